#![doc(test(attr(deny(warnings))))]

//! pace_budget ties the envelope-pacing engine to JSON storage, saved plans, the
//! engine configuration, and the system clock.

pub mod clock;
pub mod engine;
pub mod errors;
pub mod utils;

use std::sync::Once;

pub use clock::SystemClock;
pub use engine::{BudgetEngine, LoadReport};
pub use errors::{BudgetError, Result};
pub use pace_config::{Config, ConfigError, ConfigManager};
pub use pace_core::{Clock, CoreError, FixedClock, NewPeriod, BillsSeed, ShufflePlan};
pub use pace_domain::*;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("pace_budget tracing initialized.");
    });
}
