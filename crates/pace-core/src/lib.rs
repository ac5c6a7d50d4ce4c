//! pace-core
//!
//! Pacing, purchase, shuffle, bills, and period services for envelope budgets.
//! Depends on pace-domain. No terminal I/O, no filesystem, no system clock.

pub mod bills_service;
pub mod calendar;
pub mod envelope_service;
pub mod error;
pub mod period_service;
pub mod plans;
pub mod purchase_service;
pub mod shuffle_service;
pub mod state;
pub mod status_service;
pub mod storage;
pub mod time;

pub use bills_service::*;
pub use calendar::*;
pub use envelope_service::*;
pub use error::CoreError;
pub use period_service::*;
pub use plans::*;
pub use purchase_service::*;
pub use shuffle_service::*;
pub use state::*;
pub use status_service::*;
pub use storage::*;
pub use time::*;
