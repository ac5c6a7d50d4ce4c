//! pace-config
//!
//! Persistent engine configuration: locale, user identity, pay schedule, rollover and
//! retention settings, plus the data directory. Owns the Config model and its disk helpers.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::{Config, PACE_HOME_ENV};
