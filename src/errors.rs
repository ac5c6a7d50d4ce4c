use thiserror::Error;

use pace_config::ConfigError;
use pace_core::CoreError;
use pace_domain::PeriodId;

/// Error type surfaced by the `BudgetEngine` facade.
#[derive(Debug, Error)]
pub enum BudgetError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Pay schedule is not configured")]
    MissingPreferences,
    #[error("Rollover stopped after starting {} period(s): {source}", .started.len())]
    RolloverInterrupted {
        started: Vec<PeriodId>,
        #[source]
        source: CoreError,
    },
}

pub type Result<T> = std::result::Result<T, BudgetError>;
