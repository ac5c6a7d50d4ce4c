use serde::{Deserialize, Serialize};
use std::{ffi::OsString, path::PathBuf};

use pace_domain::{PaycheckFrequency, UserPreferences};

use crate::ConfigError;

/// Environment variable that overrides the default data directory.
pub const PACE_HOME_ENV: &str = "PACE_HOME";

const DEFAULT_DATA_DIR: &str = ".pace_budget";
const MAX_PLAN_HORIZON: usize = 24;

/// Stores engine settings and the user's pay schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    #[serde(default = "Config::default_user_id")]
    pub user_id: String,
    /// Local hour at which an elapsed period rolls over.
    #[serde(default = "Config::default_rollover_hour")]
    pub rollover_hour: u32,
    /// How many periods (current included) are listed when planning ahead.
    #[serde(default = "Config::default_plan_horizon")]
    pub plan_horizon: usize,
    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<UserPreferences>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom root for snapshots, plans, and backups. Defaults to `~/.pace_budget`.
    pub data_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            currency: "USD".into(),
            user_id: Self::default_user_id(),
            rollover_hour: Self::default_rollover_hour(),
            plan_horizon: Self::default_plan_horizon(),
            backup_retention: Self::default_backup_retention(),
            preferences: None,
            data_root: None,
        }
    }
}

impl Config {
    pub fn default_user_id() -> String {
        "default".into()
    }

    pub fn default_rollover_hour() -> u32 {
        6
    }

    pub fn default_plan_horizon() -> usize {
        3
    }

    pub fn default_backup_retention() -> usize {
        5
    }

    /// Data root from the config, else `$PACE_HOME`, else `~/.pace_budget`.
    pub fn resolve_data_root(&self) -> PathBuf {
        self.resolve_data_root_with(std::env::var_os(PACE_HOME_ENV))
    }

    /// Same as [`Config::resolve_data_root`] with an explicit `PACE_HOME` value.
    pub fn resolve_data_root_with(&self, pace_home: Option<OsString>) -> PathBuf {
        if let Some(path) = &self.data_root {
            return path.clone();
        }
        if let Some(home) = pace_home.filter(|value| !value.is_empty()) {
            return PathBuf::from(home);
        }

        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join(DEFAULT_DATA_DIR)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_id.trim().is_empty() {
            return Err(ConfigError::Invalid("user_id cannot be empty".into()));
        }
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Invalid("currency cannot be empty".into()));
        }
        if self.rollover_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "rollover_hour must be 0-23, got {}",
                self.rollover_hour
            )));
        }
        if !(1..=MAX_PLAN_HORIZON).contains(&self.plan_horizon) {
            return Err(ConfigError::Invalid(format!(
                "plan_horizon must be 1-{MAX_PLAN_HORIZON}, got {}",
                self.plan_horizon
            )));
        }
        if self.backup_retention == 0 {
            return Err(ConfigError::Invalid(
                "backup_retention must keep at least one backup".into(),
            ));
        }
        if let Some(preferences) = &self.preferences {
            validate_preferences(preferences)?;
        }
        Ok(())
    }
}

fn validate_preferences(preferences: &UserPreferences) -> Result<(), ConfigError> {
    if !(preferences.paycheck_amount.is_finite() && preferences.paycheck_amount >= 0.0) {
        return Err(ConfigError::Invalid(
            "paycheck_amount must be non-negative".into(),
        ));
    }
    if preferences.first_period_length == 0 {
        return Err(ConfigError::Invalid(
            "first_period_length must be at least one day".into(),
        ));
    }
    let day_in_range = |day: u32| (1..=31).contains(&day);
    if let Some(day) = preferences.monthly_pay_day {
        if !day_in_range(day) {
            return Err(ConfigError::Invalid(format!(
                "monthly_pay_day must be 1-31, got {day}"
            )));
        }
    }
    match (preferences.paycheck_frequency, preferences.semi_monthly_pay_days) {
        (PaycheckFrequency::Semimonthly, None) => Err(ConfigError::Invalid(
            "semimonthly schedule requires semi_monthly_pay_days".into(),
        )),
        (_, Some(days)) if !days.iter().copied().all(day_in_range) => Err(ConfigError::Invalid(
            format!("semi_monthly_pay_days must be 1-31, got {days:?}"),
        )),
        _ => Ok(()),
    }
}
