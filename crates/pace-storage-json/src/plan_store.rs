use std::{fs, path::PathBuf};

use pace_core::{CoreError, PlanStore};
use pace_domain::{PeriodId, PeriodPlan};

use crate::fs_util::{
    canonical_name, read_json, remove_if_exists, write_json_atomic, JSON_EXTENSION,
};

const DEFAULT_PREFIX: &str = "default_";

/// Saved plans as `<root>/<period-id>.json`, user templates as `<root>/default_<user>.json`.
#[derive(Debug, Clone)]
pub struct JsonPlanStore {
    root: PathBuf,
}

impl JsonPlanStore {
    pub fn new(root: PathBuf) -> Result<Self, CoreError> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn plan_path(&self, period_id: &PeriodId) -> PathBuf {
        let stem: String = period_id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.root.join(format!("{stem}.{JSON_EXTENSION}"))
    }

    pub fn default_plan_path(&self, user_id: &str) -> PathBuf {
        self.root.join(format!(
            "{DEFAULT_PREFIX}{}.{JSON_EXTENSION}",
            canonical_name(user_id)
        ))
    }

    fn read(path: PathBuf) -> Result<Option<PeriodPlan>, CoreError> {
        if path.exists() {
            read_json(&path).map(Some)
        } else {
            Ok(None)
        }
    }
}

impl PlanStore for JsonPlanStore {
    fn get_plan(&self, period_id: &PeriodId) -> Result<Option<PeriodPlan>, CoreError> {
        Self::read(self.plan_path(period_id))
    }

    fn save_plan(&self, period_id: &PeriodId, plan: &PeriodPlan) -> Result<(), CoreError> {
        write_json_atomic(&self.plan_path(period_id), plan)?;
        tracing::debug!(period = %period_id, "saved period plan");
        Ok(())
    }

    fn delete_plan(&self, period_id: &PeriodId) -> Result<bool, CoreError> {
        remove_if_exists(&self.plan_path(period_id))
    }

    fn get_default_plan(&self, user_id: &str) -> Result<Option<PeriodPlan>, CoreError> {
        Self::read(self.default_plan_path(user_id))
    }

    fn save_default_plan(&self, user_id: &str, plan: &PeriodPlan) -> Result<(), CoreError> {
        write_json_atomic(&self.default_plan_path(user_id), plan)?;
        tracing::debug!(user = %canonical_name(user_id), "saved default plan");
        Ok(())
    }

    fn delete_default_plan(&self, user_id: &str) -> Result<bool, CoreError> {
        remove_if_exists(&self.default_plan_path(user_id))
    }
}
