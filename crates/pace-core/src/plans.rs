//! Saved-plan store collaborator and an in-memory implementation.

use std::{collections::HashMap, sync::Mutex};

use pace_domain::{PeriodId, PeriodPlan};

use crate::CoreError;

/// Stores envelope layouts saved ahead of a period, plus a per-user default template.
pub trait PlanStore: Send + Sync {
    fn get_plan(&self, period_id: &PeriodId) -> Result<Option<PeriodPlan>, CoreError>;
    fn save_plan(&self, period_id: &PeriodId, plan: &PeriodPlan) -> Result<(), CoreError>;
    /// Returns whether a plan was removed.
    fn delete_plan(&self, period_id: &PeriodId) -> Result<bool, CoreError>;

    fn get_default_plan(&self, user_id: &str) -> Result<Option<PeriodPlan>, CoreError>;
    fn save_default_plan(&self, user_id: &str, plan: &PeriodPlan) -> Result<(), CoreError>;
    fn delete_default_plan(&self, user_id: &str) -> Result<bool, CoreError>;

    /// The plan saved for `period_id`, falling back to the user's default template.
    fn resolve_plan(
        &self,
        period_id: &PeriodId,
        user_id: &str,
    ) -> Result<Option<PeriodPlan>, CoreError> {
        match self.get_plan(period_id)? {
            Some(plan) => Ok(Some(plan)),
            None => self.get_default_plan(user_id),
        }
    }
}

#[derive(Debug, Default)]
struct PlanTables {
    periods: HashMap<PeriodId, PeriodPlan>,
    defaults: HashMap<String, PeriodPlan>,
}

/// Process-local plan store, used by tests and callers without a data directory.
#[derive(Debug, Default)]
pub struct InMemoryPlanStore {
    tables: Mutex<PlanTables>,
}

impl InMemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut PlanTables) -> T) -> Result<T, CoreError> {
        let mut guard = self
            .tables
            .lock()
            .map_err(|_| CoreError::Storage("plan store lock poisoned".into()))?;
        Ok(f(&mut guard))
    }
}

impl PlanStore for InMemoryPlanStore {
    fn get_plan(&self, period_id: &PeriodId) -> Result<Option<PeriodPlan>, CoreError> {
        self.with_tables(|tables| tables.periods.get(period_id).cloned())
    }

    fn save_plan(&self, period_id: &PeriodId, plan: &PeriodPlan) -> Result<(), CoreError> {
        self.with_tables(|tables| {
            tables.periods.insert(period_id.clone(), plan.clone());
        })
    }

    fn delete_plan(&self, period_id: &PeriodId) -> Result<bool, CoreError> {
        self.with_tables(|tables| tables.periods.remove(period_id).is_some())
    }

    fn get_default_plan(&self, user_id: &str) -> Result<Option<PeriodPlan>, CoreError> {
        self.with_tables(|tables| tables.defaults.get(user_id).cloned())
    }

    fn save_default_plan(&self, user_id: &str, plan: &PeriodPlan) -> Result<(), CoreError> {
        self.with_tables(|tables| {
            tables.defaults.insert(user_id.to_string(), plan.clone());
        })
    }

    fn delete_default_plan(&self, user_id: &str) -> Result<bool, CoreError> {
        self.with_tables(|tables| tables.defaults.remove(user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pace_domain::EnvelopeTemplate;

    fn period_id() -> PeriodId {
        PeriodId::from_start(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap())
    }

    #[test]
    fn resolve_prefers_period_plan_over_default() {
        let store = InMemoryPlanStore::new();
        let default = PeriodPlan::new(vec![EnvelopeTemplate::new("Groceries", 300.0)], 0.0);
        let specific = PeriodPlan::new(vec![EnvelopeTemplate::new("Groceries", 450.0)], 50.0);

        store.save_default_plan("alex", &default).unwrap();
        assert_eq!(store.resolve_plan(&period_id(), "alex").unwrap(), Some(default.clone()));

        store.save_plan(&period_id(), &specific).unwrap();
        assert_eq!(store.resolve_plan(&period_id(), "alex").unwrap(), Some(specific));

        assert!(store.delete_plan(&period_id()).unwrap());
        assert!(!store.delete_plan(&period_id()).unwrap());
        assert_eq!(store.resolve_plan(&period_id(), "alex").unwrap(), Some(default));
    }

    #[test]
    fn missing_plans_resolve_to_none() {
        let store = InMemoryPlanStore::new();
        assert!(store.resolve_plan(&period_id(), "nobody").unwrap().is_none());
        assert!(!store.delete_default_plan("nobody").unwrap());
    }
}
