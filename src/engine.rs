use std::sync::Arc;

use uuid::Uuid;

use pace_config::Config;
use pace_core::{
    snapshot_warnings, BillsService, BudgetEngineState, Clock, CoreError, EnvelopeService,
    NewPeriod, PeriodService, PlanStore, PurchaseService, ShufflePlan, ShuffleService,
    SnapshotStorage, StatusService,
};
use pace_domain::{
    Bill, BillUpdate, BillsEnvelope, PaycheckFrequency, Period, PeriodDescriptor, PeriodId,
    PeriodPlan, Purchase, PurchaseDraft, ShuffleStrategy, ShuffleTransaction, Snapshot,
    StatusReport, UserPreferences,
};
use pace_storage_json::{JsonPlanStore, JsonSnapshotStorage, StoragePaths};

use crate::{clock::SystemClock, errors::BudgetError, errors::Result};

/// Upper bound on periods started by a single rollover catch-up.
const MAX_CATCH_UP_PERIODS: usize = 366;

/// Outcome of [`BudgetEngine::load`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub found: bool,
    pub warnings: Vec<String>,
}

/// Controller that owns engine state and wires it to storage, plans, and a clock.
///
/// Mutations stay in memory until [`BudgetEngine::save`] is called.
pub struct BudgetEngine {
    state: BudgetEngineState,
    config: Config,
    clock: Arc<dyn Clock>,
    storage: Box<dyn SnapshotStorage>,
    plans: Box<dyn PlanStore>,
}

impl BudgetEngine {
    pub fn new(
        config: Config,
        clock: Arc<dyn Clock>,
        storage: Box<dyn SnapshotStorage>,
        plans: Box<dyn PlanStore>,
    ) -> Self {
        Self {
            state: BudgetEngineState::new(),
            config,
            clock,
            storage,
            plans,
        }
    }

    /// Opens the JSON stores under the configured data root and loads the user's snapshot.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let root = config.resolve_data_root();
        let paths = StoragePaths::from_data_root(&root);
        let storage = JsonSnapshotStorage::with_retention(&paths, config.backup_retention)?;
        let plans = JsonPlanStore::new(paths.plan_root.clone())?;
        tracing::info!(
            data_root = %root.display(),
            user = %config.user_id,
            "opening budget engine"
        );

        let mut engine = Self::new(
            config,
            Arc::new(SystemClock),
            Box::new(storage),
            Box::new(plans),
        );
        engine.load()?;
        Ok(engine)
    }

    pub fn state(&self) -> &BudgetEngineState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn preferences(&self) -> Option<&UserPreferences> {
        self.config.preferences.as_ref()
    }

    pub fn set_preferences(&mut self, preferences: UserPreferences) {
        self.config.preferences = Some(preferences);
    }

    pub fn plans(&self) -> &dyn PlanStore {
        self.plans.as_ref()
    }

    /// Replaces in-memory state with the stored snapshot, if there is one.
    pub fn load(&mut self) -> Result<LoadReport> {
        let Some(snapshot) = self.storage.load(&self.config.user_id)? else {
            tracing::debug!(user = %self.config.user_id, "no stored snapshot");
            return Ok(LoadReport::default());
        };
        let warnings = snapshot_warnings(&snapshot);
        for warning in &warnings {
            tracing::warn!(user = %self.config.user_id, "{warning}");
        }
        self.state = BudgetEngineState::from_snapshot(snapshot);
        Ok(LoadReport {
            found: true,
            warnings,
        })
    }

    pub fn save(&self) -> Result<()> {
        self.storage
            .save(&self.config.user_id, &self.state.snapshot())?;
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.snapshot()
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.state.snapshot())?)
    }

    /// Replaces state with a snapshot parsed from JSON. The session returns to idle.
    pub fn import_json(&mut self, json: &str) -> Result<Vec<String>> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        let warnings = snapshot_warnings(&snapshot);
        self.state = BudgetEngineState::from_snapshot(snapshot);
        Ok(warnings)
    }

    // Envelopes

    pub fn add_envelope(&mut self, name: &str, allocation: f64) -> Result<Uuid> {
        Ok(EnvelopeService::add(&mut self.state, name, allocation)?)
    }

    pub fn rename_envelope(&mut self, id: Uuid, name: &str) -> Result<bool> {
        Ok(EnvelopeService::rename(&mut self.state, id, name)?)
    }

    pub fn set_allocation(&mut self, id: Uuid, allocation: f64) -> Result<bool> {
        Ok(EnvelopeService::set_allocation(&mut self.state, id, allocation)?)
    }

    pub fn delete_envelope(&mut self, id: Uuid) -> bool {
        EnvelopeService::delete(&mut self.state, id)
    }

    pub fn status(&self, id: Uuid) -> Option<StatusReport> {
        self.state
            .envelope(id)
            .map(|envelope| StatusService::evaluate_now(envelope, None, self.clock.as_ref()))
    }

    pub fn overview(&self) -> Vec<StatusReport> {
        StatusService::overview(&self.state, self.clock.as_ref())
    }

    // Purchase session

    pub fn select_envelope(&mut self, id: Uuid) -> bool {
        PurchaseService::select_envelope(&mut self.state, id)
    }

    pub fn simulate(&mut self, draft: PurchaseDraft) -> Result<StatusReport> {
        Ok(PurchaseService::simulate(
            &mut self.state,
            draft,
            self.clock.as_ref(),
        )?)
    }

    pub fn confirm(&mut self) -> Result<StatusReport> {
        Ok(PurchaseService::confirm(&mut self.state, self.clock.as_ref())?)
    }

    pub fn cancel(&mut self) -> Result<StatusReport> {
        Ok(PurchaseService::cancel(&mut self.state, self.clock.as_ref())?)
    }

    /// Previews how `strategy` would cover the pending purchase's shortfall.
    pub fn preview_shuffle(&self, strategy: &ShuffleStrategy) -> Result<Option<ShufflePlan>> {
        let purchase = self.state.session.pending_purchase().ok_or_else(|| {
            CoreError::InvalidOperation("no simulated purchase to shuffle for".into())
        })?;
        Ok(ShuffleService::plan(
            &self.state,
            purchase.envelope_id,
            purchase.amount,
            strategy,
        )?)
    }

    pub fn shuffle_and_confirm(
        &mut self,
        strategy: &ShuffleStrategy,
    ) -> Result<Option<(ShuffleTransaction, StatusReport)>> {
        Ok(PurchaseService::shuffle_and_confirm(
            &mut self.state,
            strategy,
            self.clock.as_ref(),
        )?)
    }

    pub fn purchases_for(&self, id: Uuid) -> Vec<&Purchase> {
        PurchaseService::purchases_for(&self.state, id)
    }

    // Bills

    pub fn bills(&self) -> Option<&BillsEnvelope> {
        self.state.bills.as_ref()
    }

    /// Creates (or replaces) the bills envelope.
    pub fn setup_bills(
        &mut self,
        bills: Vec<Bill>,
        current_balance: f64,
    ) -> Result<&BillsEnvelope> {
        let envelope =
            BillsService::create(bills, current_balance, self.frequency(), self.clock.today())?;
        let envelope = self.state.bills.insert(envelope);
        Ok(&*envelope)
    }

    /// Adds a bill, creating the bills envelope on first use.
    pub fn add_bill(&mut self, bill: Bill) -> Result<Uuid> {
        let today = self.clock.today();
        if let Some(envelope) = self.state.bills.as_mut() {
            return Ok(BillsService::add_bill(envelope, bill, today)?);
        }
        let mut envelope = BillsService::create(Vec::new(), 0.0, self.frequency(), today)?;
        let id = BillsService::add_bill(&mut envelope, bill, today)?;
        self.state.bills = Some(envelope);
        Ok(id)
    }

    pub fn update_bill(&mut self, id: Uuid, update: BillUpdate) -> Result<bool> {
        let today = self.clock.today();
        match self.state.bills.as_mut() {
            Some(envelope) => Ok(BillsService::update_bill(envelope, id, update, today)?),
            None => Ok(false),
        }
    }

    pub fn delete_bill(&mut self, id: Uuid) -> bool {
        let today = self.clock.today();
        self.state
            .bills
            .as_mut()
            .map_or(false, |envelope| BillsService::delete_bill(envelope, id, today))
    }

    pub fn add_money_to_bills(&mut self, amount: f64) -> Result<()> {
        let today = self.clock.today();
        let envelope = self.bills_mut()?;
        Ok(BillsService::add_money(envelope, amount, today)?)
    }

    pub fn pay_bill(&mut self, id: Uuid) -> bool {
        let today = self.clock.today();
        self.state
            .bills
            .as_mut()
            .map_or(false, |envelope| BillsService::pay_bill(envelope, id, today))
    }

    // Periods

    pub fn current_period(&self) -> Option<&Period> {
        PeriodService::current_period(&self.state)
    }

    pub fn period(&self, id: &PeriodId) -> Option<&Period> {
        PeriodService::period(&self.state, id)
    }

    pub fn start_new_period(&mut self, request: NewPeriod) -> Result<PeriodId> {
        Ok(PeriodService::start_new_period(
            &mut self.state,
            request,
            self.clock.as_ref(),
        )?)
    }

    /// The current period and the upcoming ones, `plan_horizon` entries in total.
    pub fn upcoming_periods(&self) -> Result<Vec<PeriodDescriptor>> {
        let preferences = self.preferences().ok_or(BudgetError::MissingPreferences)?;
        Ok(PeriodService::next_periods(
            preferences,
            self.state.current_period(),
            self.config.plan_horizon,
            self.plans.as_ref(),
        )?)
    }

    pub fn save_plan(&self, period_id: &PeriodId, plan: &PeriodPlan) -> Result<()> {
        Ok(self.plans.save_plan(period_id, plan)?)
    }

    pub fn delete_plan(&self, period_id: &PeriodId) -> Result<bool> {
        Ok(self.plans.delete_plan(period_id)?)
    }

    pub fn save_default_plan(&self, plan: &PeriodPlan) -> Result<()> {
        Ok(self.plans.save_default_plan(&self.config.user_id, plan)?)
    }

    pub fn should_rollover(&self) -> bool {
        PeriodService::should_rollover(&self.state, self.clock.now(), self.config.rollover_hour)
    }

    /// Rolls over as many times as needed to reach the period containing now.
    ///
    /// Stops early when a due period has no plan. Returns the ids that were started. A failure
    /// after at least one period was started is reported as
    /// [`BudgetError::RolloverInterrupted`]; the periods already started stay in place.
    pub fn check_and_start_next_period(&mut self) -> Result<Vec<PeriodId>> {
        let preferences = self
            .config
            .preferences
            .clone()
            .ok_or(BudgetError::MissingPreferences)?;
        let mut started = Vec::new();
        while started.len() < MAX_CATCH_UP_PERIODS {
            let next = PeriodService::rollover(
                &mut self.state,
                &preferences,
                self.plans.as_ref(),
                self.clock.as_ref(),
                self.config.rollover_hour,
                &self.config.user_id,
            );
            match next {
                Ok(Some(id)) => started.push(id),
                Ok(None) => break,
                Err(source) if started.is_empty() => return Err(source.into()),
                Err(source) => {
                    tracing::warn!(
                        started = started.len(),
                        %source,
                        "rollover catch-up interrupted"
                    );
                    return Err(BudgetError::RolloverInterrupted { started, source });
                }
            }
        }
        if !started.is_empty() {
            tracing::info!(count = started.len(), "caught up on period rollovers");
        }
        Ok(started)
    }

    fn frequency(&self) -> PaycheckFrequency {
        self.preferences()
            .map(|preferences| preferences.paycheck_frequency)
            .or_else(|| self.state.bills.as_ref().map(|bills| bills.frequency))
            .unwrap_or(PaycheckFrequency::Biweekly)
    }

    fn bills_mut(&mut self) -> Result<&mut BillsEnvelope> {
        let envelope = self.state.bills.as_mut().ok_or_else(|| {
            CoreError::InvalidOperation("bills envelope is not set up".into())
        })?;
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pace_core::{FixedClock, InMemoryPlanStore};
    use pace_domain::EnvelopeTemplate;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStorage {
        saved: Mutex<Option<Snapshot>>,
    }

    impl SnapshotStorage for MemoryStorage {
        fn load(&self, _user_id: &str) -> std::result::Result<Option<Snapshot>, CoreError> {
            Ok(self.saved.lock().expect("lock").clone())
        }

        fn save(&self, _user_id: &str, snapshot: &Snapshot) -> std::result::Result<(), CoreError> {
            *self.saved.lock().expect("lock") = Some(snapshot.clone());
            Ok(())
        }
    }

    fn engine_on(date: NaiveDate) -> BudgetEngine {
        BudgetEngine::new(
            Config::default(),
            Arc::new(FixedClock::at_noon(date)),
            Box::new(MemoryStorage::default()),
            Box::new(InMemoryPlanStore::new()),
        )
    }

    #[test]
    fn shuffle_preview_requires_pending_purchase() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut engine = engine_on(start);
        engine
            .start_new_period(NewPeriod::new(
                start,
                14,
                vec![EnvelopeTemplate::new("Fun", 50.0)],
            ))
            .unwrap();

        let err = engine
            .preview_shuffle(&ShuffleStrategy::ReduceFromAll)
            .unwrap_err();
        assert!(matches!(err, BudgetError::Core(CoreError::InvalidOperation(_))));
    }

    #[test]
    fn periods_need_preferences() {
        let mut engine = engine_on(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert!(matches!(
            engine.upcoming_periods(),
            Err(BudgetError::MissingPreferences)
        ));
        assert!(matches!(
            engine.check_and_start_next_period(),
            Err(BudgetError::MissingPreferences)
        ));
    }

    #[test]
    fn bills_are_created_on_first_add() {
        let mut engine = engine_on(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        assert!(engine.bills().is_none());
        assert!(engine.add_money_to_bills(10.0).is_err());

        engine.add_bill(Bill::new("Phone", 40.0, 12)).unwrap();
        let bills = engine.bills().unwrap();
        assert_eq!(bills.bills.len(), 1);
        assert_eq!(bills.frequency, PaycheckFrequency::Biweekly);
        assert_eq!(bills.total_monthly_bills, 40.0);
    }

    #[test]
    fn rejected_first_bill_leaves_state_untouched() {
        let mut engine = engine_on(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
        let before = engine.snapshot();

        let err = engine.add_bill(Bill::new("   ", 10.0, 5)).unwrap_err();
        assert!(matches!(err, BudgetError::Core(CoreError::Validation(_))));
        assert!(engine.bills().is_none());
        assert_eq!(engine.snapshot(), before);

        let id = engine.add_bill(Bill::new(" Water ", 25.0, 5)).unwrap();
        assert_eq!(engine.bills().unwrap().bill(id).unwrap().name, "Water");
    }

    #[test]
    fn envelope_management_goes_through_the_engine() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut engine = engine_on(start);
        assert!(engine.add_envelope("Travel", 100.0).is_err());
        engine
            .start_new_period(NewPeriod::new(
                start,
                14,
                vec![EnvelopeTemplate::new("Groceries", 300.0)],
            ))
            .unwrap();

        let travel = engine.add_envelope("Travel", 100.0).unwrap();
        assert!(engine.rename_envelope(travel, "Trips").unwrap());
        assert!(engine.set_allocation(travel, 150.0).unwrap());
        assert!(engine.rename_envelope(travel, "groceries").is_err());
        let status = engine.status(travel).unwrap();
        assert_eq!(status.envelope_name, "Trips");
        assert_eq!(status.remaining_amount, 150.0);
        assert_eq!(engine.overview().len(), 2);

        assert!(engine.delete_envelope(travel));
        assert!(!engine.delete_envelope(travel));
        assert!(engine.status(travel).is_none());
    }

    #[test]
    fn interrupted_catch_up_reports_started_periods() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut engine = engine_on(NaiveDate::from_ymd_opt(2025, 4, 15).unwrap());
        engine.set_preferences(UserPreferences::new(
            PaycheckFrequency::Biweekly,
            start,
            2000.0,
        ));
        engine
            .start_new_period(NewPeriod::new(
                start,
                14,
                vec![EnvelopeTemplate::new("Groceries", 280.0)],
            ))
            .unwrap();
        let second = PeriodId::from_start(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap());
        engine
            .save_plan(
                &second,
                &PeriodPlan::new(vec![EnvelopeTemplate::new("Groceries", 300.0)], 0.0),
            )
            .unwrap();
        engine
            .save_default_plan(&PeriodPlan::new(
                vec![
                    EnvelopeTemplate::new("Fun", 10.0),
                    EnvelopeTemplate::new("fun", 20.0),
                ],
                0.0,
            ))
            .unwrap();

        match engine.check_and_start_next_period() {
            Err(BudgetError::RolloverInterrupted { started, source }) => {
                assert_eq!(started, vec![second.clone()]);
                assert!(matches!(source, CoreError::Validation(_)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(engine.current_period().unwrap().id, second);
        assert_eq!(engine.state().periods.len(), 2);
    }

    #[test]
    fn json_export_round_trips_through_import() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut engine = engine_on(start);
        engine
            .start_new_period(NewPeriod::new(
                start,
                14,
                vec![EnvelopeTemplate::new("Groceries", 300.0)],
            ))
            .unwrap();
        let json = engine.export_json().unwrap();

        let mut other = engine_on(start);
        let warnings = other.import_json(&json).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(other.snapshot(), engine.snapshot());
    }
}
