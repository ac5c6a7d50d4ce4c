//! The simulate/confirm/cancel session for purchases against the selected envelope.

use uuid::Uuid;

use pace_domain::{
    PeriodTransaction, Purchase, PurchaseDraft, ShuffleStrategy, ShuffleTransaction, StatusReport,
};

use crate::{
    shuffle_service::ShuffleService,
    state::{BudgetEngineState, SessionFlow},
    status_service::StatusService,
    time::Clock,
    CoreError,
};

/// Drives the single in-flight purchase flow held in [`BudgetEngineState::session`].
pub struct PurchaseService;

impl PurchaseService {
    /// Makes `envelope_id` the current envelope and drops any pending simulation.
    /// Returns `false` (leaving the session untouched) when the id is unknown.
    pub fn select_envelope(state: &mut BudgetEngineState, envelope_id: Uuid) -> bool {
        if state.envelope(envelope_id).is_none() {
            return false;
        }
        state.session.current_envelope_id = Some(envelope_id);
        state.session.flow = SessionFlow::Idle;
        true
    }

    /// Evaluates the current envelope as if `draft` were spent, without committing it.
    ///
    /// A second call replaces the previous uncommitted purchase.
    pub fn simulate(
        state: &mut BudgetEngineState,
        draft: PurchaseDraft,
        clock: &dyn Clock,
    ) -> Result<StatusReport, CoreError> {
        if !(draft.amount.is_finite() && draft.amount > 0.0) {
            return Err(CoreError::Validation(format!(
                "purchase amount must be positive, got {}",
                draft.amount
            )));
        }
        let envelope = state
            .current_envelope()
            .ok_or_else(|| CoreError::InvalidOperation("no envelope is selected".into()))?;

        let purchase = Purchase::new(envelope.id, draft.amount, draft.item, clock.today());
        let report = StatusService::evaluate_now(envelope, Some(&purchase), clock);
        if state.session.is_simulating() {
            tracing::debug!("replacing pending simulated purchase");
        }
        state.session.flow = SessionFlow::Simulating { purchase };
        Ok(report)
    }

    /// Commits the simulated purchase and returns the envelope's post-commit status.
    pub fn confirm(
        state: &mut BudgetEngineState,
        clock: &dyn Clock,
    ) -> Result<StatusReport, CoreError> {
        let purchase = Self::pending(state)?;
        let envelope = state.envelope_mut(purchase.envelope_id).ok_or_else(|| {
            CoreError::InvalidOperation("simulated envelope no longer exists".into())
        })?;
        envelope.spent += purchase.amount;
        let report = StatusService::evaluate_now(envelope, None, clock);

        state.purchases.push(purchase.clone());
        state.record_transaction(PeriodTransaction::Purchase(purchase.clone()));
        state.session.flow = SessionFlow::Idle;
        tracing::info!(
            envelope = %report.envelope_name,
            amount = purchase.amount,
            status = %report.status,
            "confirmed purchase"
        );
        Ok(report)
    }

    /// Discards the simulated purchase and returns the unchanged envelope's status.
    pub fn cancel(
        state: &mut BudgetEngineState,
        clock: &dyn Clock,
    ) -> Result<StatusReport, CoreError> {
        let purchase = Self::pending(state)?;
        let envelope = state.envelope(purchase.envelope_id).ok_or_else(|| {
            CoreError::InvalidOperation("simulated envelope no longer exists".into())
        })?;
        let report = StatusService::evaluate_now(envelope, None, clock);
        state.session.flow = SessionFlow::Idle;
        Ok(report)
    }

    /// Commits the simulated purchase by shuffling funds from other envelopes.
    ///
    /// The session stays in `Simulating` if the shuffle is rejected. Returns `Ok(None)` when a
    /// manually named source envelope does not exist.
    pub fn shuffle_and_confirm(
        state: &mut BudgetEngineState,
        strategy: &ShuffleStrategy,
        clock: &dyn Clock,
    ) -> Result<Option<(ShuffleTransaction, StatusReport)>, CoreError> {
        let purchase = Self::pending(state)?;
        let target_id = purchase.envelope_id;
        let Some(plan) = ShuffleService::plan(state, target_id, purchase.amount, strategy)? else {
            return Ok(None);
        };
        let Some(transaction) =
            ShuffleService::apply(state, target_id, purchase, &plan.allocations, clock)?
        else {
            return Ok(None);
        };
        state.session.flow = SessionFlow::Idle;
        let report = state
            .envelope(target_id)
            .map(|envelope| StatusService::evaluate_now(envelope, None, clock))
            .ok_or_else(|| CoreError::InvalidOperation("shuffle target disappeared".into()))?;
        Ok(Some((transaction, report)))
    }

    /// Committed purchases for one envelope, oldest first.
    pub fn purchases_for(state: &BudgetEngineState, envelope_id: Uuid) -> Vec<&Purchase> {
        state
            .purchases
            .iter()
            .filter(|purchase| purchase.envelope_id == envelope_id)
            .collect()
    }

    /// Transaction log of the current period, oldest first.
    pub fn current_transactions(state: &BudgetEngineState) -> &[PeriodTransaction] {
        state
            .current_period()
            .map_or(&[], |period| period.transactions.as_slice())
    }

    fn pending(state: &BudgetEngineState) -> Result<Purchase, CoreError> {
        state
            .session
            .pending_purchase()
            .cloned()
            .ok_or_else(|| CoreError::InvalidOperation("no purchase is being simulated".into()))
    }
}
