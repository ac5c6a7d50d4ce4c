//! Cross-envelope reallocation to cover a purchase shortfall.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pace_domain::{
    round_currency, sum_amounts, Envelope, PeriodTransaction, Purchase, ShuffleAllocation,
    ShuffleLimit, ShuffleStrategy, ShuffleTransaction, CURRENCY_EPSILON,
};

use crate::{state::BudgetEngineState, time::Clock, CoreError};

const CENT: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// An envelope that still has unspent allocation to give.
pub struct ShuffleCandidate {
    pub envelope_id: Uuid,
    pub name: String,
    pub remaining: f64,
    pub previous_remaining: f64,
}

impl ShuffleCandidate {
    fn from_envelope(envelope: &Envelope) -> Self {
        Self {
            envelope_id: envelope.id,
            name: envelope.name.clone(),
            remaining: envelope.remaining(),
            previous_remaining: envelope.previous_remaining.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Proposed allocations for one shortfall; computing a plan never mutates state.
pub struct ShufflePlan {
    pub target_envelope_id: Uuid,
    pub amount_needed: f64,
    pub allocations: Vec<ShuffleAllocation>,
    pub total: f64,
    pub covers_need: bool,
}

/// Stateless reallocation calculator and committer.
pub struct ShuffleService;

impl ShuffleService {
    /// Shortfall the target cannot absorb from its own remaining allocation.
    pub fn amount_needed(target: &Envelope, purchase_amount: f64) -> f64 {
        round_currency((purchase_amount - target.remaining()).max(0.0))
    }

    /// Every envelope except the target that has unspent allocation, in envelope order.
    pub fn candidates(
        state: &BudgetEngineState,
        target_envelope_id: Uuid,
    ) -> Vec<ShuffleCandidate> {
        state
            .envelopes
            .iter()
            .filter(|envelope| envelope.id != target_envelope_id && !envelope.is_empty())
            .map(ShuffleCandidate::from_envelope)
            .collect()
    }

    /// Computes allocations for `strategy` without touching state.
    ///
    /// Returns `Ok(None)` when the target or a manually named source does not exist.
    pub fn plan(
        state: &BudgetEngineState,
        target_envelope_id: Uuid,
        purchase_amount: f64,
        strategy: &ShuffleStrategy,
    ) -> Result<Option<ShufflePlan>, CoreError> {
        let Some(target) = state.envelope(target_envelope_id) else {
            return Ok(None);
        };
        let amount_needed = Self::amount_needed(target, purchase_amount);
        let candidates = Self::candidates(state, target_envelope_id);

        let allocations = match strategy {
            ShuffleStrategy::Manual { allocations } => {
                if !Self::sources_exist(state, allocations) {
                    return Ok(None);
                }
                Self::validate_allocations(state, target_envelope_id, allocations)?;
                allocations
                    .iter()
                    .map(|entry| {
                        ShuffleAllocation::new(entry.envelope_id, round_currency(entry.amount))
                    })
                    .collect()
            }
            ShuffleStrategy::ReduceFromAll => Self::reduce_from_all(&candidates, amount_needed),
            ShuffleStrategy::Recommended => Self::recommended(candidates, amount_needed),
        };

        let total = round_currency(sum_amounts(allocations.iter().map(|entry| entry.amount)));
        let plan = ShufflePlan {
            target_envelope_id,
            amount_needed,
            covers_need: total + CURRENCY_EPSILON >= amount_needed,
            allocations,
            total,
        };
        tracing::debug!(
            target = %target.name,
            strategy = %strategy,
            amount_needed,
            total,
            covers_need = plan.covers_need,
            "computed shuffle plan"
        );
        Ok(Some(plan))
    }

    /// Commits a shuffle: grows the target by exactly the shortfall, books the purchase,
    /// and takes each allocation out of its source.
    ///
    /// Everything is validated before any field changes, so a rejected shuffle leaves
    /// state untouched. Returns `Ok(None)` when the target or a source does not exist.
    pub fn apply(
        state: &mut BudgetEngineState,
        target_envelope_id: Uuid,
        mut purchase: Purchase,
        allocations: &[ShuffleAllocation],
        clock: &dyn Clock,
    ) -> Result<Option<ShuffleTransaction>, CoreError> {
        if !(purchase.amount.is_finite() && purchase.amount > 0.0) {
            return Err(CoreError::Validation(format!(
                "purchase amount must be positive, got {}",
                purchase.amount
            )));
        }
        let Some(target) = state.envelope(target_envelope_id) else {
            return Ok(None);
        };
        if !Self::sources_exist(state, allocations) {
            return Ok(None);
        }
        Self::validate_allocations(state, target_envelope_id, allocations)?;

        let amount_needed = Self::amount_needed(target, purchase.amount);
        let allocations: Vec<ShuffleAllocation> = allocations
            .iter()
            .filter(|entry| entry.amount > 0.0)
            .map(|entry| ShuffleAllocation::new(entry.envelope_id, round_currency(entry.amount)))
            .collect();
        let provided = round_currency(sum_amounts(allocations.iter().map(|entry| entry.amount)));
        if provided + CURRENCY_EPSILON < amount_needed {
            return Err(CoreError::ShuffleInsufficient {
                needed: amount_needed,
                provided,
            });
        }

        purchase.envelope_id = target_envelope_id;
        let transaction = ShuffleTransaction::new(
            target_envelope_id,
            purchase.id,
            allocations.clone(),
            clock.today(),
        );

        if let Some(target) = state.envelope_mut(target_envelope_id) {
            target.allocation += amount_needed;
            target.spent += purchase.amount;
        }
        for entry in &allocations {
            let allocation_before = match state.envelope_mut(entry.envelope_id) {
                Some(source) => {
                    let before = source.allocation;
                    source.allocation -= entry.amount;
                    before
                }
                None => continue,
            };
            Self::track_limit(state, entry, allocation_before);
        }

        state.purchases.push(purchase.clone());
        state.shuffle_transactions.push(transaction.clone());
        state.record_transaction(PeriodTransaction::Purchase(purchase));
        state.record_transaction(PeriodTransaction::Shuffle(transaction.clone()));

        tracing::info!(
            target = %target_envelope_id,
            amount_needed,
            provided,
            sources = allocations.len(),
            "applied shuffle"
        );
        Ok(Some(transaction))
    }

    /// Advisory cap usage for one envelope.
    pub fn limit_status(state: &BudgetEngineState, envelope_id: Uuid) -> Option<&ShuffleLimit> {
        state.shuffle_limit(envelope_id)
    }

    fn reduce_from_all(
        candidates: &[ShuffleCandidate],
        amount_needed: f64,
    ) -> Vec<ShuffleAllocation> {
        let total_remaining = sum_amounts(candidates.iter().map(|c| c.remaining));
        if amount_needed <= 0.0 || total_remaining <= 0.0 {
            return Vec::new();
        }
        let mut allocations: Vec<ShuffleAllocation> = candidates
            .iter()
            .map(|candidate| {
                let share = amount_needed * candidate.remaining / total_remaining;
                ShuffleAllocation::new(
                    candidate.envelope_id,
                    round_currency(share.min(candidate.remaining)),
                )
            })
            .collect();

        // Per-envelope rounding can leave the total a few cents short.
        let allocated = sum_amounts(allocations.iter().map(|a| a.amount));
        let mut shortfall = round_currency(amount_needed.min(total_remaining) - allocated);
        for (entry, candidate) in allocations.iter_mut().zip(candidates) {
            while shortfall > CURRENCY_EPSILON
                && entry.amount + CENT <= candidate.remaining + CURRENCY_EPSILON
            {
                entry.amount = round_currency(entry.amount + CENT);
                shortfall = round_currency(shortfall - CENT);
            }
        }
        allocations.retain(|entry| entry.amount > 0.0);
        allocations
    }

    fn recommended(
        mut candidates: Vec<ShuffleCandidate>,
        amount_needed: f64,
    ) -> Vec<ShuffleAllocation> {
        candidates.sort_by(|a, b| {
            let a_carry = a.previous_remaining > 0.0;
            let b_carry = b.previous_remaining > 0.0;
            b_carry
                .cmp(&a_carry)
                .then_with(|| b.remaining.total_cmp(&a.remaining))
        });
        let mut still_needed = amount_needed;
        let mut allocations = Vec::new();
        for candidate in candidates {
            if still_needed <= CURRENCY_EPSILON {
                break;
            }
            let amount = round_currency(candidate.remaining.min(still_needed));
            if amount > 0.0 {
                allocations.push(ShuffleAllocation::new(candidate.envelope_id, amount));
                still_needed = round_currency(still_needed - amount);
            }
        }
        allocations
    }

    fn sources_exist(state: &BudgetEngineState, allocations: &[ShuffleAllocation]) -> bool {
        allocations
            .iter()
            .all(|entry| state.envelope(entry.envelope_id).is_some())
    }

    fn validate_allocations(
        state: &BudgetEngineState,
        target_envelope_id: Uuid,
        allocations: &[ShuffleAllocation],
    ) -> Result<(), CoreError> {
        let mut seen = HashSet::new();
        for entry in allocations {
            if entry.envelope_id == target_envelope_id {
                return Err(CoreError::Validation(
                    "cannot shuffle from the target envelope".into(),
                ));
            }
            if !seen.insert(entry.envelope_id) {
                return Err(CoreError::Validation(format!(
                    "envelope {} appears more than once",
                    entry.envelope_id
                )));
            }
            if !(entry.amount.is_finite() && entry.amount >= 0.0) {
                return Err(CoreError::Validation(format!(
                    "shuffle amount must be non-negative, got {}",
                    entry.amount
                )));
            }
            let remaining = state
                .envelope(entry.envelope_id)
                .map_or(0.0, |source| source.remaining().max(0.0));
            if entry.amount > remaining + CURRENCY_EPSILON {
                return Err(CoreError::Validation(format!(
                    "cannot take {:.2} from an envelope with {:.2} remaining",
                    entry.amount, remaining
                )));
            }
        }
        Ok(())
    }

    fn track_limit(
        state: &mut BudgetEngineState,
        entry: &ShuffleAllocation,
        allocation_before: f64,
    ) {
        if state.shuffle_limit(entry.envelope_id).is_none() {
            state
                .shuffle_limits
                .push(ShuffleLimit::for_allocation(entry.envelope_id, allocation_before));
        }
        if let Some(limit) = state.shuffle_limit_mut(entry.envelope_id) {
            limit.current_shuffled = round_currency(limit.current_shuffled + entry.amount);
            if limit.is_exceeded() {
                tracing::warn!(
                    envelope = %entry.envelope_id,
                    shuffled = limit.current_shuffled,
                    max = limit.max_amount,
                    "shuffle limit exceeded"
                );
            } else {
                tracing::debug!(
                    envelope = %entry.envelope_id,
                    capacity_left = limit.remaining_capacity(),
                    "shuffle limit usage"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedClock;
    use chrono::NaiveDate;
    use pace_domain::Period;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 5).unwrap()
    }

    fn clock() -> FixedClock {
        FixedClock::at_noon(today())
    }

    fn add(state: &mut BudgetEngineState, name: &str, allocation: f64, spent: f64) -> Uuid {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut envelope = Envelope::new(name, allocation, 14, start);
        envelope.spent = spent;
        let id = envelope.id;
        state
            .shuffle_limits
            .push(ShuffleLimit::for_allocation(id, allocation));
        state.envelopes.push(envelope);
        id
    }

    fn base_state() -> (BudgetEngineState, Uuid, Uuid, Uuid) {
        let mut state = BudgetEngineState::new();
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 14).unwrap();
        state.periods.push(Period::new(start, end, Vec::new()));
        let target = add(&mut state, "Dining", 100.0, 90.0);
        let a = add(&mut state, "Fun", 80.0, 50.0);
        let b = add(&mut state, "Gas", 60.0, 40.0);
        (state, target, a, b)
    }

    #[test]
    fn amount_needed_only_counts_shortfall() {
        let (state, target, _, _) = base_state();
        let target = state.envelope(target).unwrap();
        assert_eq!(ShuffleService::amount_needed(target, 60.0), 50.0);
        assert_eq!(ShuffleService::amount_needed(target, 5.0), 0.0);
    }

    #[test]
    fn reduce_from_all_drains_proportionally() {
        let (state, target, a, b) = base_state();
        let plan = ShuffleService::plan(&state, target, 60.0, &ShuffleStrategy::ReduceFromAll)
            .unwrap()
            .unwrap();
        assert_eq!(plan.amount_needed, 50.0);
        assert!(plan.covers_need);
        let amount_for = |id| {
            plan.allocations
                .iter()
                .find(|entry| entry.envelope_id == id)
                .map(|entry| entry.amount)
        };
        assert_eq!(amount_for(a), Some(30.0));
        assert_eq!(amount_for(b), Some(20.0));
    }

    #[test]
    fn reduce_from_all_tops_up_rounding_shortfall() {
        let mut state = BudgetEngineState::new();
        let target = add(&mut state, "Dining", 10.0, 10.0);
        add(&mut state, "A", 10.0, 0.0);
        add(&mut state, "B", 10.0, 0.0);
        add(&mut state, "C", 10.0, 0.0);
        let plan = ShuffleService::plan(&state, target, 10.0, &ShuffleStrategy::ReduceFromAll)
            .unwrap()
            .unwrap();
        assert_eq!(plan.total, 10.0);
        assert!(plan.covers_need);
    }

    #[test]
    fn recommended_prefers_carried_surplus_then_largest() {
        let (mut state, target, a, b) = base_state();
        state.envelope_mut(b).unwrap().previous_remaining = Some(12.0);
        let plan = ShuffleService::plan(&state, target, 40.0, &ShuffleStrategy::Recommended)
            .unwrap()
            .unwrap();
        assert_eq!(plan.amount_needed, 30.0);
        assert_eq!(
            plan.allocations,
            vec![ShuffleAllocation::new(b, 20.0), ShuffleAllocation::new(a, 10.0)]
        );
    }

    #[test]
    fn recommended_stops_when_candidates_run_out() {
        let (state, target, _, _) = base_state();
        let plan = ShuffleService::plan(&state, target, 200.0, &ShuffleStrategy::Recommended)
            .unwrap()
            .unwrap();
        assert_eq!(plan.total, 50.0);
        assert!(!plan.covers_need);
    }

    #[test]
    fn manual_rejects_amount_above_remaining() {
        let (state, target, a, _) = base_state();
        let strategy = ShuffleStrategy::Manual {
            allocations: vec![ShuffleAllocation::new(a, 31.0)],
        };
        let err =
            ShuffleService::plan(&state, target, 60.0, &strategy).expect_err("over remaining");
        assert!(matches!(err, CoreError::Validation(_)), "unexpected: {err:?}");
    }

    #[test]
    fn apply_moves_capacity_and_books_purchase() {
        let (mut state, target, a, b) = base_state();
        let purchase = Purchase::new(target, 60.0, Some("Dinner".into()), today());
        let allocations = vec![ShuffleAllocation::new(a, 30.0), ShuffleAllocation::new(b, 20.0)];

        let transaction =
            ShuffleService::apply(&mut state, target, purchase.clone(), &allocations, &clock())
                .unwrap()
                .unwrap();

        let target_env = state.envelope(target).unwrap();
        assert_eq!(target_env.allocation, 150.0);
        assert_eq!(target_env.spent, 150.0);
        assert_eq!(state.envelope(a).unwrap().allocation, 50.0);
        assert_eq!(state.envelope(a).unwrap().spent, 50.0);
        assert_eq!(state.envelope(b).unwrap().allocation, 40.0);
        assert_eq!(state.shuffle_limit(a).unwrap().current_shuffled, 30.0);
        assert_eq!(transaction.purchase_id, purchase.id);
        assert_eq!(state.purchases.len(), 1);
        assert_eq!(state.shuffle_transactions.len(), 1);
        assert_eq!(state.current_period().unwrap().transactions.len(), 2);
    }

    #[test]
    fn apply_rejects_insufficient_allocations_without_mutation() {
        let (mut state, target, a, _) = base_state();
        let before = state.clone();
        let purchase = Purchase::new(target, 60.0, None, today());
        let err = ShuffleService::apply(
            &mut state,
            target,
            purchase,
            &[ShuffleAllocation::new(a, 20.0)],
            &clock(),
        )
        .expect_err("insufficient");
        assert!(matches!(
            err,
            CoreError::ShuffleInsufficient { needed, provided }
                if needed == 50.0 && provided == 20.0
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn apply_with_unknown_target_is_no_op() {
        let (mut state, _, a, _) = base_state();
        let before = state.clone();
        let purchase = Purchase::new(Uuid::new_v4(), 10.0, None, today());
        let result = ShuffleService::apply(
            &mut state,
            Uuid::new_v4(),
            purchase,
            &[ShuffleAllocation::new(a, 10.0)],
            &clock(),
        )
        .unwrap();
        assert!(result.is_none());
        assert_eq!(state, before);
    }

    #[test]
    fn exceeding_limit_is_tracked_not_blocked() {
        let (mut state, target, a, _) = base_state();
        let purchase = Purchase::new(target, 40.0, None, today());
        ShuffleService::apply(
            &mut state,
            target,
            purchase,
            &[ShuffleAllocation::new(a, 30.0)],
            &clock(),
        )
        .unwrap()
        .unwrap();
        let limit = ShuffleService::limit_status(&state, a).unwrap();
        assert_eq!(limit.max_amount, 16.0);
        assert!(limit.is_exceeded());
    }
}
