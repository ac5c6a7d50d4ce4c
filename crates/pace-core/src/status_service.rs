//! Pacing status evaluation for envelopes.

use chrono::NaiveDate;

use pace_domain::{Envelope, PacingStatus, Purchase, StatusReport};

use crate::{calendar::day_in_period, state::BudgetEngineState, time::Clock};

/// Spend above this multiple of the on-pace line is dangerous.
pub const DANGER_RATIO: f64 = 1.2;
/// Spend at or above this multiple of the on-pace line is merely safe.
pub const SAFE_RATIO: f64 = 0.8;

/// Stateless pacing calculator.
pub struct StatusService;

impl StatusService {
    /// Evaluates `envelope` as of `today`, optionally including a hypothetical purchase.
    pub fn evaluate(
        envelope: &Envelope,
        purchase: Option<&Purchase>,
        today: NaiveDate,
    ) -> StatusReport {
        let period_length = envelope.period_length.max(1);
        let current_day = day_in_period(envelope.start_date, period_length, today);
        let daily_amount = if envelope.allocation > 0.0 {
            envelope.allocation / period_length as f64
        } else {
            0.0
        };
        let expected_spend = current_day as f64 * daily_amount;
        let effective_spend = envelope.spent + purchase.map_or(0.0, |p| p.amount);
        let status = Self::classify(
            envelope.spent,
            effective_spend,
            envelope.allocation,
            expected_spend,
        );
        let display = status.display();

        let report = StatusReport {
            envelope_id: envelope.id,
            envelope_name: envelope.name.clone(),
            status,
            current_day,
            period_length,
            daily_amount,
            expected_spend,
            days_worth_of_spending: days_worth(envelope.spent, daily_amount),
            days_worth_after_purchase: days_worth(effective_spend, daily_amount),
            remaining_amount: envelope.remaining(),
            color: display.color.to_string(),
            icon: display.icon.to_string(),
            label: display.label.to_string(),
        };
        tracing::debug!(
            envelope = %envelope.name,
            status = ?report.status,
            current_day,
            expected_spend,
            effective_spend,
            "evaluated envelope pacing"
        );
        report
    }

    /// Same as [`StatusService::evaluate`] with the date taken from `clock`.
    pub fn evaluate_now(
        envelope: &Envelope,
        purchase: Option<&Purchase>,
        clock: &dyn Clock,
    ) -> StatusReport {
        Self::evaluate(envelope, purchase, clock.today())
    }

    /// Picks the first matching status, checked from over-budget down to super-safe.
    pub fn classify(
        spent: f64,
        effective_spend: f64,
        allocation: f64,
        expected_spend: f64,
    ) -> PacingStatus {
        if effective_spend >= allocation {
            if spent >= allocation {
                PacingStatus::EnvelopeEmpty
            } else {
                PacingStatus::BudgetBreaker
            }
        } else if effective_spend > DANGER_RATIO * expected_spend {
            PacingStatus::Danger
        } else if effective_spend > expected_spend {
            PacingStatus::OffTrack
        } else if effective_spend >= SAFE_RATIO * expected_spend {
            PacingStatus::Safe
        } else {
            PacingStatus::SuperSafe
        }
    }

    /// One report per envelope, in envelope order.
    pub fn overview(state: &BudgetEngineState, clock: &dyn Clock) -> Vec<StatusReport> {
        let today = clock.today();
        state
            .envelopes
            .iter()
            .map(|envelope| Self::evaluate(envelope, None, today))
            .collect()
    }
}

fn days_worth(amount: f64, daily_amount: f64) -> f64 {
    if daily_amount > 0.0 {
        amount / daily_amount
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    fn envelope(allocation: f64, spent: f64, period_length: u32, days_ago: i64) -> Envelope {
        let mut envelope = Envelope::new(
            "Groceries",
            allocation,
            period_length,
            today() - Duration::days(days_ago),
        );
        envelope.spent = spent;
        envelope
    }

    fn purchase(envelope: &Envelope, amount: f64) -> Purchase {
        Purchase::new(envelope.id, amount, None, today())
    }

    #[test]
    fn under_pace_spend_is_super_safe() {
        let env = envelope(420.0, 90.0, 14, 4);
        let report = StatusService::evaluate(&env, None, today());
        assert_eq!(report.current_day, 5);
        assert_eq!(report.daily_amount, 30.0);
        assert_eq!(report.expected_spend, 150.0);
        assert_eq!(report.status, PacingStatus::SuperSafe);
        assert_eq!(report.days_worth_of_spending, 3.0);
        assert_eq!(report.remaining_amount, 330.0);
    }

    #[test]
    fn large_hypothetical_purchase_is_danger() {
        let env = envelope(420.0, 90.0, 14, 4);
        let report = StatusService::evaluate(&env, Some(&purchase(&env, 150.0)), today());
        assert_eq!(report.status, PacingStatus::Danger);
        assert_eq!(report.days_worth_after_purchase, 8.0);
        assert_eq!(report.label, "Danger");
    }

    #[test]
    fn already_empty_envelope_reports_envelope_empty() {
        let env = envelope(100.0, 100.0, 10, 2);
        let report = StatusService::evaluate(&env, Some(&purchase(&env, 20.0)), today());
        assert_eq!(report.status, PacingStatus::EnvelopeEmpty);
    }

    #[test]
    fn purchase_pushing_over_allocation_is_budget_breaker() {
        let env = envelope(100.0, 80.0, 10, 9);
        let report = StatusService::evaluate(&env, Some(&purchase(&env, 30.0)), today());
        assert_eq!(report.status, PacingStatus::BudgetBreaker);
    }

    #[test]
    fn pace_boundaries_follow_thresholds() {
        assert_eq!(
            StatusService::classify(0.0, 100.0, 500.0, 100.0),
            PacingStatus::Safe
        );
        assert_eq!(
            StatusService::classify(0.0, 80.0, 500.0, 100.0),
            PacingStatus::Safe
        );
        assert_eq!(
            StatusService::classify(0.0, 79.0, 500.0, 100.0),
            PacingStatus::SuperSafe
        );
        assert_eq!(
            StatusService::classify(0.0, 101.0, 500.0, 100.0),
            PacingStatus::OffTrack
        );
        assert_eq!(
            StatusService::classify(0.0, 120.0, 500.0, 100.0),
            PacingStatus::OffTrack
        );
        assert_eq!(
            StatusService::classify(0.0, 121.0, 500.0, 100.0),
            PacingStatus::Danger
        );
    }

    #[test]
    fn zero_allocation_treats_any_state_as_over() {
        let env = envelope(0.0, 0.0, 14, 3);
        let report = StatusService::evaluate(&env, None, today());
        assert_eq!(report.daily_amount, 0.0);
        assert_eq!(report.expected_spend, 0.0);
        assert_eq!(report.days_worth_of_spending, 0.0);
        assert_eq!(report.status, PacingStatus::EnvelopeEmpty);
    }

    #[test]
    fn finished_period_uses_full_pace() {
        let env = envelope(140.0, 130.0, 14, 40);
        let report = StatusService::evaluate(&env, None, today());
        assert_eq!(report.current_day, 14);
        assert_eq!(report.expected_spend, 140.0);
        assert_eq!(report.status, PacingStatus::Safe);
    }

    #[test]
    fn report_carries_envelope_identity() {
        let env = envelope(200.0, 10.0, 7, 0);
        let report = StatusService::evaluate(&env, None, today());
        assert_eq!(report.envelope_id, env.id);
        assert_ne!(report.envelope_id, Uuid::nil());
        assert_eq!(report.envelope_name, "Groceries");
    }
}
