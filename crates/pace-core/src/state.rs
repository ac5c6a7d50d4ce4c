//! In-memory engine state: the persisted snapshot plus the purchase session slot.

use uuid::Uuid;

use pace_domain::{
    BillsEnvelope, Envelope, Period, PeriodTransaction, Purchase, ShuffleLimit,
    ShuffleTransaction, Snapshot,
};

#[derive(Debug, Clone, Default, PartialEq)]
/// Progress of the single simulate/shuffle flow the engine allows at a time.
pub enum SessionFlow {
    #[default]
    Idle,
    Simulating { purchase: Purchase },
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Current envelope selection and any uncommitted purchase. Never persisted.
pub struct Session {
    pub current_envelope_id: Option<Uuid>,
    pub flow: SessionFlow,
}

impl Session {
    pub fn pending_purchase(&self) -> Option<&Purchase> {
        match &self.flow {
            SessionFlow::Simulating { purchase } => Some(purchase),
            SessionFlow::Idle => None,
        }
    }

    pub fn is_simulating(&self) -> bool {
        matches!(self.flow, SessionFlow::Simulating { .. })
    }

    pub fn reset(&mut self) {
        self.current_envelope_id = None;
        self.flow = SessionFlow::Idle;
    }
}

/// Owned engine state passed into every service operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetEngineState {
    pub envelopes: Vec<Envelope>,
    pub purchases: Vec<Purchase>,
    pub shuffle_transactions: Vec<ShuffleTransaction>,
    pub periods: Vec<Period>,
    pub shuffle_limits: Vec<ShuffleLimit>,
    pub bills: Option<BillsEnvelope>,
    pub session: Session,
}

impl BudgetEngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds state from a persisted snapshot. The session always starts idle.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let Snapshot {
            envelopes,
            purchases,
            shuffle_transactions,
            periods,
            shuffle_limits,
            bills_envelope,
        } = snapshot;
        Self {
            envelopes,
            purchases,
            shuffle_transactions,
            periods,
            shuffle_limits,
            bills: bills_envelope,
            session: Session::default(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            envelopes: self.envelopes.clone(),
            purchases: self.purchases.clone(),
            shuffle_transactions: self.shuffle_transactions.clone(),
            periods: self.periods.clone(),
            shuffle_limits: self.shuffle_limits.clone(),
            bills_envelope: self.bills.clone(),
        }
    }

    pub fn envelope(&self, id: Uuid) -> Option<&Envelope> {
        self.envelopes.iter().find(|envelope| envelope.id == id)
    }

    pub fn envelope_mut(&mut self, id: Uuid) -> Option<&mut Envelope> {
        self.envelopes.iter_mut().find(|envelope| envelope.id == id)
    }

    pub fn envelope_by_name(&self, name: &str) -> Option<&Envelope> {
        let normalized = normalize_name(name);
        self.envelopes
            .iter()
            .find(|envelope| normalize_name(&envelope.name) == normalized)
    }

    pub fn current_envelope(&self) -> Option<&Envelope> {
        self.session
            .current_envelope_id
            .and_then(|id| self.envelope(id))
    }

    /// The most recently started period.
    pub fn current_period(&self) -> Option<&Period> {
        self.periods.last()
    }

    pub fn shuffle_limit(&self, envelope_id: Uuid) -> Option<&ShuffleLimit> {
        self.shuffle_limits
            .iter()
            .find(|limit| limit.envelope_id == envelope_id)
    }

    pub fn shuffle_limit_mut(&mut self, envelope_id: Uuid) -> Option<&mut ShuffleLimit> {
        self.shuffle_limits
            .iter_mut()
            .find(|limit| limit.envelope_id == envelope_id)
    }

    /// Appends to the current period's log. Past periods are never modified.
    pub(crate) fn record_transaction(&mut self, entry: PeriodTransaction) {
        if let Some(period) = self.periods.last_mut() {
            period.transactions.push(entry);
        }
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn snapshot_round_trip_drops_session() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut state = BudgetEngineState::new();
        let envelope = Envelope::new("Groceries", 300.0, 14, start);
        let envelope_id = envelope.id;
        state.envelopes.push(envelope);
        state.session.current_envelope_id = Some(envelope_id);

        let restored = BudgetEngineState::from_snapshot(state.snapshot());
        assert_eq!(restored.envelopes, state.envelopes);
        assert_eq!(restored.session, Session::default());
    }

    #[test]
    fn envelope_lookup_by_name_ignores_case() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut state = BudgetEngineState::new();
        state.envelopes.push(Envelope::new("Dining Out", 120.0, 14, start));
        assert!(state.envelope_by_name("  dining out ").is_some());
        assert!(state.envelope_by_name("Dining").is_none());
    }
}
