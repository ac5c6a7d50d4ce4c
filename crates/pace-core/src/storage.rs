use std::{collections::HashSet, path::PathBuf};

use pace_domain::{PeriodTransaction, Snapshot};

use crate::CoreError;

/// Describes a persisted backup of one user's snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotBackupInfo {
    pub user_id: String,
    pub id: String,
    pub created_at: String,
    pub path: PathBuf,
}

/// Persistence collaborator: loads and saves fully materialized snapshots per user.
pub trait SnapshotStorage: Send + Sync {
    /// Returns `Ok(None)` when nothing has been saved for `user_id` yet.
    fn load(&self, user_id: &str) -> Result<Option<Snapshot>, CoreError>;
    fn save(&self, user_id: &str, snapshot: &Snapshot) -> Result<(), CoreError>;
}

/// Detects dangling references within a snapshot.
pub fn snapshot_warnings(snapshot: &Snapshot) -> Vec<String> {
    let envelope_ids: HashSet<_> = snapshot.envelopes.iter().map(|e| e.id).collect();
    let purchase_ids: HashSet<_> = snapshot.purchases.iter().map(|p| p.id).collect();
    let mut warnings = Vec::new();

    for limit in &snapshot.shuffle_limits {
        if !envelope_ids.contains(&limit.envelope_id) {
            warnings.push(format!(
                "shuffle limit references unknown envelope {}",
                limit.envelope_id
            ));
        }
    }
    for shuffle in &snapshot.shuffle_transactions {
        if !purchase_ids.contains(&shuffle.purchase_id) {
            warnings.push(format!(
                "shuffle {} references missing purchase {}",
                shuffle.id, shuffle.purchase_id
            ));
        }
    }
    if let Some(period) = snapshot.periods.last() {
        for purchase in period.transactions.iter().filter_map(|entry| match entry {
            PeriodTransaction::Purchase(purchase) => Some(purchase),
            PeriodTransaction::Shuffle(_) => None,
        }) {
            if !envelope_ids.contains(&purchase.envelope_id) {
                warnings.push(format!(
                    "purchase {} references unknown envelope {}",
                    purchase.id, purchase.envelope_id
                ));
            }
        }
    }
    if let Some(bills) = &snapshot.bills_envelope {
        if bills.current_balance < 0.0 {
            warnings.push(format!(
                "bills balance is negative ({:.2})",
                bills.current_balance
            ));
        }
    }
    warnings
}
