use serde::{Deserialize, Serialize};

use crate::{
    bills::BillsEnvelope,
    envelope::Envelope,
    period::Period,
    purchase::Purchase,
    shuffle::{ShuffleLimit, ShuffleTransaction},
};

/// Fully materialized state exchanged with the persistence layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub envelopes: Vec<Envelope>,
    #[serde(default)]
    pub purchases: Vec<Purchase>,
    #[serde(default)]
    pub shuffle_transactions: Vec<ShuffleTransaction>,
    #[serde(default)]
    pub periods: Vec<Period>,
    #[serde(default)]
    pub shuffle_limits: Vec<ShuffleLimit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bills_envelope: Option<BillsEnvelope>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn dates_serialize_as_iso_strings() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 28).unwrap();
        let envelope = Envelope::new("Groceries", 300.0, 14, start);
        let snapshot = Snapshot {
            envelopes: vec![envelope.clone()],
            periods: vec![Period::new(start, end, vec![envelope])],
            ..Snapshot::default()
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"start_date\":\"2025-01-15\""));
        assert!(json.contains("\"end_date\":\"2025-01-28\""));

        let restored: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn missing_collections_default_to_empty() {
        let restored: Snapshot = serde_json::from_str("{}").unwrap();
        assert!(restored.envelopes.is_empty());
        assert!(restored.bills_envelope.is_none());
    }
}
