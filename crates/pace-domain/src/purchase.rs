use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A spending event against one envelope, either simulated or committed.
pub struct Purchase {
    pub id: Uuid,
    pub envelope_id: Uuid,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    pub date: NaiveDate,
}

impl Purchase {
    pub fn new(envelope_id: Uuid, amount: f64, item: Option<String>, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            envelope_id,
            amount,
            item,
            date,
        }
    }
}

/// Caller-supplied input for a purchase that has not been assigned an id or date yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseDraft {
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
}

impl PurchaseDraft {
    pub fn new(amount: f64) -> Self {
        Self { amount, item: None }
    }

    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }
}
