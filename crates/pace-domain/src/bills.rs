//! Recurring bills and the aggregate envelope that funds them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::preferences::PaycheckFrequency;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bill {
    pub id: Uuid,
    pub name: String,
    pub amount: f64,
    /// Day of month the bill falls due (1-31, clamped to short months).
    pub due_day: u32,
    #[serde(default = "Bill::default_recurring")]
    pub is_recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_paid_date: Option<NaiveDate>,
}

impl Bill {
    pub fn new(name: impl Into<String>, amount: f64, due_day: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            amount,
            due_day,
            is_recurring: true,
            category: None,
            last_paid_date: None,
        }
    }

    pub fn one_off(mut self) -> Self {
        self.is_recurring = false;
        self
    }

    fn default_recurring() -> bool {
        true
    }
}

/// Partial update applied to an existing bill. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BillUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
}

impl BillUpdate {
    pub fn has_effect(&self) -> bool {
        self.name.is_some()
            || self.amount.is_some()
            || self.due_day.is_some()
            || self.is_recurring.is_some()
            || self.category.is_some()
    }
}

/// Aggregate bills funding state.
///
/// Every field after `frequency` is derived from `bills`, `current_balance`, and the
/// reference date; they are only ever written by a full recompute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillsEnvelope {
    pub bills: Vec<Bill>,
    pub current_balance: f64,
    pub frequency: PaycheckFrequency,
    pub total_monthly_bills: f64,
    pub cushion_amount: f64,
    pub target_amount: f64,
    pub is_fully_funded: bool,
    pub has_reached_cushion: bool,
    pub required_per_paycheck: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due_amount: Option<f64>,
}

impl BillsEnvelope {
    pub fn bill(&self, id: Uuid) -> Option<&Bill> {
        self.bills.iter().find(|bill| bill.id == id)
    }
}
