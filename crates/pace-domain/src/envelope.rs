//! Spending envelopes tracked for the active budgeting period.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A named spending bucket with an allocation and running spend.
pub struct Envelope {
    pub id: Uuid,
    pub name: String,
    pub allocation: f64,
    pub spent: f64,
    pub period_length: u32,
    pub start_date: NaiveDate,
    /// Unspent balance of the same-named envelope in the prior period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_remaining: Option<f64>,
}

impl Envelope {
    pub fn new(
        name: impl Into<String>,
        allocation: f64,
        period_length: u32,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            allocation,
            spent: 0.0,
            period_length: period_length.max(1),
            start_date,
            previous_remaining: None,
        }
    }

    pub fn with_previous_remaining(mut self, previous: Option<f64>) -> Self {
        self.previous_remaining = previous;
        self
    }

    /// Unspent allocation; negative once the envelope is overspent.
    pub fn remaining(&self) -> f64 {
        self.allocation - self.spent
    }

    /// True once spend has reached or passed the allocation.
    pub fn is_empty(&self) -> bool {
        self.spent >= self.allocation
    }
}

/// Name and allocation used to create an envelope when a period starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeTemplate {
    pub name: String,
    pub allocation: f64,
}

impl EnvelopeTemplate {
    pub fn new(name: impl Into<String>, allocation: f64) -> Self {
        Self {
            name: name.into(),
            allocation,
        }
    }
}
