//! Records describing reallocation of unspent budget between envelopes.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// Default advisory cap on shuffling away from an envelope, as a share of its allocation.
pub const DEFAULT_SHUFFLE_LIMIT_RATE: f64 = 0.2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Take `amount` from the envelope identified by `envelope_id`.
pub struct ShuffleAllocation {
    pub envelope_id: Uuid,
    pub amount: f64,
}

impl ShuffleAllocation {
    pub fn new(envelope_id: Uuid, amount: f64) -> Self {
        Self {
            envelope_id,
            amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One completed reallocation event. Immutable once created.
pub struct ShuffleTransaction {
    pub id: Uuid,
    pub target_envelope_id: Uuid,
    pub purchase_id: Uuid,
    pub allocations: Vec<ShuffleAllocation>,
    pub date: NaiveDate,
}

impl ShuffleTransaction {
    pub fn new(
        target_envelope_id: Uuid,
        purchase_id: Uuid,
        allocations: Vec<ShuffleAllocation>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_envelope_id,
            purchase_id,
            allocations,
            date,
        }
    }

    pub fn total(&self) -> f64 {
        sum_amounts(self.allocations.iter().map(|entry| entry.amount))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Advisory cap on the cumulative amount shuffled away from one envelope.
pub struct ShuffleLimit {
    pub envelope_id: Uuid,
    pub max_amount: f64,
    pub current_shuffled: f64,
}

impl ShuffleLimit {
    pub fn for_allocation(envelope_id: Uuid, allocation: f64) -> Self {
        Self {
            envelope_id,
            max_amount: round_currency(allocation.max(0.0) * DEFAULT_SHUFFLE_LIMIT_RATE),
            current_shuffled: 0.0,
        }
    }

    pub fn remaining_capacity(&self) -> f64 {
        (self.max_amount - self.current_shuffled).max(0.0)
    }

    pub fn is_exceeded(&self) -> bool {
        self.current_shuffled > self.max_amount + CURRENCY_EPSILON
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// How source amounts are chosen when covering a shortfall.
pub enum ShuffleStrategy {
    /// Caller supplies every amount.
    Manual { allocations: Vec<ShuffleAllocation> },
    /// Proportional to each candidate's remaining balance.
    ReduceFromAll,
    /// Envelopes carrying a prior-period surplus first, then largest remaining.
    Recommended,
}

impl fmt::Display for ShuffleStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ShuffleStrategy::Manual { .. } => "Manual",
            ShuffleStrategy::ReduceFromAll => "Reduce From All",
            ShuffleStrategy::Recommended => "Recommended",
        };
        f.write_str(label)
    }
}
