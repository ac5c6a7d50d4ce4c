//! Budgeting periods, their transaction logs, and saved plans for future periods.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{envelope::*, purchase::Purchase, shuffle::ShuffleTransaction};

const PERIOD_ID_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier of a period, derived from its start date so future periods can be planned.
pub struct PeriodId(String);

impl PeriodId {
    pub fn from_start(start_date: NaiveDate) -> Self {
        Self(start_date.format(PERIOD_ID_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Start date encoded in the identifier, when it is well formed.
    pub fn start_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, PERIOD_ID_FORMAT).ok()
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Entry in a period's append-only transaction log.
pub enum PeriodTransaction {
    Purchase(Purchase),
    Shuffle(ShuffleTransaction),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// A budgeting window aligned with the paycheck schedule. `end_date` is inclusive.
pub struct Period {
    pub id: PeriodId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub envelopes: Vec<Envelope>,
    #[serde(default)]
    pub transactions: Vec<PeriodTransaction>,
}

impl Period {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, envelopes: Vec<Envelope>) -> Self {
        Self {
            id: PeriodId::from_start(start_date),
            start_date,
            end_date,
            envelopes,
            transactions: Vec::new(),
        }
    }

    /// Number of calendar days covered, counting both ends.
    pub fn period_length(&self) -> u32 {
        ((self.end_date - self.start_date).num_days() + 1).max(1) as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Summary row describing a current or upcoming period.
pub struct PeriodDescriptor {
    pub id: PeriodId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub period_length: u32,
    pub is_current: bool,
    pub is_planned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
/// Envelope layout and bills contribution saved ahead of a period start.
pub struct PeriodPlan {
    #[serde(default)]
    pub envelopes: Vec<EnvelopeTemplate>,
    #[serde(default)]
    pub bills_allocation: f64,
}

impl PeriodPlan {
    pub fn new(envelopes: Vec<EnvelopeTemplate>, bills_allocation: f64) -> Self {
        Self {
            envelopes,
            bills_allocation,
        }
    }
}
