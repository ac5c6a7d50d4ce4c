use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
/// Enumerates supported paycheck cadences.
pub enum PaycheckFrequency {
    Weekly,
    #[default]
    Biweekly,
    Semimonthly,
    Monthly,
}

impl PaycheckFrequency {
    /// Average number of paychecks per calendar month.
    pub fn periods_per_month(self) -> f64 {
        match self {
            PaycheckFrequency::Weekly => 4.33,
            PaycheckFrequency::Biweekly => 2.17,
            PaycheckFrequency::Semimonthly => 2.0,
            PaycheckFrequency::Monthly => 1.0,
        }
    }

    /// Fixed period length for cadences that do not depend on the calendar.
    pub fn fixed_days(self) -> Option<u32> {
        match self {
            PaycheckFrequency::Weekly => Some(7),
            PaycheckFrequency::Biweekly => Some(14),
            PaycheckFrequency::Semimonthly | PaycheckFrequency::Monthly => None,
        }
    }
}

impl fmt::Display for PaycheckFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PaycheckFrequency::Weekly => "Weekly",
            PaycheckFrequency::Biweekly => "Biweekly",
            PaycheckFrequency::Semimonthly => "Semimonthly",
            PaycheckFrequency::Monthly => "Monthly",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Pay schedule inputs consumed by period derivation.
pub struct UserPreferences {
    pub paycheck_frequency: PaycheckFrequency,
    pub next_payday: NaiveDate,
    pub paycheck_amount: f64,
    pub period_length: u32,
    pub first_period_start: NaiveDate,
    pub first_period_length: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_pay_day: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semi_monthly_pay_days: Option<[u32; 2]>,
}

impl UserPreferences {
    pub fn new(
        paycheck_frequency: PaycheckFrequency,
        next_payday: NaiveDate,
        paycheck_amount: f64,
    ) -> Self {
        let period_length = paycheck_frequency.fixed_days().unwrap_or(30);
        Self {
            paycheck_frequency,
            next_payday,
            paycheck_amount,
            period_length,
            first_period_start: next_payday,
            first_period_length: period_length,
            monthly_pay_day: None,
            semi_monthly_pay_days: None,
        }
    }
}
