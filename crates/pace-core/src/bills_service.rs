//! Bills envelope funding: derived targets, per-paycheck contribution, and bill mutators.
//!
//! Every mutator edits `bills` or `current_balance` and then re-runs [`BillsService::recompute`];
//! derived fields are never patched individually.

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use pace_domain::{
    clamped_date, shift_month, sum_amounts, Bill, BillUpdate, BillsEnvelope, PaycheckFrequency,
};

use crate::CoreError;

/// Cushion held on top of one month of bills, as a share of the monthly total.
pub const CUSHION_RATE: f64 = 0.15;

pub struct BillsService;

impl BillsService {
    /// Builds a bills envelope with every derived field computed for `today`.
    pub fn create(
        bills: Vec<Bill>,
        current_balance: f64,
        frequency: PaycheckFrequency,
        today: NaiveDate,
    ) -> Result<BillsEnvelope, CoreError> {
        for bill in &bills {
            Self::validate_bill(&bill.name, bill.amount, bill.due_day)?;
        }
        Self::validate_balance(current_balance)?;
        let mut envelope = BillsEnvelope {
            bills,
            current_balance,
            frequency,
            total_monthly_bills: 0.0,
            cushion_amount: 0.0,
            target_amount: 0.0,
            is_fully_funded: false,
            has_reached_cushion: false,
            required_per_paycheck: 0.0,
            next_due_date: None,
            next_due_amount: None,
        };
        Self::recompute(&mut envelope, today);
        Ok(envelope)
    }

    /// Rewrites every derived field from `bills`, `current_balance`, and `today`.
    pub fn recompute(envelope: &mut BillsEnvelope, today: NaiveDate) {
        let total = sum_amounts(envelope.bills.iter().map(|bill| bill.amount));
        let cushion = total * CUSHION_RATE;
        let target = total + cushion;
        let balance = envelope.current_balance;

        envelope.total_monthly_bills = total;
        envelope.cushion_amount = cushion;
        envelope.target_amount = target;
        envelope.is_fully_funded = balance >= total;
        envelope.has_reached_cushion = balance >= target;
        envelope.required_per_paycheck =
            Self::required_per_paycheck(total, balance, envelope.frequency);

        match Self::next_due(&envelope.bills, today) {
            Some((date, bill)) => {
                envelope.next_due_date = Some(date);
                envelope.next_due_amount = Some(bill.amount);
            }
            None => {
                envelope.next_due_date = None;
                envelope.next_due_amount = None;
            }
        }

        tracing::debug!(
            total,
            target,
            balance,
            required_per_paycheck = envelope.required_per_paycheck,
            fully_funded = envelope.is_fully_funded,
            "recomputed bills envelope"
        );
    }

    /// Maintenance contribution, plus a catch-up share while the cushion has not been reached.
    pub fn required_per_paycheck(
        total_monthly_bills: f64,
        current_balance: f64,
        frequency: PaycheckFrequency,
    ) -> f64 {
        let periods_per_month = frequency.periods_per_month();
        let maintenance = total_monthly_bills / periods_per_month;
        let target = total_monthly_bills + total_monthly_bills * CUSHION_RATE;
        if current_balance >= target {
            maintenance
        } else {
            maintenance + (target - current_balance) / (periods_per_month * 2.0)
        }
    }

    /// Earliest upcoming due date on or after `today` and the bill it belongs to.
    ///
    /// Each bill's due day is projected into the current month, or the next one when it has
    /// already passed. Ties go to the bill listed first.
    pub fn next_due(bills: &[Bill], today: NaiveDate) -> Option<(NaiveDate, &Bill)> {
        let mut earliest: Option<(NaiveDate, &Bill)> = None;
        for bill in bills {
            let Some(date) = Self::project_due_date(bill.due_day, today) else {
                continue;
            };
            if earliest.map_or(true, |(current, _)| date < current) {
                earliest = Some((date, bill));
            }
        }
        earliest
    }

    /// Shortfall against the cushioned target, never negative.
    pub fn remaining_to_fund(envelope: &BillsEnvelope) -> f64 {
        (envelope.target_amount - envelope.current_balance).max(0.0)
    }

    /// Appends a bill and returns its identifier.
    pub fn add_bill(
        envelope: &mut BillsEnvelope,
        mut bill: Bill,
        today: NaiveDate,
    ) -> Result<Uuid, CoreError> {
        Self::validate_bill(&bill.name, bill.amount, bill.due_day)?;
        bill.name = bill.name.trim().to_string();
        let id = bill.id;
        tracing::info!(
            bill = %bill.name,
            amount = bill.amount,
            due_day = bill.due_day,
            "added bill"
        );
        envelope.bills.push(bill);
        Self::recompute(envelope, today);
        Ok(id)
    }

    /// Applies `update` to a bill. Returns `Ok(false)` when the id is unknown.
    pub fn update_bill(
        envelope: &mut BillsEnvelope,
        id: Uuid,
        update: BillUpdate,
        today: NaiveDate,
    ) -> Result<bool, CoreError> {
        let Some(bill) = envelope.bills.iter_mut().find(|bill| bill.id == id) else {
            return Ok(false);
        };
        if !update.has_effect() {
            return Ok(true);
        }
        let name = update.name.as_deref().unwrap_or(&bill.name);
        let amount = update.amount.unwrap_or(bill.amount);
        let due_day = update.due_day.unwrap_or(bill.due_day);
        Self::validate_bill(name, amount, due_day)?;

        if let Some(name) = update.name {
            bill.name = name.trim().to_string();
        }
        bill.amount = amount;
        bill.due_day = due_day;
        if let Some(is_recurring) = update.is_recurring {
            bill.is_recurring = is_recurring;
        }
        if let Some(category) = update.category {
            bill.category = category;
        }
        Self::recompute(envelope, today);
        Ok(true)
    }

    /// Removes a bill. Returns whether anything was removed.
    pub fn delete_bill(envelope: &mut BillsEnvelope, id: Uuid, today: NaiveDate) -> bool {
        let before = envelope.bills.len();
        envelope.bills.retain(|bill| bill.id != id);
        let removed = envelope.bills.len() != before;
        if removed {
            Self::recompute(envelope, today);
        }
        removed
    }

    /// Deposits money into the bills envelope.
    pub fn add_money(
        envelope: &mut BillsEnvelope,
        amount: f64,
        today: NaiveDate,
    ) -> Result<(), CoreError> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(CoreError::Validation(format!(
                "deposit must be positive, got {amount}"
            )));
        }
        envelope.current_balance += amount;
        tracing::info!(amount, balance = envelope.current_balance, "added money to bills");
        Self::recompute(envelope, today);
        Ok(())
    }

    /// Pays a bill from the balance.
    ///
    /// Returns `false` without changing anything when the bill is unknown or the balance
    /// cannot cover it. One-off bills are removed once paid.
    pub fn pay_bill(envelope: &mut BillsEnvelope, id: Uuid, today: NaiveDate) -> bool {
        let Some(index) = envelope.bills.iter().position(|bill| bill.id == id) else {
            return false;
        };
        let amount = envelope.bills[index].amount;
        if envelope.current_balance < amount {
            tracing::warn!(
                bill = %envelope.bills[index].name,
                amount,
                balance = envelope.current_balance,
                "insufficient bills balance; payment skipped"
            );
            return false;
        }

        envelope.current_balance -= amount;
        if envelope.bills[index].is_recurring {
            envelope.bills[index].last_paid_date = Some(today);
        } else {
            envelope.bills.remove(index);
        }
        tracing::info!(amount, balance = envelope.current_balance, "paid bill");
        Self::recompute(envelope, today);
        true
    }

    fn project_due_date(due_day: u32, today: NaiveDate) -> Option<NaiveDate> {
        let this_month = clamped_date(today.year(), today.month(), due_day)?;
        if this_month >= today {
            return Some(this_month);
        }
        let (year, month) = shift_month(today.year(), today.month(), 1);
        clamped_date(year, month, due_day)
    }

    fn validate_bill(name: &str, amount: f64, due_day: u32) -> Result<(), CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::Validation("bill name cannot be empty".into()));
        }
        if !(amount.is_finite() && amount > 0.0) {
            return Err(CoreError::Validation(format!(
                "bill amount must be positive, got {amount}"
            )));
        }
        if !(1..=31).contains(&due_day) {
            return Err(CoreError::Validation(format!(
                "due day must be between 1 and 31, got {due_day}"
            )));
        }
        Ok(())
    }

    fn validate_balance(balance: f64) -> Result<(), CoreError> {
        if balance.is_finite() && balance >= 0.0 {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "balance must be non-negative, got {balance}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2025, 2, 10)
    }

    fn sample(balance: f64) -> BillsEnvelope {
        BillsService::create(
            vec![Bill::new("Rent", 1000.0, 1), Bill::new("Phone", 100.0, 20)],
            balance,
            PaycheckFrequency::Monthly,
            today(),
        )
        .unwrap()
    }

    #[test]
    fn derived_totals_include_cushion() {
        let bills = sample(0.0);
        assert_eq!(bills.total_monthly_bills, 1100.0);
        assert!((bills.cushion_amount - 165.0).abs() < 1e-9);
        assert!((bills.target_amount - 1265.0).abs() < 1e-9);
        assert!(!bills.is_fully_funded);
        assert!(!bills.has_reached_cushion);
    }

    #[test]
    fn catch_up_contribution_shrinks_toward_maintenance() {
        let empty = sample(0.0);
        let partial = sample(1100.0);
        let cushioned = sample(1300.0);
        assert!((empty.required_per_paycheck - (1100.0 + 1265.0 / 2.0)).abs() < 1e-9);
        assert!(partial.required_per_paycheck < empty.required_per_paycheck);
        assert!(partial.is_fully_funded && !partial.has_reached_cushion);
        assert_eq!(cushioned.required_per_paycheck, 1100.0);
        assert!(cushioned.has_reached_cushion);
    }

    #[test]
    fn biweekly_maintenance_uses_periods_per_month() {
        let required =
            BillsService::required_per_paycheck(217.0, 1000.0, PaycheckFrequency::Biweekly);
        assert!((required - 100.0).abs() < 1e-9);
    }

    #[test]
    fn next_due_projects_into_following_month() {
        let bills = sample(0.0);
        assert_eq!(bills.next_due_date, Some(date(2025, 2, 20)));
        assert_eq!(bills.next_due_amount, Some(100.0));

        let late = vec![Bill::new("Rent", 1000.0, 1)];
        let (due, _) = BillsService::next_due(&late, today()).unwrap();
        assert_eq!(due, date(2025, 3, 1));
    }

    #[test]
    fn next_due_clamps_and_breaks_ties_by_order() {
        let bills = vec![Bill::new("Gym", 30.0, 31), Bill::new("Water", 40.0, 28)];
        let (due, bill) = BillsService::next_due(&bills, today()).unwrap();
        assert_eq!(due, date(2025, 2, 28));
        assert_eq!(bill.name, "Gym");
    }

    #[test]
    fn mutators_validate_input() {
        let mut bills = sample(0.0);
        let before = bills.clone();
        assert!(BillsService::add_bill(&mut bills, Bill::new(" ", 10.0, 5), today()).is_err());
        assert!(BillsService::add_bill(&mut bills, Bill::new("Gas", 0.0, 5), today()).is_err());
        assert!(BillsService::add_bill(&mut bills, Bill::new("Gas", 10.0, 32), today()).is_err());
        assert!(BillsService::add_money(&mut bills, -5.0, today()).is_err());
        assert_eq!(bills, before);
    }

    #[test]
    fn update_bill_recomputes_totals() {
        let mut bills = sample(0.0);
        let phone = bills.bills[1].id;
        let update = BillUpdate {
            amount: Some(150.0),
            category: Some(Some("Utilities".into())),
            ..BillUpdate::default()
        };
        assert!(BillsService::update_bill(&mut bills, phone, update, today()).unwrap());
        assert_eq!(bills.total_monthly_bills, 1150.0);
        assert_eq!(bills.bill(phone).unwrap().category.as_deref(), Some("Utilities"));
        let unknown = Uuid::new_v4();
        assert!(!BillsService::update_bill(&mut bills, unknown, BillUpdate::default(), today())
            .unwrap());
    }

    #[test]
    fn empty_update_changes_nothing() {
        let mut bills = sample(0.0);
        let before = bills.clone();
        let rent = bills.bills[0].id;
        assert!(
            BillsService::update_bill(&mut bills, rent, BillUpdate::default(), today()).unwrap()
        );
        assert_eq!(bills, before);
    }

    #[test]
    fn added_bill_names_are_trimmed() {
        let mut bills = sample(0.0);
        let water = Bill::new("  Water  ", 40.0, 3);
        let id = BillsService::add_bill(&mut bills, water, today()).unwrap();
        assert_eq!(bills.bill(id).unwrap().name, "Water");
    }

    #[test]
    fn empty_bills_total_is_positive_zero() {
        let bills =
            BillsService::create(Vec::new(), 0.0, PaycheckFrequency::Biweekly, today()).unwrap();
        assert!(bills.total_monthly_bills.is_sign_positive());
        assert!(bills.target_amount.is_sign_positive());
        assert!(bills.required_per_paycheck.is_sign_positive());
        assert_eq!(bills.required_per_paycheck, 0.0);
        let json = serde_json::to_string(&bills).unwrap();
        assert!(!json.contains("-0.0"), "{json}");
    }

    #[test]
    fn pay_bill_without_funds_is_no_op() {
        let mut bills = sample(50.0);
        let before = bills.clone();
        let phone = bills.bills[1].id;
        assert!(!BillsService::pay_bill(&mut bills, phone, today()));
        assert_eq!(bills, before);
    }

    #[test]
    fn paying_recurring_bill_records_date() {
        let mut bills = sample(500.0);
        let phone = bills.bills[1].id;
        assert!(BillsService::pay_bill(&mut bills, phone, today()));
        assert_eq!(bills.current_balance, 400.0);
        assert_eq!(bills.bill(phone).unwrap().last_paid_date, Some(today()));
        assert_eq!(bills.bills.len(), 2);
    }

    #[test]
    fn paying_one_off_bill_removes_it() {
        let mut bills = sample(500.0);
        let repair = Bill::new("Repair", 200.0, 15).one_off();
        let id = BillsService::add_bill(&mut bills, repair, today()).unwrap();
        assert_eq!(bills.total_monthly_bills, 1300.0);
        assert!(BillsService::pay_bill(&mut bills, id, today()));
        assert!(bills.bill(id).is_none());
        assert_eq!(bills.total_monthly_bills, 1100.0);
        assert_eq!(bills.current_balance, 300.0);
    }

    #[test]
    fn remaining_to_fund_is_never_negative() {
        assert!((BillsService::remaining_to_fund(&sample(265.0)) - 1000.0).abs() < 1e-9);
        assert_eq!(BillsService::remaining_to_fund(&sample(5000.0)), 0.0);
    }

    #[test]
    fn delete_bill_reports_removal() {
        let mut bills = sample(0.0);
        let rent = bills.bills[0].id;
        assert!(BillsService::delete_bill(&mut bills, rent, today()));
        assert!(!BillsService::delete_bill(&mut bills, rent, today()));
        assert_eq!(bills.total_monthly_bills, 100.0);
    }
}
