//! Period lifecycle: starting periods, previewing upcoming ones, and automatic rollover.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use pace_domain::{
    Envelope, EnvelopeTemplate, PaycheckFrequency, Period, PeriodDescriptor, PeriodId,
    ShuffleLimit, UserPreferences,
};

use crate::{
    bills_service::BillsService,
    calendar::{first_period_bounds, is_period_ended, next_period_bounds},
    envelope_service::EnvelopeService,
    plans::PlanStore,
    state::{normalize_name, BudgetEngineState},
    time::Clock,
    CoreError,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
/// Opening balance for the bills envelope of a new period.
pub struct BillsSeed {
    pub initial_balance: f64,
    pub frequency: PaycheckFrequency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Request to open a period.
///
/// When `end_date` is given it fixes the window and overrides `period_length`.
pub struct NewPeriod {
    pub start_date: NaiveDate,
    pub period_length: u32,
    pub envelopes: Vec<EnvelopeTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bills_seed: Option<BillsSeed>,
}

impl NewPeriod {
    pub fn new(
        start_date: NaiveDate,
        period_length: u32,
        envelopes: Vec<EnvelopeTemplate>,
    ) -> Self {
        Self {
            start_date,
            period_length,
            envelopes,
            end_date: None,
            bills_seed: None,
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_bills_seed(mut self, seed: BillsSeed) -> Self {
        self.bills_seed = Some(seed);
        self
    }

    fn window(&self) -> Result<(NaiveDate, u32), CoreError> {
        match self.end_date {
            Some(end_date) if end_date < self.start_date => Err(CoreError::Validation(format!(
                "period end {end_date} is before its start {}",
                self.start_date
            ))),
            Some(end_date) => Ok((end_date, ((end_date - self.start_date).num_days() + 1) as u32)),
            None if self.period_length == 0 => Err(CoreError::Validation(
                "period length must be at least one day".into(),
            )),
            None => Ok((
                self.start_date + Duration::days(self.period_length as i64 - 1),
                self.period_length,
            )),
        }
    }
}

pub struct PeriodService;

impl PeriodService {
    /// Replaces the active envelopes with fresh ones built from templates and opens a new period.
    ///
    /// Each new envelope carries the unspent remainder of the outgoing envelope with the same
    /// name. Shuffle limits are reset and the purchase session returns to idle.
    pub fn start_new_period(
        state: &mut BudgetEngineState,
        request: NewPeriod,
        clock: &dyn Clock,
    ) -> Result<PeriodId, CoreError> {
        let (end_date, period_length) = request.window()?;
        let mut seen = Vec::with_capacity(request.envelopes.len());
        for template in &request.envelopes {
            EnvelopeService::validate_template(template)?;
            let normalized = normalize_name(&template.name);
            if seen.contains(&normalized) {
                return Err(CoreError::Validation(format!(
                    "envelope `{}` appears more than once",
                    template.name.trim()
                )));
            }
            seen.push(normalized);
        }
        if let Some(seed) = &request.bills_seed {
            if !(seed.initial_balance.is_finite() && seed.initial_balance >= 0.0) {
                return Err(CoreError::Validation(format!(
                    "bills opening balance must be non-negative, got {}",
                    seed.initial_balance
                )));
            }
        }
        let id = PeriodId::from_start(request.start_date);
        if state.current_period().map(|period| &period.id) == Some(&id) {
            return Err(CoreError::InvalidOperation(format!(
                "period {id} has already been started"
            )));
        }

        let envelopes: Vec<Envelope> = request
            .envelopes
            .iter()
            .map(|template| {
                let previous = state
                    .envelope_by_name(&template.name)
                    .map(|outgoing| (outgoing.allocation - outgoing.spent).max(0.0));
                Envelope::new(
                    template.name.trim(),
                    template.allocation,
                    period_length,
                    request.start_date,
                )
                .with_previous_remaining(previous)
            })
            .collect();

        let bills = match request.bills_seed {
            Some(seed) => {
                let existing = state
                    .bills
                    .as_ref()
                    .map(|bills| bills.bills.clone())
                    .unwrap_or_default();
                Some(BillsService::create(
                    existing,
                    seed.initial_balance,
                    seed.frequency,
                    clock.today(),
                )?)
            }
            None => state.bills.take(),
        };

        // Close out the outgoing period with its final envelope figures.
        let outgoing = std::mem::take(&mut state.envelopes);
        if let Some(previous) = state.periods.last_mut() {
            previous.envelopes = outgoing;
        }

        state.shuffle_limits = envelopes
            .iter()
            .map(|envelope| ShuffleLimit::for_allocation(envelope.id, envelope.allocation))
            .collect();
        state
            .periods
            .push(Period::new(request.start_date, end_date, envelopes.clone()));
        state.envelopes = envelopes;
        state.bills = bills;
        state.session.reset();

        tracing::info!(
            period = %id,
            end = %end_date,
            envelopes = state.envelopes.len(),
            "started new period"
        );
        Ok(id)
    }

    /// The current period followed by upcoming ones derived from the pay schedule.
    ///
    /// Without a current period the list starts at the first configured period.
    pub fn next_periods(
        preferences: &UserPreferences,
        current: Option<&Period>,
        count: usize,
        plans: &dyn PlanStore,
    ) -> Result<Vec<PeriodDescriptor>, CoreError> {
        let mut descriptors = Vec::with_capacity(count);
        if count == 0 {
            return Ok(descriptors);
        }

        let (mut start_date, mut end_date, is_current) = match current {
            Some(period) => (period.start_date, period.end_date, true),
            None => {
                let bounds = first_period_bounds(preferences);
                (bounds.start_date, bounds.end_date, false)
            }
        };
        loop {
            let id = PeriodId::from_start(start_date);
            let is_planned = plans.get_plan(&id)?.is_some();
            let is_first = descriptors.is_empty();
            descriptors.push(PeriodDescriptor {
                period_length: ((end_date - start_date).num_days() + 1).max(1) as u32,
                is_current: is_current && is_first,
                id,
                start_date,
                end_date,
                is_planned,
            });
            if descriptors.len() == count {
                break;
            }
            let bounds = next_period_bounds(preferences, end_date)?;
            start_date = bounds.start_date;
            end_date = bounds.end_date;
        }
        Ok(descriptors)
    }

    /// Whether the current period has elapsed as of `now`.
    pub fn should_rollover(
        state: &BudgetEngineState,
        now: NaiveDateTime,
        reference_hour: u32,
    ) -> bool {
        state.current_period().map_or(false, |period| {
            is_period_ended(period.start_date, period.period_length(), now, reference_hour)
        })
    }

    /// Starts the next period from its saved plan (or the user's default template) once the
    /// current one has elapsed.
    ///
    /// Returns `Ok(None)` when nothing is due or no plan exists.
    pub fn rollover(
        state: &mut BudgetEngineState,
        preferences: &UserPreferences,
        plans: &dyn PlanStore,
        clock: &dyn Clock,
        reference_hour: u32,
        user_id: &str,
    ) -> Result<Option<PeriodId>, CoreError> {
        if !Self::should_rollover(state, clock.now(), reference_hour) {
            return Ok(None);
        }
        let Some(current_end) = state.current_period().map(|period| period.end_date) else {
            return Ok(None);
        };
        let bounds = next_period_bounds(preferences, current_end)?;
        let next_id = PeriodId::from_start(bounds.start_date);
        let Some(plan) = plans.resolve_plan(&next_id, user_id)? else {
            tracing::warn!(period = %next_id, "rollover due but no plan saved");
            return Ok(None);
        };

        let bills_seed = match &state.bills {
            Some(bills) => Some(BillsSeed {
                initial_balance: bills.current_balance + plan.bills_allocation.max(0.0),
                frequency: preferences.paycheck_frequency,
            }),
            None if plan.bills_allocation > 0.0 => Some(BillsSeed {
                initial_balance: plan.bills_allocation,
                frequency: preferences.paycheck_frequency,
            }),
            None => None,
        };
        let mut request = NewPeriod::new(bounds.start_date, bounds.period_length, plan.envelopes)
            .with_end_date(bounds.end_date);
        request.bills_seed = bills_seed;

        let id = Self::start_new_period(state, request, clock)?;
        tracing::info!(period = %id, "rolled over to next period");
        Ok(Some(id))
    }

    pub fn current_period(state: &BudgetEngineState) -> Option<&Period> {
        state.current_period()
    }

    pub fn period<'a>(state: &'a BudgetEngineState, id: &PeriodId) -> Option<&'a Period> {
        state.periods.iter().find(|period| &period.id == id)
    }
}
