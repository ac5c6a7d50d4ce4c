//! Validated add/rename/reallocate/delete helpers for envelopes in the active period.

use uuid::Uuid;

use pace_domain::{Envelope, EnvelopeTemplate, ShuffleLimit};

use crate::{
    state::{normalize_name, BudgetEngineState},
    CoreError,
};

/// Provides validated CRUD helpers for envelopes.
pub struct EnvelopeService;

impl EnvelopeService {
    /// Adds an envelope to the current period and returns its identifier.
    pub fn add(
        state: &mut BudgetEngineState,
        name: &str,
        allocation: f64,
    ) -> Result<Uuid, CoreError> {
        Self::validate_template(&EnvelopeTemplate::new(name, allocation))?;
        Self::ensure_unique_name(state, None, name)?;
        let period = state
            .current_period()
            .ok_or_else(|| CoreError::InvalidOperation("no period has been started".into()))?;
        let envelope = Envelope::new(
            name.trim(),
            allocation,
            period.period_length(),
            period.start_date,
        );
        let id = envelope.id;
        state
            .shuffle_limits
            .push(ShuffleLimit::for_allocation(id, allocation));
        state.envelopes.push(envelope);
        tracing::info!(envelope = %name.trim(), allocation, "added envelope");
        Ok(id)
    }

    /// Renames an envelope. Returns `Ok(false)` when the id is unknown.
    pub fn rename(
        state: &mut BudgetEngineState,
        id: Uuid,
        new_name: &str,
    ) -> Result<bool, CoreError> {
        Self::validate_name(new_name)?;
        Self::ensure_unique_name(state, Some(id), new_name)?;
        match state.envelope_mut(id) {
            Some(envelope) => {
                envelope.name = new_name.trim().to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replaces an envelope's allocation. Returns `Ok(false)` when the id is unknown.
    pub fn set_allocation(
        state: &mut BudgetEngineState,
        id: Uuid,
        allocation: f64,
    ) -> Result<bool, CoreError> {
        Self::validate_allocation(allocation)?;
        match state.envelope_mut(id) {
            Some(envelope) => {
                envelope.allocation = allocation;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes an envelope and its shuffle limit. Returns whether anything was removed.
    pub fn delete(state: &mut BudgetEngineState, id: Uuid) -> bool {
        let before = state.envelopes.len();
        state.envelopes.retain(|envelope| envelope.id != id);
        if state.envelopes.len() == before {
            return false;
        }
        state.shuffle_limits.retain(|limit| limit.envelope_id != id);
        if state.session.current_envelope_id == Some(id) {
            state.session.reset();
        }
        tracing::info!(%id, "deleted envelope");
        true
    }

    pub fn validate_template(template: &EnvelopeTemplate) -> Result<(), CoreError> {
        Self::validate_name(&template.name)?;
        Self::validate_allocation(template.allocation)
    }

    fn validate_name(name: &str) -> Result<(), CoreError> {
        if name.trim().is_empty() {
            Err(CoreError::Validation("envelope name cannot be empty".into()))
        } else {
            Ok(())
        }
    }

    fn validate_allocation(allocation: f64) -> Result<(), CoreError> {
        if allocation.is_finite() && allocation >= 0.0 {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "allocation must be a non-negative amount, got {allocation}"
            )))
        }
    }

    fn ensure_unique_name(
        state: &BudgetEngineState,
        exclude: Option<Uuid>,
        candidate: &str,
    ) -> Result<(), CoreError> {
        let normalized = normalize_name(candidate);
        let duplicate = state.envelopes.iter().any(|envelope| {
            normalize_name(&envelope.name) == normalized
                && exclude.map_or(true, |id| envelope.id != id)
        });
        if duplicate {
            Err(CoreError::Validation(format!(
                "envelope `{}` already exists",
                candidate.trim()
            )))
        } else {
            Ok(())
        }
    }
}
