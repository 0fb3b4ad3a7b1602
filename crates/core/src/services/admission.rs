//! Admission control for new enrollments.
//!
//! Programs may declare a seat capacity. Whether that capacity is enforced
//! at registration time is a policy decision, so the registration workflow
//! consults an [`AdmissionPolicy`] instead of hard-coding a rule.

use markaz_common::{AppError, AppResult, config::RegistrationConfig};
use std::sync::Arc;

/// What a policy gets to look at when deciding on an admission.
#[derive(Debug, Clone)]
pub struct AdmissionContext {
    pub program_id: String,
    /// Declared seat count; `None` means unlimited.
    pub capacity: Option<i32>,
    /// Enrollments currently holding a seat (pending or active).
    pub occupied: u64,
}

/// Decides whether a new enrollment may be created.
pub trait AdmissionPolicy: Send + Sync {
    /// Return `Ok(())` to admit, or the error to report to the applicant.
    fn admit(&self, ctx: &AdmissionContext) -> AppResult<()>;

    /// Whether [`AdmissionContext::occupied`] has to be counted for this
    /// policy. Policies that ignore occupancy skip the query.
    fn needs_occupancy(&self) -> bool {
        true
    }
}

/// Admits everyone. Capacity is managed by staff.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAdmission;

impl AdmissionPolicy for OpenAdmission {
    fn admit(&self, _ctx: &AdmissionContext) -> AppResult<()> {
        Ok(())
    }

    fn needs_occupancy(&self) -> bool {
        false
    }
}

/// Rejects registrations once a program's declared capacity is taken.
///
/// The seat count is read before the registration transaction opens, so two
/// applicants racing for the last seat can both be admitted. Staff resolve
/// the overflow by cancelling an enrollment.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapacityLimit;

impl AdmissionPolicy for CapacityLimit {
    fn admit(&self, ctx: &AdmissionContext) -> AppResult<()> {
        match ctx.capacity {
            Some(capacity) if ctx.occupied >= u64::try_from(capacity).unwrap_or(0) => {
                Err(AppError::Conflict("program is full".to_string()))
            }
            _ => Ok(()),
        }
    }
}

/// Shared admission policy handle.
pub type AdmissionPolicyRef = Arc<dyn AdmissionPolicy>;

/// Pick the admission policy configured for registrations.
#[must_use]
pub fn policy_from_config(config: &RegistrationConfig) -> AdmissionPolicyRef {
    if config.enforce_capacity {
        Arc::new(CapacityLimit)
    } else {
        Arc::new(OpenAdmission)
    }
}
