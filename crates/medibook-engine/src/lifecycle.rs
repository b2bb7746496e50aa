//! Role-aware transition planning over the appointment status graph.
//!
//! [`AppointmentStatus`] defines which edges exist at all; this module
//! decides which of them a given role may take. Re-issuing the current
//! status is planned as a no-op rather than an error, so a retried request
//! that already won converges instead of failing.

use medibook_core::{AppointmentStatus, DomainError, Role};

/// What the engine should do for a requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// The appointment already carries the requested status. Commit
    /// nothing, report success.
    Noop,
    /// Write the new status.
    Apply,
}

/// Plans `from -> to` for `role`.
///
/// - Admin may move any non-terminal appointment to any other status,
///   including edges outside the regular graph (operational corrections).
/// - Doctor may take exactly the working edges: approve or reject a
///   pending appointment, complete or cancel an approved one.
/// - Patient never transitions directly; the policy layer denies this
///   before planning, so hitting it here is still a denial.
pub fn plan_transition(
    role: Role,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<TransitionPlan, DomainError> {
    if from == to {
        return Ok(TransitionPlan::Noop);
    }

    let allowed = match role {
        Role::Admin => !from.is_terminal(),
        Role::Doctor => {
            use AppointmentStatus::*;
            matches!(
                (from, to),
                (Pending, Approved) | (Pending, Rejected) | (Approved, Completed) | (Approved, Cancelled)
            )
        }
        Role::Patient => return Err(DomainError::Forbidden),
    };

    if allowed {
        Ok(TransitionPlan::Apply)
    } else {
        Err(DomainError::invalid_transition(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn test_same_status_is_noop_even_when_terminal() {
        for status in [Pending, Approved, Completed, Cancelled, Rejected] {
            for role in [Role::Admin, Role::Doctor] {
                assert_eq!(
                    plan_transition(role, status, status).unwrap(),
                    TransitionPlan::Noop
                );
            }
        }
    }

    #[test]
    fn test_doctor_working_edges() {
        for (from, to) in [
            (Pending, Approved),
            (Pending, Rejected),
            (Approved, Completed),
            (Approved, Cancelled),
        ] {
            assert_eq!(
                plan_transition(Role::Doctor, from, to).unwrap(),
                TransitionPlan::Apply
            );
        }
    }

    #[test]
    fn test_doctor_cannot_skip_or_reverse() {
        for (from, to) in [
            (Pending, Completed),
            (Pending, Cancelled),
            (Approved, Rejected),
            (Approved, Pending),
            (Completed, Approved),
        ] {
            let err = plan_transition(Role::Doctor, from, to).unwrap_err();
            assert!(matches!(err, DomainError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_admin_may_correct_any_live_appointment() {
        assert_eq!(
            plan_transition(Role::Admin, Pending, Completed).unwrap(),
            TransitionPlan::Apply
        );
        assert_eq!(
            plan_transition(Role::Admin, Approved, Rejected).unwrap(),
            TransitionPlan::Apply
        );
    }

    #[test]
    fn test_terminal_statuses_are_frozen_for_everyone() {
        for from in [Completed, Cancelled, Rejected] {
            for to in [Pending, Approved] {
                for role in [Role::Admin, Role::Doctor] {
                    let err = plan_transition(role, from, to).unwrap_err();
                    assert!(matches!(err, DomainError::InvalidTransition { .. }));
                }
            }
        }
    }

    #[test]
    fn test_patient_is_denied_outright() {
        let err = plan_transition(Role::Patient, Pending, Approved).unwrap_err();
        assert!(matches!(err, DomainError::Forbidden));
    }
}
