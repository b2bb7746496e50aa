//! Role-scoped access policy.
//!
//! One pure function decides every allow/deny, replacing per-call-site
//! role checks. It is evaluated before any mutation or disclosure; the
//! engine calls [`authorize`] first and only then touches the store.

use serde::{Deserialize, Serialize};
use tracing::debug;

use medibook_core::{Caller, DoctorId, DomainError, PatientId, Role};

/// What the caller is trying to do to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    /// Appointment status transition. Split from `Update` because patients
    /// may never transition directly even where they can otherwise write.
    Transition,
}

/// Ownership coordinates of the entity an operation targets.
///
/// The policy never sees full entity rows, only the ids that scope them:
/// which doctor and/or patient a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Appointment {
        doctor_id: DoctorId,
        patient_id: PatientId,
    },
    Prescription {
        doctor_id: DoctorId,
    },
    Payment {
        patient_id: PatientId,
    },
    Feedback {
        doctor_id: DoctorId,
        patient_id: PatientId,
    },
}

/// Policy verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Pure policy predicate.
///
/// - Admin: allowed on every operation and every entity.
/// - Doctor: read/write appointments and prescriptions whose doctor id is
///   their own; read-only feedback about themselves; payments are blocked
///   outright.
/// - Patient: read/write their own appointments, payments and feedback;
///   never prescriptions; never a direct `Transition`.
/// - An unresolvable caller (claimed role without an owned row) is denied
///   everything — denial, not not-found, so the error type cannot leak
///   whether the target exists.
pub fn decide(caller: &Caller, action: Action, target: Target) -> Decision {
    if !caller.is_resolvable() {
        return Decision::Deny;
    }
    if caller.is_admin() {
        return Decision::Allow;
    }

    let decision = match (caller.role, target) {
        (Role::Doctor, Target::Appointment { doctor_id, .. }) => {
            own(caller.doctor_id == Some(doctor_id))
        }
        (Role::Doctor, Target::Prescription { doctor_id }) => {
            own(caller.doctor_id == Some(doctor_id))
        }
        // Explicitly blocked, not merely unlisted.
        (Role::Doctor, Target::Payment { .. }) => Decision::Deny,
        (Role::Doctor, Target::Feedback { doctor_id, .. }) => {
            if action == Action::Read && caller.doctor_id == Some(doctor_id) {
                Decision::Allow
            } else {
                Decision::Deny
            }
        }

        (Role::Patient, Target::Appointment { patient_id, .. }) => {
            if action == Action::Transition {
                Decision::Deny
            } else {
                own(caller.patient_id == Some(patient_id))
            }
        }
        (Role::Patient, Target::Prescription { .. }) => Decision::Deny,
        (Role::Patient, Target::Payment { patient_id }) => {
            own(caller.patient_id == Some(patient_id))
        }
        (Role::Patient, Target::Feedback { patient_id, .. }) => {
            own(caller.patient_id == Some(patient_id))
        }

        // Admin handled above.
        (Role::Admin, _) => Decision::Allow,
    };

    if decision == Decision::Deny {
        debug!(role = %caller.role, ?action, "access denied by policy");
    }
    decision
}

fn own(owned: bool) -> Decision {
    if owned { Decision::Allow } else { Decision::Deny }
}

/// [`decide`], mapped onto the domain error taxonomy.
pub fn authorize(caller: &Caller, action: Action, target: Target) -> Result<(), DomainError> {
    match decide(caller, action, target) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(DomainError::Forbidden),
    }
}
