use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{DoctorId, PatientId};

/// Role of an authenticated caller, resolved by the external identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Doctor,
    Patient,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Doctor => write!(f, "doctor"),
            Self::Patient => write!(f, "patient"),
        }
    }
}

/// The resolved identity issuing an operation.
///
/// The core never authenticates; it only authorizes against this
/// descriptor. A caller whose claimed role has no owned entity id (the
/// identity layer found no backing row) is unresolvable and is denied on
/// every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doctor_id: Option<DoctorId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub patient_id: Option<PatientId>,
}

impl Caller {
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            doctor_id: None,
            patient_id: None,
        }
    }

    pub fn doctor(id: DoctorId) -> Self {
        Self {
            role: Role::Doctor,
            doctor_id: Some(id),
            patient_id: None,
        }
    }

    pub fn patient(id: PatientId) -> Self {
        Self {
            role: Role::Patient,
            doctor_id: None,
            patient_id: Some(id),
        }
    }

    /// A caller claiming a role for which identity resolution found no
    /// owned row.
    pub fn unresolved(role: Role) -> Self {
        Self {
            role,
            doctor_id: None,
            patient_id: None,
        }
    }

    /// Whether the role's owned-entity id is present. Admins own nothing
    /// and are always resolvable.
    pub fn is_resolvable(&self) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Doctor => self.doctor_id.is_some(),
            Role::Patient => self.patient_id.is_some(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let c = Caller::doctor(DoctorId::new(3));
        assert_eq!(c.role, Role::Doctor);
        assert_eq!(c.doctor_id, Some(DoctorId::new(3)));
        assert!(c.patient_id.is_none());

        let c = Caller::patient(PatientId::new(7));
        assert_eq!(c.role, Role::Patient);
        assert_eq!(c.patient_id, Some(PatientId::new(7)));
    }

    #[test]
    fn test_resolvability() {
        assert!(Caller::admin().is_resolvable());
        assert!(Caller::doctor(DoctorId::new(1)).is_resolvable());
        assert!(Caller::patient(PatientId::new(1)).is_resolvable());
        assert!(!Caller::unresolved(Role::Doctor).is_resolvable());
        assert!(!Caller::unresolved(Role::Patient).is_resolvable());
        // An unresolved admin claim is still an admin.
        assert!(Caller::unresolved(Role::Admin).is_resolvable());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::Doctor.to_string(), "doctor");
        assert_eq!(Role::Patient.to_string(), "patient");
    }
}
