use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            pub fn value(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Surrogate key for a doctor record.
    DoctorId
);
entity_id!(
    /// Surrogate key for a patient record.
    PatientId
);
entity_id!(
    /// Surrogate key for an appointment record.
    AppointmentId
);
entity_id!(
    /// Surrogate key for a prescription record.
    PrescriptionId
);
entity_id!(
    /// Surrogate key for a payment record.
    PaymentId
);
entity_id!(
    /// Surrogate key for a feedback record.
    FeedbackId
);
