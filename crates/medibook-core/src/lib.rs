pub mod caller;
pub mod entity;
pub mod error;
pub mod id;
pub mod status;
pub mod time;

pub use caller::{Caller, Role};
pub use entity::{Appointment, Doctor, Feedback, Patient, Payment, PaymentStatus, Prescription};
pub use error::{DomainError, ErrorCategory, Result};
pub use id::{AppointmentId, DoctorId, FeedbackId, PatientId, PaymentId, PrescriptionId};
pub use status::AppointmentStatus;
pub use time::now_utc;
