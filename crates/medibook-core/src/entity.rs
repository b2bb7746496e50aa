use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::id::{AppointmentId, DoctorId, FeedbackId, PatientId, PaymentId, PrescriptionId};
use crate::status::AppointmentStatus;

/// A doctor record. Only approved doctors are bookable or
/// feedback-eligible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    pub specialization_id: u64,
    pub consultation_fee: f64,
    pub available: bool,
    pub approved: bool,
    /// Backing identity of the owning user. Exactly one per doctor.
    pub user_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_of_birth: OffsetDateTime,
    pub gender: String,
    pub address: String,
    /// Backing identity of the owning user. Exactly one per patient.
    pub user_ref: String,
}

/// An appointment between one patient and one doctor.
///
/// `status` is the controlling field for every dependent rule. Both
/// parties may read; mutation rights differ by status and role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
}

/// At most one prescription may reference any appointment; the store
/// enforces the uniqueness of `appointment_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: PrescriptionId,
    pub appointment_id: AppointmentId,
    pub doctor_notes: String,
    pub details: String,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    Paid,
    Pending,
}

/// A local payment status record, not a settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub appointment_id: AppointmentId,
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub paid_at: OffsetDateTime,
    pub method: String,
    pub status: PaymentStatus,
}

/// Patient feedback about a doctor. Not hard-linked to a specific
/// appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    /// Always within `1..=5`.
    pub rating: u8,
    pub comments: String,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now_utc;

    #[test]
    fn test_appointment_serde_round_trip() {
        let appt = Appointment {
            id: AppointmentId::new(1),
            patient_id: PatientId::new(7),
            doctor_id: DoctorId::new(3),
            scheduled_at: now_utc(),
            status: AppointmentStatus::Pending,
            notes: Some("first visit".to_string()),
        };
        let json = serde_json::to_string(&appt).unwrap();
        let back: Appointment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, appt);
    }

    #[test]
    fn test_appointment_notes_omitted_when_none() {
        let appt = Appointment {
            id: AppointmentId::new(1),
            patient_id: PatientId::new(7),
            doctor_id: DoctorId::new(3),
            scheduled_at: now_utc(),
            status: AppointmentStatus::Pending,
            notes: None,
        };
        let json = serde_json::to_string(&appt).unwrap();
        assert!(!json.contains("notes"));
    }

    #[test]
    fn test_payment_status_serde() {
        let json = serde_json::to_string(&PaymentStatus::Paid).unwrap();
        assert_eq!(json, "\"Paid\"");
    }
}
