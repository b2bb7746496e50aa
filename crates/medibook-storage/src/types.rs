//! Parameter and filter types shared by store backends.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use medibook_core::{
    AppointmentId, AppointmentStatus, DoctorId, PatientId, PaymentStatus,
};

/// Insert payload for an appointment. The store assigns the surrogate id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    #[serde(with = "time::serde::rfc3339")]
    pub scheduled_at: OffsetDateTime,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
}

/// Insert payload for a prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrescription {
    pub appointment_id: AppointmentId,
    pub doctor_notes: String,
    pub details: String,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

/// Insert payload for a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub appointment_id: AppointmentId,
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub paid_at: OffsetDateTime,
    pub method: String,
    pub status: PaymentStatus,
}

/// Insert payload for feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub rating: u8,
    pub comments: String,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

/// Id-level scoping for appointment scans. Role scoping translates into
/// these filters before any text filtering happens in the service layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub doctor_id: Option<DoctorId>,
    pub patient_id: Option<PatientId>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn for_doctor(doctor_id: DoctorId) -> Self {
        Self {
            doctor_id: Some(doctor_id),
            ..Self::default()
        }
    }

    pub fn for_patient(patient_id: PatientId) -> Self {
        Self {
            patient_id: Some(patient_id),
            ..Self::default()
        }
    }
}

/// Id-level scoping for prescription scans. Prescriptions are scoped
/// through their appointment's doctor/patient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrescriptionFilter {
    pub doctor_id: Option<DoctorId>,
    pub patient_id: Option<PatientId>,
}

/// Id-level scoping for payment scans, through the appointment's patient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub patient_id: Option<PatientId>,
}

/// Id-level scoping for feedback scans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackFilter {
    pub doctor_id: Option<DoctorId>,
    pub patient_id: Option<PatientId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appointment_filter_constructors() {
        let f = AppointmentFilter::for_doctor(DoctorId::new(3));
        assert_eq!(f.doctor_id, Some(DoctorId::new(3)));
        assert!(f.patient_id.is_none());
        assert!(f.status.is_none());

        let f = AppointmentFilter::for_patient(PatientId::new(7));
        assert_eq!(f.patient_id, Some(PatientId::new(7)));
        assert!(f.doctor_id.is_none());
    }
}
