//! Role-scoped listings.
//!
//! Scoping is id-level and happens in the store filter, derived from the
//! caller's role before anything is read; the optional free-text needle is
//! applied afterwards, case-insensitively, over the visible rows only.
//! Results come back newest first.

use std::collections::HashMap;

use medibook_core::{
    Appointment, Caller, DoctorId, DomainError, Feedback, PatientId, Payment, Prescription,
    Result, Role,
};
use medibook_storage::{AppointmentFilter, FeedbackFilter, PaymentFilter, PrescriptionFilter};

use crate::service::BookingService;

fn matches(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

impl BookingService {
    /// Lists appointments visible to the caller, optionally filtered by
    /// doctor or patient name.
    pub async fn list_appointments_for_caller(
        &self,
        caller: &Caller,
        search: Option<&str>,
    ) -> Result<Vec<Appointment>> {
        Self::ensure_resolvable(caller)?;
        let filter = match caller.role {
            Role::Admin => AppointmentFilter::default(),
            Role::Doctor => AppointmentFilter::for_doctor(self.caller_doctor(caller)?),
            Role::Patient => AppointmentFilter::for_patient(self.caller_patient(caller)?),
        };
        let mut rows = self.timed(self.store.list_appointments(&filter)).await?;

        if let Some(needle) = normalize(search) {
            let mut doctor_names: HashMap<DoctorId, String> = HashMap::new();
            let mut patient_names: HashMap<PatientId, String> = HashMap::new();
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                let doctor_name = match doctor_names.get(&row.doctor_id) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self
                            .timed(self.store.get_doctor(row.doctor_id))
                            .await?
                            .map(|d| d.name)
                            .unwrap_or_default();
                        doctor_names.insert(row.doctor_id, name.clone());
                        name
                    }
                };
                let patient_name = match patient_names.get(&row.patient_id) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self
                            .timed(self.store.get_patient(row.patient_id))
                            .await?
                            .map(|p| p.name)
                            .unwrap_or_default();
                        patient_names.insert(row.patient_id, name.clone());
                        name
                    }
                };
                if matches(&doctor_name, &needle) || matches(&patient_name, &needle) {
                    kept.push(row);
                }
            }
            rows = kept;
        }
        Ok(rows)
    }

    /// Lists prescriptions visible to the caller: all for an admin, own
    /// for a doctor. Patients have no prescription surface at all.
    pub async fn list_prescriptions_for_caller(
        &self,
        caller: &Caller,
        search: Option<&str>,
    ) -> Result<Vec<Prescription>> {
        Self::ensure_resolvable(caller)?;
        let filter = match caller.role {
            Role::Admin => PrescriptionFilter::default(),
            Role::Doctor => PrescriptionFilter {
                doctor_id: Some(self.caller_doctor(caller)?),
                ..PrescriptionFilter::default()
            },
            Role::Patient => return Err(DomainError::Forbidden),
        };
        let mut rows = self.timed(self.store.list_prescriptions(&filter)).await?;
        if let Some(needle) = normalize(search) {
            rows.retain(|r| matches(&r.details, &needle) || matches(&r.doctor_notes, &needle));
        }
        Ok(rows)
    }

    /// Lists payments visible to the caller: all for an admin, own for a
    /// patient. Doctors never see payments.
    pub async fn list_payments_for_caller(
        &self,
        caller: &Caller,
        search: Option<&str>,
    ) -> Result<Vec<Payment>> {
        Self::ensure_resolvable(caller)?;
        let filter = match caller.role {
            Role::Admin => PaymentFilter::default(),
            Role::Doctor => return Err(DomainError::Forbidden),
            Role::Patient => PaymentFilter {
                patient_id: Some(self.caller_patient(caller)?),
            },
        };
        let mut rows = self.timed(self.store.list_payments(&filter)).await?;
        if let Some(needle) = normalize(search) {
            rows.retain(|r| matches(&r.method, &needle));
        }
        Ok(rows)
    }

    /// Lists feedback visible to the caller: all for an admin, feedback
    /// about themselves for a doctor, their own submissions for a patient.
    pub async fn list_feedback_for_caller(
        &self,
        caller: &Caller,
        search: Option<&str>,
    ) -> Result<Vec<Feedback>> {
        Self::ensure_resolvable(caller)?;
        let filter = match caller.role {
            Role::Admin => FeedbackFilter::default(),
            Role::Doctor => FeedbackFilter {
                doctor_id: Some(self.caller_doctor(caller)?),
                ..FeedbackFilter::default()
            },
            Role::Patient => FeedbackFilter {
                patient_id: Some(self.caller_patient(caller)?),
                ..FeedbackFilter::default()
            },
        };
        let mut rows = self.timed(self.store.list_feedback(&filter)).await?;
        if let Some(needle) = normalize(search) {
            rows.retain(|r| matches(&r.comments, &needle));
        }
        Ok(rows)
    }

    fn caller_doctor(&self, caller: &Caller) -> Result<DoctorId> {
        caller.doctor_id.ok_or(DomainError::Forbidden)
    }

    fn caller_patient(&self, caller: &Caller) -> Result<PatientId> {
        caller.patient_id.ok_or(DomainError::Forbidden)
    }
}

fn normalize(search: Option<&str>) -> Option<String> {
    let needle = search?.trim().to_lowercase();
    if needle.is_empty() { None } else { Some(needle) }
}
