//! Prescription operations.
//!
//! A prescription is issued by the appointment's own doctor, only while
//! the appointment is in a prescribable status (`Completed` by default),
//! and at most once per appointment. The uniqueness constraint itself
//! lives in the store, so two racing issuers cannot both win.

use tracing::info;

use medibook_core::{
    AppointmentId, Caller, DomainError, Prescription, PrescriptionId, Result, now_utc,
};
use medibook_policy::{Action, Target, authorize};
use medibook_storage::NewPrescription;

use crate::service::BookingService;

impl BookingService {
    /// Issues the prescription for an appointment.
    ///
    /// # Errors
    ///
    /// - `Forbidden` unless the caller is the appointment's doctor or an
    ///   admin.
    /// - `InvalidState` when the appointment's status is not in the
    ///   configured prescribable set.
    /// - `Conflict` when a prescription already references the
    ///   appointment, including when a concurrent issuer committed first.
    pub async fn create_prescription(
        &self,
        caller: &Caller,
        appointment_id: AppointmentId,
        doctor_notes: String,
        details: String,
    ) -> Result<Prescription> {
        Self::ensure_resolvable(caller)?;
        if details.trim().is_empty() {
            return Err(DomainError::validation("Prescription details are required"));
        }

        let mut tx = self.begin().await?;
        let appointment = self.load_appointment(&*tx, appointment_id).await?;
        authorize(
            caller,
            Action::Create,
            Target::Prescription {
                doctor_id: appointment.doctor_id,
            },
        )?;

        if !self.config.lifecycle.is_prescribable(appointment.status) {
            self.rollback(tx).await?;
            return Err(DomainError::invalid_state(appointment.status));
        }

        // Store-level uniqueness; a duplicate surfaces here as Conflict.
        let prescription = tx
            .insert_prescription(NewPrescription {
                appointment_id,
                doctor_notes,
                details,
                issued_at: now_utc(),
            })
            .await?;
        self.commit(tx).await?;

        info!(
            prescription_id = %prescription.id,
            %appointment_id,
            "prescription issued"
        );
        Ok(prescription)
    }

    /// Edits the free-text fields of a prescription. The appointment link
    /// is immutable.
    pub async fn update_prescription(
        &self,
        caller: &Caller,
        id: PrescriptionId,
        doctor_notes: Option<String>,
        details: Option<String>,
    ) -> Result<Prescription> {
        Self::ensure_resolvable(caller)?;
        if let Some(details) = &details {
            if details.trim().is_empty() {
                return Err(DomainError::validation("Prescription details are required"));
            }
        }

        let mut tx = self.begin().await?;
        let mut prescription = tx
            .get_prescription(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Prescription", id.value()))?;
        let appointment = self
            .load_appointment(&*tx, prescription.appointment_id)
            .await?;
        authorize(
            caller,
            Action::Update,
            Target::Prescription {
                doctor_id: appointment.doctor_id,
            },
        )?;

        if let Some(doctor_notes) = doctor_notes {
            prescription.doctor_notes = doctor_notes;
        }
        if let Some(details) = details {
            prescription.details = details;
        }
        tx.update_prescription(&prescription).await?;
        self.commit(tx).await?;

        info!(prescription_id = %id, "prescription updated");
        Ok(prescription)
    }

    /// Deletes a prescription, freeing its appointment for re-issue.
    pub async fn delete_prescription(&self, caller: &Caller, id: PrescriptionId) -> Result<()> {
        Self::ensure_resolvable(caller)?;

        let mut tx = self.begin().await?;
        let prescription = tx
            .get_prescription(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Prescription", id.value()))?;
        let appointment = self
            .load_appointment(&*tx, prescription.appointment_id)
            .await?;
        authorize(
            caller,
            Action::Delete,
            Target::Prescription {
                doctor_id: appointment.doctor_id,
            },
        )?;

        tx.delete_prescription(id).await?;
        self.commit(tx).await?;
        info!(prescription_id = %id, "prescription deleted");
        Ok(())
    }
}
