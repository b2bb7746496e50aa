//! Appointment operations: booking, transition, edit, delete.

use time::OffsetDateTime;
use tracing::{debug, info};

use medibook_core::{
    Appointment, AppointmentId, AppointmentStatus, Caller, DoctorId, DomainError, PatientId,
    Result, Role,
};
use medibook_policy::{Action, Target, authorize};
use medibook_storage::{NewAppointment, StoreTransaction};

use crate::lifecycle::{TransitionPlan, plan_transition};
use crate::service::BookingService;

/// Partial update for an appointment. Absent fields keep their value;
/// status never moves through here, only through
/// [`BookingService::transition_appointment`].
#[derive(Debug, Clone, Default)]
pub struct AppointmentPatch {
    pub scheduled_at: Option<OffsetDateTime>,
    /// `Some(None)` clears the notes.
    pub notes: Option<Option<String>>,
    pub doctor_id: Option<DoctorId>,
    pub patient_id: Option<PatientId>,
}

impl BookingService {
    /// Books a new appointment. It always starts `Pending`; approval is a
    /// separate doctor-side transition.
    ///
    /// Only the named patient (or an admin acting for them) may book.
    /// The doctor must exist and be approved.
    pub async fn create_appointment(
        &self,
        caller: &Caller,
        patient_id: PatientId,
        doctor_id: DoctorId,
        scheduled_at: OffsetDateTime,
        notes: Option<String>,
    ) -> Result<Appointment> {
        Self::ensure_resolvable(caller)?;
        authorize(
            caller,
            Action::Create,
            Target::Appointment {
                doctor_id,
                patient_id,
            },
        )?;
        // Doctors do not book on anyone's behalf, their own slate included.
        if caller.role == Role::Doctor {
            return Err(DomainError::Forbidden);
        }

        let mut tx = self.begin().await?;

        let doctor = tx
            .get_doctor(doctor_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Doctor", doctor_id.value()))?;
        if !doctor.approved {
            self.rollback(tx).await?;
            return Err(DomainError::validation(format!(
                "Doctor {doctor_id} is not approved for booking"
            )));
        }
        if tx.get_patient(patient_id).await?.is_none() {
            self.rollback(tx).await?;
            return Err(DomainError::not_found("Patient", patient_id.value()));
        }

        let appointment = tx
            .insert_appointment(NewAppointment {
                patient_id,
                doctor_id,
                scheduled_at,
                status: AppointmentStatus::Pending,
                notes,
            })
            .await?;
        self.commit(tx).await?;

        info!(
            appointment_id = %appointment.id,
            %patient_id,
            %doctor_id,
            "appointment booked"
        );
        Ok(appointment)
    }

    /// Moves an appointment along the status graph.
    ///
    /// Re-issuing the current status succeeds without writing, so a lost
    /// race or a retried request converges. An edge outside the caller's
    /// table fails with `InvalidTransition` carrying the observed current
    /// status.
    pub async fn transition_appointment(
        &self,
        caller: &Caller,
        id: AppointmentId,
        to: AppointmentStatus,
    ) -> Result<Appointment> {
        Self::ensure_resolvable(caller)?;
        let mut tx = self.begin().await?;

        let mut appointment = self.load_appointment(&*tx, id).await?;
        authorize(
            caller,
            Action::Transition,
            Target::Appointment {
                doctor_id: appointment.doctor_id,
                patient_id: appointment.patient_id,
            },
        )?;

        match plan_transition(caller.role, appointment.status, to) {
            Ok(TransitionPlan::Noop) => {
                self.rollback(tx).await?;
                debug!(appointment_id = %id, status = %to, "transition is a no-op");
                Ok(appointment)
            }
            Ok(TransitionPlan::Apply) => {
                let from = appointment.status;
                appointment.status = to;
                tx.update_appointment(&appointment).await?;
                self.commit(tx).await?;
                info!(appointment_id = %id, %from, %to, role = %caller.role, "appointment transitioned");
                Ok(appointment)
            }
            Err(err) => {
                self.rollback(tx).await?;
                debug!(appointment_id = %id, status = %appointment.status, requested = %to, "transition refused");
                Err(err)
            }
        }
    }

    /// Edits appointment details. Patients may not edit; both parties are
    /// frozen once any prescription or payment references the appointment.
    pub async fn update_appointment(
        &self,
        caller: &Caller,
        id: AppointmentId,
        patch: AppointmentPatch,
    ) -> Result<Appointment> {
        Self::ensure_resolvable(caller)?;
        if caller.role == Role::Patient {
            return Err(DomainError::Forbidden);
        }

        let mut tx = self.begin().await?;
        let mut appointment = self.load_appointment(&*tx, id).await?;
        authorize(
            caller,
            Action::Update,
            Target::Appointment {
                doctor_id: appointment.doctor_id,
                patient_id: appointment.patient_id,
            },
        )?;

        let reassigns = patch.doctor_id.is_some_and(|d| d != appointment.doctor_id)
            || patch.patient_id.is_some_and(|p| p != appointment.patient_id);
        if reassigns {
            if self.has_dependents(&*tx, id).await? {
                self.rollback(tx).await?;
                return Err(DomainError::conflict(format!(
                    "Appointment {id} has dependent records; its parties cannot change"
                )));
            }
            if let Some(doctor_id) = patch.doctor_id {
                let doctor = tx
                    .get_doctor(doctor_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Doctor", doctor_id.value()))?;
                if !doctor.approved {
                    self.rollback(tx).await?;
                    return Err(DomainError::validation(format!(
                        "Doctor {doctor_id} is not approved for booking"
                    )));
                }
                appointment.doctor_id = doctor_id;
            }
            if let Some(patient_id) = patch.patient_id {
                if tx.get_patient(patient_id).await?.is_none() {
                    self.rollback(tx).await?;
                    return Err(DomainError::not_found("Patient", patient_id.value()));
                }
                appointment.patient_id = patient_id;
            }
        }

        if let Some(scheduled_at) = patch.scheduled_at {
            appointment.scheduled_at = scheduled_at;
        }
        if let Some(notes) = patch.notes {
            appointment.notes = notes;
        }

        tx.update_appointment(&appointment).await?;
        self.commit(tx).await?;
        info!(appointment_id = %id, role = %caller.role, "appointment updated");
        Ok(appointment)
    }

    /// Deletes an appointment with no dependent records. A prescription or
    /// payment referencing it turns deletion into a `Conflict`; there is no
    /// cascade.
    pub async fn delete_appointment(&self, caller: &Caller, id: AppointmentId) -> Result<()> {
        Self::ensure_resolvable(caller)?;
        if caller.role == Role::Patient {
            return Err(DomainError::Forbidden);
        }

        let mut tx = self.begin().await?;
        let appointment = self.load_appointment(&*tx, id).await?;
        authorize(
            caller,
            Action::Delete,
            Target::Appointment {
                doctor_id: appointment.doctor_id,
                patient_id: appointment.patient_id,
            },
        )?;

        if self.has_dependents(&*tx, id).await? {
            self.rollback(tx).await?;
            return Err(DomainError::conflict(format!(
                "Appointment {id} has dependent records and cannot be deleted"
            )));
        }

        tx.delete_appointment(id).await?;
        self.commit(tx).await?;
        info!(appointment_id = %id, role = %caller.role, "appointment deleted");
        Ok(())
    }

    pub(crate) async fn load_appointment(
        &self,
        tx: &dyn StoreTransaction,
        id: AppointmentId,
    ) -> Result<Appointment> {
        tx.get_appointment(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Appointment", id.value()))
    }

    async fn has_dependents(&self, tx: &dyn StoreTransaction, id: AppointmentId) -> Result<bool> {
        Ok(tx.find_prescription_for_appointment(id).await?.is_some()
            || tx.appointment_has_payments(id).await?)
    }
}
