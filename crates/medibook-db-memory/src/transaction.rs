use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use medibook_core::{
    Appointment, AppointmentId, Doctor, DoctorId, Feedback, FeedbackId, Patient, PatientId,
    Payment, PaymentId, Prescription, PrescriptionId,
};
use medibook_storage::{
    NewAppointment, NewFeedback, NewPayment, NewPrescription, StorageError, StoreTransaction,
};

use crate::store::{Sequences, Tables};

/// One reversible table write. Rolling back restores `prior` (removing the
/// row when `prior` is `None`).
#[derive(Debug)]
enum Undo {
    Appointment { id: u64, prior: Option<Appointment> },
    Prescription { id: u64, prior: Option<Prescription> },
    PrescriptionIndex { appointment_id: u64, prior: Option<u64> },
    Payment { id: u64, prior: Option<Payment> },
    Feedback { id: u64, prior: Option<Feedback> },
}

/// Transaction over the in-memory tables.
///
/// Holds the store-wide lock for its whole lifetime: writes apply
/// directly to the tables (giving read-your-writes for free) and are
/// recorded in an undo log that `rollback` replays in reverse. Dropping
/// the transaction without committing also replays the log, so an aborted
/// request leaves no partial state.
pub(crate) struct MemoryTransaction {
    tables: OwnedMutexGuard<Tables>,
    seqs: Arc<Sequences>,
    undo: Vec<Undo>,
    committed: bool,
}

impl MemoryTransaction {
    pub(crate) fn new(tables: OwnedMutexGuard<Tables>, seqs: Arc<Sequences>) -> Self {
        Self {
            tables,
            seqs,
            undo: Vec::new(),
            committed: false,
        }
    }

    fn replay_undo(&mut self) {
        for op in self.undo.drain(..).rev() {
            match op {
                Undo::Appointment { id, prior } => match prior {
                    Some(row) => {
                        self.tables.appointments.insert(id, row);
                    }
                    None => {
                        self.tables.appointments.remove(&id);
                    }
                },
                Undo::Prescription { id, prior } => match prior {
                    Some(row) => {
                        self.tables.prescriptions.insert(id, row);
                    }
                    None => {
                        self.tables.prescriptions.remove(&id);
                    }
                },
                Undo::PrescriptionIndex {
                    appointment_id,
                    prior,
                } => match prior {
                    Some(pid) => {
                        self.tables
                            .prescription_by_appointment
                            .insert(appointment_id, pid);
                    }
                    None => {
                        self.tables.prescription_by_appointment.remove(&appointment_id);
                    }
                },
                Undo::Payment { id, prior } => match prior {
                    Some(row) => {
                        self.tables.payments.insert(id, row);
                    }
                    None => {
                        self.tables.payments.remove(&id);
                    }
                },
                Undo::Feedback { id, prior } => match prior {
                    Some(row) => {
                        self.tables.feedback.insert(id, row);
                    }
                    None => {
                        self.tables.feedback.remove(&id);
                    }
                },
            }
        }
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.committed && !self.undo.is_empty() {
            warn!(
                writes = self.undo.len(),
                "store transaction dropped without commit; rolling back"
            );
            self.replay_undo();
        }
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn commit(mut self: Box<Self>) -> Result<(), StorageError> {
        debug!(writes = self.undo.len(), "committing store transaction");
        self.undo.clear();
        self.committed = true;
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), StorageError> {
        debug!(writes = self.undo.len(), "rolling back store transaction");
        self.replay_undo();
        self.committed = true;
        Ok(())
    }

    async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, StorageError> {
        Ok(self.tables.appointments.get(&id.value()).cloned())
    }

    async fn insert_appointment(
        &mut self,
        new: NewAppointment,
    ) -> Result<Appointment, StorageError> {
        let id = self.seqs.next_appointment_id();
        let appointment = Appointment {
            id,
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            scheduled_at: new.scheduled_at,
            status: new.status,
            notes: new.notes,
        };
        self.undo.push(Undo::Appointment {
            id: id.value(),
            prior: None,
        });
        self.tables.appointments.insert(id.value(), appointment.clone());
        Ok(appointment)
    }

    async fn update_appointment(
        &mut self,
        appointment: &Appointment,
    ) -> Result<(), StorageError> {
        let id = appointment.id.value();
        let prior = self
            .tables
            .appointments
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Appointment", id))?;
        self.undo.push(Undo::Appointment {
            id,
            prior: Some(prior),
        });
        self.tables.appointments.insert(id, appointment.clone());
        Ok(())
    }

    async fn delete_appointment(&mut self, id: AppointmentId) -> Result<(), StorageError> {
        let prior = self
            .tables
            .appointments
            .remove(&id.value())
            .ok_or_else(|| StorageError::not_found("Appointment", id.value()))?;
        self.undo.push(Undo::Appointment {
            id: id.value(),
            prior: Some(prior),
        });
        Ok(())
    }

    async fn get_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, StorageError> {
        Ok(self.tables.doctors.get(&id.value()).cloned())
    }

    async fn get_patient(&self, id: PatientId) -> Result<Option<Patient>, StorageError> {
        Ok(self.tables.patients.get(&id.value()).cloned())
    }

    async fn insert_prescription(
        &mut self,
        new: NewPrescription,
    ) -> Result<Prescription, StorageError> {
        let appointment_key = new.appointment_id.value();
        // Constraint check and insert happen under the same lock; the
        // "check then insert" race the engine would otherwise have is
        // closed here.
        if self
            .tables
            .prescription_by_appointment
            .contains_key(&appointment_key)
        {
            return Err(StorageError::already_exists(
                "Prescription",
                format!("appointment_id={appointment_key}"),
            ));
        }
        let id = self.seqs.next_prescription_id();
        let prescription = Prescription {
            id,
            appointment_id: new.appointment_id,
            doctor_notes: new.doctor_notes,
            details: new.details,
            issued_at: new.issued_at,
        };
        self.undo.push(Undo::Prescription {
            id: id.value(),
            prior: None,
        });
        self.undo.push(Undo::PrescriptionIndex {
            appointment_id: appointment_key,
            prior: None,
        });
        self.tables
            .prescriptions
            .insert(id.value(), prescription.clone());
        self.tables
            .prescription_by_appointment
            .insert(appointment_key, id.value());
        Ok(prescription)
    }

    async fn get_prescription(
        &self,
        id: PrescriptionId,
    ) -> Result<Option<Prescription>, StorageError> {
        Ok(self.tables.prescriptions.get(&id.value()).cloned())
    }

    async fn update_prescription(
        &mut self,
        prescription: &Prescription,
    ) -> Result<(), StorageError> {
        let id = prescription.id.value();
        let prior = self
            .tables
            .prescriptions
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Prescription", id))?;
        if prior.appointment_id != prescription.appointment_id {
            // Moving a prescription between appointments would bypass the
            // uniqueness index.
            return Err(StorageError::constraint(
                "prescription appointment_id is immutable",
            ));
        }
        self.undo.push(Undo::Prescription {
            id,
            prior: Some(prior),
        });
        self.tables.prescriptions.insert(id, prescription.clone());
        Ok(())
    }

    async fn delete_prescription(&mut self, id: PrescriptionId) -> Result<(), StorageError> {
        let prior = self
            .tables
            .prescriptions
            .remove(&id.value())
            .ok_or_else(|| StorageError::not_found("Prescription", id.value()))?;
        let appointment_key = prior.appointment_id.value();
        let index_prior = self.tables.prescription_by_appointment.remove(&appointment_key);
        self.undo.push(Undo::Prescription {
            id: id.value(),
            prior: Some(prior),
        });
        self.undo.push(Undo::PrescriptionIndex {
            appointment_id: appointment_key,
            prior: index_prior,
        });
        Ok(())
    }

    async fn find_prescription_for_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<Prescription>, StorageError> {
        Ok(self
            .tables
            .prescription_by_appointment
            .get(&appointment_id.value())
            .and_then(|pid| self.tables.prescriptions.get(pid))
            .cloned())
    }

    async fn insert_payment(&mut self, new: NewPayment) -> Result<Payment, StorageError> {
        let id = self.seqs.next_payment_id();
        let payment = Payment {
            id,
            appointment_id: new.appointment_id,
            amount: new.amount,
            paid_at: new.paid_at,
            method: new.method,
            status: new.status,
        };
        self.undo.push(Undo::Payment {
            id: id.value(),
            prior: None,
        });
        self.tables.payments.insert(id.value(), payment.clone());
        Ok(payment)
    }

    async fn delete_payment(&mut self, id: PaymentId) -> Result<(), StorageError> {
        let prior = self
            .tables
            .payments
            .remove(&id.value())
            .ok_or_else(|| StorageError::not_found("Payment", id.value()))?;
        self.undo.push(Undo::Payment {
            id: id.value(),
            prior: Some(prior),
        });
        Ok(())
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, StorageError> {
        Ok(self.tables.payments.get(&id.value()).cloned())
    }

    async fn appointment_has_payments(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<bool, StorageError> {
        Ok(self
            .tables
            .payments
            .values()
            .any(|p| p.appointment_id == appointment_id))
    }

    async fn insert_feedback(&mut self, new: NewFeedback) -> Result<Feedback, StorageError> {
        let id = self.seqs.next_feedback_id();
        let feedback = Feedback {
            id,
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            rating: new.rating,
            comments: new.comments,
            submitted_at: new.submitted_at,
        };
        self.undo.push(Undo::Feedback {
            id: id.value(),
            prior: None,
        });
        self.tables.feedback.insert(id.value(), feedback.clone());
        Ok(feedback)
    }

    async fn get_feedback(&self, id: FeedbackId) -> Result<Option<Feedback>, StorageError> {
        Ok(self.tables.feedback.get(&id.value()).cloned())
    }

    async fn update_feedback(&mut self, feedback: &Feedback) -> Result<(), StorageError> {
        let id = feedback.id.value();
        let prior = self
            .tables
            .feedback
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Feedback", id))?;
        self.undo.push(Undo::Feedback {
            id,
            prior: Some(prior),
        });
        self.tables.feedback.insert(id, feedback.clone());
        Ok(())
    }

    async fn delete_feedback(&mut self, id: FeedbackId) -> Result<(), StorageError> {
        let prior = self
            .tables
            .feedback
            .remove(&id.value())
            .ok_or_else(|| StorageError::not_found("Feedback", id.value()))?;
        self.undo.push(Undo::Feedback {
            id: id.value(),
            prior: Some(prior),
        });
        Ok(())
    }

    async fn patient_has_appointment_with(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
    ) -> Result<bool, StorageError> {
        Ok(self
            .tables
            .appointments
            .values()
            .any(|a| a.patient_id == patient_id && a.doctor_id == doctor_id))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::InMemoryStore;
    use medibook_core::{
        AppointmentId, AppointmentStatus, DoctorId, PatientId, PaymentStatus, now_utc,
    };
    use medibook_storage::{
        AppointmentFilter, EntityStore, NewAppointment, NewPayment, NewPrescription,
        StorageError,
    };

    fn new_appointment() -> NewAppointment {
        NewAppointment {
            patient_id: PatientId::new(7),
            doctor_id: DoctorId::new(3),
            scheduled_at: now_utc(),
            status: AppointmentStatus::Pending,
            notes: None,
        }
    }

    fn new_prescription(appointment_id: AppointmentId) -> NewPrescription {
        NewPrescription {
            appointment_id,
            doctor_notes: "rest".to_string(),
            details: "ibuprofen 200mg".to_string(),
            issued_at: now_utc(),
        }
    }

    #[tokio::test]
    async fn test_insert_visible_after_commit() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let appt = tx.insert_appointment(new_appointment()).await.unwrap();
        // Read-your-writes inside the transaction.
        assert!(tx.get_appointment(appt.id).await.unwrap().is_some());
        tx.commit().await.unwrap();

        assert!(store.get_appointment(appt.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_undoes_all_writes() {
        let store = InMemoryStore::new();

        // Committed baseline row.
        let mut tx = store.begin().await.unwrap();
        let mut appt = tx.insert_appointment(new_appointment()).await.unwrap();
        tx.commit().await.unwrap();

        // Update + insert, then roll back.
        let mut tx = store.begin().await.unwrap();
        appt.status = AppointmentStatus::Approved;
        tx.update_appointment(&appt).await.unwrap();
        let extra = tx.insert_appointment(new_appointment()).await.unwrap();
        tx.rollback().await.unwrap();

        let stored = store.get_appointment(appt.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Pending);
        assert!(store.get_appointment(extra.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_drop_without_commit_rolls_back() {
        let store = InMemoryStore::new();

        let id = {
            let mut tx = store.begin().await.unwrap();
            let appt = tx.insert_appointment(new_appointment()).await.unwrap();
            appt.id
            // tx dropped here without commit
        };

        assert!(store.get_appointment(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prescription_uniqueness_enforced_by_store() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let appt = tx.insert_appointment(new_appointment()).await.unwrap();
        tx.insert_prescription(new_prescription(appt.id)).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_prescription(new_prescription(appt.id))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_rollback_frees_prescription_slot() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let appt = tx.insert_appointment(new_appointment()).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_prescription(new_prescription(appt.id)).await.unwrap();
        tx.rollback().await.unwrap();

        // The slot is free again after rollback.
        let mut tx = store.begin().await.unwrap();
        assert!(
            tx.find_prescription_for_appointment(appt.id)
                .await
                .unwrap()
                .is_none()
        );
        tx.insert_prescription(new_prescription(appt.id)).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_prescription_clears_index() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let appt = tx.insert_appointment(new_appointment()).await.unwrap();
        let rx = tx.insert_prescription(new_prescription(appt.id)).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.delete_prescription(rx.id).await.unwrap();
        // A new prescription for the same appointment is allowed again.
        tx.insert_prescription(new_prescription(appt.id)).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_prescription_appointment_is_immutable() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let a1 = tx.insert_appointment(new_appointment()).await.unwrap();
        let a2 = tx.insert_appointment(new_appointment()).await.unwrap();
        let mut rx = tx.insert_prescription(new_prescription(a1.id)).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        rx.appointment_id = a2.id;
        let err = tx.update_prescription(&rx).await.unwrap_err();
        assert!(matches!(err, StorageError::Constraint { .. }));
        // Surfaces as a conflict, not a transient store failure.
        let domain: medibook_core::DomainError = err.into();
        assert!(!domain.is_retryable());
        assert!(matches!(domain, medibook_core::DomainError::Conflict { .. }));
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_payment_and_status_update_atomic_on_rollback() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let mut appt = tx.insert_appointment(new_appointment()).await.unwrap();
        appt.status = AppointmentStatus::Approved;
        tx.update_appointment(&appt).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let payment = tx
            .insert_payment(NewPayment {
                appointment_id: appt.id,
                amount: 50.0,
                paid_at: now_utc(),
                method: "card".to_string(),
                status: PaymentStatus::Paid,
            })
            .await
            .unwrap();
        appt.status = AppointmentStatus::Completed;
        tx.update_appointment(&appt).await.unwrap();
        tx.rollback().await.unwrap();

        // Neither write survived: no Paid row against a non-Completed
        // appointment, and no status flip without its payment.
        assert!(store.get_payment(payment.id).await.unwrap().is_none());
        let stored = store.get_appointment(appt.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AppointmentStatus::Approved);
    }

    #[tokio::test]
    async fn test_concurrent_transactions_serialize() {
        use tokio::task::JoinSet;

        let store = Arc::new(InMemoryStore::new());

        let mut tx = store.begin().await.unwrap();
        let appt = tx.insert_appointment(new_appointment()).await.unwrap();
        tx.commit().await.unwrap();

        // Many racing prescription attempts against the same appointment:
        // exactly one wins, the rest observe the winner's committed state.
        let mut join_set = JoinSet::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            let appointment_id = appt.id;
            join_set.spawn(async move {
                let mut tx = store.begin().await.unwrap();
                let result = tx.insert_prescription(new_prescription(appointment_id)).await;
                match result {
                    Ok(_) => {
                        tx.commit().await.unwrap();
                        true
                    }
                    Err(_) => {
                        tx.rollback().await.unwrap();
                        false
                    }
                }
            });
        }

        let mut winners = 0;
        while let Some(result) = join_set.join_next().await {
            if result.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);

        let tx = store.begin().await.unwrap();
        assert!(
            tx.find_prescription_for_appointment(appt.id)
                .await
                .unwrap()
                .is_some()
        );
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_appointments_sees_only_committed_state() {
        let store = Arc::new(InMemoryStore::new());

        let mut tx = store.begin().await.unwrap();
        tx.insert_appointment(new_appointment()).await.unwrap();
        tx.rollback().await.unwrap();

        let rows = store
            .list_appointments(&AppointmentFilter::default())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
