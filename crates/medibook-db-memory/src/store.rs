use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use medibook_core::{
    Appointment, AppointmentId, Doctor, DoctorId, Feedback, FeedbackId, Patient, PatientId,
    Payment, PaymentId, Prescription, PrescriptionId,
};
use medibook_storage::{
    AppointmentFilter, EntityStore, FeedbackFilter, PaymentFilter, PrescriptionFilter,
    StorageError, StoreTransaction,
};

use crate::transaction::MemoryTransaction;

/// All entity tables. One lock guards the whole set: a transaction takes
/// the lock for its lifetime, which is what serializes racing writers.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) doctors: HashMap<u64, Doctor>,
    pub(crate) patients: HashMap<u64, Patient>,
    pub(crate) appointments: HashMap<u64, Appointment>,
    pub(crate) prescriptions: HashMap<u64, Prescription>,
    /// Uniqueness index: appointment id -> prescription id. Insertions go
    /// through this index, so at most one prescription can ever reference
    /// an appointment.
    pub(crate) prescription_by_appointment: HashMap<u64, u64>,
    pub(crate) payments: HashMap<u64, Payment>,
    pub(crate) feedback: HashMap<u64, Feedback>,
}

impl Tables {
    pub(crate) fn appointments_matching(&self, filter: &AppointmentFilter) -> Vec<Appointment> {
        let mut rows: Vec<Appointment> = self
            .appointments
            .values()
            .filter(|a| {
                filter.doctor_id.is_none_or(|d| a.doctor_id == d)
                    && filter.patient_id.is_none_or(|p| a.patient_id == p)
                    && filter.status.is_none_or(|s| a.status == s)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.scheduled_at
                .cmp(&a.scheduled_at)
                .then(b.id.value().cmp(&a.id.value()))
        });
        rows
    }

    pub(crate) fn prescriptions_matching(&self, filter: &PrescriptionFilter) -> Vec<Prescription> {
        let mut rows: Vec<Prescription> = self
            .prescriptions
            .values()
            .filter(|p| match self.appointments.get(&p.appointment_id.value()) {
                Some(appt) => {
                    filter.doctor_id.is_none_or(|d| appt.doctor_id == d)
                        && filter.patient_id.is_none_or(|pt| appt.patient_id == pt)
                }
                // Orphaned rows cannot be scoped to anyone but admin.
                None => filter.doctor_id.is_none() && filter.patient_id.is_none(),
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.issued_at
                .cmp(&a.issued_at)
                .then(b.id.value().cmp(&a.id.value()))
        });
        rows
    }

    pub(crate) fn payments_matching(&self, filter: &PaymentFilter) -> Vec<Payment> {
        let mut rows: Vec<Payment> = self
            .payments
            .values()
            .filter(|p| match filter.patient_id {
                None => true,
                Some(patient_id) => self
                    .appointments
                    .get(&p.appointment_id.value())
                    .is_some_and(|appt| appt.patient_id == patient_id),
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.paid_at
                .cmp(&a.paid_at)
                .then(b.id.value().cmp(&a.id.value()))
        });
        rows
    }

    pub(crate) fn feedback_matching(&self, filter: &FeedbackFilter) -> Vec<Feedback> {
        let mut rows: Vec<Feedback> = self
            .feedback
            .values()
            .filter(|f| {
                filter.doctor_id.is_none_or(|d| f.doctor_id == d)
                    && filter.patient_id.is_none_or(|p| f.patient_id == p)
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then(b.id.value().cmp(&a.id.value()))
        });
        rows
    }
}

/// Atomic id counters, shared between the store and its open
/// transactions. Ids consumed by a rolled-back transaction are not
/// reused.
#[derive(Debug)]
pub(crate) struct Sequences {
    appointment: AtomicU64,
    prescription: AtomicU64,
    payment: AtomicU64,
    feedback: AtomicU64,
}

impl Sequences {
    fn new() -> Self {
        Self {
            appointment: AtomicU64::new(1),
            prescription: AtomicU64::new(1),
            payment: AtomicU64::new(1),
            feedback: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_appointment_id(&self) -> AppointmentId {
        AppointmentId::new(self.appointment.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn next_prescription_id(&self) -> PrescriptionId {
        PrescriptionId::new(self.prescription.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn next_payment_id(&self) -> PaymentId {
        PaymentId::new(self.payment.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn next_feedback_id(&self) -> FeedbackId {
        FeedbackId::new(self.feedback.fetch_add(1, Ordering::SeqCst))
    }
}

/// In-memory entity store.
#[derive(Debug)]
pub struct InMemoryStore {
    pub(crate) tables: Arc<Mutex<Tables>>,
    pub(crate) seqs: Arc<Sequences>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            seqs: Arc::new(Sequences::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn upsert_doctor(&self, doctor: Doctor) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        tables.doctors.insert(doctor.id.value(), doctor);
        Ok(())
    }

    async fn upsert_patient(&self, patient: Patient) -> Result<(), StorageError> {
        let mut tables = self.tables.lock().await;
        tables.patients.insert(patient.id.value(), patient);
        Ok(())
    }

    async fn get_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.doctors.get(&id.value()).cloned())
    }

    async fn get_patient(&self, id: PatientId) -> Result<Option<Patient>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.patients.get(&id.value()).cloned())
    }

    async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.appointments.get(&id.value()).cloned())
    }

    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.appointments_matching(filter))
    }

    async fn get_prescription(
        &self,
        id: PrescriptionId,
    ) -> Result<Option<Prescription>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.prescriptions.get(&id.value()).cloned())
    }

    async fn list_prescriptions(
        &self,
        filter: &PrescriptionFilter,
    ) -> Result<Vec<Prescription>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.prescriptions_matching(filter))
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.payments.get(&id.value()).cloned())
    }

    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.payments_matching(filter))
    }

    async fn get_feedback(&self, id: FeedbackId) -> Result<Option<Feedback>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.feedback.get(&id.value()).cloned())
    }

    async fn list_feedback(&self, filter: &FeedbackFilter) -> Result<Vec<Feedback>, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables.feedback_matching(filter))
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StorageError> {
        debug!("beginning store transaction");
        let guard = Arc::clone(&self.tables).lock_owned().await;
        Ok(Box::new(MemoryTransaction::new(
            guard,
            Arc::clone(&self.seqs),
        )))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medibook_core::{AppointmentStatus, now_utc};
    use medibook_storage::NewAppointment;

    pub(crate) fn doctor(id: u64, approved: bool) -> Doctor {
        Doctor {
            id: DoctorId::new(id),
            name: format!("Dr. {id}"),
            specialization_id: 1,
            consultation_fee: 50.0,
            available: true,
            approved,
            user_ref: format!("user-doc-{id}"),
        }
    }

    pub(crate) fn patient(id: u64) -> Patient {
        Patient {
            id: PatientId::new(id),
            name: format!("Patient {id}"),
            email: format!("patient{id}@example.com"),
            phone: "555-0000".to_string(),
            date_of_birth: now_utc(),
            gender: "other".to_string(),
            address: "1 Main St".to_string(),
            user_ref: format!("user-pat-{id}"),
        }
    }

    #[tokio::test]
    async fn test_directory_rows_round_trip() {
        let store = InMemoryStore::new();
        store.upsert_doctor(doctor(3, true)).await.unwrap();
        store.upsert_patient(patient(7)).await.unwrap();

        let d = store.get_doctor(DoctorId::new(3)).await.unwrap().unwrap();
        assert!(d.approved);
        assert!(store.get_doctor(DoctorId::new(99)).await.unwrap().is_none());

        let p = store.get_patient(PatientId::new(7)).await.unwrap().unwrap();
        assert_eq!(p.id, PatientId::new(7));
    }

    #[tokio::test]
    async fn test_list_appointments_scoped_and_newest_first() {
        let store = InMemoryStore::new();
        let base = now_utc();

        let mut tx = store.begin().await.unwrap();
        for (i, doc) in [(1u64, 3u64), (2, 3), (3, 9)] {
            tx.insert_appointment(NewAppointment {
                patient_id: PatientId::new(7),
                doctor_id: DoctorId::new(doc),
                scheduled_at: base + time::Duration::hours(i as i64),
                status: AppointmentStatus::Pending,
                notes: None,
            })
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        let all = store
            .list_appointments(&AppointmentFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].scheduled_at >= w[1].scheduled_at));

        let for_doc3 = store
            .list_appointments(&AppointmentFilter::for_doctor(DoctorId::new(3)))
            .await
            .unwrap();
        assert_eq!(for_doc3.len(), 2);
        assert!(for_doc3.iter().all(|a| a.doctor_id == DoctorId::new(3)));
    }
}
