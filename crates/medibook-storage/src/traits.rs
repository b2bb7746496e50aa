//! Store traits every backend must implement.
//!
//! The lifecycle engine talks exclusively to these traits; backends must be
//! thread-safe (`Send + Sync`). Read-then-conditionally-write sequences run
//! inside a [`StoreTransaction`], whose implementations serialize against
//! each other so the second of two racing writers observes the first
//! writer's committed state.

use async_trait::async_trait;

use medibook_core::{
    Appointment, AppointmentId, Doctor, DoctorId, Feedback, FeedbackId, Patient, PatientId,
    Payment, PaymentId, Prescription, PrescriptionId,
};

use crate::error::StorageError;
use crate::types::{
    AppointmentFilter, FeedbackFilter, NewAppointment, NewFeedback, NewPayment, NewPrescription,
    PaymentFilter, PrescriptionFilter,
};

/// Transactional repository over the Medibook entities.
///
/// Point lookups and scans read committed state. All mutations go through
/// [`EntityStore::begin`]; a backend may additionally expose direct seed
/// methods for directory rows (doctors, patients), which belong to the
/// external directory layer rather than the lifecycle core.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // ==================== Directory rows ====================

    /// Inserts or replaces a doctor row. Seed seam for the external
    /// directory layer and for tests.
    async fn upsert_doctor(&self, doctor: Doctor) -> Result<(), StorageError>;

    /// Inserts or replaces a patient row. Seed seam, as above.
    async fn upsert_patient(&self, patient: Patient) -> Result<(), StorageError>;

    async fn get_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, StorageError>;

    async fn get_patient(&self, id: PatientId) -> Result<Option<Patient>, StorageError>;

    // ==================== Committed reads ====================

    async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, StorageError>;

    /// Scans appointments matching the filter, newest first.
    async fn list_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StorageError>;

    async fn get_prescription(
        &self,
        id: PrescriptionId,
    ) -> Result<Option<Prescription>, StorageError>;

    /// Scans prescriptions whose appointment matches the filter, newest
    /// first.
    async fn list_prescriptions(
        &self,
        filter: &PrescriptionFilter,
    ) -> Result<Vec<Prescription>, StorageError>;

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, StorageError>;

    /// Scans payments whose appointment matches the filter, newest first.
    async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>, StorageError>;

    async fn get_feedback(&self, id: FeedbackId) -> Result<Option<Feedback>, StorageError>;

    /// Scans feedback matching the filter, newest first.
    async fn list_feedback(&self, filter: &FeedbackFilter) -> Result<Vec<Feedback>, StorageError>;

    // ==================== Transactions ====================

    /// Begins a transaction. The transaction must be either committed or
    /// rolled back; dropping it without doing either must leave committed
    /// state untouched.
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StorageError>;

    /// Name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// A transaction over the entity tables.
///
/// Reads inside a transaction see the transaction's own uncommitted
/// writes. Implementations serialize concurrent transactions; this is the
/// unit of atomicity for every guarded operation (there is no multi-step
/// saga above it).
#[async_trait]
pub trait StoreTransaction: Send + Sync {
    /// Commits all writes. Consumes the transaction.
    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Undoes all writes. Consumes the transaction.
    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;

    // ==================== Appointments ====================

    async fn get_appointment(
        &self,
        id: AppointmentId,
    ) -> Result<Option<Appointment>, StorageError>;

    async fn insert_appointment(
        &mut self,
        new: NewAppointment,
    ) -> Result<Appointment, StorageError>;

    /// Replaces the stored row keyed by `appointment.id`.
    ///
    /// # Errors
    ///
    /// `StorageError::NotFound` if no such appointment exists.
    async fn update_appointment(&mut self, appointment: &Appointment)
    -> Result<(), StorageError>;

    async fn delete_appointment(&mut self, id: AppointmentId) -> Result<(), StorageError>;

    // ==================== Doctors / patients ====================

    async fn get_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, StorageError>;

    async fn get_patient(&self, id: PatientId) -> Result<Option<Patient>, StorageError>;

    // ==================== Prescriptions ====================

    /// Inserts a prescription.
    ///
    /// # Errors
    ///
    /// `StorageError::AlreadyExists` if any prescription already references
    /// `new.appointment_id` — the uniqueness constraint lives here in the
    /// store, not in application code, so checking and inserting cannot
    /// race.
    async fn insert_prescription(
        &mut self,
        new: NewPrescription,
    ) -> Result<Prescription, StorageError>;

    async fn get_prescription(
        &self,
        id: PrescriptionId,
    ) -> Result<Option<Prescription>, StorageError>;

    async fn update_prescription(
        &mut self,
        prescription: &Prescription,
    ) -> Result<(), StorageError>;

    async fn delete_prescription(&mut self, id: PrescriptionId) -> Result<(), StorageError>;

    /// Point lookup through the uniqueness index.
    async fn find_prescription_for_appointment(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<Option<Prescription>, StorageError>;

    // ==================== Payments ====================

    async fn insert_payment(&mut self, new: NewPayment) -> Result<Payment, StorageError>;

    async fn delete_payment(&mut self, id: PaymentId) -> Result<(), StorageError>;

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>, StorageError>;

    /// Whether any payment references the appointment.
    async fn appointment_has_payments(
        &self,
        appointment_id: AppointmentId,
    ) -> Result<bool, StorageError>;

    // ==================== Feedback ====================

    async fn insert_feedback(&mut self, new: NewFeedback) -> Result<Feedback, StorageError>;

    async fn get_feedback(&self, id: FeedbackId) -> Result<Option<Feedback>, StorageError>;

    async fn update_feedback(&mut self, feedback: &Feedback) -> Result<(), StorageError>;

    async fn delete_feedback(&mut self, id: FeedbackId) -> Result<(), StorageError>;

    /// Whether the patient is party to at least one appointment with the
    /// doctor, in any status.
    async fn patient_has_appointment_with(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
    ) -> Result<bool, StorageError>;
}

// Ensure traits are object-safe by using them as trait objects
#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that EntityStore is object-safe
    fn _assert_store_object_safe(_: &dyn EntityStore) {}

    // Compile-time test that StoreTransaction is object-safe
    fn _assert_transaction_object_safe(_: &dyn StoreTransaction) {}
}
