//! Payment operations.
//!
//! Recording a payment against an `Approved` appointment also completes
//! the appointment; both writes commit in one transaction, so no observer
//! ever sees a paid appointment still `Approved`.

use tracing::info;

use medibook_core::{
    Appointment, AppointmentId, AppointmentStatus, Caller, DomainError, Payment, PaymentId,
    PaymentStatus, Result, now_utc,
};
use medibook_policy::{Action, Target, authorize};
use medibook_storage::NewPayment;

use crate::service::BookingService;

/// Result of [`BookingService::record_payment`]: the payment row plus the
/// appointment as committed, reflecting the completion side effect if one
/// happened.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub appointment: Appointment,
}

impl BookingService {
    /// Records a payment for an appointment.
    ///
    /// The row is written with status `Paid`; this is a local payment
    /// record, not a settlement against any processor. If the appointment
    /// is `Approved` it moves to `Completed` atomically with the payment.
    /// Any other status keeps its value; the payment is still recorded.
    pub async fn record_payment(
        &self,
        caller: &Caller,
        appointment_id: AppointmentId,
        amount: f64,
        method: String,
    ) -> Result<PaymentReceipt> {
        Self::ensure_resolvable(caller)?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(DomainError::validation("Payment amount must be positive"));
        }
        if method.trim().is_empty() {
            return Err(DomainError::validation("Payment method is required"));
        }

        let mut tx = self.begin().await?;
        let mut appointment = self.load_appointment(&*tx, appointment_id).await?;
        authorize(
            caller,
            Action::Create,
            Target::Payment {
                patient_id: appointment.patient_id,
            },
        )?;

        let payment = tx
            .insert_payment(NewPayment {
                appointment_id,
                amount,
                paid_at: now_utc(),
                method,
                status: PaymentStatus::Paid,
            })
            .await?;

        let completed = appointment.status == AppointmentStatus::Approved;
        if completed {
            appointment.status = AppointmentStatus::Completed;
            tx.update_appointment(&appointment).await?;
        }
        self.commit(tx).await?;

        info!(
            payment_id = %payment.id,
            %appointment_id,
            amount,
            completed,
            "payment recorded"
        );
        Ok(PaymentReceipt {
            payment,
            appointment,
        })
    }

    /// Deletes a payment record. The appointment status is untouched;
    /// completion is never unwound by bookkeeping corrections.
    pub async fn delete_payment(&self, caller: &Caller, id: PaymentId) -> Result<()> {
        Self::ensure_resolvable(caller)?;

        let mut tx = self.begin().await?;
        let payment = tx
            .get_payment(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Payment", id.value()))?;
        let appointment = self.load_appointment(&*tx, payment.appointment_id).await?;
        authorize(
            caller,
            Action::Delete,
            Target::Payment {
                patient_id: appointment.patient_id,
            },
        )?;

        tx.delete_payment(id).await?;
        self.commit(tx).await?;
        info!(payment_id = %id, "payment deleted");
        Ok(())
    }
}
