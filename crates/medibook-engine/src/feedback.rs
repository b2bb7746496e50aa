//! Feedback operations.
//!
//! Feedback is a patient's rating of a doctor, not tied to a specific
//! appointment. By default any patient may rate any approved doctor;
//! deployments can require prior appointment history via
//! `feedback.require_prior_appointment`.

use tracing::info;

use medibook_core::{Caller, DoctorId, DomainError, Feedback, FeedbackId, Result, now_utc};
use medibook_policy::{Action, Target, authorize};
use medibook_storage::NewFeedback;

use crate::service::BookingService;

fn validate_rating(rating: u8) -> Result<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "Rating must be between 1 and 5, got {rating}"
        )))
    }
}

impl BookingService {
    /// Submits feedback about a doctor. Patient-only: the feedback is
    /// attributed to the caller's own patient record.
    pub async fn create_feedback(
        &self,
        caller: &Caller,
        doctor_id: DoctorId,
        rating: u8,
        comments: String,
    ) -> Result<Feedback> {
        Self::ensure_resolvable(caller)?;
        let Some(patient_id) = caller.patient_id else {
            return Err(DomainError::Forbidden);
        };
        authorize(
            caller,
            Action::Create,
            Target::Feedback {
                doctor_id,
                patient_id,
            },
        )?;
        validate_rating(rating)?;

        let mut tx = self.begin().await?;
        let doctor = tx
            .get_doctor(doctor_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Doctor", doctor_id.value()))?;
        if !doctor.approved {
            self.rollback(tx).await?;
            return Err(DomainError::validation(format!(
                "Doctor {doctor_id} is not eligible for feedback"
            )));
        }
        if self.config.feedback.require_prior_appointment
            && !tx.patient_has_appointment_with(patient_id, doctor_id).await?
        {
            self.rollback(tx).await?;
            return Err(DomainError::validation(
                "Feedback requires an appointment with this doctor",
            ));
        }

        let feedback = tx
            .insert_feedback(NewFeedback {
                patient_id,
                doctor_id,
                rating,
                comments,
                submitted_at: now_utc(),
            })
            .await?;
        self.commit(tx).await?;

        info!(feedback_id = %feedback.id, %doctor_id, rating, "feedback submitted");
        Ok(feedback)
    }

    /// Edits the caller's own feedback (or any, for an admin). Doctors are
    /// read-only on feedback and can never reach this.
    pub async fn update_feedback(
        &self,
        caller: &Caller,
        id: FeedbackId,
        rating: Option<u8>,
        comments: Option<String>,
    ) -> Result<Feedback> {
        Self::ensure_resolvable(caller)?;
        if let Some(rating) = rating {
            validate_rating(rating)?;
        }

        let mut tx = self.begin().await?;
        let mut feedback = tx
            .get_feedback(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Feedback", id.value()))?;
        authorize(
            caller,
            Action::Update,
            Target::Feedback {
                doctor_id: feedback.doctor_id,
                patient_id: feedback.patient_id,
            },
        )?;

        if let Some(rating) = rating {
            feedback.rating = rating;
        }
        if let Some(comments) = comments {
            feedback.comments = comments;
        }
        tx.update_feedback(&feedback).await?;
        self.commit(tx).await?;

        info!(feedback_id = %id, "feedback updated");
        Ok(feedback)
    }

    pub async fn delete_feedback(&self, caller: &Caller, id: FeedbackId) -> Result<()> {
        Self::ensure_resolvable(caller)?;

        let mut tx = self.begin().await?;
        let feedback = tx
            .get_feedback(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Feedback", id.value()))?;
        authorize(
            caller,
            Action::Delete,
            Target::Feedback {
                doctor_id: feedback.doctor_id,
                patient_id: feedback.patient_id,
            },
        )?;

        tx.delete_feedback(id).await?;
        self.commit(tx).await?;
        info!(feedback_id = %id, "feedback deleted");
        Ok(())
    }
}
