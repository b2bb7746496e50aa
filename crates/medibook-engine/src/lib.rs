//! Medibook lifecycle engine.
//!
//! [`BookingService`] is the single entry point for everything the clinic
//! core does: booking and transitioning appointments, issuing
//! prescriptions, recording payments and collecting feedback. Every
//! operation authorizes through `medibook-policy` before touching the
//! store, and every guarded mutation runs read-check-write inside one
//! store transaction.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use medibook_core::{AppointmentStatus, Caller, DoctorId, PatientId, now_utc};
//! use medibook_db_memory::InMemoryStore;
//! use medibook_engine::BookingService;
//!
//! # async fn demo() -> medibook_core::Result<()> {
//! let service = BookingService::with_defaults(Arc::new(InMemoryStore::new()));
//!
//! let patient = Caller::patient(PatientId::new(7));
//! let appointment = service
//!     .create_appointment(&patient, PatientId::new(7), DoctorId::new(3), now_utc(), None)
//!     .await?;
//!
//! let doctor = Caller::doctor(DoctorId::new(3));
//! service
//!     .transition_appointment(&doctor, appointment.id, AppointmentStatus::Approved)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod appointments;
mod feedback;
mod lifecycle;
mod listing;
mod payments;
mod prescriptions;
mod service;

pub use appointments::AppointmentPatch;
pub use lifecycle::{TransitionPlan, plan_transition};
pub use payments::PaymentReceipt;
pub use service::BookingService;
