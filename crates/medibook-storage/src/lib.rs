//! Entity store abstraction layer for Medibook.
//!
//! Defines the [`EntityStore`] and [`StoreTransaction`] traits backends
//! implement, the [`StorageError`] type and its mapping onto the domain
//! error taxonomy, and the filter/payload types shared by backends.

pub mod error;
pub mod traits;
pub mod types;

pub use error::StorageError;
pub use traits::{EntityStore, StoreTransaction};
pub use types::{
    AppointmentFilter, FeedbackFilter, NewAppointment, NewFeedback, NewPayment, NewPrescription,
    PaymentFilter, PrescriptionFilter,
};
