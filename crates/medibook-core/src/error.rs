use thiserror::Error;

use crate::status::AppointmentStatus;

/// Domain error taxonomy for Medibook operations.
///
/// Every guard names its own error kind; nothing is downgraded to a generic
/// failure that would hide which invariant was violated.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or out-of-range input (bad rating, unapproved doctor, ...).
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Policy denial. Deliberately carries no target detail so that the
    /// error itself cannot leak whether the target exists.
    #[error("Forbidden")]
    Forbidden,

    /// The entity id is absent for an otherwise authorized caller.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: u64 },

    /// The requested status edge is not in the allowed table. Carries the
    /// observed current status so the caller can re-read and decide.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    /// The appointment is not in a status that permits the guarded
    /// operation (e.g. prescribing against a Pending appointment).
    #[error("Operation not allowed in status {status}")]
    InvalidState { status: AppointmentStatus },

    /// Uniqueness or dependent-entity violation.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Transient store failure or timeout. Safe for the caller to retry
    /// with backoff; never retried inside the core.
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },
}

impl DomainError {
    /// Create a new Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new NotFound error.
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Create a new InvalidTransition error.
    pub fn invalid_transition(from: AppointmentStatus, to: AppointmentStatus) -> Self {
        Self::InvalidTransition { from, to }
    }

    /// Create a new InvalidState error.
    pub fn invalid_state(status: AppointmentStatus) -> Self {
        Self::InvalidState { status }
    }

    /// Create a new Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a new Unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Whether the caller may retry the operation after backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Get error category for logging/monitoring.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Forbidden => ErrorCategory::Forbidden,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidTransition { .. } | Self::InvalidState { .. } => ErrorCategory::DomainRule,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Unavailable { .. } => ErrorCategory::Unavailable,
        }
    }
}

/// Error categories for monitoring and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    Forbidden,
    NotFound,
    DomainRule,
    Conflict,
    Unavailable,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::NotFound => write!(f, "not_found"),
            Self::DomainRule => write!(f, "domain_rule"),
            Self::Conflict => write!(f, "conflict"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Convenience result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
