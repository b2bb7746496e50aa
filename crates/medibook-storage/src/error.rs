//! Error types for the entity store abstraction layer.

use medibook_core::DomainError;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested record was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity table the lookup ran against.
        entity: &'static str,
        /// Surrogate key that was looked up.
        id: u64,
    },

    /// A uniqueness constraint was violated on insert.
    #[error("{entity} already exists for key {key}")]
    AlreadyExists {
        /// Entity table the insert ran against.
        entity: &'static str,
        /// The constrained key, rendered for diagnostics.
        key: String,
    },

    /// A store-enforced integrity constraint was violated on a write
    /// other than an insert (e.g. an update trying to change an
    /// immutable reference).
    #[error("Constraint violated: {message}")]
    Constraint { message: String },

    /// An error occurred beginning, committing or rolling back a
    /// transaction.
    #[error("Transaction error: {message}")]
    TransactionError { message: String },

    /// A store call exceeded its bounded timeout.
    #[error("Store call timed out: {message}")]
    Timeout { message: String },

    /// An internal store error occurred.
    #[error("Internal store error: {message}")]
    Internal { message: String },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(entity: &'static str, key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            key: key.into(),
        }
    }

    /// Creates a new `Constraint` error.
    #[must_use]
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    /// Creates a new `TransactionError` error.
    #[must_use]
    pub fn transaction_error(message: impl Into<String>) -> Self {
        Self::TransactionError {
            message: message.into(),
        }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Map store failures onto the domain taxonomy without losing which
/// invariant was violated: uniqueness violations stay conflicts, missing
/// rows stay not-found, everything infrastructural becomes retryable
/// `Unavailable`.
impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => DomainError::not_found(entity, id),
            StorageError::AlreadyExists { entity, key } => {
                DomainError::conflict(format!("{entity} already exists for key {key}"))
            }
            StorageError::Constraint { message } => DomainError::conflict(message),
            StorageError::Timeout { message } => DomainError::unavailable(message),
            StorageError::TransactionError { message } | StorageError::Internal { message } => {
                DomainError::unavailable(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medibook_core::ErrorCategory;

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found("Appointment", 5);
        assert_eq!(err.to_string(), "Appointment not found: 5");

        let err = StorageError::already_exists("Prescription", "appointment_id=5");
        assert_eq!(
            err.to_string(),
            "Prescription already exists for key appointment_id=5"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(StorageError::not_found("Payment", 1).is_not_found());
        assert!(!StorageError::not_found("Payment", 1).is_already_exists());
        assert!(StorageError::already_exists("Prescription", "k").is_already_exists());
    }

    #[test]
    fn test_domain_error_mapping_preserves_invariant() {
        let domain: DomainError = StorageError::already_exists("Prescription", "k").into();
        assert_eq!(domain.category(), ErrorCategory::Conflict);

        let domain: DomainError = StorageError::not_found("Appointment", 9).into();
        assert_eq!(domain.category(), ErrorCategory::NotFound);

        // Integrity violations are conflicts, never retryable infrastructure
        // failures.
        let domain: DomainError =
            StorageError::constraint("prescription appointment_id is immutable").into();
        assert_eq!(domain.category(), ErrorCategory::Conflict);
        assert!(!domain.is_retryable());

        let domain: DomainError = StorageError::timeout("read deadline exceeded").into();
        assert_eq!(domain.category(), ErrorCategory::Unavailable);
        assert!(domain.is_retryable());

        let domain: DomainError = StorageError::internal("poisoned").into();
        assert_eq!(domain.category(), ErrorCategory::Unavailable);
    }
}
