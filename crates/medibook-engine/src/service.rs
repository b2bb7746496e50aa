//! The booking service: shared state and store-call plumbing.
//!
//! Operation implementations live in the sibling modules
//! ([`crate::appointments`], [`crate::prescriptions`], [`crate::payments`],
//! [`crate::feedback`], [`crate::listing`]); this module owns the struct,
//! the timeout wrapper and the small helpers they all share.

use std::future::Future;
use std::sync::Arc;

use medibook_config::MedibookConfig;
use medibook_core::{Caller, DomainError, Result};
use medibook_storage::{EntityStore, StorageError, StoreTransaction};

/// Entry point for every lifecycle operation.
///
/// Holds a store handle and the runtime configuration; cheap to clone and
/// share across tasks. Every mutation runs read-check-write inside a single
/// store transaction, and every guard is authorized before any write.
#[derive(Clone)]
pub struct BookingService {
    pub(crate) store: Arc<dyn EntityStore>,
    pub(crate) config: MedibookConfig,
}

impl BookingService {
    pub fn new(store: Arc<dyn EntityStore>, config: MedibookConfig) -> Self {
        Self { store, config }
    }

    /// Service over `store` with compiled-in default configuration.
    pub fn with_defaults(store: Arc<dyn EntityStore>) -> Self {
        Self::new(store, MedibookConfig::default())
    }

    pub fn config(&self) -> &MedibookConfig {
        &self.config
    }

    /// Bounds a store call by the configured timeout. Exceeding it surfaces
    /// as a retryable `Unavailable`; the engine itself never retries.
    pub(crate) async fn timed<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, StorageError>>,
    {
        match tokio::time::timeout(self.config.store.timeout(), fut).await {
            Ok(result) => result.map_err(DomainError::from),
            Err(_) => Err(DomainError::unavailable(format!(
                "store call exceeded {}ms",
                self.config.store.timeout_ms
            ))),
        }
    }

    pub(crate) async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        self.timed(self.store.begin()).await
    }

    pub(crate) async fn commit(&self, tx: Box<dyn StoreTransaction>) -> Result<()> {
        self.timed(tx.commit()).await
    }

    pub(crate) async fn rollback(&self, tx: Box<dyn StoreTransaction>) -> Result<()> {
        self.timed(tx.rollback()).await
    }

    /// Rejects callers whose claimed role has no backing row before any
    /// lookup happens, so the answer never depends on whether the target
    /// exists.
    pub(crate) fn ensure_resolvable(caller: &Caller) -> Result<()> {
        if caller.is_resolvable() {
            Ok(())
        } else {
            tracing::debug!(role = %caller.role, "unresolvable caller rejected");
            Err(DomainError::Forbidden)
        }
    }
}

impl std::fmt::Debug for BookingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingService")
            .field("backend", &self.store.backend_name())
            .field("config", &self.config)
            .finish()
    }
}
