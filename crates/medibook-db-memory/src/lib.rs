//! In-memory entity store backend.
//!
//! Reference implementation of the Medibook store traits and the test
//! double used by the lifecycle engine's tests. Transactions hold the
//! store-wide lock for their lifetime, so concurrent read-modify-write
//! sequences are fully serialized and the loser of a race re-evaluates
//! against the winner's committed state.

mod store;
mod transaction;

pub use store::InMemoryStore;
