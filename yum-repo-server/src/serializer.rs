//! Mutation serializer: at most one reindex runs at a time.
//!
//! The metadata tool must not run twice against the same directory
//! concurrently. Every mutation cycle acquires the serializer for the duration
//! of its reindex. Waiters block without a timeout and without a fairness
//! guarantee beyond what [`tokio::sync::Mutex`] provides; a hung tool stalls all
//! later mutations.
//!
//! The serializer is a trait object owned by the repository, so tests can plug
//! in an instrumented implementation.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Proof of exclusive access. Dropping it releases the serializer.
#[must_use = "the serializer is released as soon as the guard is dropped"]
pub struct SerializerGuard {
    _held: Box<dyn Send>,
}

impl SerializerGuard {
    /// Wrap whatever value keeps the underlying primitive locked.
    pub fn new<T: Send + 'static>(held: T) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

/// Exclusive section guarding the reindex step of a mutation cycle.
#[async_trait]
pub trait MutationSerializer: Send + Sync {
    /// Wait until no other holder exists.
    async fn acquire(&self) -> SerializerGuard;
}

/// Process-wide exclusive lock.
#[derive(Debug, Default, Clone)]
pub struct ExclusiveSerializer {
    lock: Arc<Mutex<()>>,
}

impl ExclusiveSerializer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MutationSerializer for ExclusiveSerializer {
    async fn acquire(&self) -> SerializerGuard {
        SerializerGuard::new(self.lock.clone().lock_owned().await)
    }
}

/// Does not serialize anything. Only for setups where the runner is a fake.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSerializer;

#[async_trait]
impl MutationSerializer for NoopSerializer {
    async fn acquire(&self) -> SerializerGuard {
        SerializerGuard::new(())
    }
}
