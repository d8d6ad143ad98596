// src/worklist/gate.rs
// =============================================================================
// The concurrency gate: a counting semaphore with N permits.
//
// Every extraction runs while holding exactly one permit. The permit is a
// guard value, so it goes back to the pool when it is dropped, whether the
// extraction returned Ok, returned Err, or panicked.
//
// Rust concepts:
// - RAII: cleanup tied to a value going out of scope
// - Arc: shared ownership so spawned tasks can hold the semaphore
// =============================================================================

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::WorklistError;

/// Bounds the number of simultaneous extractions.
///
/// Cloning a `Gate` is cheap and every clone shares the same permit pool.
#[derive(Debug, Clone)]
pub struct Gate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One held permit. Dropping it releases the permit.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl Gate {
    /// Creates a gate with `capacity` permits. Zero is rejected.
    pub fn new(capacity: usize) -> Result<Self, WorklistError> {
        if capacity == 0 {
            return Err(WorklistError::InvalidConcurrency(capacity));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Waits until a permit is free and takes it.
    ///
    /// Waiters are admitted in FIFO order, so nobody starves.
    pub async fn acquire(&self) -> GatePermit {
        // The semaphore is private and never closed, so acquire cannot fail.
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("gate semaphore is never closed"),
        };

        GatePermit { _permit: permit }
    }

    /// The fixed number of permits this gate was built with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held by anyone.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
