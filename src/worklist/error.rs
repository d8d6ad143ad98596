// src/worklist/error.rs
// Configuration errors. These are fatal and are reported before any task runs.
// Extraction failures are NOT errors at this level: the engine logs them and
// keeps going.

use thiserror::Error;

/// Errors returned when building an engine or a gate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorklistError {
    /// The concurrency ceiling must allow at least one extraction.
    #[error("concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    /// An item budget of zero would admit nothing.
    #[error("item budget must be at least 1, got {0}")]
    InvalidItemBudget(usize),
}
