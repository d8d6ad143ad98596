// src/worklist/mod.rs
// =============================================================================
// This module contains the concurrent worklist engine.
//
// Submodules:
// - gate: caps how many extractions run at the same time
// - dedup: remembers every item ever admitted so none runs twice
// - extractor: the trait callers implement to turn one item into more items
// - engine: the dispatcher loop that ties everything together
// - error: configuration errors
//
// The engine knows nothing about URLs or HTTP. Anything that is hashable,
// cloneable and printable can be an item.
// =============================================================================

mod dedup;
mod engine;
mod error;
mod extractor;
mod gate;

pub use dedup::Deduplicator;
pub use engine::{Engine, EngineConfig, Failure, RunReport, DEFAULT_CONCURRENCY};
pub use error::WorklistError;
pub use extractor::{extract_fn, Extractor, FnExtractor, Item};
pub use gate::{Gate, GatePermit};
