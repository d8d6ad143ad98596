// src/lib.rs
// =============================================================================
// Library root for linkwalk.
//
// The crate is split in two halves:
// - worklist: a generic engine that processes items concurrently, discovers
//   new items while doing so, never processes an item twice, and stops when
//   nothing is left to do
// - crawl: an Extractor that treats URLs as items and discovers new URLs by
//   fetching pages and parsing their links
//
// The binary (src/main.rs) glues these together behind a small CLI.
// =============================================================================

pub mod crawl;
pub mod worklist;

pub use worklist::{
    extract_fn, Deduplicator, Engine, EngineConfig, Extractor, Failure, Gate, GatePermit, Item,
    RunReport, WorklistError,
};
