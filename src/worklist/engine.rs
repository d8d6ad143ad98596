// src/worklist/engine.rs
// =============================================================================
// The dispatcher: owns the worklist, spawns one task per admitted item, and
// decides when the run is over.
//
// How it works:
// 1. The seed batch is pushed onto the worklist and counts as one pending
//    obligation
// 2. The loop takes one batch at a time off the worklist
// 3. Every item in the batch that the deduplicator admits bumps the pending
//    counter and gets its own task
// 4. Each task waits for a gate permit, runs the extractor, drops the permit,
//    and pushes whatever it found back onto the worklist as one batch
// 5. After a batch has been handled the counter goes down by one
// 6. When the counter hits zero nothing is in flight and nothing can arrive,
//    so the run is finished
//
// Only this loop touches the counter. Increments for a batch's items always
// happen before the decrement for the batch itself, so the counter can never
// read zero while a discovered item is still waiting to be spawned.
//
// Rust concepts:
// - mpsc channels: the worklist of batches
// - tokio::spawn: one lightweight task per item
// - catch_unwind: a panicking extractor still reports back
// =============================================================================

use std::any::Any;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt; // catch_unwind() on futures
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Deduplicator, Extractor, Gate, Item, WorklistError};

/// Matches the 20-token semaphore of the classic concurrent crawler.
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Knobs for one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum number of extractions running at the same time. Must be >= 1.
    pub concurrency: usize,
    /// Stop admitting new items once this many have been admitted.
    pub max_items: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_items: None,
        }
    }
}

impl EngineConfig {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn validate(&self) -> Result<(), WorklistError> {
        if self.concurrency == 0 {
            return Err(WorklistError::InvalidConcurrency(self.concurrency));
        }
        if let Some(0) = self.max_items {
            return Err(WorklistError::InvalidItemBudget(0));
        }
        Ok(())
    }
}

/// An item whose extraction failed, with the rendered error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure<T> {
    pub item: T,
    pub error: String,
}

/// What a run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<T> {
    /// Every admitted item, in admission order. Each was extracted exactly
    /// once unless it also shows up in `skipped`.
    pub visited: Vec<T>,
    /// Items whose extraction returned an error or panicked.
    pub failures: Vec<Failure<T>>,
    /// Admitted items that were still waiting for a permit when the run was
    /// cancelled. Their extractor was never called.
    pub skipped: Vec<T>,
    /// True if cancellation turned away a new item or skipped an admitted one.
    pub cancelled: bool,
    /// True if the item budget caused at least one new item to be turned away.
    pub truncated: bool,
}

impl<T> Default for RunReport<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RunReport<T> {
    fn new() -> Self {
        Self {
            visited: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            cancelled: false,
            truncated: false,
        }
    }

    /// Number of extractor invocations the run made.
    pub fn extraction_count(&self) -> usize {
        self.visited.len() - self.skipped.len()
    }

    /// True if the run explored everything reachable from the seeds.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && !self.truncated
    }
}

// One unit on the worklist. Batches may hold zero items.
enum Batch<T> {
    Seeds(Vec<T>),
    Extracted {
        item: T,
        outcome: Result<Vec<T>, String>,
    },
    // Cancelled before a permit was granted; counts as an empty batch
    Skipped(T),
}

/// Runs an [`Extractor`] over a growing set of items with bounded fan-out.
pub struct Engine<T: Item, E: Extractor<T>> {
    extractor: Arc<E>,
    config: EngineConfig,
    gate: Gate,
    cancel: CancellationToken,
    _item: PhantomData<fn() -> T>,
}

impl<T: Item, E: Extractor<T>> Engine<T, E> {
    /// Builds an engine. Fails if `config` is invalid.
    pub fn new(extractor: E, config: EngineConfig) -> Result<Self, WorklistError> {
        config.validate()?;
        let gate = Gate::new(config.concurrency)?;

        Ok(Self {
            extractor: Arc::new(extractor),
            config,
            gate,
            cancel: CancellationToken::new(),
            _item: PhantomData,
        })
    }

    /// Uses `token` instead of the engine's own cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that stops the engine when cancelled: no new items are
    /// admitted, admitted items still waiting for a permit are skipped, and
    /// extractions already running are allowed to finish.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Processes `seeds` and everything discovered from them, then returns.
    ///
    /// Extraction failures never abort the run. An empty seed list returns
    /// immediately with an empty report.
    pub async fn run<I>(&self, seeds: I) -> RunReport<T>
    where
        I: IntoIterator<Item = T>,
    {
        let seeds: Vec<T> = seeds.into_iter().collect();
        info!(
            seeds = seeds.len(),
            concurrency = self.config.concurrency,
            max_items = ?self.config.max_items,
            "Starting worklist run"
        );

        let dedup = Deduplicator::new();
        let mut report = RunReport::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        // The seed batch is the first obligation
        let mut pending: usize = 1;
        let _ = tx.send(Batch::Seeds(seeds));

        while pending > 0 {
            // We hold a sender for the whole loop, so recv() only returns None
            // if that invariant is broken
            let Some(batch) = rx.recv().await else {
                break;
            };

            let discovered = match batch {
                Batch::Seeds(items) => items,
                Batch::Extracted {
                    item,
                    outcome: Ok(items),
                } => {
                    debug!(item = %item, found = items.len(), "Extraction finished");
                    items
                }
                Batch::Extracted {
                    item,
                    outcome: Err(error),
                } => {
                    warn!(item = %item, error = %error, "Extraction failed");
                    report.failures.push(Failure { item, error });
                    Vec::new()
                }
                Batch::Skipped(item) => {
                    debug!(item = %item, "Skipped after cancellation");
                    report.skipped.push(item);
                    report.cancelled = true;
                    Vec::new()
                }
            };

            for item in discovered {
                if !self.may_admit(&item, &dedup, &mut report) {
                    continue;
                }
                if !dedup.try_admit(&item) {
                    continue;
                }

                pending += 1;
                report.visited.push(item.clone());
                self.spawn_extraction(item, tx.clone());
            }

            pending -= 1;
            debug!(pending, "Batch handled");
        }

        info!(
            visited = report.visited.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            cancelled = report.cancelled,
            truncated = report.truncated,
            "Worklist run finished"
        );

        report
    }

    // Stop conditions live here, right before admission. Items already seen
    // don't flip the flags since they would have been dropped anyway.
    fn may_admit(&self, item: &T, dedup: &Deduplicator<T>, report: &mut RunReport<T>) -> bool {
        if self.cancel.is_cancelled() {
            if !dedup.contains(item) {
                report.cancelled = true;
            }
            return false;
        }

        if let Some(max) = self.config.max_items {
            if report.visited.len() >= max {
                if !dedup.contains(item) {
                    report.truncated = true;
                }
                return false;
            }
        }

        true
    }

    fn spawn_extraction(&self, item: T, tx: mpsc::UnboundedSender<Batch<T>>) {
        let extractor = self.extractor.clone();
        let gate = self.gate.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            // Cancellation wins over a free permit, so nothing new starts
            // once the token is set
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = gate.acquire() => Some(permit),
            };
            let Some(permit) = permit else {
                let _ = tx.send(Batch::Skipped(item));
                return;
            };

            let outcome = AssertUnwindSafe(extractor.extract(&item))
                .catch_unwind()
                .await;
            drop(permit);

            let outcome = match outcome {
                Ok(Ok(items)) => Ok(items),
                Ok(Err(e)) => Err(format!("{:#}", e)),
                Err(panic) => Err(format!("extractor panicked: {}", panic_message(&*panic))),
            };

            // The receiver only goes away if the run itself was dropped
            let _ = tx.send(Batch::Extracted { item, outcome });
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worklist::extract_fn;
    use anyhow::anyhow;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.max_items, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let extractor = extract_fn(|_: u32| async { Ok(Vec::new()) });
        let err = Engine::new(extractor, EngineConfig::default().with_concurrency(0))
            .err()
            .unwrap();
        assert_eq!(err, WorklistError::InvalidConcurrency(0));

        assert_eq!(
            EngineConfig::default().with_max_items(0).validate(),
            Err(WorklistError::InvalidItemBudget(0))
        );
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*boxed), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(&*boxed), "kaboom");

        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*boxed), "unknown panic payload");
    }

    #[tokio::test]
    async fn test_empty_seeds_finish_immediately() {
        let extractor = extract_fn(|_: u32| async { Ok(Vec::new()) });
        let engine = Engine::new(extractor, EngineConfig::default()).unwrap();

        let report = engine.run(Vec::new()).await;
        assert!(report.visited.is_empty());
        assert!(report.failures.is_empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_chain_is_followed_to_the_end() {
        // 0 -> 1 -> ... -> 9 -> nothing
        let extractor = extract_fn(|n: u32| async move {
            Ok(if n < 9 { vec![n + 1] } else { Vec::new() })
        });
        let engine = Engine::new(extractor, EngineConfig::default()).unwrap();

        let report = engine.run([0]).await;
        assert_eq!(report.visited, (0..10).collect::<Vec<_>>());
        assert_eq!(report.extraction_count(), 10);
    }

    #[tokio::test]
    async fn test_failure_recorded_and_run_continues() {
        let extractor = extract_fn(|n: u32| async move {
            match n {
                0 => Ok(vec![1, 2]),
                1 => Err(anyhow!("fetch failed")),
                _ => Ok(Vec::new()),
            }
        });
        let engine = Engine::new(extractor, EngineConfig::default()).unwrap();

        let report = engine.run([0]).await;
        assert_eq!(report.extraction_count(), 3);
        assert_eq!(
            report.failures,
            vec![Failure {
                item: 1,
                error: "fetch failed".to_string()
            }]
        );
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_panicking_extractor_does_not_hang() {
        let extractor = extract_fn(|n: u32| async move {
            if n == 1 {
                panic!("bad item {}", n);
            }
            Ok(if n == 0 { vec![1, 2] } else { Vec::new() })
        });
        let engine = Engine::new(extractor, EngineConfig::default().with_concurrency(1)).unwrap();

        let report = engine.run([0]).await;
        assert_eq!(report.extraction_count(), 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item, 1);
        assert!(report.failures[0].error.contains("bad item 1"));
    }

    #[tokio::test]
    async fn test_item_budget_truncates() {
        // Endless chain, stopped by the budget
        let extractor = extract_fn(|n: u64| async move { Ok(vec![n + 1]) });
        let engine = Engine::new(extractor, EngineConfig::default().with_max_items(5)).unwrap();

        let report = engine.run([0]).await;
        assert_eq!(report.visited, vec![0, 1, 2, 3, 4]);
        assert!(report.truncated);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_budget_not_hit_when_graph_fits() {
        let extractor = extract_fn(|n: u32| async move {
            Ok(if n < 2 { vec![n + 1] } else { Vec::new() })
        });
        let engine = Engine::new(extractor, EngineConfig::default().with_max_items(3)).unwrap();

        let report = engine.run([0]).await;
        assert_eq!(report.extraction_count(), 3);
        assert!(!report.truncated);
    }

    #[tokio::test]
    async fn test_cancel_before_run_admits_nothing() {
        let extractor = extract_fn(|_: u32| async { Ok(Vec::new()) });
        let engine = Engine::new(extractor, EngineConfig::default()).unwrap();
        engine.cancellation_token().cancel();

        let report = engine.run([1, 2, 3]).await;
        assert!(report.visited.is_empty());
        assert!(report.cancelled);
    }

    #[tokio::test]
    async fn test_cancel_mid_run_drains_in_flight() {
        let token = CancellationToken::new();
        let inner = token.clone();

        // Endless chain that cancels itself at 5; 6 is discovered but refused
        let extractor = extract_fn(move |n: u64| {
            let inner = inner.clone();
            async move {
                if n == 5 {
                    inner.cancel();
                }
                Ok(vec![n + 1])
            }
        });
        let engine = Engine::new(extractor, EngineConfig::default())
            .unwrap()
            .with_cancellation(token);

        let report = engine.run([0]).await;
        assert_eq!(report.visited, vec![0, 1, 2, 3, 4, 5]);
        assert!(report.cancelled);
        assert!(!report.is_complete());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancel_skips_items_waiting_for_a_permit() {
        let token = CancellationToken::new();
        let inner = token.clone();
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();

        // Root fans out to 50 children queued behind a single permit; the
        // first child to run cancels the run
        let extractor = extract_fn(move |n: u32| {
            let inner = inner.clone();
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n == 0 {
                    return Ok((1..=50).collect());
                }
                inner.cancel();
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                Ok(Vec::new())
            }
        });
        let engine = Engine::new(extractor, EngineConfig::default().with_concurrency(1))
            .unwrap()
            .with_cancellation(token);

        let started = std::time::Instant::now();
        let report = engine.run([0]).await;

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(report.visited.len(), 51);
        assert_eq!(report.skipped.len(), 49);
        assert_eq!(report.extraction_count(), 2);
        assert!(report.cancelled);
        assert!(started.elapsed() < std::time::Duration::from_millis(500));
    }
}
