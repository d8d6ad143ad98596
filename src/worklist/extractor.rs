// src/worklist/extractor.rs
// =============================================================================
// The Extractor trait: the one piece of the engine the caller supplies.
//
// Given one item, an extractor returns the items it discovered (possibly
// none) or an error. The engine calls it from many tasks at once, so it must
// be Send + Sync. It may do blocking I/O, sleep, or enforce its own timeout.
//
// Rust concepts:
// - Traits: the seam between the generic engine and concrete crawlers
// - async-trait: lets a trait method be async and still be used from
//   tokio::spawn (the returned future is Send)
// - Blanket impls: every type that meets the bounds is an Item automatically
// =============================================================================

use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

/// Anything the engine can schedule: comparable, hashable, printable, and
/// movable between tasks.
pub trait Item: Eq + Hash + Clone + Display + Send + Sync + 'static {}

impl<T> Item for T where T: Eq + Hash + Clone + Display + Send + Sync + 'static {}

/// Turns one item into zero or more newly discovered items.
#[async_trait]
pub trait Extractor<T: Item>: Send + Sync + 'static {
    async fn extract(&self, item: &T) -> Result<Vec<T>>;
}

// Lets a caller keep a handle on the extractor it gave to the engine
#[async_trait]
impl<T: Item, E: Extractor<T>> Extractor<T> for Arc<E> {
    async fn extract(&self, item: &T) -> Result<Vec<T>> {
        (**self).extract(item).await
    }
}

/// Adapts an async closure into an [`Extractor`].
///
/// The closure receives its own clone of the item.
pub struct FnExtractor<F> {
    f: F,
}

/// Wraps `f` so it can be handed to [`Engine::new`](super::Engine::new).
///
/// ```ignore
/// let extractor = extract_fn(|n: u32| async move { Ok(vec![n / 2]) });
/// ```
pub fn extract_fn<T, F, Fut>(f: F) -> FnExtractor<F>
where
    T: Item,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>>> + Send,
{
    FnExtractor { f }
}

#[async_trait]
impl<T, F, Fut> Extractor<T> for FnExtractor<F>
where
    T: Item,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<T>>> + Send,
{
    async fn extract(&self, item: &T) -> Result<Vec<T>> {
        (self.f)(item.clone()).await
    }
}
