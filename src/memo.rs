//! Process-lifetime memoization of pure pipeline stages.
//!
//! Entries are keyed by the stage name plus its arguments serialized to JSON.
//! Nothing is evicted; the table lives as long as the `Memo` (and the process
//! hosting it). Concurrent callers asking for the same key share one
//! computation, and failed computations are not cached.

use std::sync::Arc;

use moka::sync::Cache;
use serde::Serialize;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    pub function: &'static str,
    pub args: String,
}

impl MemoKey {
    pub fn new<A: Serialize>(function: &'static str, args: &A) -> Result<Self> {
        let args = serde_json::to_string(args)
            .map_err(|e| PipelineError::config(format!("cannot build memo key for {function}: {e}")))?;
        Ok(Self { function, args })
    }
}

pub struct Memo<V> {
    cache: Cache<MemoKey, Arc<V>>,
}

impl<V> Memo<V>
where
    V: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }

    /// Cached value for `key`, computing it with `compute` on first use.
    pub fn get_or_try_insert<F>(&self, key: MemoKey, compute: F) -> Result<Arc<V>>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(hit) = self.cache.get(&key) {
            tracing::trace!(function = key.function, "memo hit");
            return Ok(hit);
        }
        let function = key.function;
        self.cache
            .try_get_with(key, || {
                tracing::debug!(function, "memo miss, computing");
                compute().map(Arc::new)
            })
            .map_err(|e: Arc<PipelineError>| (*e).clone())
    }

    pub fn contains(&self, key: &MemoKey) -> bool {
        self.cache.contains_key(key)
    }

    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for Memo<V>
where
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for Memo<V>
where
    V: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
