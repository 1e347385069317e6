//! Runtime context shared by every service
//!
//! Time and identifier generation are injected so tests can assert on
//! generated ids and timestamps instead of racing the wall clock.

use crate::config::{ID_PREFIX, ID_RANDOM_LEN};
use crate::error::Result;
use crate::storage::{self, KeyLocks, Store};
use chrono::Utc;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

/// Source of "now" in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Generator of entity identifiers
pub trait IdProvider: Send + Sync {
    fn next_id(&self) -> String;
}

/// `s_` followed by eight random base-36 characters
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdProvider for RandomIds {
    fn next_id(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_RANDOM_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        format!("{}{}", ID_PREFIX, suffix)
    }
}

/// `s_` followed by a v4 UUID in simple form
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdProvider for UuidIds {
    fn next_id(&self) -> String {
        format!("{}{}", ID_PREFIX, uuid::Uuid::new_v4().simple())
    }
}

/// Monotonic counter ids: `s_1`, `s_2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdProvider for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}{}", ID_PREFIX, n)
    }
}

/// Store, clock and id provider bundle handed to every service.
///
/// Clones share the per-key locks, so every service built from one context
/// serializes its read-modify-write cycles against the others.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdProvider>,
    pub locks: Arc<KeyLocks>,
}

impl Context {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, ids: Arc<dyn IdProvider>) -> Self {
        Self {
            store,
            clock,
            ids,
            locks: Arc::new(KeyLocks::new()),
        }
    }

    /// Context on the wall clock with random ids
    pub fn system(store: Arc<dyn Store>) -> Self {
        Self::new(store, Arc::new(SystemClock), Arc::new(RandomIds))
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn next_id(&self) -> String {
        self.ids.next_id()
    }

    /// Locked read-modify-write of the value under `key`
    pub async fn update<T, R, F>(&self, key: &str, mutate: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default + Sync,
        F: FnOnce(&mut T) -> Result<R>,
    {
        storage::update(self.store.as_ref(), &self.locks, key, mutate).await
    }
}
