//! Storage module
//!
//! Key/value persistence of JSON-encoded collections. Every component reads
//! a whole collection, mutates it and writes it back through [`update`],
//! which holds an in-process lock per key across the read and the write.
//! Tasks of one engine (user commands and timers) therefore never lose
//! each other's writes. There is no cross-key transaction and nothing
//! coordinates separate processes sharing a store: between those the last
//! full snapshot wins.

pub mod memory;
pub mod seed;
pub mod sqlite;

pub use memory::MemoryStore;
pub use seed::seed_fixtures;
pub use sqlite::SqliteStore;

use crate::error::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

/// Raw text storage under named keys
#[async_trait]
pub trait Store: Send + Sync {
    /// Read the text stored under `key`, `None` when absent
    async fn read_raw(&self, key: &str) -> Result<Option<String>>;

    /// Replace the text stored under `key`
    async fn write_raw(&self, key: &str, value: String) -> Result<()>;

    /// Remove `key`; removing an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read and decode the value under `key`.
///
/// A missing key, an unavailable substrate and an undecodable payload all
/// yield `T::default()`; first run and cleared storage are expected states.
pub async fn load<T>(store: &dyn Store, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match store.read_raw(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Discarding undecodable value under '{}': {}", key, e);
                T::default()
            }
        },
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!("Storage read of '{}' failed, using empty value: {}", key, e);
            T::default()
        }
    }
}

/// Encode and write `value` under `key`
pub async fn save<T>(store: &dyn Store, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized + Sync,
{
    let raw = serde_json::to_string(value)?;
    store.write_raw(key, raw).await
}

/// One async lock per storage key
#[derive(Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Held until the guard is dropped.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(locks) => locks,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Read, mutate and write back the value under `key` while holding its lock.
///
/// The value is loaded like [`load`]. When `mutate` fails nothing is written
/// and its error is returned.
pub async fn update<T, R, F>(store: &dyn Store, locks: &KeyLocks, key: &str, mutate: F) -> Result<R>
where
    T: Serialize + DeserializeOwned + Default + Sync,
    F: FnOnce(&mut T) -> Result<R>,
{
    let _guard = locks.lock(key).await;

    let mut value: T = load(store, key).await;
    let result = mutate(&mut value)?;
    save(store, key, &value).await?;
    Ok(result)
}

/// Whether `key` currently holds a value
pub async fn contains(store: &dyn Store, key: &str) -> Result<bool> {
    Ok(store.read_raw(key).await?.is_some())
}
