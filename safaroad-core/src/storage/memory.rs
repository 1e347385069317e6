//! In-memory store
//!
//! Backs tests and ephemeral sessions. Clones share the same map.

use super::Store;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
    unavailable: Arc<AtomicBool>,
    read_only: Arc<AtomicBool>,
    yielding: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read and write fail as if the substrate was gone
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make writes fail while reads keep working
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Make every operation suspend once before touching the map, like an
    /// I/O-backed store would
    pub fn set_yielding(&self, yielding: bool) {
        self.yielding.store(yielding, Ordering::SeqCst);
    }

    async fn maybe_yield(&self) {
        if self.yielding.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }

    /// Number of keys currently stored
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::StorageUnavailable("memory store offline".to_string()));
        }
        Ok(())
    }

    fn check_writable(&self) -> Result<()> {
        self.check_available()?;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(AppError::StorageUnavailable("memory store is read-only".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read_raw(&self, key: &str) -> Result<Option<String>> {
        self.maybe_yield().await;
        self.check_available()?;
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::StorageUnavailable("memory store poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    async fn write_raw(&self, key: &str, value: String) -> Result<()> {
        self.maybe_yield().await;
        self.check_writable()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::StorageUnavailable("memory store poisoned".to_string()))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.maybe_yield().await;
        self.check_writable()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::StorageUnavailable("memory store poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}
