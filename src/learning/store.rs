//! Key-value persistence boundary for learning records. Durability beyond
//! the process lifetime is a collaborator concern; this trait is the seam.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::errors::Result;

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Vec<u8>>;
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// Thread-safe in-memory store; survives across orchestrator invocations
/// within a process, which is all the learning contract requires.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// Store for when persistence is disabled.
#[derive(Debug, Default, Clone)]
pub struct NoOpKvStore;

impl NoOpKvStore {
    pub fn new() -> Self {
        Self
    }
}

impl KvStore for NoOpKvStore {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn put(&self, _key: &str, _value: &[u8]) -> Result<()> {
        Ok(())
    }
}
