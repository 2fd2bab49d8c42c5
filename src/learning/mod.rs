//! Learning memory: persistent (signature, strategy) success rates that bias
//! future scoring toward historically successful strategies for similar
//! files.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::core::{StrategyKind, StructuralTree, UnitKind};

pub mod store;

pub use store::{KvStore, MemoryKvStore, NoOpKvStore};

/// Prior returned for unseen (signature, strategy) pairs.
pub const NEUTRAL_BIAS: f64 = 0.5;

/// Exponential moving average weight toward the newest observation.
const ALPHA: f64 = 0.1;

/// Bound on distinct signatures tracked; least recently used is evicted.
const MAX_SIGNATURES: usize = 1024;

const STORE_KEY: &str = "fission/learning-records";

/// A shape fingerprint of a file, computed from gross structural features
/// so that similar files share a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileSignature(String);

impl FileSignature {
    pub fn of(tree: &StructuralTree) -> Self {
        let bucket = (tree.total_lines / 100) * 100;
        let features = format!(
            "functions={};classes={};imports={};sections={};lines={}",
            tree.count_of(UnitKind::Function),
            tree.count_of(UnitKind::Class),
            tree.count_of(UnitKind::Import),
            tree.count_of(UnitKind::Section),
            bucket,
        );
        let digest = Sha256::digest(features.as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        FileSignature(hex[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One persisted observation stream for a (signature, strategy) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningRecord {
    /// Exponentially weighted success rate in [0, 1].
    pub rate: f64,
    pub uses: u64,
    pub last_used: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SignatureRecords {
    strategies: HashMap<StrategyKind, LearningRecord>,
    last_used: Option<DateTime<Utc>>,
}

/// Shared, mutex-guarded record map with optional persistence through a
/// [`KvStore`]. `record_outcome` is the only mutator and always succeeds;
/// store failures are logged, never propagated.
pub struct LearningMemory {
    records: Mutex<HashMap<String, SignatureRecords>>,
    store: Option<Box<dyn KvStore>>,
}

impl Default for LearningMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningMemory {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            store: None,
        }
    }

    /// Load any previously persisted records and keep persisting through
    /// `store` after each outcome.
    pub fn with_store(store: Box<dyn KvStore>) -> Self {
        let records = store
            .get(STORE_KEY)
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default();
        Self {
            records: Mutex::new(records),
            store: Some(store),
        }
    }

    /// Historical success rate for the pair, or the neutral prior.
    pub fn get_bias(&self, signature: &FileSignature, strategy: StrategyKind) -> f64 {
        self.records
            .lock()
            .get(signature.as_str())
            .and_then(|sig| sig.strategies.get(&strategy))
            .map(|record| record.rate)
            .unwrap_or(NEUTRAL_BIAS)
    }

    /// Fold one observed outcome into the pair's rate:
    /// `rate <- 0.1 * outcome + 0.9 * rate`. Success and rollback both count.
    pub fn record_outcome(&self, signature: &FileSignature, strategy: StrategyKind, success: bool) {
        let observation = if success { 1.0 } else { 0.0 };
        let now = Utc::now();
        let mut records = self.records.lock();

        let entry = records
            .entry(signature.as_str().to_string())
            .or_default();
        entry.last_used = Some(now);
        let record = entry
            .strategies
            .entry(strategy)
            .or_insert_with(|| LearningRecord {
                rate: NEUTRAL_BIAS,
                uses: 0,
                last_used: now,
            });
        record.rate = ALPHA * observation + (1.0 - ALPHA) * record.rate;
        record.uses += 1;
        record.last_used = now;

        Self::evict_lru(&mut records);

        if let Some(store) = &self.store {
            match serde_json::to_vec(&*records) {
                Ok(bytes) => {
                    if let Err(e) = store.put(STORE_KEY, &bytes) {
                        log::warn!("learning store put failed: {e}");
                    }
                }
                Err(e) => log::warn!("learning records serialization failed: {e}"),
            }
        }
    }

    /// Distinct signatures currently tracked.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_lru(records: &mut HashMap<String, SignatureRecords>) {
        while records.len() > MAX_SIGNATURES {
            let oldest = records
                .iter()
                .min_by_key(|(_, sig)| sig.last_used)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    log::debug!("evicting learning records for signature {key}");
                    records.remove(&key);
                }
                None => break,
            }
        }
    }
}
