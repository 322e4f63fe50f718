use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::candidate::AssetKey;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryBudget {
    pub max_bytes: usize,
}

impl MemoryBudget {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Residency {
    Resident,
    Evicted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("asset too large for cache budget: requested={requested} max={max}")]
    BudgetExceeded { requested: usize, max: usize },
    #[error("no evictable entries (all pinned?)")]
    NoEvictableEntries,
    #[error("unknown cache key {0}")]
    UnknownKey(AssetKey),
}

#[derive(Debug)]
struct Entry<T> {
    asset: Option<Arc<T>>,
    residency: Residency,
    bytes: usize,
    last_used_tick: u64,
    pin_count: u32,
}

/// Decoded assets keyed by logical identity, under a byte budget.
///
/// - Keys live in a `BTreeMap` so traversal order is stable.
/// - Eviction is LRU by `last_used_tick`, ties broken by key order.
/// - Pinned entries are never evicted.
/// - Evicted entries keep their slot so `state` can report them.
#[derive(Debug)]
pub struct AssetCache<T> {
    budget: MemoryBudget,
    used_bytes: usize,
    tick: u64,
    entries: BTreeMap<AssetKey, Entry<T>>,
}

impl<T> AssetCache<T> {
    pub fn new(budget: MemoryBudget) -> Self {
        Self {
            budget,
            used_bytes: 0,
            tick: 0,
            entries: BTreeMap::new(),
        }
    }

    pub fn budget(&self) -> MemoryBudget {
        self.budget
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn state(&self, key: &AssetKey) -> Option<Residency> {
        self.entries.get(key).map(|e| e.residency)
    }

    pub fn contains(&self, key: &AssetKey) -> bool {
        self.state(key) == Some(Residency::Resident)
    }

    /// Returns the resident asset and marks it most recently used.
    pub fn get(&mut self, key: &AssetKey) -> Option<Arc<T>> {
        self.tick += 1;
        let entry = self.entries.get_mut(key)?;
        let asset = entry.asset.clone()?;
        entry.last_used_tick = self.tick;
        Some(asset)
    }

    /// Stores `asset` under `key`, returning the keys evicted to make room.
    pub fn insert(
        &mut self,
        key: AssetKey,
        asset: Arc<T>,
        bytes: usize,
    ) -> Result<Vec<AssetKey>, CacheError> {
        if bytes > self.budget.max_bytes {
            return Err(CacheError::BudgetExceeded {
                requested: bytes,
                max: self.budget.max_bytes,
            });
        }

        self.tick += 1;
        let entry = self.entries.entry(key.clone()).or_insert_with(|| Entry {
            asset: None,
            residency: Residency::Evicted,
            bytes: 0,
            last_used_tick: 0,
            pin_count: 0,
        });
        if entry.residency == Residency::Resident {
            self.used_bytes = self.used_bytes.saturating_sub(entry.bytes);
        }
        entry.asset = Some(asset);
        entry.bytes = bytes;
        entry.residency = Residency::Resident;
        entry.last_used_tick = self.tick;
        self.used_bytes += bytes;

        self.evict_as_needed(&key)
    }

    pub fn pin(&mut self, key: &AssetKey) -> Result<(), CacheError> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| CacheError::UnknownKey(key.clone()))?;
        entry.pin_count = entry.pin_count.saturating_add(1);
        Ok(())
    }

    pub fn is_pinned(&self, key: &AssetKey) -> bool {
        self.entries.get(key).is_some_and(|e| e.pin_count > 0)
    }

    /// Drops the asset for `key`; pins are ignored.
    pub fn invalidate(&mut self, key: &AssetKey) -> Result<(), CacheError> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| CacheError::UnknownKey(key.clone()))?;
        if entry.residency == Residency::Resident {
            self.used_bytes = self.used_bytes.saturating_sub(entry.bytes);
        }
        entry.asset = None;
        entry.bytes = 0;
        entry.residency = Residency::Evicted;
        Ok(())
    }

    fn evict_as_needed(&mut self, protected: &AssetKey) -> Result<Vec<AssetKey>, CacheError> {
        let mut evicted: Vec<AssetKey> = Vec::new();
        while self.used_bytes > self.budget.max_bytes {
            let pick = |exclude: Option<&AssetKey>| {
                self.entries
                    .iter()
                    .filter(|(k, e)| {
                        e.residency == Residency::Resident
                            && e.pin_count == 0
                            && exclude.is_none_or(|p| p != *k)
                    })
                    .min_by(|(ka, ea), (kb, eb)| {
                        ea.last_used_tick
                            .cmp(&eb.last_used_tick)
                            .then_with(|| ka.cmp(kb))
                    })
                    .map(|(k, _)| k.clone())
            };

            // The fresh entry goes last, and only if everything else is pinned.
            let Some(key) = pick(Some(protected)).or_else(|| pick(None)) else {
                return Err(CacheError::NoEvictableEntries);
            };

            self.invalidate(&key)?;
            evicted.push(key);
        }
        Ok(evicted)
    }
}
