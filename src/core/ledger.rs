//! Deduplication ledger
//!
//! Fixed-capacity FIFO of asset ids that already produced an alert. Lives in
//! process memory only: a restart starts with an empty ledger.

use std::collections::{HashSet, VecDeque};

/// Default number of remembered assets
pub const DEFAULT_LEDGER_CAPACITY: usize = 30;

/// Bounded memory of previously alerted asset ids, oldest evicted first
#[derive(Debug, Clone)]
pub struct DedupLedger {
    entries: VecDeque<String>,
    capacity: usize,
}

impl DedupLedger {
    /// Create an empty ledger. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, asset_id: &str) -> bool {
        self.entries.iter().any(|id| id == asset_id)
    }

    /// Append an asset id, evicting the oldest entries past capacity.
    ///
    /// Recording an id that is already present moves it to the newest slot.
    pub fn record(&mut self, asset_id: impl Into<String>) {
        let asset_id = asset_id.into();
        self.entries.retain(|id| *id != asset_id);
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(asset_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Owned copy of the ids, handed to source adapters
    pub fn snapshot(&self) -> HashSet<String> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for DedupLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAPACITY)
    }
}
