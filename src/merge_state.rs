//! Pure in-memory reducer that folds several segment snapshots into a single
//! keep-set, resolving overwrites and deletions by timestamp.

use std::collections::HashMap;

use crate::codec::MappedStoredEntry;
use crate::key::BitcaskKey;

/// Accumulates survivors (`value_by_key`) and pending tombstones (`deleted_keys`)
/// across one or more segment snapshots folded in sequence.
pub struct MergedState<K: BitcaskKey> {
    value_by_key: HashMap<K, MappedStoredEntry<K>>,
    deleted_keys: HashMap<K, MappedStoredEntry<K>>,
}

impl<K: BitcaskKey> MergedState<K> {
    /// An empty merged state.
    pub fn new() -> Self {
        MergedState {
            value_by_key: HashMap::new(),
            deleted_keys: HashMap::new(),
        }
    }

    /// The first fold: every live entry is taken as-is, every tombstone is
    /// remembered as-is. Call once with the first snapshot, then [`Self::merge_with`]
    /// for every subsequent one.
    pub fn take_all(&mut self, entries: Vec<MappedStoredEntry<K>>) {
        for entry in entries {
            if entry.deleted {
                self.deleted_keys.insert(entry.key.clone(), entry);
            } else {
                self.value_by_key.insert(entry.key.clone(), entry);
            }
        }
    }

    /// Folds a subsequent snapshot in, resolving each incoming entry against
    /// whatever is already known for its key by comparing timestamps.
    pub fn merge_with(&mut self, entries: Vec<MappedStoredEntry<K>>) {
        for entry in entries {
            if let Some(existing) = self.value_by_key.get(&entry.key) {
                if entry.timestamp > existing.timestamp {
                    if entry.deleted {
                        let key = entry.key.clone();
                        self.value_by_key.remove(&key);
                        self.deleted_keys.insert(key, entry);
                    } else {
                        self.value_by_key.insert(entry.key.clone(), entry);
                    }
                }
                continue;
            }

            if let Some(existing) = self.deleted_keys.get(&entry.key) {
                if entry.timestamp > existing.timestamp && !entry.deleted {
                    let key = entry.key.clone();
                    self.deleted_keys.remove(&key);
                    self.value_by_key.insert(key, entry);
                }
                continue;
            }

            if entry.deleted {
                self.deleted_keys.insert(entry.key.clone(), entry);
            } else {
                self.value_by_key.insert(entry.key.clone(), entry);
            }
        }
    }

    /// Convenience for folding exactly two snapshots: `take_all(a)` then
    /// `merge_with(b)`.
    pub fn merge(&mut self, a: Vec<MappedStoredEntry<K>>, b: Vec<MappedStoredEntry<K>>) {
        self.take_all(a);
        self.merge_with(b);
    }

    /// The surviving live entries, consumed for write-back. Tombstones are
    /// intentionally dropped: a key with no live record anywhere in the merged
    /// window has nothing to write forward.
    pub fn into_value_by_key(self) -> HashMap<K, MappedStoredEntry<K>> {
        self.value_by_key
    }

    /// Borrow of the current survivor set, for inspection in tests.
    pub fn value_by_key(&self) -> &HashMap<K, MappedStoredEntry<K>> {
        &self.value_by_key
    }
}

impl<K: BitcaskKey> Default for MergedState<K> {
    fn default() -> Self {
        Self::new()
    }
}
