//! The in-memory index mapping keys to their most recent on-disk location.
//!
//! `KeyDirectory` itself is not generic over the key type: keys are stored
//! serialized (`Vec<u8>`) so the directory can be reused across differently-typed
//! `KVStore<K>` instances without monomorphizing the whole index. Type-parameterized
//! methods accept a `BitcaskKey` and serialize it on the way in.

use std::collections::HashMap;

use crate::codec::MappedStoredEntry;
use crate::key::BitcaskKey;
use crate::segment::AppendEntryResponse;
use crate::segments::WriteBackResponse;

/// Where a live key's most recent record lives: which segment, what offset, how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// The segment the record was written to.
    pub file_id: u64,
    /// The offset, within that segment, the record starts at.
    pub offset: i64,
    /// The encoded length of the record in bytes.
    pub entry_length: u32,
}

impl From<AppendEntryResponse> for Entry {
    fn from(response: AppendEntryResponse) -> Self {
        Entry {
            file_id: response.file_id,
            offset: response.offset,
            entry_length: response.entry_length,
        }
    }
}

/// The live key index: serialized key bytes to their current location.
#[derive(Default)]
pub struct KeyDirectory {
    entries: HashMap<Vec<u8>, Entry>,
}

impl KeyDirectory {
    /// An empty key directory.
    pub fn new() -> Self {
        KeyDirectory { entries: HashMap::new() }
    }

    /// Records `key`'s new location, overwriting whatever was there before.
    pub fn put<K: BitcaskKey>(&mut self, key: &K, response: AppendEntryResponse) {
        self.entries.insert(key.serialize(), response.into());
    }

    /// Looks up `key`'s current location, if it is live.
    pub fn get<K: BitcaskKey>(&self, key: &K) -> Option<Entry> {
        self.entries.get(&key.serialize()).copied()
    }

    /// Removes `key` from the directory, as if it had never been written. Used after
    /// a tombstone is appended: the directory never stores tombstones, it simply
    /// forgets the key.
    pub fn delete<K: BitcaskKey>(&mut self, key: &K) {
        self.entries.remove(&key.serialize());
    }

    /// Number of live keys currently tracked.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory currently tracks no live keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies a bootstrap scan's worth of records (in on-disk, and therefore
    /// chronological, order) from a single segment discovered at `file_id`.
    ///
    /// Every record is `Put` unconditionally, tombstones included: a tombstone still
    /// produces a directory entry pointing at its own offset, since the next decode of
    /// that offset will report `deleted = true` anyway. Callers must invoke this once
    /// per segment, iterating segments in ascending `file_id` order, so that
    /// cross-segment overwrites resolve correctly.
    pub fn reload<K: BitcaskKey>(&mut self, file_id: u64, entries: &[MappedStoredEntry<K>]) {
        for entry in entries {
            self.entries.insert(
                entry.key.serialize(),
                Entry {
                    file_id,
                    offset: entry.key_offset as i64,
                    entry_length: entry.entry_length,
                },
            );
        }
    }

    /// Applies the outcome of a merge write-back: every surviving key is repointed at
    /// its new location in the freshly written segment(s), in one atomic step.
    pub fn bulk_update<K: BitcaskKey>(&mut self, changes: &[WriteBackResponse<K>]) {
        for change in changes {
            self.entries.insert(
                change.key.serialize(),
                change.append_entry_response.into(),
            );
        }
    }

}
