//! Composes [`Segments`] and [`KeyDirectory`] behind a single reader/writer lock into
//! the engine's public surface.

use std::collections::HashMap;
use std::sync::RwLock;

use log::warn;

use crate::codec::MappedStoredEntry;
use crate::config::BitcaskConfig;
use crate::error::{BitcaskError, Result};
use crate::key::BitcaskKey;
use crate::key_directory::KeyDirectory;
use crate::segments::Segments;

struct Inner {
    segments: Segments,
    key_directory: KeyDirectory,
}

/// An embeddable, single-process, log-structured key-value store.
///
/// Every public operation, including reads, acquires the internal lock in exclusive
/// mode — matching the floor documented for this engine: a reader must never observe
/// a key directory entry whose pointed-to bytes have already been removed by a
/// concurrent merge.
pub struct KVStore<K: BitcaskKey> {
    inner: RwLock<Inner>,
    _key: std::marker::PhantomData<K>,
}

impl<K: BitcaskKey> KVStore<K> {
    /// Opens (or creates) a store at `config.directory()`, bootstrapping its segment
    /// set and reloading the key directory from every inactive segment found, in
    /// ascending file-id order.
    pub fn open(config: &BitcaskConfig<K>) -> Result<Self> {
        let segments = Segments::open(config.directory(), config.max_segment_size_in_bytes(), config.clock())?;
        let mut key_directory = KeyDirectory::new();

        let mut file_ids = segments.inactive_segment_ids();
        file_ids.sort_unstable();
        for file_id in file_ids {
            let entries: Vec<MappedStoredEntry<K>> =
                segments.read_inactive_segment_full(file_id, config.merge_config().key_mapper())?;
            key_directory.reload(file_id, &entries);
        }

        Ok(KVStore {
            inner: RwLock::new(Inner { segments, key_directory }),
            _key: std::marker::PhantomData,
        })
    }

    /// Appends `value` for `key` and records its location in the key directory.
    pub fn put(&self, key: &K, value: &[u8]) -> Result<()> {
        let mut inner = self.lock_mut()?;
        let response = inner.segments.append(key, value)?;
        inner.key_directory.put(key, response);
        Ok(())
    }

    /// Append-only semantics make update identical to put: a new record always
    /// supersedes whatever was there before.
    pub fn update(&self, key: &K, value: &[u8]) -> Result<()> {
        self.put(key, value)
    }

    /// Appends a tombstone for `key` and forgets its location in the key directory.
    /// The tombstone remains physically on disk until merged away.
    pub fn delete(&self, key: &K) -> Result<()> {
        let mut inner = self.lock_mut()?;
        inner.segments.append_delete(key)?;
        inner.key_directory.delete(key);
        Ok(())
    }

    /// Resolves `key`'s current value. Returns [`BitcaskError::KeyNotFound`] if the
    /// key directory has no entry for it.
    pub fn get(&self, key: &K) -> Result<Vec<u8>> {
        let inner = self.lock_mut()?;
        let entry = inner.key_directory.get(key).ok_or(BitcaskError::KeyNotFound)?;
        let stored = inner.segments.read(entry.file_id, entry.offset, entry.entry_length)?;
        Ok(stored.value)
    }

    /// Resolves `key`'s current value, returning `None` rather than an error on a
    /// miss or an underlying read failure.
    pub fn silent_get(&self, key: &K) -> Option<Vec<u8>> {
        let inner = self.lock_mut().ok()?;
        let entry = inner.key_directory.get(key)?;
        match inner.segments.read(entry.file_id, entry.offset, entry.entry_length) {
            Ok(stored) => Some(stored.value),
            Err(err) => {
                warn!("silent_get swallowed a read failure: {err}");
                None
            }
        }
    }

    /// Reads up to `total_segments` inactive segments, fully decoded. Used by the
    /// merge worker to snapshot merge candidates.
    pub fn read_inactive_segments(
        &self,
        total_segments: usize,
        key_mapper: &crate::key::KeyMapper<K>,
    ) -> Result<(Vec<u64>, Vec<Vec<MappedStoredEntry<K>>>)> {
        let inner = self.lock_mut()?;
        inner.segments.read_inactive_segments(total_segments, key_mapper)
    }

    /// Reads every inactive segment, fully decoded.
    pub fn read_all_inactive_segments(
        &self,
        key_mapper: &crate::key::KeyMapper<K>,
    ) -> Result<(Vec<u64>, Vec<Vec<MappedStoredEntry<K>>>)> {
        let inner = self.lock_mut()?;
        inner.segments.read_all_inactive_segments(key_mapper)
    }

    /// Writes merge survivors into fresh segments, re-points the key directory at
    /// the new locations, then removes `old_file_ids`. Ordering matters: the
    /// directory is repointed before the old segments are deleted, so no reader can
    /// ever resolve to a removed file.
    pub fn write_back(&self, old_file_ids: &[u64], changes: HashMap<K, MappedStoredEntry<K>>) -> Result<()> {
        let mut inner = self.lock_mut()?;
        let responses = inner.segments.write_back(changes)?;
        inner.key_directory.bulk_update(&responses);
        inner.segments.remove(old_file_ids)?;
        Ok(())
    }

    /// File ids of every inactive segment currently tracked.
    pub fn inactive_segment_ids(&self) -> Result<Vec<u64>> {
        let inner = self.lock_mut()?;
        Ok(inner.segments.inactive_segment_ids())
    }

    /// Number of inactive segments currently tracked.
    pub fn inactive_segment_count(&self) -> Result<usize> {
        let inner = self.lock_mut()?;
        Ok(inner.segments.inactive_segment_count())
    }

    /// Flushes every segment to stable storage.
    pub fn sync(&self) -> Result<()> {
        let inner = self.lock_mut()?;
        inner.segments.sync()
    }

    /// Drops the active segment handle and clears the inactive map. The store is
    /// expected to be unusable afterwards.
    pub fn shutdown(&self) -> Result<()> {
        let mut inner = self.lock_mut()?;
        inner.segments.sync()?;
        inner.segments.shutdown();
        Ok(())
    }

    /// Removes every segment file from disk. Intended for test teardown.
    pub fn clear(&self) -> Result<()> {
        let inner = self.lock_mut()?;
        inner.segments.remove_all_inactive()?;
        inner.segments.remove_active()?;
        Ok(())
    }

    fn lock_mut(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| BitcaskError::LockPoisoned("KVStore lock poisoned by a panicking thread".to_string()))
    }
}

impl Inner {}
