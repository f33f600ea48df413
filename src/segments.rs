use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};

use crate::clock::Clock;
use crate::codec::MappedStoredEntry;
use crate::error::{BitcaskError, Result};
use crate::id::FileIdGenerator;
use crate::key::{BitcaskKey, KeyMapper};
use crate::segment::{AppendEntryResponse, Segment};

const SEGMENT_FILE_SUFFIX: &str = "_bitcask.data";

/// Where a merged record was rewritten to, keyed by the original key.
pub struct WriteBackResponse<K> {
    /// The key this record belongs to.
    pub key: K,
    /// Where the rewritten record landed.
    pub append_entry_response: AppendEntryResponse,
}

/// Manages one active (writable) segment and a map of inactive (sealed) segments,
/// handling rollover, bootstrap discovery, and multi-segment read/write-back.
pub struct Segments {
    active_segment: Segment,
    inactive_segments: HashMap<u64, Segment>,
    file_id_generator: FileIdGenerator,
    clock: Arc<dyn Clock>,
    max_segment_byte_size: u64,
    directory: PathBuf,
}

impl Segments {
    /// Creates a fresh active segment and scans `directory` for pre-existing segment
    /// files to attach as inactive segments.
    pub fn open(directory: impl Into<PathBuf>, max_segment_byte_size: u64, clock: Arc<dyn Clock>) -> Result<Self> {
        let directory = directory.into();
        let file_id_generator = FileIdGenerator::new(Arc::clone(&clock));
        let active_segment = Segment::create(file_id_generator.next(), &directory)?;

        let mut segments = Segments {
            active_segment,
            inactive_segments: HashMap::new(),
            file_id_generator,
            clock,
            max_segment_byte_size,
            directory,
        };
        segments.bootstrap()?;
        Ok(segments)
    }

    fn bootstrap(&mut self) -> Result<()> {
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let Some(file_id) = parse_segment_file_id(&file_name) else {
                continue;
            };
            if file_id != self.active_segment.file_id() {
                let segment = Segment::reload(file_id, &self.directory)?;
                self.inactive_segments.insert(file_id, segment);
            }
        }
        debug!(
            "bootstrapped {} inactive segment(s) from {}",
            self.inactive_segments.len(),
            self.directory.display()
        );
        Ok(())
    }

    /// Appends a live record for `key`, rolling the active segment over first if it
    /// has reached `max_segment_byte_size`.
    pub fn append<K: BitcaskKey>(&mut self, key: &K, value: &[u8]) -> Result<AppendEntryResponse> {
        self.maybe_rollover_active_segment()?;
        self.active_segment.append(&key.serialize(), value, 0, 0, self.clock.as_ref())
    }

    /// Appends a tombstone record for `key`, rolling the active segment over first if
    /// needed.
    pub fn append_delete<K: BitcaskKey>(&mut self, key: &K) -> Result<AppendEntryResponse> {
        self.maybe_rollover_active_segment()?;
        self.active_segment.append(&key.serialize(), b"", 1, 0, self.clock.as_ref())
    }

    /// Reads and decodes a single record from the segment identified by `file_id`.
    pub fn read(&self, file_id: u64, offset: i64, len: u32) -> Result<crate::codec::StoredEntry> {
        if self.active_segment.file_id() == file_id {
            return self.active_segment.read(offset, len);
        }
        self.inactive_segments
            .get(&file_id)
            .ok_or(BitcaskError::UnknownSegment { file_id })?
            .read(offset, len)
    }

    /// Reads up to `total_segments` inactive segments (order unspecified), fully
    /// decoded. Used by the merge worker to snapshot merge candidates.
    pub fn read_inactive_segments<K: BitcaskKey>(
        &self,
        total_segments: usize,
        key_mapper: &KeyMapper<K>,
    ) -> Result<(Vec<u64>, Vec<Vec<MappedStoredEntry<K>>>)> {
        let mut file_ids = Vec::with_capacity(total_segments);
        let mut contents = Vec::with_capacity(total_segments);

        for segment in self.inactive_segments.values().take(total_segments) {
            contents.push(segment.read_full(key_mapper)?);
            file_ids.push(segment.file_id());
        }

        Ok((file_ids, contents))
    }

    /// Reads every inactive segment, fully decoded.
    pub fn read_all_inactive_segments<K: BitcaskKey>(
        &self,
        key_mapper: &KeyMapper<K>,
    ) -> Result<(Vec<u64>, Vec<Vec<MappedStoredEntry<K>>>)> {
        self.read_inactive_segments(self.inactive_segments.len(), key_mapper)
    }

    /// Writes `changes` into one or more fresh inactive segments, preserving each
    /// entry's original timestamp. Rolls over into another fresh inactive segment
    /// whenever `max_segment_byte_size` is exceeded mid-write.
    pub fn write_back<K: BitcaskKey>(
        &mut self,
        changes: HashMap<K, MappedStoredEntry<K>>,
    ) -> Result<Vec<WriteBackResponse<K>>> {
        let mut target_id = self.file_id_generator.next();
        let mut target = Segment::create(target_id, &self.directory)?;

        let mut responses = Vec::with_capacity(changes.len());

        for (key, entry) in changes {
            let append_entry_response = target.append(
                &key.serialize(),
                &entry.value,
                if entry.deleted { 1 } else { 0 },
                entry.timestamp,
                self.clock.as_ref(),
            )?;
            responses.push(WriteBackResponse {
                key,
                append_entry_response,
            });

            if target.size_in_bytes() >= self.max_segment_byte_size {
                target.stop_writes();
                self.inactive_segments.insert(target_id, target);
                target_id = self.file_id_generator.next();
                target = Segment::create(target_id, &self.directory)?;
            }
        }

        self.inactive_segments.insert(target_id, target);
        Ok(responses)
    }

    /// Removes the active segment's file from disk.
    pub fn remove_active(&self) -> Result<()> {
        self.active_segment.remove()
    }

    /// Removes every inactive segment's file from disk.
    pub fn remove_all_inactive(&self) -> Result<()> {
        for segment in self.inactive_segments.values() {
            segment.remove()?;
        }
        Ok(())
    }

    /// Removes the inactive segments identified by `file_ids`, if present.
    pub fn remove(&mut self, file_ids: &[u64]) -> Result<()> {
        for file_id in file_ids {
            if let Some(segment) = self.inactive_segments.remove(file_id) {
                segment.remove()?;
            }
        }
        Ok(())
    }

    /// The file ids of every currently known inactive segment.
    pub fn inactive_segment_ids(&self) -> Vec<u64> {
        self.inactive_segments.keys().copied().collect()
    }

    /// Number of inactive segments currently tracked.
    pub fn inactive_segment_count(&self) -> usize {
        self.inactive_segments.len()
    }

    /// Fully decodes the inactive segment identified by `file_id`.
    pub fn read_inactive_segment_full<K: BitcaskKey>(
        &self,
        file_id: u64,
        key_mapper: &KeyMapper<K>,
    ) -> Result<Vec<MappedStoredEntry<K>>> {
        self.inactive_segments
            .get(&file_id)
            .ok_or(BitcaskError::UnknownSegment { file_id })?
            .read_full(key_mapper)
    }

    /// Flushes the active segment and every inactive segment to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.active_segment.sync()?;
        for segment in self.inactive_segments.values() {
            segment.sync()?;
        }
        Ok(())
    }

    /// Drops the active segment handle and clears the inactive map. The owning
    /// `KVStore` is expected to be unusable afterwards.
    pub fn shutdown(&mut self) {
        self.inactive_segments.clear();
        info!("segments shut down for {}", self.directory.display());
    }

    fn maybe_rollover_active_segment(&mut self) -> Result<()> {
        if self.active_segment.size_in_bytes() < self.max_segment_byte_size {
            return Ok(());
        }

        self.active_segment.stop_writes();
        let new_file_id = self.file_id_generator.next();
        let new_active = Segment::create(new_file_id, &self.directory)?;
        let sealed = std::mem::replace(&mut self.active_segment, new_active);
        let sealed_id = sealed.file_id();
        self.inactive_segments.insert(sealed_id, sealed);
        debug!("rolled over segment {sealed_id} to {new_file_id}");
        Ok(())
    }
}

fn parse_segment_file_id(file_name: &str) -> Option<u64> {
    let prefix = file_name.strip_suffix(SEGMENT_FILE_SUFFIX)?;
    prefix.parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::key::string_key_mapper;
    use tempfile::tempdir;

    fn open(dir: &Path, max_segment_byte_size: u64) -> Segments {
        Segments::open(dir, max_segment_byte_size, Arc::new(SystemClock::new())).unwrap()
    }

    #[test]
    fn append_and_read_on_the_active_segment() {
        let dir = tempdir().unwrap();
        let mut segments = open(dir.path(), 100);

        let response = segments.append(&"Key1".to_string(), b"Value 1").unwrap();
        let stored = segments.read(response.file_id, response.offset, response.entry_length).unwrap();

        assert_eq!(stored.key, b"Key1");
        assert_eq!(stored.value, b"Value 1");
    }

    #[test]
    fn append_rolls_over_once_the_size_threshold_is_reached() {
        let dir = tempdir().unwrap();
        let mut segments = open(dir.path(), 30);

        let r1 = segments
            .append(&"Key1".to_string(), b"This is a long value to store in the segment")
            .unwrap();
        let r2 = segments.append(&"Key2".to_string(), b"V2").unwrap();
        let r3 = segments.append(&"Key3".to_string(), b"V3").unwrap();

        assert_ne!(r1.file_id, r2.file_id);
        assert_eq!(r2.file_id, r3.file_id);

        assert_eq!(segments.read(r1.file_id, r1.offset, r1.entry_length).unwrap().key, b"Key1");
        assert_eq!(segments.read(r2.file_id, r2.offset, r2.entry_length).unwrap().key, b"Key2");
        assert_eq!(segments.read(r3.file_id, r3.offset, r3.entry_length).unwrap().key, b"Key3");
    }

    #[test]
    fn reading_an_unknown_segment_id_errors() {
        let dir = tempdir().unwrap();
        let segments = open(dir.path(), 100);
        let err = segments.read(212, 0, 10).unwrap_err();
        assert!(matches!(err, BitcaskError::UnknownSegment { file_id: 212 }));
    }

    #[test]
    fn a_delete_record_round_trips_through_segments() {
        let dir = tempdir().unwrap();
        let mut segments = open(dir.path(), 100);
        let response = segments.append_delete(&"Key1".to_string()).unwrap();
        let stored = segments.read(response.file_id, response.offset, response.entry_length).unwrap();
        assert!(stored.deleted);
        assert_eq!(stored.key, b"Key1");
    }

    #[test]
    fn reads_a_bounded_number_of_inactive_segments() {
        let dir = tempdir().unwrap();
        let mut segments = open(dir.path(), 8);
        segments.append(&"topic".to_string(), b"microservices").unwrap();
        segments.append(&"diskType".to_string(), b"solid state drive").unwrap();
        segments.append(&"engine".to_string(), b"bitcask").unwrap();

        let mapper = string_key_mapper();
        let (file_ids, contents) = segments.read_inactive_segments(2, &mapper).unwrap();
        assert_eq!(file_ids.len(), 2);
        assert_eq!(contents.len(), 2);
    }

    #[test]
    fn reads_every_inactive_segment() {
        let dir = tempdir().unwrap();
        let mut segments = open(dir.path(), 8);
        segments.append(&"topic".to_string(), b"microservices").unwrap();
        segments.append(&"diskType".to_string(), b"solid state drive").unwrap();
        segments.append(&"engine".to_string(), b"bitcask").unwrap();
        segments.append(&"language".to_string(), b"go language").unwrap();

        let mapper = string_key_mapper();
        let (_, contents) = segments.read_all_inactive_segments(&mapper).unwrap();
        assert_eq!(contents.len(), 3);
    }

    #[test]
    fn write_back_distributes_across_rollover_boundaries() {
        let dir = tempdir().unwrap();
        let mut segments = open(dir.path(), 8);

        let mut changes = HashMap::new();
        changes.insert(
            "disk".to_string(),
            MappedStoredEntry { key: "disk".to_string(), value: b"Solid State Drive".to_vec(), deleted: false, timestamp: 1, key_offset: 0, entry_length: 0 },
        );
        changes.insert(
            "engine".to_string(),
            MappedStoredEntry { key: "engine".to_string(), value: b"Bitcask Dummy Engine".to_vec(), deleted: false, timestamp: 1, key_offset: 0, entry_length: 0 },
        );
        changes.insert(
            "topic".to_string(),
            MappedStoredEntry { key: "topic".to_string(), value: b"Microservices".to_vec(), deleted: false, timestamp: 1, key_offset: 0, entry_length: 0 },
        );

        let responses = segments.write_back(changes).unwrap();
        assert_eq!(responses.len(), 3);

        let mapper = string_key_mapper();
        let mut all_keys: Vec<String> = Vec::new();
        for file_id in segments.inactive_segment_ids() {
            let entries = segments.read_inactive_segment_full(file_id, &mapper).unwrap();
            all_keys.extend(entries.into_iter().map(|e| e.key));
        }
        all_keys.sort();
        assert_eq!(all_keys, vec!["disk".to_string(), "engine".to_string(), "topic".to_string()]);
    }

    #[test]
    fn remove_drops_the_named_inactive_segment() {
        let dir = tempdir().unwrap();
        let mut segments = open(dir.path(), 8);
        let r1 = segments.append(&"topic".to_string(), b"Databases").unwrap();
        segments.append(&"disktype".to_string(), b"Solid State Disk").unwrap();
        segments.append(&"databaseType".to_string(), b"KV").unwrap();

        assert!(segments.inactive_segment_ids().contains(&r1.file_id));
        segments.remove(&[r1.file_id]).unwrap();
        assert!(!segments.inactive_segment_ids().contains(&r1.file_id));
    }
}
