use std::path::Path;

use crate::clock::Clock;
use crate::codec::{self, MappedStoredEntry, StoredEntry};
use crate::error::Result;
use crate::key::KeyMapper;
use crate::store::{segment_file_name, Store};

/// Where an [`Segment::append`] landed: which segment, at what offset, and how long
/// the encoded record was. Threaded through to the key directory so a later read can
/// find the record again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendEntryResponse {
    /// The segment the record was appended to.
    pub file_id: u64,
    /// The offset, within that segment, the record starts at.
    pub offset: i64,
    /// The encoded length of the record in bytes.
    pub entry_length: u32,
}

/// One log file: a [`Store`] plus its `file_id`. A segment is either active
/// (writable) or inactive (read-only, writer handle closed).
pub struct Segment {
    file_id: u64,
    store: Store,
}

impl Segment {
    /// Creates a brand new, writable segment with the given `file_id` inside
    /// `directory`.
    pub fn create(file_id: u64, directory: &Path) -> Result<Self> {
        let path = segment_file_name(file_id, directory);
        let store = Store::open(path)?;
        Ok(Segment { file_id, store })
    }

    /// Reopens a segment discovered at start-up. Only a reader handle is created:
    /// inactive segments found on disk never receive further writes.
    pub fn reload(file_id: u64, directory: &Path) -> Result<Self> {
        let path = segment_file_name(file_id, directory);
        let store = Store::reload(path)?;
        Ok(Segment { file_id, store })
    }

    /// This segment's file id.
    pub fn file_id(&self) -> u64 {
        self.file_id
    }

    /// Encodes and appends a record, returning where it landed.
    pub fn append(
        &mut self,
        key: &[u8],
        value: &[u8],
        tombstone: u8,
        timestamp: u32,
        clock: &dyn Clock,
    ) -> Result<AppendEntryResponse> {
        let encoded = codec::encode(key, value, tombstone, timestamp, clock);
        let entry_length = encoded.len() as u32;
        let offset = self.store.append(&encoded)?;
        Ok(AppendEntryResponse {
            file_id: self.file_id,
            offset: offset as i64,
            entry_length,
        })
    }

    /// Reads and decodes a single record at `(offset, len)`.
    pub fn read(&self, offset: i64, len: u32) -> Result<StoredEntry> {
        let bytes = self.store.read(offset as u64, len)?;
        codec::decode(&bytes)
    }

    /// Reads and decodes every record in the file, in on-disk order.
    pub fn read_full<K>(&self, key_mapper: &KeyMapper<K>) -> Result<Vec<MappedStoredEntry<K>>> {
        let bytes = self.store.read_full()?;
        codec::decode_multi(&bytes, key_mapper)
    }

    /// Current size of the segment file in bytes.
    pub fn size_in_bytes(&self) -> u64 {
        self.store.size_in_bytes()
    }

    /// Flushes the writer to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.store.sync()
    }

    /// Closes the write handle, sealing the segment as read-only.
    pub fn stop_writes(&mut self) {
        self.store.stop_writes();
    }

    /// Deletes the underlying file.
    pub fn remove(&self) -> Result<()> {
        self.store.remove()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::key::string_key_mapper;
    use tempfile::tempdir;

    #[test]
    fn append_then_read_a_single_entry() {
        let dir = tempdir().unwrap();
        let mut segment = Segment::create(0, dir.path()).unwrap();
        let clock = SystemClock::new();

        let response = segment
            .append(b"Topic", b"Bitcask DB", 0, 0, &clock)
            .unwrap();
        let stored = segment.read(response.offset, response.entry_length).unwrap();

        assert_eq!(stored.key, b"Topic");
        assert_eq!(stored.value, b"Bitcask DB");
        assert!(!stored.deleted);
    }

    #[test]
    fn append_survives_a_sync() {
        let dir = tempdir().unwrap();
        let mut segment = Segment::create(1, dir.path()).unwrap();
        let clock = SystemClock::new();

        let response = segment
            .append(b"Topic", b"Bitcask DB", 0, 0, &clock)
            .unwrap();
        segment.sync().unwrap();

        let stored = segment.read(response.offset, response.entry_length).unwrap();
        assert_eq!(stored.key, b"Topic");
        assert!(!stored.deleted);
    }

    #[test]
    fn two_entries_land_at_distinct_offsets() {
        let dir = tempdir().unwrap();
        let mut segment = Segment::create(2, dir.path()).unwrap();
        let clock = SystemClock::new();

        let first = segment.append(b"Key1", b"Value1", 0, 0, &clock).unwrap();
        let second = segment.append(b"Key2", b"Value2", 0, 0, &clock).unwrap();

        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, first.entry_length as i64);

        let stored = segment.read(second.offset, second.entry_length).unwrap();
        assert_eq!(stored.key, b"Key2");
    }

    #[test]
    fn delete_entries_decode_as_deleted() {
        let dir = tempdir().unwrap();
        let mut segment = Segment::create(4, dir.path()).unwrap();
        let clock = SystemClock::new();

        let response = segment.append(b"Key", b"", 1, 0, &clock).unwrap();
        let stored = segment.read(response.offset, response.entry_length).unwrap();

        assert_eq!(stored.key, b"Key");
        assert!(stored.deleted);
    }

    #[test]
    fn read_full_decodes_every_entry_in_order() {
        let dir = tempdir().unwrap();
        let mut segment = Segment::create(5, dir.path()).unwrap();
        let clock = SystemClock::new();
        segment.append(b"Key1", b"Value1", 0, 0, &clock).unwrap();
        segment.append(b"Key2", b"Value2", 0, 0, &clock).unwrap();

        let mapper = string_key_mapper();
        let entries = segment.read_full(&mapper).unwrap();
        assert_eq!(entries[0].key, "Key1");
        assert_eq!(entries[1].key, "Key2");
    }

    #[test]
    fn append_after_stop_writes_fails() {
        let dir = tempdir().unwrap();
        let mut segment = Segment::create(5, dir.path()).unwrap();
        let clock = SystemClock::new();
        let first = segment.append(b"Key1", b"Value1", 0, 0, &clock).unwrap();

        segment.stop_writes();
        assert!(segment.append(b"Key2", b"Value2", 0, 0, &clock).is_err());

        let stored = segment.read(first.offset, first.entry_length).unwrap();
        assert_eq!(stored.key, b"Key1");
    }
}
