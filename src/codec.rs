//! Binary framing for a single log record.
//!
//! ```text
//! ┌───────────┬──────────┬────────────┬─────┬──────────────────────┐
//! │ timestamp │ key_size │ value_size │ key │ value_bytes ‖ tomb   │
//! │  4 bytes  │ 4 bytes  │ 4 bytes    │  *  │ value_size bytes     │
//! └───────────┴──────────┴────────────┴─────┴──────────────────────┘
//! ```
//!
//! All multi-byte integers are little-endian. `value_size` includes the trailing
//! one-byte tombstone marker: bit 0 set means the record is a delete.

use crate::clock::Clock;
use crate::error::{BitcaskError, Result};
use crate::key::KeyMapper;

const TIMESTAMP_SIZE: usize = 4;
const KEY_SIZE_SIZE: usize = 4;
const VALUE_SIZE_SIZE: usize = 4;
const HEADER_SIZE: usize = TIMESTAMP_SIZE + KEY_SIZE_SIZE + VALUE_SIZE_SIZE;
const TOMBSTONE_MARKER_SIZE: usize = 1;

/// A single record decoded from the log, with raw key bytes (not yet mapped to a
/// typed key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// The record's key, as the raw bytes stored on disk.
    pub key: Vec<u8>,
    /// The record's value, with the tombstone marker already stripped off.
    pub value: Vec<u8>,
    /// Whether this record is a tombstone (delete marker).
    pub deleted: bool,
    /// The low 32 bits of the nanosecond timestamp the record was written with.
    pub timestamp: u32,
}

/// A [`StoredEntry`] with its key mapped to a typed `K`, plus its location within the
/// segment it was decoded from. Produced by [`decode_multi`] during full-segment
/// scans (reload, merge).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedStoredEntry<K> {
    /// The record's key, mapped from raw bytes via the injected [`KeyMapper`].
    pub key: K,
    /// The record's value, with the tombstone marker already stripped off.
    pub value: Vec<u8>,
    /// Whether this record is a tombstone (delete marker).
    pub deleted: bool,
    /// The low 32 bits of the nanosecond timestamp the record was written with.
    pub timestamp: u32,
    /// Offset, within the segment file, that this record starts at.
    pub key_offset: u32,
    /// Total encoded length of this record in bytes.
    pub entry_length: u32,
}

/// Encodes a record. If `timestamp` is `0`, the low 32 bits of `clock.now_nanos()`
/// are substituted at encode time; otherwise `timestamp` is preserved verbatim (used
/// by merge write-back to round-trip the original timestamp).
pub fn encode(key: &[u8], value: &[u8], tombstone: u8, timestamp: u32, clock: &dyn Clock) -> Vec<u8> {
    let key_size = key.len() as u32;
    let value_size = value.len() as u32 + TOMBSTONE_MARKER_SIZE as u32;
    let total_size = HEADER_SIZE + key.len() + value.len() + TOMBSTONE_MARKER_SIZE;

    let mut encoded = Vec::with_capacity(total_size);
    let effective_timestamp = if timestamp == 0 {
        clock.now_nanos() as u32
    } else {
        timestamp
    };
    encoded.extend_from_slice(&effective_timestamp.to_le_bytes());
    encoded.extend_from_slice(&key_size.to_le_bytes());
    encoded.extend_from_slice(&value_size.to_le_bytes());
    encoded.extend_from_slice(key);
    encoded.extend_from_slice(value);
    encoded.push(tombstone);

    encoded
}

/// Decodes a single record starting at the beginning of `bytes`.
pub fn decode(bytes: &[u8]) -> Result<StoredEntry> {
    let (entry, _) = decode_at(bytes, 0)?;
    Ok(entry)
}

/// Decodes a single record starting at `offset` within `bytes`, returning the entry
/// and the offset immediately after it.
fn decode_at(bytes: &[u8], offset: usize) -> Result<(StoredEntry, usize)> {
    let need_header = offset + HEADER_SIZE;
    if bytes.len() < need_header {
        return Err(BitcaskError::DecodeOverrun {
            offset: offset as u64,
            needed: HEADER_SIZE as u64,
            available: bytes.len().saturating_sub(offset) as u64,
        });
    }

    let mut cursor = offset;
    let timestamp = read_u32(bytes, cursor);
    cursor += TIMESTAMP_SIZE;
    let key_size = read_u32(bytes, cursor) as usize;
    cursor += KEY_SIZE_SIZE;
    let value_size = read_u32(bytes, cursor) as usize;
    cursor += VALUE_SIZE_SIZE;

    let need_body = cursor + key_size + value_size;
    if bytes.len() < need_body {
        return Err(BitcaskError::DecodeOverrun {
            offset: offset as u64,
            needed: (need_body - offset) as u64,
            available: (bytes.len() - offset) as u64,
        });
    }

    let key = bytes[cursor..cursor + key_size].to_vec();
    cursor += key_size;
    let value_with_tombstone = &bytes[cursor..cursor + value_size];
    cursor += value_size;

    let tombstone_byte = value_with_tombstone[value_size - 1];
    let value = value_with_tombstone[..value_size - 1].to_vec();

    Ok((
        StoredEntry {
            key,
            value,
            deleted: tombstone_byte & 0x01 == 0x01,
            timestamp,
        },
        cursor,
    ))
}

/// Walks `bytes` from offset 0, decoding records back to back until the buffer is
/// exhausted, mapping each record's key via `key_mapper`.
///
/// A record that would read past the end of the buffer is a fatal decode error — no
/// partial trailing record is ever tolerated.
pub fn decode_multi<K>(bytes: &[u8], key_mapper: &KeyMapper<K>) -> Result<Vec<MappedStoredEntry<K>>> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let key_offset = offset;
        let (entry, next_offset) = decode_at(bytes, offset)?;
        let entry_length = (next_offset - key_offset) as u32;
        entries.push(MappedStoredEntry {
            key: key_mapper(&entry.key),
            value: entry.value,
            deleted: entry.deleted,
            timestamp: entry.timestamp,
            key_offset: key_offset as u32,
            entry_length,
        });
        offset = next_offset;
    }

    Ok(entries)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(bytes[offset..offset + 4].try_into().expect("4-byte slice"))
}
