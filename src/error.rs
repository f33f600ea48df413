use std::io;
use thiserror::Error;

/// Error type for engine operations.
#[derive(Error, Debug)]
pub enum BitcaskError {
    /// IO error from file operations (open/read/write/sync/delete).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// `Store::append` wrote fewer bytes than requested.
    #[error("short write: wrote {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes actually written.
        written: usize,
        /// Bytes requested to be written.
        expected: usize,
    },

    /// A positional read returned fewer bytes than requested.
    #[error("short read: read {read} of {expected} bytes at offset {offset}")]
    ShortRead {
        /// Bytes actually read.
        read: usize,
        /// Bytes requested to be read.
        expected: usize,
        /// Offset the read started at.
        offset: u64,
    },

    /// `Segments::read` was asked to read from a file id that is neither the active
    /// segment nor a known inactive segment.
    #[error("invalid fileId {file_id}")]
    UnknownSegment {
        /// The unrecognized segment id.
        file_id: u64,
    },

    /// `KVStore::get` was called with a key absent from the key directory.
    #[error("key not present in store")]
    KeyNotFound,

    /// A segment file ended in the middle of a record during a full scan.
    ///
    /// Fatal to reload: the engine has no checksums to tell a torn write from
    /// corruption, so it refuses to open rather than silently drop the tail.
    #[error(
        "decode overrun: record at offset {offset} needs {needed} bytes but only {available} remain"
    )]
    DecodeOverrun {
        /// Offset the truncated record starts at.
        offset: u64,
        /// Bytes the record header claims it needs.
        needed: u64,
        /// Bytes actually available in the buffer.
        available: u64,
    },

    /// An internal lock was poisoned by a panicking thread.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, BitcaskError>;
