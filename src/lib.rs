#![deny(missing_docs)]

//! An embeddable, single-process, log-structured key-value store in the Bitcask
//! family.
//!
//! Values are appended to an active log segment; a background [`MergeWorker`]
//! reclaims space by folding sealed segments together and dropping superseded
//! records. An in-memory key directory maps each live key straight to its
//! on-disk location so a [`KVStore::get`] never scans the log.
//!
//! ```no_run
//! use bitcask::{BitcaskConfig, KVStore, MergeConfig, string_key_mapper};
//!
//! let merge_config = MergeConfig::new(4, string_key_mapper());
//! let config = BitcaskConfig::new("/tmp/my-bitcask", 64 * 1024 * 1024, merge_config);
//! let store: KVStore<String> = KVStore::open(&config).unwrap();
//!
//! store.put(&"language".to_string(), b"rust").unwrap();
//! assert_eq!(store.get(&"language".to_string()).unwrap(), b"rust");
//! ```

mod clock;
mod codec;
mod config;
mod error;
mod id;
mod key;
mod key_directory;
mod kv_store;
mod merge_state;
mod merge_worker;
mod segment;
mod segments;
mod store;

pub use clock::{Clock, FixedClock, SteppingClock, SystemClock};
pub use codec::{MappedStoredEntry, StoredEntry};
pub use config::{BitcaskConfig, MergeConfig};
pub use error::{BitcaskError, Result};
pub use key::{string_key_mapper, BitcaskKey, KeyMapper};
pub use key_directory::Entry as KeyDirectoryEntry;
pub use kv_store::KVStore;
pub use merge_state::MergedState;
pub use merge_worker::MergeWorker;
pub use segment::AppendEntryResponse;
