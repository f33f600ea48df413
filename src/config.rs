//! Construction surface for [`crate::kv_store::KVStore`] and its background
//! [`crate::merge_worker::MergeWorker`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::key::{BitcaskKey, KeyMapper};

const DEFAULT_RUN_MERGE_EVERY: Duration = Duration::from_secs(5 * 60);

/// How the merge worker selects which inactive segments to fold on each tick.
#[derive(Clone)]
pub struct MergeConfig<K: BitcaskKey> {
    total_segments_to_read: usize,
    should_read_all_segments: bool,
    key_mapper: KeyMapper<K>,
    run_merge_every: Duration,
}

impl<K: BitcaskKey> MergeConfig<K> {
    /// Reads a fixed number of inactive segments per tick, ticking every 5 minutes.
    pub fn new(total_segments_to_read: usize, key_mapper: KeyMapper<K>) -> Self {
        MergeConfig {
            total_segments_to_read,
            should_read_all_segments: false,
            key_mapper,
            run_merge_every: DEFAULT_RUN_MERGE_EVERY,
        }
    }

    /// Reads a fixed number of inactive segments per tick, on a custom interval.
    pub fn with_duration(total_segments_to_read: usize, run_merge_every: Duration, key_mapper: KeyMapper<K>) -> Self {
        MergeConfig {
            total_segments_to_read,
            should_read_all_segments: false,
            key_mapper,
            run_merge_every,
        }
    }

    /// Reads every inactive segment on each tick, ticking every 5 minutes.
    pub fn with_all_segments(key_mapper: KeyMapper<K>) -> Self {
        MergeConfig {
            total_segments_to_read: 0,
            should_read_all_segments: true,
            key_mapper,
            run_merge_every: DEFAULT_RUN_MERGE_EVERY,
        }
    }

    /// Reads every inactive segment on each tick, on a custom interval.
    pub fn with_all_segments_and_duration(run_merge_every: Duration, key_mapper: KeyMapper<K>) -> Self {
        MergeConfig {
            total_segments_to_read: 0,
            should_read_all_segments: true,
            key_mapper,
            run_merge_every,
        }
    }

    /// Number of inactive segments folded per tick, when not reading all of them.
    pub fn total_segments_to_read(&self) -> usize {
        self.total_segments_to_read
    }

    /// Whether every merge tick folds all inactive segments, ignoring
    /// [`Self::total_segments_to_read`].
    pub fn should_read_all_segments(&self) -> bool {
        self.should_read_all_segments
    }

    /// The injected function mapping raw key bytes back to a typed `K`.
    pub fn key_mapper(&self) -> &KeyMapper<K> {
        &self.key_mapper
    }

    /// The interval between merge ticks.
    pub fn run_merge_every(&self) -> Duration {
        self.run_merge_every
    }
}

/// Construction options for [`crate::kv_store::KVStore`].
#[derive(Clone)]
pub struct BitcaskConfig<K: BitcaskKey> {
    directory: PathBuf,
    max_segment_size_bytes: u64,
    merge_config: MergeConfig<K>,
    clock: Arc<dyn Clock>,
}

impl<K: BitcaskKey> BitcaskConfig<K> {
    /// A config using the system wall clock.
    pub fn new(directory: impl Into<PathBuf>, max_segment_size_bytes: u64, merge_config: MergeConfig<K>) -> Self {
        BitcaskConfig::with_clock(directory, max_segment_size_bytes, merge_config, Arc::new(SystemClock::new()))
    }

    /// A config using an injected clock, primarily for deterministic tests.
    pub fn with_clock(
        directory: impl Into<PathBuf>,
        max_segment_size_bytes: u64,
        merge_config: MergeConfig<K>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        BitcaskConfig {
            directory: directory.into(),
            max_segment_size_bytes,
            merge_config,
            clock,
        }
    }

    /// The segment directory. Must already exist and be writable.
    pub fn directory(&self) -> &PathBuf {
        &self.directory
    }

    /// The threshold, in bytes, at or above which the active segment is sealed.
    pub fn max_segment_size_in_bytes(&self) -> u64 {
        self.max_segment_size_bytes
    }

    /// The injected time source.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// The merge worker's configuration.
    pub fn merge_config(&self) -> &MergeConfig<K> {
        &self.merge_config
    }
}
