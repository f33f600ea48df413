//! Background compaction: periodically folds inactive segments through
//! [`MergedState`] and writes the survivors back into fresh segments.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Sender};
use log::{debug, error, info, warn};

use crate::config::MergeConfig;
use crate::key::BitcaskKey;
use crate::kv_store::KVStore;
use crate::merge_state::MergedState;

/// Fewer than this many inactive segments in a snapshot isn't worth merging;
/// the worker silently skips the tick.
const MIN_SEGMENTS_TO_MERGE: usize = 3;

/// Runs [`MergeConfig::run_merge_every`] on a dedicated background thread, folding
/// inactive segments from a [`KVStore`] and writing the survivors back.
///
/// Holds a non-owning [`Arc`] reference to the store: the worker must be stopped
/// before the store itself is shut down.
pub struct MergeWorker {
    quit: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl MergeWorker {
    /// Spawns the worker thread and starts ticking immediately.
    pub fn start<K: BitcaskKey>(store: Arc<KVStore<K>>, merge_config: MergeConfig<K>) -> Self {
        let (quit_tx, quit_rx) = channel::bounded::<()>(0);
        let ticker = channel::tick(merge_config.run_merge_every());

        let handle = thread::Builder::new()
            .name("bitcask-merge-worker".to_string())
            .spawn(move || loop {
                channel::select! {
                    recv(ticker) -> _ => {
                        if let Err(err) = run_merge_tick(&store, &merge_config) {
                            error!("merge tick failed: {err}");
                        }
                    }
                    recv(quit_rx) -> _ => {
                        debug!("merge worker received stop signal, exiting");
                        return;
                    }
                }
            })
            .expect("failed to spawn merge worker thread");

        MergeWorker {
            quit: quit_tx,
            handle: Some(handle),
        }
    }

    /// Signals the worker to stop after its current tick (if any) completes, then
    /// joins the thread. Idempotent: calling `stop` twice is a no-op the second time.
    pub fn stop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        let _ = self.quit.send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("merge worker thread panicked while shutting down");
            }
        }
    }
}

impl Drop for MergeWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_merge_tick<K: BitcaskKey>(store: &KVStore<K>, merge_config: &MergeConfig<K>) -> crate::error::Result<()> {
    let (file_ids, snapshots) = if merge_config.should_read_all_segments() {
        store.read_all_inactive_segments(merge_config.key_mapper())?
    } else {
        store.read_inactive_segments(merge_config.total_segments_to_read(), merge_config.key_mapper())?
    };

    if snapshots.len() < MIN_SEGMENTS_TO_MERGE {
        debug!("merge tick skipped: only {} inactive segment(s) in snapshot", snapshots.len());
        return Ok(());
    }

    let mut iter = snapshots.into_iter();
    let mut merged = MergedState::new();
    merged.take_all(iter.next().expect("snapshot has more than two entries"));
    for snapshot in iter {
        merged.merge_with(snapshot);
    }

    let survivor_count = merged.value_by_key().len();
    store.write_back(&file_ids, merged.into_value_by_key())?;
    info!(
        "merge tick folded {} segment(s) into {} surviving key(s)",
        file_ids.len(),
        survivor_count
    );
    Ok(())
}
