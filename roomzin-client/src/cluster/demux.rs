//! Per-connection response demultiplexer.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use roomzin_core::protocol::ServerReply;

#[derive(Debug)]
struct DemuxEntry {
    reply: oneshot::Sender<ServerReply>,
    dispatched_at: Instant,
}

/// Maps in-flight correlation ids to their waiting reply sinks.
///
/// Keys are allocated from a per-handler atomic counter, so duplicates are
/// impossible. Entries leave the map on response arrival, on send failure,
/// or through the TTL sweep run by the dispatcher.
#[derive(Default, Debug)]
pub(crate) struct DemuxMap {
    entries: RwLock<HashMap<u32, DemuxEntry>>,
}

impl DemuxMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for `clr_id`, stamping the dispatch time.
    pub(crate) fn store(&self, clr_id: u32, reply: oneshot::Sender<ServerReply>) {
        let mut entries = self.entries.write().expect("demux lock poisoned");
        entries.insert(
            clr_id,
            DemuxEntry {
                reply,
                dispatched_at: Instant::now(),
            },
        );
    }

    /// Atomically removes and returns the waiter for `clr_id`.
    pub(crate) fn load_remove(
        &self,
        clr_id: u32,
    ) -> Option<(oneshot::Sender<ServerReply>, Instant)> {
        let mut entries = self.entries.write().expect("demux lock poisoned");
        entries
            .remove(&clr_id)
            .map(|e| (e.reply, e.dispatched_at))
    }

    /// Removes every entry older than `max_age`, dropping its sink.
    ///
    /// Dropping the sender wakes the waiter with a closed-channel error, so
    /// orphaned correlation ids cannot pin memory after a reader exit.
    /// Returns the number of reaped entries.
    pub(crate) fn cleanup(&self, max_age: Duration) -> usize {
        let Some(threshold) = Instant::now().checked_sub(max_age) else {
            return 0;
        };
        let mut entries = self.entries.write().expect("demux lock poisoned");
        let before = entries.len();
        entries.retain(|_, e| e.dispatched_at > threshold);
        before - entries.len()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.read().expect("demux lock poisoned").len()
    }
}
