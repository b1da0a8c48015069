//! Cluster runtime: connections, topology sync, and request dispatch.

mod connection;
mod demux;
mod discovery;
mod follower;
mod handler;
mod latency;
mod leader;

pub use discovery::Topology;

pub(crate) use connection::Connection;
pub(crate) use demux::DemuxMap;
pub(crate) use discovery::{ClusterDiscovery, HttpDiscovery};
pub(crate) use follower::FollowerHandler;
pub(crate) use handler::ClusterHandler;
pub(crate) use leader::LeaderHandler;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::oneshot;

use roomzin_core::protocol::{encode_frame, ServerReply};
use roomzin_core::Codecs;

/// Capacity of each handler's request channel.
pub(crate) const REQUEST_CHANNEL_CAPACITY: usize = 1024;

/// How often a send loop re-checks for a usable connection.
pub(crate) const CONN_WAIT_TICK: Duration = Duration::from_millis(100);

/// One queued request: the serialized payload and the caller's reply sink.
pub(crate) struct Request {
    pub payload: Bytes,
    pub reply: oneshot::Sender<ServerReply>,
}

/// Allocates a fresh correlation id, registers the reply sink in the
/// connection's demux, prepends the frame header, and enqueues the frame.
///
/// If the connection dies between selection and enqueue, the demux entry is
/// removed again so the caller observes a closed sink immediately instead of
/// waiting for the TTL sweep.
pub(crate) async fn dispatch(conn: &Arc<Connection>, counter: &AtomicU32, request: Request) {
    let clr_id = counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
    conn.demux().store(clr_id, request.reply);
    let frame = encode_frame(clr_id, &request.payload);
    if conn.enqueue(frame).await.is_err() {
        conn.demux().load_remove(clr_id);
    }
}

/// Per-client cell holding the server-published codec table.
///
/// The leader sync loop clears it on every reconnect; readers observing an
/// empty cell refetch transparently.
#[derive(Default)]
pub(crate) struct CodecCache {
    inner: RwLock<Option<Arc<Codecs>>>,
}

impl CodecCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self) -> Option<Arc<Codecs>> {
        self.inner.read().expect("codec cache lock poisoned").clone()
    }

    pub(crate) fn set(&self, codecs: Arc<Codecs>) {
        *self.inner.write().expect("codec cache lock poisoned") = Some(codecs);
    }

    pub(crate) fn invalidate(&self) {
        *self.inner.write().expect("codec cache lock poisoned") = None;
    }
}
