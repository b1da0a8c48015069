//! The leader handler: exactly one connection, re-established on failure.

use std::sync::atomic::AtomicU32;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use roomzin_core::Result;

use super::connection::Connection;
use super::demux::DemuxMap;
use super::discovery::ClusterDiscovery;
use super::{dispatch, CodecCache, Request, CONN_WAIT_TICK, REQUEST_CHANNEL_CAPACITY};
use crate::config::ClientConfig;

/// First pause between failed sync attempts.
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
/// Backoff ceiling.
const MAX_BACKOFF: Duration = Duration::from_secs(2);
/// Jitter added to every sync pause, in milliseconds.
const MAX_JITTER_MS: u64 = 50;

/// Maintains the single current leader connection.
///
/// The demux map outlives individual connections so that replies racing a
/// reconnect still find their waiters.
pub(crate) struct LeaderHandler {
    cfg: Arc<ClientConfig>,
    discovery: Arc<dyn ClusterDiscovery>,
    codec_cache: Arc<CodecCache>,
    req_tx: mpsc::Sender<Request>,
    conn: RwLock<Option<Arc<Connection>>>,
    demux: Arc<DemuxMap>,
    clr_id: AtomicU32,
}

impl LeaderHandler {
    pub(crate) fn new(
        cfg: Arc<ClientConfig>,
        discovery: Arc<dyn ClusterDiscovery>,
        codec_cache: Arc<CodecCache>,
    ) -> (Arc<Self>, mpsc::Receiver<Request>) {
        let (req_tx, req_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let handler = Arc::new(Self {
            cfg,
            discovery,
            codec_cache,
            req_tx,
            conn: RwLock::new(None),
            demux: Arc::new(DemuxMap::new()),
            clr_id: AtomicU32::new(0),
        });
        (handler, req_rx)
    }

    pub(crate) fn request_sender(&self) -> mpsc::Sender<Request> {
        self.req_tx.clone()
    }

    pub(crate) fn connection(&self) -> Option<Arc<Connection>> {
        self.conn.read().expect("leader lock poisoned").clone()
    }

    pub(crate) fn demux(&self) -> &Arc<DemuxMap> {
        &self.demux
    }

    /// Publishes a new connection, closing the one it replaces.
    fn publish(&self, conn: Arc<Connection>) {
        let prev = self.conn.write().expect("leader lock poisoned").replace(conn);
        if let Some(prev) = prev {
            prev.close();
        }
    }

    async fn reconnect(&self) -> Result<String> {
        let topology = self.discovery.discover().await?;
        let conn =
            Connection::open(&topology.leader, &self.cfg, self.demux.clone(), false).await?;
        self.publish(conn);
        Ok(topology.leader)
    }

    /// Re-establishes the leader connection whenever it is absent or closed.
    pub(crate) async fn sync_loop(self: Arc<Self>, shutdown: CancellationToken) {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            if shutdown.is_cancelled() {
                return;
            }

            let healthy = self.connection().is_some_and(|c| !c.is_closed());
            if !healthy {
                // The codec table belongs to the previous leader session.
                self.codec_cache.invalidate();
                match self.reconnect().await {
                    Ok(leader) => {
                        tracing::info!(leader = %leader, "leader connection established");
                        backoff = INITIAL_BACKOFF;
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "leader sync failed");
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                    }
                }
            }

            let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..MAX_JITTER_MS));
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(backoff + jitter) => {}
            }
        }
    }

    /// Drains the request channel onto the current connection.
    pub(crate) async fn send_loop(
        self: Arc<Self>,
        mut req_rx: mpsc::Receiver<Request>,
        shutdown: CancellationToken,
    ) {
        loop {
            let request = tokio::select! {
                _ = shutdown.cancelled() => return,
                request = req_rx.recv() => match request {
                    Some(request) => request,
                    None => return,
                },
            };
            let Some(conn) = self.wait_ready(&shutdown).await else {
                return;
            };
            dispatch(&conn, &self.clr_id, request).await;
        }
    }

    async fn wait_ready(&self, shutdown: &CancellationToken) -> Option<Arc<Connection>> {
        loop {
            if let Some(conn) = self.connection() {
                if !conn.is_closed() {
                    return Some(conn);
                }
            }
            tokio::select! {
                _ = shutdown.cancelled() => return None,
                _ = tokio::time::sleep(CONN_WAIT_TICK) => {}
            }
        }
    }
}
