//! The follower handler: a dynamic set of scored read connections.

use std::collections::HashMap;
use std::sync::atomic::AtomicU32;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use roomzin_core::{Result, RoomzinError};

use super::connection::Connection;
use super::demux::DemuxMap;
use super::discovery::ClusterDiscovery;
use super::{dispatch, Request, CONN_WAIT_TICK, REQUEST_CHANNEL_CAPACITY};
use crate::config::ClientConfig;

/// Cadence of the emergency re-sync check.
const FAST_TICK: Duration = Duration::from_millis(100);

/// Maintains one scored connection per known follower.
///
/// Closed connections are not removed eagerly; the selector skips them and
/// the next sync round replaces them. Each follower connection gets its own
/// demux map.
pub(crate) struct FollowerHandler {
    cfg: Arc<ClientConfig>,
    discovery: Arc<dyn ClusterDiscovery>,
    req_tx: mpsc::Sender<Request>,
    connections: RwLock<HashMap<String, Arc<Connection>>>,
    clr_id: AtomicU32,
}

impl FollowerHandler {
    pub(crate) fn new(
        cfg: Arc<ClientConfig>,
        discovery: Arc<dyn ClusterDiscovery>,
    ) -> (Arc<Self>, mpsc::Receiver<Request>) {
        let (req_tx, req_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let handler = Arc::new(Self {
            cfg,
            discovery,
            req_tx,
            connections: RwLock::new(HashMap::new()),
            clr_id: AtomicU32::new(0),
        });
        (handler, req_rx)
    }

    pub(crate) fn request_sender(&self) -> mpsc::Sender<Request> {
        self.req_tx.clone()
    }

    /// Snapshot of every tracked connection, closed ones included.
    pub(crate) fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections
            .read()
            .expect("follower lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    fn all_closed(&self) -> bool {
        self.connections
            .read()
            .expect("follower lock poisoned")
            .values()
            .all(|c| c.is_closed())
    }

    /// Two-pass best-connection choice: lowest non-zero rolling average
    /// first, any open connection as the cold-start fallback.
    pub(crate) fn best_connection(&self) -> Result<Arc<Connection>> {
        let connections = self.connections.read().expect("follower lock poisoned");

        let mut best: Option<(&Arc<Connection>, Duration)> = None;
        for conn in connections.values() {
            if conn.is_closed() {
                continue;
            }
            let average = conn.average_latency();
            if average.is_zero() {
                continue;
            }
            if best.map_or(true, |(_, b)| average < b) {
                best = Some((conn, average));
            }
        }
        if let Some((conn, _)) = best {
            return Ok(conn.clone());
        }

        connections
            .values()
            .find(|c| !c.is_closed())
            .cloned()
            .ok_or(RoomzinError::NoFollower)
    }

    async fn connect_if_absent(&self, addr: &str) {
        {
            let connections = self.connections.read().expect("follower lock poisoned");
            if let Some(existing) = connections.get(addr) {
                if !existing.is_closed() {
                    return;
                }
            } else {
                // One slot stays reserved for the leader connection.
                let open = connections.values().filter(|c| !c.is_closed()).count();
                if open + 1 >= self.cfg.max_active_conns() {
                    tracing::debug!(addr, "connection cap reached, skipping follower");
                    return;
                }
            }
        }

        match Connection::open(addr, &self.cfg, Arc::new(DemuxMap::new()), true).await {
            Ok(conn) => {
                let prev = self
                    .connections
                    .write()
                    .expect("follower lock poisoned")
                    .insert(addr.to_owned(), conn);
                if let Some(prev) = prev {
                    prev.close();
                }
            }
            Err(e) => tracing::debug!(addr, error = %e, "follower connect failed"),
        }
    }

    async fn sync(&self) {
        let topology = match self.discovery.discover().await {
            Ok(topology) => topology,
            Err(e) => {
                tracing::debug!(error = %e, "follower sync failed");
                return;
            }
        };
        for addr in &topology.followers {
            self.connect_if_absent(addr).await;
        }
    }

    /// Slow ticker adds newly discovered followers; the fast ticker forces a
    /// round as soon as every tracked connection is gone.
    pub(crate) async fn sync_loop(self: Arc<Self>, shutdown: CancellationToken) {
        let mut probe = tokio::time::interval(self.cfg.node_probe_interval());
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut fast = tokio::time::interval(FAST_TICK);
        fast.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = probe.tick() => self.sync().await,
                _ = fast.tick() => {
                    if self.all_closed() {
                        self.sync().await;
                    }
                }
            }
        }
    }

    /// Drains the request channel onto the best scored connection.
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
            if let Ok(conn) = self.best_connection() {
                return Some(conn);
            }
            tokio::select! {
                _ = shutdown.cancelled() => return None,
                _ = tokio::time::sleep(CONN_WAIT_TICK) => {}
            }
        }
    }
}
