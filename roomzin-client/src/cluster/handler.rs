//! The dispatcher: routing, retry policy, and demux hygiene.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout_at, Duration, Instant};
use tokio_util::sync::CancellationToken;

use roomzin_core::protocol::{
    ServerReply, CODE_BUSY, CODE_LEADER_CHANGED, CODE_METHOD_NOT_ALLOWED, CODE_UNAVAILABLE,
};
use roomzin_core::{Result, RoomzinError};

use super::discovery::ClusterDiscovery;
use super::follower::FollowerHandler;
use super::leader::LeaderHandler;
use super::{CodecCache, Request};
use crate::config::ClientConfig;

/// Retry budget per dispatched request.
const MAX_RETRIES: u32 = 5;
/// Backoff unit for `503`/`429`; attempt `n` sleeps `n` units.
const RETRY_BACKOFF_UNIT: Duration = Duration::from_millis(100);

/// Owns both handlers and the background tasks that keep them alive.
pub(crate) struct ClusterHandler {
    cfg: Arc<ClientConfig>,
    leader: Arc<LeaderHandler>,
    followers: Arc<FollowerHandler>,
    shutdown: CancellationToken,
}

impl ClusterHandler {
    /// Builds the handler pair and spawns the five long-lived tasks:
    /// leader sync/send, follower sync/send, and the demux cleanup ticker.
    pub(crate) fn start(
        cfg: Arc<ClientConfig>,
        discovery: Arc<dyn ClusterDiscovery>,
        codec_cache: Arc<CodecCache>,
    ) -> Arc<Self> {
        let (leader, leader_rx) = LeaderHandler::new(cfg.clone(), discovery.clone(), codec_cache);
        let (followers, follower_rx) = FollowerHandler::new(cfg.clone(), discovery);
        let shutdown = CancellationToken::new();

        let handler = Arc::new(Self {
            cfg,
            leader,
            followers,
            shutdown,
        });

        tokio::spawn(handler.leader.clone().sync_loop(handler.shutdown.clone()));
        tokio::spawn(
            handler
                .leader
                .clone()
                .send_loop(leader_rx, handler.shutdown.clone()),
        );
        tokio::spawn(handler.followers.clone().sync_loop(handler.shutdown.clone()));
        tokio::spawn(
            handler
                .followers
                .clone()
                .send_loop(follower_rx, handler.shutdown.clone()),
        );
        tokio::spawn(handler.clone().cleanup_loop());

        handler
    }

    /// Cancels every background task and unblocks pending submissions.
    pub(crate) fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Reaps demux entries orphaned by deadline expiry or reader exits.
    async fn cleanup_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.cfg.timeout());
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                _ = ticker.tick() => {
                    let max_age = self.cfg.timeout() * 2;
                    let mut reaped = self.leader.demux().cleanup(max_age);
                    for conn in self.followers.connections() {
                        reaped += conn.demux().cleanup(max_age);
                    }
                    if reaped > 0 {
                        tracing::debug!(reaped, "reaped orphaned correlation ids");
                    }
                }
            }
        }
    }

    /// Submits a request and consumes its response, retrying per policy.
    ///
    /// Error replies with a non-retryable code are returned to the caller
    /// verbatim, as is the last error frame once the retry budget runs out.
    pub(crate) async fn execute(
        &self,
        deadline: Instant,
        is_write: bool,
        payload: Bytes,
    ) -> Result<ServerReply> {
        if payload.is_empty() {
            return Err(RoomzinError::EmptyPayload);
        }
        if is_write && self.leader.connection().is_none() {
            return Err(RoomzinError::NoLeader);
        }

        let req_tx = if is_write {
            self.leader.request_sender()
        } else {
            self.followers.request_sender()
        };

        let mut attempts: u32 = 0;
        loop {
            let (reply_tx, reply_rx) = oneshot::channel();
            let request = Request {
                payload: payload.clone(),
                reply: reply_tx,
            };

            match timeout_at(deadline, req_tx.send(request)).await {
                Err(_) => return Err(RoomzinError::Timeout),
                Ok(Err(_)) => return Err(RoomzinError::ConnClosed),
                Ok(Ok(())) => {}
            }

            let reply = match timeout_at(deadline, reply_rx).await {
                Err(_) => return Err(RoomzinError::Timeout),
                Ok(Err(_)) => return Err(RoomzinError::ConnClosed),
                Ok(Ok(reply)) => reply,
            };

            if reply.status.is_success() {
                return Ok(reply);
            }

            let code = reply.error_code().map(str::to_owned);
            let with_backoff = match code.as_deref() {
                Some(CODE_LEADER_CHANGED) | Some(CODE_METHOD_NOT_ALLOWED) => false,
                Some(CODE_UNAVAILABLE) | Some(CODE_BUSY) => true,
                _ => return Ok(reply),
            };

            if attempts >= MAX_RETRIES {
                return Ok(reply);
            }
            attempts += 1;
            tracing::debug!(
                attempts,
                code = code.as_deref().unwrap_or(""),
                "retrying request"
            );

            if with_backoff {
                let pause = RETRY_BACKOFF_UNIT * attempts;
                if timeout_at(deadline, sleep(pause)).await.is_err() {
                    return Err(RoomzinError::Timeout);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::test_support::{spawn_silent_node, test_config, StaticTopology};
    use crate::cluster::Topology;

    async fn handler_against_silent_leader(timeout: Duration) -> Arc<ClusterHandler> {
        let port = spawn_silent_node("127.0.0.1", 0).await;
        let cfg = Arc::new(test_config(port, timeout));
        let discovery = Arc::new(StaticTopology(Topology {
            leader: "127.0.0.1".into(),
            followers: Vec::new(),
        }));
        let handler = ClusterHandler::start(cfg, discovery, Arc::new(CodecCache::new()));

        // Wait for the leader sync loop to publish its connection.
        tokio::time::timeout(Duration::from_secs(2), async {
            while handler.leader.connection().is_none() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("leader connection must come up");
        handler
    }

    #[tokio::test]
    async fn test_empty_payload_rejected_before_io() {
        let handler = handler_against_silent_leader(Duration::from_millis(200)).await;
        let err = handler
            .execute(Instant::now() + Duration::from_millis(200), false, Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RoomzinError::EmptyPayload));
        handler.shutdown();
    }

    #[tokio::test]
    async fn test_deadline_fires_and_cleanup_reaps_orphan() {
        let handler = handler_against_silent_leader(Duration::from_millis(100)).await;

        let started = tokio::time::Instant::now();
        let err = handler
            .execute(
                Instant::now() + Duration::from_millis(100),
                true,
                Bytes::from_static(b"\x09PROPEXIST\x00\x00"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RoomzinError::Timeout));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");

        // The orphaned correlation id sits in the demux until the sweep
        // (cadence = timeout, max age = 2x timeout) removes it.
        assert_eq!(handler.leader.demux().len(), 1);
        tokio::time::timeout(Duration::from_secs(2), async {
            while handler.leader.demux().len() > 0 {
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("cleanup must reap the orphaned entry");
        handler.shutdown();
    }

    #[tokio::test]
    async fn test_write_without_leader_fails_fast() {
        let cfg = Arc::new(test_config(1, Duration::from_millis(100)));
        let discovery = Arc::new(StaticTopology(Topology {
            leader: "127.0.0.1".into(),
            followers: Vec::new(),
        }));
        let handler = ClusterHandler::start(cfg, discovery, Arc::new(CodecCache::new()));

        let err = handler
            .execute(
                Instant::now() + Duration::from_millis(100),
                true,
                Bytes::from_static(b"\x07SETPROP\x00\x00"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RoomzinError::NoLeader));
        handler.shutdown();
    }
}
