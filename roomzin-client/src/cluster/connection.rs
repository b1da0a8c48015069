//! A single authenticated connection to a cluster node.
//!
//! After login the connection runs two pumps: a writer draining the bounded
//! send queue onto the socket, and a reader decoding response frames and
//! delivering them through the demux map. Either pump closes the connection
//! on its first I/O error; the owning handler notices on its next sync tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use futures::StreamExt;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use roomzin_core::protocol::{
    encode_command, encode_frame, Field, FrameCodec, RawResponse, Status, CODE_BUSY,
    CODE_LEADER_CHANGED, CODE_METHOD_NOT_ALLOWED, CODE_UNAVAILABLE, LOGIN_CLR_ID, LOGIN_COMMAND,
    LOGIN_OK,
};
use roomzin_core::{Result, RoomzinError};

use super::demux::DemuxMap;
use super::latency::{RollingAverage, LATENCY_WINDOW};
use crate::config::ClientConfig;

/// Capacity of the per-connection send queue.
pub(crate) const SEND_QUEUE_CAPACITY: usize = 8192;

/// Synthetic latency fed into the rolling average on an in-band `429`.
const BUSY_PENALTY: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub(crate) struct Connection {
    addr: String,
    send_tx: mpsc::Sender<BytesMut>,
    demux: Arc<DemuxMap>,
    latency: RollingAverage,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl Connection {
    /// Dials `addr`, performs the login handshake, and starts both pumps.
    ///
    /// `scored` enables latency accounting; handlers set it for follower
    /// connections only.
    pub(crate) async fn open(
        addr: &str,
        cfg: &ClientConfig,
        demux: Arc<DemuxMap>,
        scored: bool,
    ) -> Result<Arc<Self>> {
        let target = format!("{addr}:{}", cfg.tcp_port());
        let mut stream = timeout(cfg.timeout(), TcpStream::connect(&target))
            .await
            .map_err(|_| RoomzinError::Connection(format!("dial timeout for {target}")))?
            .map_err(|e| RoomzinError::Connection(format!("failed to connect to {target}: {e}")))?;

        stream
            .set_nodelay(true)
            .map_err(|e| RoomzinError::Connection(format!("failed to set TCP_NODELAY: {e}")))?;
        let keepalive = TcpKeepalive::new()
            .with_time(cfg.keep_alive())
            .with_interval(cfg.keep_alive());
        let _ = SockRef::from(&stream).set_tcp_keepalive(&keepalive);

        let login_payload =
            encode_command(LOGIN_COMMAND, &[Field::string(1, cfg.auth_token())]);
        let login_frame = encode_frame(LOGIN_CLR_ID, &login_payload);
        timeout(cfg.timeout(), stream.write_all(&login_frame))
            .await
            .map_err(|_| RoomzinError::Connection(format!("login write timeout for {target}")))?
            .map_err(|e| RoomzinError::Connection(format!("login write to {target} failed: {e}")))?;

        let mut banner = [0u8; LOGIN_OK.len()];
        timeout(cfg.timeout(), stream.read_exact(&mut banner))
            .await
            .map_err(|_| RoomzinError::Connection(format!("login read timeout for {target}")))?
            .map_err(|e| RoomzinError::Connection(format!("login read from {target} failed: {e}")))?;
        if &banner[..] != LOGIN_OK {
            return Err(RoomzinError::Authentication(format!(
                "login rejected by {target}"
            )));
        }

        let (read_half, write_half) = stream.into_split();
        let (send_tx, send_rx) = mpsc::channel(SEND_QUEUE_CAPACITY);

        let conn = Arc::new(Self {
            addr: target,
            send_tx,
            demux,
            latency: RollingAverage::new(LATENCY_WINDOW),
            cancel: CancellationToken::new(),
            closed: AtomicBool::new(false),
        });

        tokio::spawn(write_pump(conn.clone(), write_half, send_rx));
        tokio::spawn(read_pump(conn.clone(), read_half, scored));

        tracing::debug!(addr = %conn.addr, scored, "connection established");
        Ok(conn)
    }

    /// Remote `host:port` this connection is bound to.
    pub(crate) fn addr(&self) -> &str {
        &self.addr
    }

    pub(crate) fn demux(&self) -> &Arc<DemuxMap> {
        &self.demux
    }

    /// Rolling latency average; zero until the first scored response.
    pub(crate) fn average_latency(&self) -> Duration {
        self.latency.average()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Closes the connection; idempotent. Both pumps observe the
    /// cancellation and drop their socket halves.
    pub(crate) fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.cancel.cancel();
            tracing::debug!(addr = %self.addr, "connection closed");
        }
    }

    /// Enqueues a ready frame, suspending while the send queue is full.
    pub(crate) async fn enqueue(&self, frame: BytesMut) -> Result<()> {
        if self.is_closed() {
            return Err(RoomzinError::ConnClosed);
        }
        tokio::select! {
            _ = self.cancel.cancelled() => Err(RoomzinError::ConnClosed),
            sent = self.send_tx.send(frame) => sent.map_err(|_| RoomzinError::ConnClosed),
        }
    }

    /// Routes one decoded frame to its waiter and applies in-band status
    /// hints. Returns `false` when the reader pump must exit.
    fn deliver(&self, response: RawResponse, scored: bool) -> bool {
        let Some((reply_tx, dispatched_at)) = self.demux.load_remove(response.clr_id) else {
            // A response nobody waits for implies correlation state corruption.
            tracing::warn!(
                addr = %self.addr,
                clr_id = response.clr_id,
                "response without a waiter"
            );
            self.close();
            return false;
        };

        if scored {
            self.latency.record(dispatched_at.elapsed());
        }

        if response.reply.status == Status::Error {
            match response.reply.error_code() {
                Some(CODE_LEADER_CHANGED) | Some(CODE_METHOD_NOT_ALLOWED) => {
                    // The node changed role underneath us; force the owning
                    // handler to re-sync.
                    self.close();
                }
                Some(CODE_UNAVAILABLE) => {
                    if scored {
                        self.latency.record(self.latency.average() * 2);
                    } else {
                        self.close();
                    }
                }
                Some(CODE_BUSY) => {
                    if scored {
                        self.latency.record(BUSY_PENALTY);
                    }
                }
                _ => {}
            }
        }

        let _ = reply_tx.send(response.reply);
        !self.is_closed()
    }

    #[cfg(test)]
    pub(crate) fn record_latency(&self, sample: Duration) {
        self.latency.record(sample);
    }
}

async fn write_pump(
    conn: Arc<Connection>,
    mut writer: OwnedWriteHalf,
    mut send_rx: mpsc::Receiver<BytesMut>,
) {
    loop {
        let frame = tokio::select! {
            _ = conn.cancel.cancelled() => break,
            frame = send_rx.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };
        if let Err(e) = writer.write_all(&frame).await {
            tracing::debug!(addr = %conn.addr, error = %e, "write failed");
            conn.close();
            break;
        }
    }
}

async fn read_pump(conn: Arc<Connection>, reader: OwnedReadHalf, scored: bool) {
    let mut frames = FramedRead::new(reader, FrameCodec::new());
    loop {
        let next = tokio::select! {
            _ = conn.cancel.cancelled() => break,
            next = frames.next() => next,
        };
        match next {
            Some(Ok(response)) => {
                if !conn.deliver(response, scored) {
                    break;
                }
            }
            Some(Err(e)) => {
                tracing::warn!(addr = %conn.addr, error = %e, "frame decode failed");
                conn.close();
                break;
            }
            None => {
                conn.close();
                break;
            }
        }
    }
}
