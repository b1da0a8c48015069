//! Scripted mock cluster for integration tests: every node serves the HTTP
//! control plane (`/healthz`, `/node-info`, `/peers`) and the framed TCP
//! protocol with canned per-command replies.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use roomzin_core::protocol::{encode_fields, Field, FIELD_CODEC_BLOB, LOGIN_OK};

pub const TEST_TOKEN: &str = "secret-token";
pub const CODEC_BLOB: &str = "wifi,pool,gym|free_cancellation,non_refundable";

/// A canned reply for one command invocation.
#[derive(Clone)]
pub enum Canned {
    Success(Vec<Field>),
    Error(String, String),
    /// Swallow the request without replying.
    Ignore,
}

impl Canned {
    pub fn error(code: &str, message: &str) -> Self {
        Self::Error(code.into(), message.into())
    }
}

#[derive(Default)]
pub struct NodeState {
    health: Mutex<String>,
    leader_url: Mutex<String>,
    peers: Mutex<Vec<String>>,
    queued: Mutex<HashMap<String, Vec<Canned>>>,
    sticky: Mutex<HashMap<String, Canned>>,
    commands: Mutex<Vec<String>>,
    pub tcp_connections: AtomicUsize,
    pub http_requests: AtomicUsize,
    reply_delay: Mutex<Duration>,
}

impl NodeState {
    pub fn set_health(&self, health: &str) {
        *self.health.lock().unwrap() = health.into();
    }

    pub fn set_leader_url(&self, url: &str) {
        *self.leader_url.lock().unwrap() = url.into();
    }

    pub fn set_peers(&self, peers: Vec<String>) {
        *self.peers.lock().unwrap() = peers;
    }

    /// Queues a one-shot reply for `command`.
    pub fn push_reply(&self, command: &str, canned: Canned) {
        self.queued
            .lock()
            .unwrap()
            .entry(command.into())
            .or_default()
            .push(canned);
    }

    /// Sets the fallback reply for `command` once the queue is drained.
    pub fn set_sticky(&self, command: &str, canned: Canned) {
        self.sticky.lock().unwrap().insert(command.into(), canned);
    }

    /// Delays every data-plane reply; models a slow follower.
    pub fn set_reply_delay(&self, delay: Duration) {
        *self.reply_delay.lock().unwrap() = delay;
    }

    pub fn command_count(&self, command: &str) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == command)
            .count()
    }

    fn next_reply(&self, command: &str) -> Canned {
        let mut queued = self.queued.lock().unwrap();
        if let Some(queue) = queued.get_mut(command) {
            if !queue.is_empty() {
                return queue.remove(0);
            }
        }
        drop(queued);

        if let Some(canned) = self.sticky.lock().unwrap().get(command) {
            return canned.clone();
        }
        if command == "GETCODECS" {
            return Canned::Success(vec![Field {
                id: 1,
                kind: FIELD_CODEC_BLOB,
                data: CODEC_BLOB.as_bytes().to_vec(),
            }]);
        }
        Canned::Success(Vec::new())
    }
}

pub struct MockNode {
    pub host: String,
    pub state: Arc<NodeState>,
}

/// A set of mock nodes on distinct loopback aliases sharing one API port and
/// one TCP port, the way a real deployment shares ports across hosts.
pub struct MockCluster {
    pub api_port: u16,
    pub tcp_port: u16,
    pub nodes: Vec<MockNode>,
}

impl MockCluster {
    pub async fn start(count: usize) -> Self {
        let base = 10u8;
        let first = format!("127.0.0.{base}");
        let api = TcpListener::bind((first.as_str(), 0)).await.unwrap();
        let tcp = TcpListener::bind((first.as_str(), 0)).await.unwrap();
        let api_port = api.local_addr().unwrap().port();
        let tcp_port = tcp.local_addr().unwrap().port();

        let mut first_listeners = Some((api, tcp));
        let mut nodes = Vec::with_capacity(count);
        for i in 0..count {
            let host = format!("127.0.0.{}", base + i as u8);
            let (api_listener, tcp_listener) = match first_listeners.take() {
                Some(pair) => pair,
                None => (
                    TcpListener::bind((host.as_str(), api_port)).await.unwrap(),
                    TcpListener::bind((host.as_str(), tcp_port)).await.unwrap(),
                ),
            };

            let state = Arc::new(NodeState::default());
            state.set_health("unavailable");
            tokio::spawn(http_loop(api_listener, state.clone()));
            tokio::spawn(tcp_loop(tcp_listener, state.clone()));
            nodes.push(MockNode { host, state });
        }

        Self {
            api_port,
            tcp_port,
            nodes,
        }
    }

    pub fn seed_hosts(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.host.clone())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn url_of(&self, index: usize) -> String {
        format!("http://{}:{}", self.nodes[index].host, self.api_port)
    }

    /// Makes node `index` the leader and every other node a follower, with
    /// every node voting for the new leader URL.
    pub fn set_leader(&self, index: usize) {
        let url = self.url_of(index);
        for (i, node) in self.nodes.iter().enumerate() {
            node.state.set_health(if i == index {
                "active_leader"
            } else {
                "active_follower"
            });
            node.state.set_leader_url(&url);
        }
    }
}

async fn http_loop(listener: TcpListener, state: Arc<NodeState>) {
    loop {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let state = state.clone();
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            loop {
                match stream.read(&mut chunk).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => {
                        buf.extend_from_slice(&chunk[..n]);
                        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                }
            }
            state.http_requests.fetch_add(1, Ordering::SeqCst);

            let request = String::from_utf8_lossy(&buf);
            let path = request.split_whitespace().nth(1).unwrap_or("/").to_owned();
            let body = match path.as_str() {
                "/healthz" => state.health.lock().unwrap().clone(),
                "/node-info" => serde_json::json!({
                    "node_id": "node",
                    "zone_id": "zone-a",
                    "shard_id": "shard-0",
                    "leader_id": "node",
                    "leader_url": state.leader_url.lock().unwrap().clone(),
                })
                .to_string(),
                "/peers" => serde_json::to_string(&*state.peers.lock().unwrap()).unwrap(),
                _ => String::new(),
            };
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes()).await;
        });
    }
}

async fn tcp_loop(listener: TcpListener, state: Arc<NodeState>) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        state.tcp_connections.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(serve_connection(stream, state.clone()));
    }
}

async fn read_frame(stream: &mut TcpStream) -> Option<(u32, Vec<u8>)> {
    let mut header = [0u8; 9];
    stream.read_exact(&mut header).await.ok()?;
    if header[0] != 0xFF {
        return None;
    }
    let clr_id = u32::from_le_bytes([header[1], header[2], header[3], header[4]]);
    let len = u32::from_le_bytes([header[5], header[6], header[7], header[8]]) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.ok()?;
    Some((clr_id, payload))
}

fn command_name(payload: &[u8]) -> String {
    let len = payload[0] as usize;
    String::from_utf8_lossy(&payload[1..1 + len]).into_owned()
}

fn response_frame(clr_id: u32, status: &str, fields: &[Field]) -> BytesMut {
    let mut payload = BytesMut::new();
    payload.put_u8(status.len() as u8);
    payload.put_slice(status.as_bytes());
    encode_fields(fields, &mut payload);

    let mut frame = BytesMut::with_capacity(9 + payload.len());
    frame.put_u8(0xFF);
    frame.put_u32_le(clr_id);
    frame.put_u32_le(payload.len() as u32);
    frame.put_slice(&payload);
    frame
}

async fn serve_connection(mut stream: TcpStream, state: Arc<NodeState>) {
    let Some((_, login)) = read_frame(&mut stream).await else {
        return;
    };
    if command_name(&login) != "LOGIN"
        || !login
            .windows(TEST_TOKEN.len())
            .any(|w| w == TEST_TOKEN.as_bytes())
    {
        let _ = stream.write_all(b"LOGIN FAILED").await;
        return;
    }
    if stream.write_all(LOGIN_OK).await.is_err() {
        return;
    }

    loop {
        let Some((clr_id, payload)) = read_frame(&mut stream).await else {
            return;
        };
        let command = command_name(&payload);
        state.commands.lock().unwrap().push(command.clone());

        let delay = *state.reply_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let frame = match state.next_reply(&command) {
            Canned::Ignore => continue,
            Canned::Success(fields) => response_frame(clr_id, "SUCCESS", &fields),
            Canned::Error(code, message) => response_frame(
                clr_id,
                "ERROR",
                &[Field::string(1, code), Field::string(2, message)],
            ),
        };
        if stream.write_all(&frame).await.is_err() {
            return;
        }
    }
}

/// Polls `predicate` until it holds or the timeout expires.
pub async fn wait_for(timeout: Duration, mut predicate: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !predicate() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within {timeout:?}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
