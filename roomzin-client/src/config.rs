//! Client configuration types and builder.

use std::time::Duration;

use roomzin_core::{Result, RoomzinError};

/// Default per-request deadline; also the demux cleanup cadence.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);
/// Default per-HTTP-call deadline for discovery.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(2);
/// Default TCP keep-alive interval.
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);
/// Default follower sync cadence.
const DEFAULT_NODE_PROBE_INTERVAL: Duration = Duration::from_secs(2);
/// Default hard cap on open TCP connections.
const DEFAULT_MAX_ACTIVE_CONNS: usize = 8;

/// Validated client configuration.
///
/// Build one with [`ClientConfig::builder`]:
///
/// ```rust
/// use roomzin_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .seed_hosts("10.0.0.1, 10.0.0.2, 10.0.0.3")
///     .api_port(7070)
///     .tcp_port(7071)
///     .auth_token("secret")
///     .build()
///     .expect("invalid config");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    seed_hosts: String,
    api_port: u16,
    tcp_port: u16,
    auth_token: String,
    timeout: Duration,
    http_timeout: Duration,
    keep_alive: Duration,
    max_active_conns: usize,
    node_probe_interval: Duration,
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Comma-separated seed host list (no ports).
    pub fn seed_hosts(&self) -> &str {
        &self.seed_hosts
    }

    /// HTTP port for the discovery control plane.
    pub fn api_port(&self) -> u16 {
        self.api_port
    }

    /// TCP port for the framed protocol.
    pub fn tcp_port(&self) -> u16 {
        self.tcp_port
    }

    /// Bearer token used for HTTP probes and the TCP login handshake.
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// Per-request deadline default; also the demux cleanup cadence.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Per-HTTP-call deadline.
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    /// TCP keep-alive interval.
    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }

    /// Hard cap on open TCP connections (leader included).
    pub fn max_active_conns(&self) -> usize {
        self.max_active_conns
    }

    /// Follower sync cadence.
    pub fn node_probe_interval(&self) -> Duration {
        self.node_probe_interval
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    seed_hosts: Option<String>,
    api_port: Option<u16>,
    tcp_port: Option<u16>,
    auth_token: Option<String>,
    timeout: Option<Duration>,
    http_timeout: Option<Duration>,
    keep_alive: Option<Duration>,
    max_active_conns: Option<usize>,
    node_probe_interval: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the comma-separated seed host list (required).
    pub fn seed_hosts(mut self, hosts: impl Into<String>) -> Self {
        self.seed_hosts = Some(hosts.into());
        self
    }

    /// Sets the HTTP discovery port (required).
    pub fn api_port(mut self, port: u16) -> Self {
        self.api_port = Some(port);
        self
    }

    /// Sets the framed-protocol TCP port (required).
    pub fn tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = Some(port);
        self
    }

    /// Sets the bearer token (required).
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Sets the per-request deadline (default 2 s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the per-HTTP-call deadline (default 2 s).
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Sets the TCP keep-alive interval (default 30 s).
    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = Some(interval);
        self
    }

    /// Sets the hard cap on open TCP connections (default 8).
    pub fn max_active_conns(mut self, cap: usize) -> Self {
        self.max_active_conns = Some(cap);
        self
    }

    /// Sets the follower sync cadence (default 2 s).
    pub fn node_probe_interval(mut self, interval: Duration) -> Self {
        self.node_probe_interval = Some(interval);
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<ClientConfig> {
        let seed_hosts = self
            .seed_hosts
            .ok_or_else(|| RoomzinError::Configuration("seed_hosts is required".into()))?;
        if seed_hosts.split(',').all(|h| h.trim().is_empty()) {
            return Err(RoomzinError::Configuration(
                "seed_hosts must name at least one host".into(),
            ));
        }

        let api_port = self
            .api_port
            .ok_or_else(|| RoomzinError::Configuration("api_port is required".into()))?;
        let tcp_port = self
            .tcp_port
            .ok_or_else(|| RoomzinError::Configuration("tcp_port is required".into()))?;

        let auth_token = self
            .auth_token
            .ok_or_else(|| RoomzinError::Configuration("auth_token is required".into()))?;
        if auth_token.is_empty() {
            return Err(RoomzinError::Configuration(
                "auth_token must not be empty".into(),
            ));
        }

        let max_active_conns = self.max_active_conns.unwrap_or(DEFAULT_MAX_ACTIVE_CONNS);
        if max_active_conns < 2 {
            return Err(RoomzinError::Configuration(
                "max_active_conns must allow a leader and at least one follower".into(),
            ));
        }

        Ok(ClientConfig {
            seed_hosts,
            api_port,
            tcp_port,
            auth_token,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            http_timeout: self.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT),
            keep_alive: self.keep_alive.unwrap_or(DEFAULT_KEEP_ALIVE),
            max_active_conns,
            node_probe_interval: self
                .node_probe_interval
                .unwrap_or(DEFAULT_NODE_PROBE_INTERVAL),
        })
    }
}
