//! Seed-based HTTP discovery of the cluster topology.
//!
//! Every cycle probes the seed hosts in parallel, expands once through each
//! node's `/peers` list, then elects the leader by majority vote over the
//! reported `leader_url` values. Cycles are stateless: the topology is
//! recomputed from scratch each time, never merged with a previous cycle.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;

use roomzin_core::{Result, RoomzinError};

use crate::config::ClientConfig;

/// Role a node reports on `/healthz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeHealth {
    ActiveLeader,
    ActiveFollower,
    Unavailable,
}

impl NodeHealth {
    fn parse(body: &str) -> Self {
        match body.trim() {
            "active_leader" => Self::ActiveLeader,
            "active_follower" => Self::ActiveFollower,
            _ => Self::Unavailable,
        }
    }
}

/// JSON body of `/node-info`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NodeInfo {
    #[allow(dead_code)]
    pub node_id: String,
    #[allow(dead_code)]
    pub zone_id: String,
    #[allow(dead_code)]
    pub shard_id: String,
    #[allow(dead_code)]
    pub leader_id: String,
    pub leader_url: String,
}

/// Everything learned about one reachable node during a cycle.
#[derive(Debug, Clone)]
pub(crate) struct ProbeRecord {
    pub host: String,
    pub health: NodeHealth,
    pub leader_url: String,
    pub peers: Vec<String>,
}

/// The outcome of one discovery cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Host serving as the elected leader.
    pub leader: String,
    /// Hosts reporting `active_follower` for the winning leader URL.
    pub followers: Vec<String>,
}

/// Discovers the current leader/follower topology.
#[async_trait]
pub(crate) trait ClusterDiscovery: Send + Sync {
    async fn discover(&self) -> Result<Topology>;
}

/// Splits the comma-separated seed list, trimming whitespace and dropping
/// empty entries.
pub(crate) fn parse_hosts(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Client-side leader election over the collected probe records.
///
/// The `leader_url` with the most votes wins; ties break lexicographically
/// so two cycles over identical inputs produce identical topologies. Among
/// nodes voting for the winner, the one reporting `active_leader` becomes
/// the leader host and the `active_follower` nodes form the follower set.
pub(crate) fn elect(records: &[ProbeRecord]) -> Result<Topology> {
    let mut votes: HashMap<&str, usize> = HashMap::new();
    for record in records {
        if !record.leader_url.is_empty() {
            *votes.entry(record.leader_url.as_str()).or_default() += 1;
        }
    }

    let mut winner: Option<(&str, usize)> = None;
    for (url, count) in votes {
        let better = match winner {
            None => true,
            Some((best_url, best_count)) => {
                count > best_count || (count == best_count && url < best_url)
            }
        };
        if better {
            winner = Some((url, count));
        }
    }
    let Some((leader_url, _)) = winner else {
        return Err(RoomzinError::NoLeader);
    };

    let mut leader = None;
    let mut followers = Vec::new();
    for record in records {
        if record.leader_url != leader_url {
            continue;
        }
        match record.health {
            NodeHealth::ActiveLeader => leader = Some(record.host.clone()),
            NodeHealth::ActiveFollower => followers.push(record.host.clone()),
            NodeHealth::Unavailable => {}
        }
    }

    match leader {
        Some(leader) => {
            followers.sort();
            Ok(Topology { leader, followers })
        }
        None => Err(RoomzinError::NoLeader),
    }
}

/// HTTP discovery against the control-plane endpoints.
pub(crate) struct HttpDiscovery {
    cfg: Arc<ClientConfig>,
    http: reqwest::Client,
}

impl HttpDiscovery {
    pub(crate) fn new(cfg: Arc<ClientConfig>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.http_timeout())
            .build()
            .map_err(|e| {
                RoomzinError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { cfg, http })
    }

    fn url(&self, host: &str, path: &str) -> String {
        format!("http://{}:{}{}", host, self.cfg.api_port(), path)
    }

    async fn get(&self, host: &str, path: &str) -> Result<reqwest::Response> {
        let url = self.url(host, path);
        let mut request = self.http.get(&url);
        if !self.cfg.auth_token().is_empty() {
            request = request.bearer_auth(self.cfg.auth_token());
        }
        let response = request
            .send()
            .await
            .map_err(|e| RoomzinError::Connection(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(RoomzinError::Connection(format!(
                "{url} returned {}",
                response.status()
            )));
        }
        Ok(response)
    }

    /// Probes one host; `None` marks it down for this cycle.
    async fn probe(&self, host: &str) -> Option<ProbeRecord> {
        let health = match self.get(host, "/healthz").await {
            Ok(response) => NodeHealth::parse(&response.text().await.ok()?),
            Err(e) => {
                tracing::debug!(host, error = %e, "health probe failed");
                return None;
            }
        };
        if health == NodeHealth::Unavailable {
            return None;
        }

        let info: NodeInfo = match self.get(host, "/node-info").await {
            Ok(response) => response.json().await.ok()?,
            Err(e) => {
                tracing::debug!(host, error = %e, "node-info probe failed");
                return None;
            }
        };

        let peers = match self.get(host, "/peers").await {
            Ok(response) => response.json().await.unwrap_or_default(),
            Err(_) => Vec::new(),
        };

        Some(ProbeRecord {
            host: host.to_owned(),
            health,
            leader_url: info.leader_url,
            peers,
        })
    }

    async fn probe_round(&self, hosts: &[String]) -> Vec<ProbeRecord> {
        join_all(hosts.iter().map(|h| self.probe(h)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

#[async_trait]
impl ClusterDiscovery for HttpDiscovery {
    async fn discover(&self) -> Result<Topology> {
        let seeds = parse_hosts(self.cfg.seed_hosts());
        let known: HashSet<&String> = seeds.iter().collect();

        let mut records = self.probe_round(&seeds).await;

        // One round of peer expansion; discovered peers are probed but their
        // own peer lists are not followed further.
        let mut discovered: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for record in &records {
            for peer in &record.peers {
                if !known.contains(peer) && seen.insert(peer.clone()) {
                    discovered.push(peer.clone());
                }
            }
        }
        if !discovered.is_empty() {
            records.extend(self.probe_round(&discovered).await);
        }

        let topology = elect(&records)?;
        tracing::debug!(
            leader = %topology.leader,
            followers = topology.followers.len(),
            "discovery cycle complete"
        );
        Ok(topology)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(host: &str, health: NodeHealth, leader_url: &str) -> ProbeRecord {
        ProbeRecord {
            host: host.into(),
            health,
            leader_url: leader_url.into(),
            peers: Vec::new(),
        }
    }

    #[test]
    fn test_parse_hosts_trims_and_drops_empties() {
        assert_eq!(
            parse_hosts(" h1 , ,h2,  h3  ,"),
            vec!["h1".to_string(), "h2".into(), "h3".into()]
        );
        assert!(parse_hosts(" , ").is_empty());
    }

    #[test]
    fn test_elect_majority() {
        let records = vec![
            record("h1", NodeHealth::ActiveLeader, "http://h1:7070"),
            record("h2", NodeHealth::ActiveFollower, "http://h1:7070"),
            record("h3", NodeHealth::ActiveFollower, "http://h3:7070"),
        ];
        let topology = elect(&records).unwrap();
        assert_eq!(topology.leader, "h1");
        assert_eq!(topology.followers, vec!["h2".to_string()]);
    }

    #[test]
    fn test_elect_is_deterministic() {
        let mut records = vec![
            record("h1", NodeHealth::ActiveLeader, "http://h1:7070"),
            record("h2", NodeHealth::ActiveFollower, "http://h1:7070"),
            record("h3", NodeHealth::ActiveFollower, "http://h1:7070"),
        ];
        let first = elect(&records).unwrap();
        records.reverse();
        assert_eq!(elect(&records).unwrap(), first);
    }

    #[test]
    fn test_elect_tie_breaks_lexicographically() {
        let records = vec![
            record("hb", NodeHealth::ActiveLeader, "http://hb:7070"),
            record("ha", NodeHealth::ActiveLeader, "http://ha:7070"),
        ];
        // One vote each; the lexicographically smaller URL wins.
        let topology = elect(&records).unwrap();
        assert_eq!(topology.leader, "ha");
    }

    #[test]
    fn test_elect_no_votes_fails() {
        let records = vec![
            record("h1", NodeHealth::ActiveFollower, ""),
            record("h2", NodeHealth::ActiveFollower, ""),
        ];
        assert!(matches!(elect(&records), Err(RoomzinError::NoLeader)));
        assert!(matches!(elect(&[]), Err(RoomzinError::NoLeader)));
    }

    #[test]
    fn test_elect_requires_live_leader_host() {
        // The winning URL exists but nobody reports active_leader for it.
        let records = vec![
            record("h2", NodeHealth::ActiveFollower, "http://h1:7070"),
            record("h3", NodeHealth::ActiveFollower, "http://h1:7070"),
        ];
        assert!(matches!(elect(&records), Err(RoomzinError::NoLeader)));
    }

    #[test]
    fn test_elect_ignores_minority_nodes() {
        let records = vec![
            record("h1", NodeHealth::ActiveLeader, "http://h1:7070"),
            record("h2", NodeHealth::ActiveFollower, "http://h1:7070"),
            // Stale node still voting for a gone leader.
            record("h4", NodeHealth::ActiveFollower, "http://h9:7070"),
        ];
        let topology = elect(&records).unwrap();
        assert_eq!(topology.leader, "h1");
        assert_eq!(topology.followers, vec!["h2".to_string()]);
    }

    #[test]
    fn test_health_parse() {
        assert_eq!(NodeHealth::parse("active_leader\n"), NodeHealth::ActiveLeader);
        assert_eq!(NodeHealth::parse(" active_follower"), NodeHealth::ActiveFollower);
        assert_eq!(NodeHealth::parse("unavailable"), NodeHealth::Unavailable);
        assert_eq!(NodeHealth::parse("???"), NodeHealth::Unavailable);
    }
}
