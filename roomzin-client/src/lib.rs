//! Async Rust client for Roomzin — the clustered in-memory availability
//! service.
//!
//! The client multiplexes many logical requests over a small pool of
//! persistent TCP connections speaking Roomzin's length-prefixed binary
//! protocol, with an HTTP side channel for topology discovery. Writes are
//! routed to the elected leader, reads to the follower with the best rolling
//! latency, and transient server back-pressure (`308`, `405`, `429`, `503`)
//! is retried without surfacing to callers.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use roomzin_client::{ClientConfig, RoomzinClient};
//! use roomzin_client::types::RoomAvailUpdate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .seed_hosts("10.0.0.1,10.0.0.2,10.0.0.3")
//!         .api_port(7070)
//!         .tcp_port(7071)
//!         .auth_token("secret")
//!         .build()?;
//!     let client = RoomzinClient::connect(config).await?;
//!
//!     let exists = client.prop_exist("h-100").await?;
//!     println!("h-100 exists: {exists}");
//!
//!     let left = client.dec_room_avail(&RoomAvailUpdate {
//!         property_id: "h-100".into(),
//!         room_type: "double".into(),
//!         date: chrono::Utc::now().date_naive() + chrono::Days::new(1),
//!         amount: 1,
//!     }).await?;
//!     println!("rooms left: {left}");
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! # Error handling
//!
//! All methods return [`RoomzinError`], which classifies into four kinds:
//! `Client` (SDK misuse), `Request` (the server rejected this request),
//! `Retry` (transient cluster state; already retried up to the budget), and
//! `Internal` (protocol violations). See [`RoomzinError::kind`].

pub mod client;
pub mod config;
pub mod types;

mod cluster;
mod command;

pub use client::RoomzinClient;
pub use cluster::Topology;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use roomzin_core::{Codecs, ErrorKind, Result, RoomzinError};
