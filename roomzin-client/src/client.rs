//! The public client facade.

use std::sync::Arc;

use bytes::Bytes;
use chrono::NaiveDate;
use tokio::time::Instant;

use roomzin_core::protocol::ServerReply;
use roomzin_core::{Codecs, Result, RoomzinError};

use crate::cluster::{ClusterDiscovery, ClusterHandler, CodecCache, HttpDiscovery};
use crate::command::{self, admin, property, room, search};
use crate::config::ClientConfig;
use crate::types::{
    PropertyAvailability, RoomAvailUpdate, RoomDay, SearchAvailRequest, SearchPropRequest,
    SegmentInfo, SetPropRequest, SetRoomPkgRequest,
};

/// A handle to the Roomzin cluster.
///
/// One client multiplexes every request over a small pool of persistent TCP
/// connections: writes go to the elected leader, reads to the follower with
/// the best rolling latency. The handle is cheap to clone-by-reference via
/// `Arc` and all methods take `&self`.
pub struct RoomzinClient {
    cfg: Arc<ClientConfig>,
    handler: Arc<ClusterHandler>,
    codecs: Arc<CodecCache>,
}

fn require(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(RoomzinError::Validation(format!("{name} is required")))
    } else {
        Ok(())
    }
}

impl RoomzinClient {
    /// Starts the background handlers and warms the codec table.
    ///
    /// The warm-up is best-effort: a cluster that is still electing a leader
    /// produces a usable client whose codec table loads on first use.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let cfg = Arc::new(config);
        let codecs = Arc::new(CodecCache::new());
        let discovery: Arc<dyn ClusterDiscovery> = Arc::new(HttpDiscovery::new(cfg.clone())?);
        let handler = ClusterHandler::start(cfg.clone(), discovery, codecs.clone());

        let client = Self {
            cfg,
            handler,
            codecs,
        };
        if let Err(e) = client.fetch_codecs().await {
            tracing::debug!(error = %e, "initial codec fetch deferred");
        }
        Ok(client)
    }

    /// Stops every background task and unblocks in-flight calls.
    pub fn close(&self) {
        self.handler.shutdown();
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.cfg.timeout()
    }

    async fn execute(&self, is_write: bool, payload: Bytes) -> Result<ServerReply> {
        self.handler.execute(self.deadline(), is_write, payload).await
    }

    async fn fetch_codecs(&self) -> Result<Arc<Codecs>> {
        let reply = self.execute(false, admin::get_codecs_request()).await?;
        let codecs = Arc::new(admin::parse_codecs(&reply)?);
        self.codecs.set(codecs.clone());
        Ok(codecs)
    }

    /// Cached codec table, refetched transparently after invalidation.
    /// Falls back to an empty table while the cluster is unreachable.
    async fn codecs(&self) -> Arc<Codecs> {
        if let Some(codecs) = self.codecs.get() {
            return codecs;
        }
        match self.fetch_codecs().await {
            Ok(codecs) => codecs,
            Err(e) => {
                tracing::debug!(error = %e, "codec refetch failed");
                Arc::new(Codecs::default())
            }
        }
    }

    /// Returns the server-published codec table, fetching it if needed.
    pub async fn get_codecs(&self) -> Result<Arc<Codecs>> {
        if let Some(codecs) = self.codecs.get() {
            return Ok(codecs);
        }
        self.fetch_codecs().await
    }

    // ---- reads (follower-routed) ----

    /// Finds property ids matching the filter set.
    pub async fn search_prop(&self, request: &SearchPropRequest) -> Result<Vec<String>> {
        request.validate(&*self.codecs().await)?;
        let reply = self.execute(false, search::search_prop_request(request)).await?;
        search::parse_search_prop(&reply)
    }

    /// Finds per-property availability across the requested dates.
    pub async fn search_avail(
        &self,
        request: &SearchAvailRequest,
    ) -> Result<Vec<PropertyAvailability>> {
        let codecs = self.codecs().await;
        request.validate(&codecs)?;
        let reply = self.execute(false, search::search_avail_request(request)).await?;
        search::parse_search_avail(&codecs, &reply)
    }

    /// Checks whether a property exists.
    pub async fn prop_exist(&self, property_id: &str) -> Result<bool> {
        require("property_id", property_id)?;
        let reply = self
            .execute(false, property::prop_exist_request(property_id))
            .await?;
        command::parse_bool(&reply)
    }

    /// Checks whether a property carries the given room type.
    pub async fn prop_room_exist(&self, property_id: &str, room_type: &str) -> Result<bool> {
        require("property_id", property_id)?;
        require("room_type", room_type)?;
        let reply = self
            .execute(false, room::prop_room_exist_request(property_id, room_type))
            .await?;
        command::parse_bool(&reply)
    }

    /// Lists the room types of a property.
    pub async fn prop_room_list(&self, property_id: &str) -> Result<Vec<String>> {
        require("property_id", property_id)?;
        let reply = self
            .execute(false, room::prop_room_list_request(property_id))
            .await?;
        room::parse_room_list(&reply)
    }

    /// Lists the dates a room type has data for, in ascending order.
    pub async fn prop_room_date_list(
        &self,
        property_id: &str,
        room_type: &str,
    ) -> Result<Vec<NaiveDate>> {
        require("property_id", property_id)?;
        require("room_type", room_type)?;
        let reply = self
            .execute(
                false,
                room::prop_room_date_list_request(property_id, room_type),
            )
            .await?;
        room::parse_date_list(&reply)
    }

    /// Fetches one room's availability, price, and rate features for a date.
    pub async fn get_room_day(
        &self,
        property_id: &str,
        room_type: &str,
        date: NaiveDate,
    ) -> Result<RoomDay> {
        require("property_id", property_id)?;
        require("room_type", room_type)?;
        crate::types::validate_window(date)?;
        let codecs = self.codecs().await;
        let reply = self
            .execute(false, room::get_room_day_request(property_id, room_type, date))
            .await?;
        room::parse_room_day(&codecs, &reply)
    }

    // ---- writes (leader-routed) ----

    /// Registers or replaces a property.
    pub async fn set_prop(&self, request: &SetPropRequest) -> Result<()> {
        request.validate(&*self.codecs().await)?;
        let reply = self.execute(true, property::set_prop_request(request)).await?;
        command::ensure_success(&reply)
    }

    /// Sets a room's package (availability, price, rate features) for a date.
    pub async fn set_room_pkg(&self, request: &SetRoomPkgRequest) -> Result<()> {
        request.validate(&*self.codecs().await)?;
        let reply = self.execute(true, room::set_room_pkg_request(request)).await?;
        command::ensure_success(&reply)
    }

    /// Sets a room's availability; returns the stored value.
    pub async fn set_room_avail(&self, update: &RoomAvailUpdate) -> Result<u8> {
        update.validate()?;
        let reply = self
            .execute(true, room::room_avail_request("SETROOMAVL", update))
            .await?;
        command::parse_scalar_u8(&reply)
    }

    /// Increments a room's availability; returns the new value.
    pub async fn inc_room_avail(&self, update: &RoomAvailUpdate) -> Result<u8> {
        update.validate()?;
        let reply = self
            .execute(true, room::room_avail_request("INCROOMAVL", update))
            .await?;
        command::parse_scalar_u8(&reply)
    }

    /// Decrements a room's availability; returns the new value.
    pub async fn dec_room_avail(&self, update: &RoomAvailUpdate) -> Result<u8> {
        update.validate()?;
        let reply = self
            .execute(true, room::room_avail_request("DECROOMAVL", update))
            .await?;
        command::parse_scalar_u8(&reply)
    }

    /// Deletes a property and all of its data.
    pub async fn del_prop(&self, property_id: &str) -> Result<()> {
        require("property_id", property_id)?;
        let reply = self.execute(true, property::del_prop_request(property_id)).await?;
        command::ensure_success(&reply)
    }

    /// Deletes one room type from a property.
    pub async fn del_prop_room(&self, property_id: &str, room_type: &str) -> Result<()> {
        require("property_id", property_id)?;
        require("room_type", room_type)?;
        let reply = self
            .execute(true, room::del_prop_room_request(property_id, room_type))
            .await?;
        command::ensure_success(&reply)
    }

    /// Deletes all room data of a property for one date.
    pub async fn del_prop_day(&self, property_id: &str, date: NaiveDate) -> Result<()> {
        require("property_id", property_id)?;
        crate::types::validate_window(date)?;
        let reply = self
            .execute(true, room::del_prop_day_request(property_id, date))
            .await?;
        command::ensure_success(&reply)
    }

    /// Deletes one room's data for one date.
    pub async fn del_room_day(
        &self,
        property_id: &str,
        room_type: &str,
        date: NaiveDate,
    ) -> Result<()> {
        require("property_id", property_id)?;
        require("room_type", room_type)?;
        crate::types::validate_window(date)?;
        let reply = self
            .execute(true, room::del_room_day_request(property_id, room_type, date))
            .await?;
        command::ensure_success(&reply)
    }

    /// Deletes a whole segment.
    pub async fn del_segment(&self, segment: &str) -> Result<()> {
        require("segment", segment)?;
        let reply = self.execute(true, admin::del_segment_request(segment)).await?;
        command::ensure_success(&reply)
    }

    /// Lists segments with their property counts. Served by the leader so
    /// the counts come from the authoritative copy.
    pub async fn get_segments(&self) -> Result<Vec<SegmentInfo>> {
        let reply = self.execute(true, admin::get_segments_request()).await?;
        admin::parse_segments(&reply)
    }

    /// Asks the leader to persist a snapshot.
    pub async fn save_snapshot(&self) -> Result<()> {
        let reply = self.execute(true, admin::save_snapshot_request()).await?;
        command::ensure_success(&reply)
    }
}
