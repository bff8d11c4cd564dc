//! Room manager: creates, tracks and lists rooms.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use soulwell_game::{BotMover, CautiousMover};
use soulwell_protocol::RoomId;

use crate::room::spawn_room;
use crate::{RoomConfig, RoomError, RoomHandle, RoomInfo, RoomSettings};

/// Counter for generating unique room IDs.
static NEXT_ROOM_ID: AtomicU64 = AtomicU64::new(1);

/// Every live room on the server.
///
/// The manager only hands out [`RoomHandle`]s; which room a connection is
/// seated in is tracked by the connection itself. Rooms close on their
/// own once their last player is gone, and closed handles are dropped
/// the next time the manager looks.
pub struct RoomManager {
    rooms: HashMap<RoomId, RoomHandle>,
    config: RoomConfig,
    mover: Arc<dyn BotMover>,
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new(RoomConfig::default())
    }
}

impl RoomManager {
    /// A manager whose bots use [`CautiousMover`].
    pub fn new(config: RoomConfig) -> Self {
        Self::with_mover(config, Arc::new(CautiousMover))
    }

    pub fn with_mover(config: RoomConfig, mover: Arc<dyn BotMover>) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
            mover,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Spawns an empty room. The creator still has to
    /// [`join`](RoomHandle::join) it.
    pub fn create_room(&mut self, settings: &RoomSettings) -> Result<RoomHandle, RoomError> {
        let room_id = RoomId(NEXT_ROOM_ID.fetch_add(1, Ordering::Relaxed));
        let handle = spawn_room(
            room_id,
            settings,
            self.config.clone(),
            Arc::clone(&self.mover),
        )?;
        self.rooms.insert(room_id, handle.clone());
        tracing::info!(%room_id, deck = %settings.deck_type, mode = ?settings.mode, "room created");
        Ok(handle)
    }

    /// The handle for a live room.
    pub fn room(&self, room_id: RoomId) -> Result<RoomHandle, RoomError> {
        self.rooms
            .get(&room_id)
            .filter(|h| !h.is_closed())
            .cloned()
            .ok_or(RoomError::NotFound(room_id))
    }

    /// Lists the rooms a newcomer could join, oldest first.
    ///
    /// Rooms that fail to answer (closing) are skipped.
    pub async fn list_rooms(&mut self) -> Vec<RoomInfo> {
        self.prune_closed();
        let mut infos = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(info) = handle.info().await {
                if info.is_joinable() {
                    infos.push(info);
                }
            }
        }
        infos.sort_by_key(|info| info.room_id);
        infos
    }

    /// Shuts a room down and forgets it.
    pub async fn destroy_room(&mut self, room_id: RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(&room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        let _ = handle.shutdown().await;
        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    /// Forgets every room whose actor has stopped.
    pub fn prune_closed(&mut self) {
        self.rooms.retain(|room_id, handle| {
            let open = !handle.is_closed();
            if !open {
                tracing::debug!(%room_id, "closed room pruned");
            }
            open
        });
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> = self.rooms.keys().copied().collect();
        ids.sort();
        ids
    }
}
