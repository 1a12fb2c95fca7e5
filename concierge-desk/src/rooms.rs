use chrono::Utc;
use concierge_core::room::{reconcile, NewRoom, RoomUpdate};
use concierge_core::staff::Actor;
use concierge_core::{AuditEntry, Room, RoomStatus, RoomStatusChange};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{DeskContext, DeskResult};

/// Room inventory and status upkeep.
#[derive(Clone)]
pub struct RoomDesk {
    ctx: DeskContext,
}

impl RoomDesk {
    pub fn new(ctx: DeskContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, input: NewRoom, actor: &Actor) -> DeskResult<Room> {
        let room = Room::create(input, Utc::now())?;
        self.ctx.repos.rooms.create_room(&room).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "room.create",
                "room",
                Some(room.id),
                serde_json::json!({ "number": room.number, "room_type": room.room_type }),
            ))
            .await?;
        Ok(room)
    }

    pub async fn get(&self, id: Uuid) -> DeskResult<Room> {
        self.ctx.room(id).await
    }

    pub async fn list(&self) -> DeskResult<Vec<Room>> {
        Ok(self.ctx.repos.rooms.list_rooms().await?)
    }

    pub async fn update(&self, id: Uuid, update: RoomUpdate, actor: &Actor) -> DeskResult<Room> {
        let mut room = self.ctx.room(id).await?;
        room.apply_update(update, Utc::now())?;
        self.ctx.repos.rooms.update_room(&room).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "room.update",
                "room",
                Some(room.id),
                serde_json::json!({ "number": room.number, "nightly_rate": room.nightly_rate }),
            ))
            .await?;
        Ok(room)
    }

    /// Manual override from the rooms screen.
    pub async fn set_status(&self, id: Uuid, status: RoomStatus, actor: &Actor) -> DeskResult<Room> {
        let mut room = self.ctx.room(id).await?;
        let from = room.status;
        if from == status {
            return Ok(room);
        }
        self.ctx.repos.rooms.set_room_status(id, status).await?;
        room.status = status;
        room.updated_at = Utc::now();

        self.ctx
            .audit(AuditEntry::new(
                actor,
                "room.set_status",
                "room",
                Some(room.id),
                serde_json::json!({ "number": room.number, "from": from, "to": status }),
            ))
            .await?;
        self.ctx
            .publish_room_change(room.id, &room.number, from.as_str(), status.as_str())
            .await;
        Ok(room)
    }

    /// Recompute every room's status from bookings and housekeeping and fix
    /// the ones that drifted.
    pub async fn reconcile(&self, actor: &Actor) -> DeskResult<Vec<RoomStatusChange>> {
        let rooms = self.ctx.repos.rooms.list_rooms().await?;
        let occupied: HashSet<Uuid> = self.ctx.repos.bookings.occupied_room_ids().await?.into_iter().collect();
        let open_tasks = self.ctx.repos.housekeeping.open_tasks().await?;

        let changes = reconcile(&rooms, &occupied, &open_tasks);
        if changes.is_empty() {
            tracing::debug!(rooms = rooms.len(), "Room statuses already consistent");
            return Ok(changes);
        }

        self.ctx.repos.rooms.apply_status_changes(&changes).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "room.reconcile",
                "room",
                None,
                serde_json::json!({ "changes": changes }),
            ))
            .await?;

        tracing::info!(changed = changes.len(), "Room statuses reconciled");
        for change in &changes {
            self.ctx
                .publish_room_change(change.room_id, &change.room_number, change.from.as_str(), change.to.as_str())
                .await;
        }
        Ok(changes)
    }
}
