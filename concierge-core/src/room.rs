use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::housekeeping::{HousekeepingTask, TaskStatus};
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    Available,
    Occupied,
    Dirty,
    Cleaning,
    OutOfService,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "AVAILABLE",
            RoomStatus::Occupied => "OCCUPIED",
            RoomStatus::Dirty => "DIRTY",
            RoomStatus::Cleaning => "CLEANING",
            RoomStatus::OutOfService => "OUT_OF_SERVICE",
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(RoomStatus::Available),
            "OCCUPIED" => Ok(RoomStatus::Occupied),
            "DIRTY" => Ok(RoomStatus::Dirty),
            "CLEANING" => Ok(RoomStatus::Cleaning),
            "OUT_OF_SERVICE" => Ok(RoomStatus::OutOfService),
            other => Err(CoreError::ValidationError(format!("Unknown room status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub number: String,
    pub room_type: String,
    pub floor: i32,
    pub nightly_rate: i64,
    pub status: RoomStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRoom {
    pub number: String,
    pub room_type: String,
    #[serde(default)]
    pub floor: i32,
    pub nightly_rate: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoomUpdate {
    pub number: Option<String>,
    pub room_type: Option<String>,
    pub floor: Option<i32>,
    pub nightly_rate: Option<i64>,
}

impl Room {
    pub fn create(input: NewRoom, now: DateTime<Utc>) -> CoreResult<Self> {
        let number = input.number.trim().to_string();
        if number.is_empty() {
            return Err(CoreError::ValidationError("Room number is required".to_string()));
        }
        if input.room_type.trim().is_empty() {
            return Err(CoreError::ValidationError("Room type is required".to_string()));
        }
        if input.nightly_rate < 0 {
            return Err(CoreError::ValidationError("Nightly rate cannot be negative".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            number,
            room_type: input.room_type.trim().to_string(),
            floor: input.floor,
            nightly_rate: input.nightly_rate,
            status: RoomStatus::Available,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, update: RoomUpdate, now: DateTime<Utc>) -> CoreResult<()> {
        if let Some(number) = update.number {
            if number.trim().is_empty() {
                return Err(CoreError::ValidationError("Room number is required".to_string()));
            }
            self.number = number.trim().to_string();
        }
        if let Some(room_type) = update.room_type {
            self.room_type = room_type.trim().to_string();
        }
        if let Some(floor) = update.floor {
            self.floor = floor;
        }
        if let Some(rate) = update.nightly_rate {
            if rate < 0 {
                return Err(CoreError::ValidationError("Nightly rate cannot be negative".to_string()));
            }
            self.nightly_rate = rate;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Price of a stay in this room.
    pub fn price_for(&self, nights: i64) -> i64 {
        self.nightly_rate * nights.max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoomStatusChange {
    pub room_id: Uuid,
    pub room_number: String,
    pub from: RoomStatus,
    pub to: RoomStatus,
}

/// Status a room should have given occupancy and open housekeeping work.
///
/// Out-of-service rooms are left alone. Otherwise occupancy wins, then an
/// in-progress clean, then a pending one; a room with none of these is
/// available.
pub fn expected_status(
    current: RoomStatus,
    occupied: bool,
    open_task: Option<TaskStatus>,
) -> RoomStatus {
    if current == RoomStatus::OutOfService {
        return RoomStatus::OutOfService;
    }
    if occupied {
        return RoomStatus::Occupied;
    }
    match open_task {
        Some(TaskStatus::InProgress) => RoomStatus::Cleaning,
        Some(TaskStatus::Pending) => RoomStatus::Dirty,
        _ => RoomStatus::Available,
    }
}

/// Compare stored room statuses against bookings and housekeeping, returning
/// only the rooms that need correcting.
pub fn reconcile(
    rooms: &[Room],
    occupied_room_ids: &HashSet<Uuid>,
    open_tasks: &[HousekeepingTask],
) -> Vec<RoomStatusChange> {
    let mut task_by_room: HashMap<Uuid, TaskStatus> = HashMap::new();
    for task in open_tasks.iter().filter(|t| t.is_open()) {
        // InProgress outranks Pending if a room somehow has both
        let entry = task_by_room.entry(task.room_id).or_insert(task.status);
        if task.status == TaskStatus::InProgress {
            *entry = TaskStatus::InProgress;
        }
    }

    rooms
        .iter()
        .filter_map(|room| {
            let expected = expected_status(
                room.status,
                occupied_room_ids.contains(&room.id),
                task_by_room.get(&room.id).copied(),
            );
            (expected != room.status).then(|| RoomStatusChange {
                room_id: room.id,
                room_number: room.number.clone(),
                from: room.status,
                to: expected,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::housekeeping::TaskPriority;

    fn room(number: &str, status: RoomStatus) -> Room {
        let mut room = Room::create(
            NewRoom {
                number: number.to_string(),
                room_type: "DOUBLE".to_string(),
                floor: 1,
                nightly_rate: 12000,
            },
            Utc::now(),
        )
        .unwrap();
        room.status = status;
        room
    }

    #[test]
    fn test_reconcile_room_statuses() {
        let occupied = room("101", RoomStatus::Available);
        let cleaning = room("102", RoomStatus::Dirty);
        let dirty = room("103", RoomStatus::Occupied);
        let stale = room("104", RoomStatus::Cleaning);
        let broken = room("105", RoomStatus::OutOfService);
        let fine = room("106", RoomStatus::Available);

        let occupied_ids: HashSet<Uuid> = [occupied.id, broken.id].into_iter().collect();

        let mut in_progress = HousekeepingTask::new(cleaning.id, Some(Uuid::new_v4()), TaskPriority::Normal, None, Utc::now());
        in_progress.start(Utc::now()).unwrap();
        let pending = HousekeepingTask::new(dirty.id, None, TaskPriority::High, None, Utc::now());

        let rooms = vec![occupied.clone(), cleaning.clone(), dirty.clone(), stale.clone(), broken, fine];
        let changes = reconcile(&rooms, &occupied_ids, &[in_progress, pending]);

        assert_eq!(changes.len(), 4);
        let to_of = |id: Uuid| changes.iter().find(|c| c.room_id == id).map(|c| c.to);
        assert_eq!(to_of(occupied.id), Some(RoomStatus::Occupied));
        assert_eq!(to_of(cleaning.id), Some(RoomStatus::Cleaning));
        assert_eq!(to_of(dirty.id), Some(RoomStatus::Dirty));
        assert_eq!(to_of(stale.id), Some(RoomStatus::Available));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let rooms = vec![room("201", RoomStatus::Available), room("202", RoomStatus::OutOfService)];
        assert!(reconcile(&rooms, &HashSet::new(), &[]).is_empty());
    }

    #[test]
    fn test_room_validation_and_pricing() {
        let result = Room::create(
            NewRoom { number: " ".to_string(), room_type: "SUITE".to_string(), floor: 3, nightly_rate: 100 },
            Utc::now(),
        );
        assert!(result.is_err());

        let suite = room("301", RoomStatus::Available);
        assert_eq!(suite.price_for(3), 36000);
        assert_eq!(suite.price_for(-1), 0);
    }
}
