use chrono::Utc;
use concierge_core::repository::TaskFilter;
use concierge_core::room::expected_status;
use concierge_core::staff::{Actor, Role};
use concierge_core::{AuditEntry, CoreError, HousekeepingTask, TaskPriority, TaskStatus};
use serde::Deserialize;
use uuid::Uuid;

use crate::{DeskContext, DeskError, DeskResult};

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub room_id: Uuid,
    pub assignee_id: Option<Uuid>,
    #[serde(default = "default_priority")]
    pub priority: TaskPriority,
    pub notes: Option<String>,
}

fn default_priority() -> TaskPriority {
    TaskPriority::Normal
}

/// Cleaning assignments and the room statuses they drive.
#[derive(Clone)]
pub struct HousekeepingDesk {
    ctx: DeskContext,
}

impl HousekeepingDesk {
    pub fn new(ctx: DeskContext) -> Self {
        Self { ctx }
    }

    /// Open an assignment. A room has at most one open task. A housekeeper
    /// can only open tasks for themselves.
    pub async fn create(&self, mut input: NewTask, actor: &Actor) -> DeskResult<HousekeepingTask> {
        if actor.role == Role::Housekeeping {
            match input.assignee_id {
                Some(id) if id != actor.staff_id => {
                    return Err(DeskError::Forbidden(format!("{} cannot assign housekeeping tasks", actor.username)));
                }
                _ => input.assignee_id = Some(actor.staff_id),
            }
        }
        self.ctx.room(input.room_id).await?;
        if self.open_task_for(input.room_id).await?.is_some() {
            return Err(CoreError::Conflict(format!("Room {} already has an open housekeeping task", input.room_id)).into());
        }
        if let Some(assignee_id) = input.assignee_id {
            self.check_assignee(assignee_id).await?;
        }

        let task = HousekeepingTask::new(input.room_id, input.assignee_id, input.priority, input.notes, Utc::now());
        self.ctx.repos.housekeeping.create_task(&task).await?;
        self.record(&task, "housekeeping.create", actor).await?;
        self.settle_room(task.room_id, Some(task.status)).await?;

        tracing::info!(task_id = %task.id, room_id = %task.room_id, priority = task.priority.as_str(), "Housekeeping task created");
        Ok(task)
    }

    /// Housekeepers only ever see their own assignments.
    pub async fn list(&self, mut filter: TaskFilter, actor: &Actor) -> DeskResult<Vec<HousekeepingTask>> {
        if actor.role == Role::Housekeeping {
            filter.assignee_id = Some(actor.staff_id);
        }
        Ok(self.ctx.repos.housekeeping.list_tasks(&filter).await?)
    }

    pub async fn get(&self, id: Uuid, actor: &Actor) -> DeskResult<HousekeepingTask> {
        let task = self.load(id).await?;
        Self::check_own(&task, actor)?;
        Ok(task)
    }

    /// Handing out work is a supervisor job; housekeepers cannot assign or
    /// reassign, not even to themselves.
    pub async fn assign(&self, id: Uuid, assignee_id: Uuid, actor: &Actor) -> DeskResult<HousekeepingTask> {
        if actor.role == Role::Housekeeping {
            return Err(DeskError::Forbidden(format!("{} cannot assign housekeeping tasks", actor.username)));
        }
        let mut task = self.load(id).await?;
        self.check_assignee(assignee_id).await?;
        task.assign(assignee_id)?;
        self.ctx.repos.housekeeping.update_task(&task).await?;
        self.record(&task, "housekeeping.assign", actor).await?;
        Ok(task)
    }

    pub async fn start(&self, id: Uuid, actor: &Actor) -> DeskResult<HousekeepingTask> {
        let mut task = self.get(id, actor).await?;
        task.start(Utc::now())?;
        self.ctx.repos.housekeeping.update_task(&task).await?;
        self.record(&task, "housekeeping.start", actor).await?;
        self.settle_room(task.room_id, Some(task.status)).await?;
        Ok(task)
    }

    pub async fn complete(&self, id: Uuid, actor: &Actor) -> DeskResult<HousekeepingTask> {
        let mut task = self.get(id, actor).await?;
        task.complete(Utc::now())?;
        self.ctx.repos.housekeeping.update_task(&task).await?;
        self.record(&task, "housekeeping.complete", actor).await?;
        self.settle_room(task.room_id, None).await?;

        tracing::info!(task_id = %task.id, room_id = %task.room_id, "Room cleaned");
        Ok(task)
    }

    pub async fn cancel(&self, id: Uuid, actor: &Actor) -> DeskResult<HousekeepingTask> {
        let mut task = self.get(id, actor).await?;
        task.cancel(Utc::now())?;
        self.ctx.repos.housekeeping.update_task(&task).await?;
        self.record(&task, "housekeeping.cancel", actor).await?;
        self.settle_room(task.room_id, None).await?;
        Ok(task)
    }

    async fn load(&self, id: Uuid) -> DeskResult<HousekeepingTask> {
        self.ctx
            .repos
            .housekeeping
            .get_task(id)
            .await?
            .ok_or_else(|| DeskError::NotFound(format!("housekeeping task {}", id)))
    }

    async fn open_task_for(&self, room_id: Uuid) -> DeskResult<Option<HousekeepingTask>> {
        let filter = TaskFilter { room_id: Some(room_id), ..Default::default() };
        let tasks = self.ctx.repos.housekeeping.list_tasks(&filter).await?;
        Ok(tasks.into_iter().find(|t| t.is_open()))
    }

    async fn check_assignee(&self, staff_id: Uuid) -> DeskResult<()> {
        let staff = self
            .ctx
            .repos
            .staff
            .get_staff(staff_id)
            .await?
            .ok_or_else(|| DeskError::NotFound(format!("staff {}", staff_id)))?;
        if !staff.active {
            return Err(DeskError::Precondition(format!("{} is deactivated", staff.username)));
        }
        Ok(())
    }

    fn check_own(task: &HousekeepingTask, actor: &Actor) -> DeskResult<()> {
        if actor.role == Role::Housekeeping && task.assignee_id != Some(actor.staff_id) {
            return Err(DeskError::Forbidden(format!("Task {} is not assigned to {}", task.id, actor.username)));
        }
        Ok(())
    }

    async fn record(&self, task: &HousekeepingTask, action: &str, actor: &Actor) -> DeskResult<()> {
        self.ctx
            .audit(AuditEntry::new(
                actor,
                action,
                "housekeeping_task",
                Some(task.id),
                serde_json::json!({
                    "room_id": task.room_id,
                    "status": task.status,
                    "assignee_id": task.assignee_id,
                }),
            ))
            .await
    }

    /// Bring the room in line with occupancy and the given open task state,
    /// the same precedence the reconciliation run applies.
    async fn settle_room(&self, room_id: Uuid, open_task: Option<TaskStatus>) -> DeskResult<()> {
        let room = self.ctx.room(room_id).await?;
        let occupied = self.ctx.repos.bookings.occupied_room_ids().await?.contains(&room_id);
        let next = expected_status(room.status, occupied, open_task);
        if next == room.status {
            return Ok(());
        }
        self.ctx.repos.rooms.set_room_status(room_id, next).await?;
        self.ctx
            .publish_room_change(room.id, &room.number, room.status.as_str(), next.as_str())
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{actor, fixture, room};
    use concierge_core::RoomStatus;
    use concierge_core::StaffUser;
    use concierge_shared::models::events::DomainEvent;

    async fn housekeeper(f: &crate::testing::Fixture, username: &str) -> Actor {
        let user = StaffUser::create(username, "Housekeeper", "hk@hotel.example", Role::Housekeeping, "$2b$hash".to_string(), Utc::now()).unwrap();
        f.store.repositories().staff.create_staff(&user).await.unwrap();
        user.actor()
    }

    fn task_for(room_id: Uuid, assignee_id: Option<Uuid>) -> NewTask {
        NewTask { room_id, assignee_id, priority: TaskPriority::Normal, notes: None }
    }

    #[tokio::test]
    async fn test_task_lifecycle_drives_room_status() {
        let f = fixture();
        let room = room(&f, "401").await;
        let manager = actor(Role::Manager);
        let cleaner = housekeeper(&f, "rosa").await;

        let task = f.desk.housekeeping.create(task_for(room.id, Some(cleaner.staff_id)), &manager).await.unwrap();
        assert_eq!(f.desk.rooms.get(room.id).await.unwrap().status, RoomStatus::Dirty);

        f.desk.housekeeping.start(task.id, &cleaner).await.unwrap();
        assert_eq!(f.desk.rooms.get(room.id).await.unwrap().status, RoomStatus::Cleaning);

        let done = f.desk.housekeeping.complete(task.id, &cleaner).await.unwrap();
        assert_eq!(done.status, TaskStatus::Done);
        assert_eq!(f.desk.rooms.get(room.id).await.unwrap().status, RoomStatus::Available);

        let room_events = f
            .notifier
            .events()
            .into_iter()
            .filter(|e| matches!(e, DomainEvent::RoomStatusChanged(_)))
            .count();
        assert_eq!(room_events, 3);
    }

    #[tokio::test]
    async fn test_one_open_task_per_room() {
        let f = fixture();
        let room = room(&f, "402").await;
        let manager = actor(Role::Manager);

        let first = f.desk.housekeeping.create(task_for(room.id, None), &manager).await.unwrap();
        let second = f.desk.housekeeping.create(task_for(room.id, None), &manager).await;
        assert!(matches!(second, Err(DeskError::Domain(CoreError::Conflict(_)))));

        f.desk.housekeeping.cancel(first.id, &manager).await.unwrap();
        assert_eq!(f.desk.rooms.get(room.id).await.unwrap().status, RoomStatus::Available);
        f.desk.housekeeping.create(task_for(room.id, None), &manager).await.unwrap();
    }

    #[tokio::test]
    async fn test_housekeeper_limited_to_own_tasks() {
        let f = fixture();
        let room_a = room(&f, "403").await;
        let room_b = room(&f, "404").await;
        let manager = actor(Role::Manager);
        let rosa = housekeeper(&f, "rosa").await;
        let ivan = housekeeper(&f, "ivan").await;

        let rosas = f.desk.housekeeping.create(task_for(room_a.id, Some(rosa.staff_id)), &manager).await.unwrap();
        f.desk.housekeeping.create(task_for(room_b.id, Some(ivan.staff_id)), &manager).await.unwrap();

        let visible = f.desk.housekeeping.list(TaskFilter::default(), &rosa).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, rosas.id);
        assert_eq!(f.desk.housekeeping.list(TaskFilter::default(), &manager).await.unwrap().len(), 2);

        let result = f.desk.housekeeping.start(rosas.id, &ivan).await;
        assert!(matches!(result, Err(DeskError::Forbidden(_))));
        assert!(matches!(f.desk.housekeeping.get(rosas.id, &ivan).await, Err(DeskError::Forbidden(_))));
        assert!(matches!(f.desk.housekeeping.cancel(rosas.id, &ivan).await, Err(DeskError::Forbidden(_))));
        assert_eq!(f.desk.housekeeping.get(rosas.id, &rosa).await.unwrap().id, rosas.id);

        // Housekeepers cannot take over work, their own or anyone else's
        let result = f.desk.housekeeping.assign(rosas.id, ivan.staff_id, &ivan).await;
        assert!(matches!(result, Err(DeskError::Forbidden(_))));
        let result = f.desk.housekeeping.assign(rosas.id, ivan.staff_id, &rosa).await;
        assert!(matches!(result, Err(DeskError::Forbidden(_))));
        let untouched = f.desk.housekeeping.get(rosas.id, &manager).await.unwrap();
        assert_eq!(untouched.assignee_id, Some(rosa.staff_id));
        assert_eq!(untouched.status, TaskStatus::Pending);

        // Reassigning hands the task over
        f.desk.housekeeping.assign(rosas.id, ivan.staff_id, &manager).await.unwrap();
        f.desk.housekeeping.start(rosas.id, &ivan).await.unwrap();
        assert!(matches!(f.desk.housekeeping.get(rosas.id, &rosa).await, Err(DeskError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_housekeeper_creates_only_own_tasks() {
        let f = fixture();
        let room_a = room(&f, "406").await;
        let room_b = room(&f, "407").await;
        let rosa = housekeeper(&f, "rosa").await;
        let ivan = housekeeper(&f, "ivan").await;

        let result = f.desk.housekeeping.create(task_for(room_a.id, Some(ivan.staff_id)), &rosa).await;
        assert!(matches!(result, Err(DeskError::Forbidden(_))));

        let own = f.desk.housekeeping.create(task_for(room_b.id, None), &rosa).await.unwrap();
        assert_eq!(own.assignee_id, Some(rosa.staff_id));
        f.desk.housekeeping.start(own.id, &rosa).await.unwrap();
    }

    #[tokio::test]
    async fn test_assignee_must_exist() {
        let f = fixture();
        let room = room(&f, "405").await;
        let result = f.desk.housekeeping.create(task_for(room.id, Some(Uuid::new_v4())), &actor(Role::Manager)).await;
        assert!(matches!(result, Err(DeskError::NotFound(_))));
    }
}
