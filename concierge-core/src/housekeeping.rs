use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "DONE" => Ok(TaskStatus::Done),
            "CANCELLED" => Ok(TaskStatus::Cancelled),
            other => Err(CoreError::ValidationError(format!("Unknown task status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Normal,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Normal => "NORMAL",
            TaskPriority::High => "HIGH",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(TaskPriority::Low),
            "NORMAL" => Ok(TaskPriority::Normal),
            "HIGH" => Ok(TaskPriority::High),
            other => Err(CoreError::ValidationError(format!("Unknown task priority: {}", other))),
        }
    }
}

/// A cleaning assignment: one room, one cleaning status, at most one assignee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingTask {
    pub id: Uuid,
    pub room_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl HousekeepingTask {
    pub fn new(
        room_id: Uuid,
        assignee_id: Option<Uuid>,
        priority: TaskPriority,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id,
            assignee_id,
            status: TaskStatus::Pending,
            priority,
            notes,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, TaskStatus::Pending | TaskStatus::InProgress)
    }

    /// Assign or reassign while the task is still open.
    pub fn assign(&mut self, assignee_id: Uuid) -> CoreResult<()> {
        if !self.is_open() {
            return Err(CoreError::Conflict(format!("Task {} is already {}", self.id, self.status)));
        }
        self.assignee_id = Some(assignee_id);
        Ok(())
    }

    /// Pending → InProgress
    pub fn start(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != TaskStatus::Pending {
            return Err(self.invalid(TaskStatus::InProgress));
        }
        if self.assignee_id.is_none() {
            return Err(CoreError::ValidationError("Task must be assigned before it is started".to_string()));
        }
        self.status = TaskStatus::InProgress;
        self.started_at = Some(now);
        Ok(())
    }

    /// InProgress → Done
    pub fn complete(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != TaskStatus::InProgress {
            return Err(self.invalid(TaskStatus::Done));
        }
        self.status = TaskStatus::Done;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Pending/InProgress → Cancelled
    pub fn cancel(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.is_open() {
            return Err(self.invalid(TaskStatus::Cancelled));
        }
        self.status = TaskStatus::Cancelled;
        self.completed_at = Some(now);
        Ok(())
    }

    fn invalid(&self, to: TaskStatus) -> CoreError {
        CoreError::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_lifecycle() {
        let now = Utc::now();
        let mut task = HousekeepingTask::new(Uuid::new_v4(), None, TaskPriority::Normal, None, now);

        // Unassigned tasks cannot start
        assert!(matches!(task.start(now), Err(CoreError::ValidationError(_))));

        task.assign(Uuid::new_v4()).unwrap();
        task.start(now).unwrap();
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.started_at.is_some());

        task.complete(now).unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.completed_at.is_some());
        assert!(!task.is_open());

        assert!(task.assign(Uuid::new_v4()).is_err());
        assert!(task.cancel(now).is_err());
    }

    #[test]
    fn test_cannot_complete_pending_task() {
        let now = Utc::now();
        let mut task = HousekeepingTask::new(Uuid::new_v4(), Some(Uuid::new_v4()), TaskPriority::High, None, now);
        assert!(matches!(task.complete(now), Err(CoreError::InvalidTransition { .. })));

        task.cancel(now).unwrap();
        assert_eq!(task.status, TaskStatus::Cancelled);
        assert!(!task.is_open());
    }
}
