use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::repository::{HousekeepingRepository, RepoError, TaskFilter};
use concierge_core::{CoreError, HousekeepingTask};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::database::write_error;

pub struct StoreHousekeepingRepository {
    pool: PgPool,
}

impl StoreHousekeepingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TASK_COLUMNS: &str =
    "id, room_id, assignee_id, status, priority, notes, created_at, started_at, completed_at";

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    room_id: Uuid,
    assignee_id: Option<Uuid>,
    status: String,
    priority: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TaskRow> for HousekeepingTask {
    type Error = CoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(HousekeepingTask {
            id: row.id,
            room_id: row.room_id,
            assignee_id: row.assignee_id,
            status: row.status.parse()?,
            priority: row.priority.parse()?,
            notes: row.notes,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

fn into_tasks(rows: Vec<TaskRow>) -> Result<Vec<HousekeepingTask>, RepoError> {
    rows.into_iter()
        .map(|row| HousekeepingTask::try_from(row).map_err(RepoError::from))
        .collect()
}

/// Insert or overwrite a task row.
pub(crate) async fn upsert_task<'e, E: PgExecutor<'e>>(exec: E, task: &HousekeepingTask) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        INSERT INTO housekeeping_tasks (id, room_id, assignee_id, status, priority, notes, created_at, started_at, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE
        SET assignee_id = EXCLUDED.assignee_id, status = EXCLUDED.status, priority = EXCLUDED.priority,
            notes = EXCLUDED.notes, started_at = EXCLUDED.started_at, completed_at = EXCLUDED.completed_at
        "#,
    )
    .bind(task.id)
    .bind(task.room_id)
    .bind(task.assignee_id)
    .bind(task.status.as_str())
    .bind(task.priority.as_str())
    .bind(&task.notes)
    .bind(task.created_at)
    .bind(task.started_at)
    .bind(task.completed_at)
    .execute(exec)
    .await
    .map_err(write_error)?;
    Ok(())
}

#[async_trait]
impl HousekeepingRepository for StoreHousekeepingRepository {
    async fn create_task(&self, task: &HousekeepingTask) -> Result<(), RepoError> {
        upsert_task(&self.pool, task).await
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<HousekeepingTask>, RepoError> {
        let sql = format!("SELECT {} FROM housekeeping_tasks WHERE id = $1", TASK_COLUMNS);
        let row: Option<TaskRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(HousekeepingTask::try_from).transpose()?)
    }

    async fn update_task(&self, task: &HousekeepingTask) -> Result<(), RepoError> {
        upsert_task(&self.pool, task).await
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<HousekeepingTask>, RepoError> {
        let sql = format!(
            r#"
            SELECT {} FROM housekeeping_tasks
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR assignee_id = $2)
              AND ($3::uuid IS NULL OR room_id = $3)
            ORDER BY CASE priority WHEN 'HIGH' THEN 0 WHEN 'NORMAL' THEN 1 ELSE 2 END, created_at
            "#,
            TASK_COLUMNS
        );
        let rows: Vec<TaskRow> = sqlx::query_as(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.assignee_id)
            .bind(filter.room_id)
            .fetch_all(&self.pool)
            .await?;
        into_tasks(rows)
    }

    async fn open_tasks(&self) -> Result<Vec<HousekeepingTask>, RepoError> {
        let sql = format!(
            "SELECT {} FROM housekeeping_tasks WHERE status IN ('PENDING', 'IN_PROGRESS')",
            TASK_COLUMNS
        );
        let rows: Vec<TaskRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        into_tasks(rows)
    }
}
