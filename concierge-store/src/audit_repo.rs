use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::repository::{AuditRepository, RepoError};
use concierge_core::AuditEntry;
use serde_json::Value;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

pub struct StoreAuditRepository {
    pool: PgPool,
}

impl StoreAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    actor: String,
    action: String,
    entity: String,
    entity_id: Option<Uuid>,
    details: Value,
    at: DateTime<Utc>,
}

pub(crate) async fn insert_audit<'e, E: PgExecutor<'e>>(exec: E, entry: &AuditEntry) -> Result<(), RepoError> {
    sqlx::query(
        "INSERT INTO audit_log (id, actor, action, entity, entity_id, details, at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(entry.id)
    .bind(&entry.actor)
    .bind(&entry.action)
    .bind(&entry.entity)
    .bind(entry.entity_id)
    .bind(&entry.details)
    .bind(entry.at)
    .execute(exec)
    .await?;
    Ok(())
}

#[async_trait]
impl AuditRepository for StoreAuditRepository {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepoError> {
        insert_audit(&self.pool, entry).await
    }

    async fn recent(&self, limit: i64) -> Result<Vec<AuditEntry>, RepoError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            "SELECT id, actor, action, entity, entity_id, details, at FROM audit_log ORDER BY at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AuditEntry {
                id: row.id,
                actor: row.actor,
                action: row.action,
                entity: row.entity,
                entity_id: row.entity_id,
                details: row.details,
                at: row.at,
            })
            .collect())
    }
}
