use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::repository::{RepoError, StaffRepository};
use concierge_core::{CoreError, StaffUser};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::write_error;

pub struct StoreStaffRepository {
    pool: PgPool,
}

impl StoreStaffRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const STAFF_COLUMNS: &str =
    "id, username, display_name, email, role, password_hash, active, created_at, last_login_at";

#[derive(sqlx::FromRow)]
struct StaffRow {
    id: Uuid,
    username: String,
    display_name: String,
    email: String,
    role: String,
    password_hash: String,
    active: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<StaffRow> for StaffUser {
    type Error = CoreError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        Ok(StaffUser {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            email: row.email,
            role: row.role.parse()?,
            password_hash: row.password_hash,
            active: row.active,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        })
    }
}

#[async_trait]
impl StaffRepository for StoreStaffRepository {
    async fn create_staff(&self, user: &StaffUser) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO staff (id, username, display_name, email, role, password_hash, active, created_at, last_login_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(user.created_at)
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_staff(&self, id: Uuid) -> Result<Option<StaffUser>, RepoError> {
        let sql = format!("SELECT {} FROM staff WHERE id = $1", STAFF_COLUMNS);
        let row: Option<StaffRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(StaffUser::try_from).transpose()?)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<StaffUser>, RepoError> {
        let sql = format!("SELECT {} FROM staff WHERE username = $1", STAFF_COLUMNS);
        let row: Option<StaffRow> = sqlx::query_as(&sql).bind(username).fetch_optional(&self.pool).await?;
        Ok(row.map(StaffUser::try_from).transpose()?)
    }

    async fn list_staff(&self) -> Result<Vec<StaffUser>, RepoError> {
        let sql = format!("SELECT {} FROM staff ORDER BY username", STAFF_COLUMNS);
        let rows: Vec<StaffRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| StaffUser::try_from(row).map_err(RepoError::from))
            .collect()
    }

    async fn update_staff(&self, user: &StaffUser) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE staff
            SET display_name = $2, email = $3, role = $4, password_hash = $5, active = $6, last_login_at = $7
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.display_name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(user.last_login_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_staff(&self) -> Result<i64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staff").fetch_one(&self.pool).await?;
        Ok(count)
    }
}
