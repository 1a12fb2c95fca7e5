use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::repository::{RepoError, RoomRepository};
use concierge_core::{CoreError, Room, RoomStatus, RoomStatusChange};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::database::write_error;

pub struct StoreRoomRepository {
    pool: PgPool,
}

impl StoreRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: Uuid,
    number: String,
    room_type: String,
    floor: i32,
    nightly_rate: i64,
    status: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoomRow> for Room {
    type Error = CoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        Ok(Room {
            id: row.id,
            number: row.number,
            room_type: row.room_type,
            floor: row.floor,
            nightly_rate: row.nightly_rate,
            status: row.status.parse()?,
            updated_at: row.updated_at,
        })
    }
}

pub(crate) async fn write_room_status<'e, E: PgExecutor<'e>>(
    exec: E,
    id: Uuid,
    status: RoomStatus,
) -> Result<(), RepoError> {
    let result = sqlx::query("UPDATE rooms SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(exec)
        .await?;
    if result.rows_affected() == 0 {
        return Err(format!("room {} not found", id).into());
    }
    Ok(())
}

#[async_trait]
impl RoomRepository for StoreRoomRepository {
    async fn create_room(&self, room: &Room) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO rooms (id, number, room_type, floor, nightly_rate, status, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(room.id)
        .bind(&room.number)
        .bind(&room.room_type)
        .bind(room.floor)
        .bind(room.nightly_rate)
        .bind(room.status.as_str())
        .bind(room.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_room(&self, id: Uuid) -> Result<Option<Room>, RepoError> {
        let row: Option<RoomRow> = sqlx::query_as(
            "SELECT id, number, room_type, floor, nightly_rate, status, updated_at FROM rooms WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Room::try_from).transpose()?)
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, RepoError> {
        let rows: Vec<RoomRow> = sqlx::query_as(
            "SELECT id, number, room_type, floor, nightly_rate, status, updated_at FROM rooms ORDER BY number",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| Room::try_from(row).map_err(RepoError::from))
            .collect()
    }

    async fn update_room(&self, room: &Room) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            UPDATE rooms
            SET number = $2, room_type = $3, floor = $4, nightly_rate = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(room.id)
        .bind(&room.number)
        .bind(&room.room_type)
        .bind(room.floor)
        .bind(room.nightly_rate)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn set_room_status(&self, id: Uuid, status: RoomStatus) -> Result<(), RepoError> {
        write_room_status(&self.pool, id, status).await
    }

    async fn apply_status_changes(&self, changes: &[RoomStatusChange]) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;
        for change in changes {
            write_room_status(&mut *tx, change.room_id, change.to).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
