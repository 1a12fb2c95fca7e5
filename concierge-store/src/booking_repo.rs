use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use concierge_core::repository::{BookingFilter, BookingRepository, RepoError};
use concierge_core::{Booking, BookingStatus, CoreError};
use concierge_shared::Masked;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::database::write_error;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, reference, kind, guest_name, guest_email, guest_phone, room_id, \
    arrival_date, departure_date, guests, status, tentative_expires_at, total_amount, currency, \
    notes, cancellation_reason, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    reference: String,
    kind: String,
    guest_name: String,
    guest_email: String,
    guest_phone: Option<String>,
    room_id: Option<Uuid>,
    arrival_date: NaiveDate,
    departure_date: NaiveDate,
    guests: i32,
    status: String,
    tentative_expires_at: Option<DateTime<Utc>>,
    total_amount: i64,
    currency: String,
    notes: Option<String>,
    cancellation_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            reference: row.reference,
            kind: row.kind.parse()?,
            guest_name: row.guest_name,
            guest_email: Masked::new(row.guest_email),
            guest_phone: row.guest_phone.map(Masked::new),
            room_id: row.room_id,
            arrival_date: row.arrival_date,
            departure_date: row.departure_date,
            guests: row.guests,
            status: row.status.parse()?,
            tentative_expires_at: row.tentative_expires_at,
            total_amount: row.total_amount,
            currency: row.currency,
            notes: row.notes,
            cancellation_reason: row.cancellation_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> Result<Vec<Booking>, RepoError> {
    rows.into_iter()
        .map(|row| Booking::try_from(row).map_err(RepoError::from))
        .collect()
}

/// Rewrite the mutable columns; shared with the front-desk transactions.
pub(crate) async fn write_booking<'e, E: PgExecutor<'e>>(exec: E, booking: &Booking) -> Result<(), RepoError> {
    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET guest_name = $2, guest_email = $3, guest_phone = $4, room_id = $5,
            arrival_date = $6, departure_date = $7, guests = $8, status = $9,
            tentative_expires_at = $10, total_amount = $11, notes = $12,
            cancellation_reason = $13, updated_at = $14
        WHERE id = $1
        "#,
    )
    .bind(booking.id)
    .bind(&booking.guest_name)
    .bind(booking.guest_email.expose())
    .bind(booking.guest_phone.as_ref().map(|p| p.expose().clone()))
    .bind(booking.room_id)
    .bind(booking.arrival_date)
    .bind(booking.departure_date)
    .bind(booking.guests)
    .bind(booking.status.as_str())
    .bind(booking.tentative_expires_at)
    .bind(booking.total_amount)
    .bind(&booking.notes)
    .bind(&booking.cancellation_reason)
    .bind(booking.updated_at)
    .execute(exec)
    .await?;

    if result.rows_affected() == 0 {
        return Err(format!("booking {} not found", booking.id).into());
    }
    Ok(())
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, reference, kind, guest_name, guest_email, guest_phone, room_id,
                arrival_date, departure_date, guests, status, tentative_expires_at, total_amount,
                currency, notes, cancellation_reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.reference)
        .bind(booking.kind.as_str())
        .bind(&booking.guest_name)
        .bind(booking.guest_email.expose())
        .bind(booking.guest_phone.as_ref().map(|p| p.expose().clone()))
        .bind(booking.room_id)
        .bind(booking.arrival_date)
        .bind(booking.departure_date)
        .bind(booking.guests)
        .bind(booking.status.as_str())
        .bind(booking.tentative_expires_at)
        .bind(booking.total_amount)
        .bind(&booking.currency)
        .bind(&booking.notes)
        .bind(&booking.cancellation_reason)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row: Option<BookingRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Booking::try_from).transpose()?)
    }

    async fn update_booking(&self, booking: &Booking) -> Result<(), RepoError> {
        write_booking(&self.pool, booking).await
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepoError> {
        let sql = format!(
            r#"
            SELECT {} FROM bookings
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::date IS NULL OR arrival_date >= $2)
              AND ($3::date IS NULL OR arrival_date <= $3)
              AND ($4::date IS NULL OR departure_date = $4)
              AND ($5::uuid IS NULL OR room_id = $5)
            ORDER BY arrival_date, created_at
            LIMIT $6
            "#,
            BOOKING_COLUMNS
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.arrival_from)
            .bind(filter.arrival_to)
            .bind(filter.departure_on)
            .bind(filter.room_id)
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;
        into_bookings(rows)
    }

    async fn list_tentative_expiring(&self, before: DateTime<Utc>) -> Result<Vec<Booking>, RepoError> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE status = $1 AND tentative_expires_at <= $2 ORDER BY tentative_expires_at",
            BOOKING_COLUMNS
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(BookingStatus::Tentative.as_str())
            .bind(before)
            .fetch_all(&self.pool)
            .await?;
        into_bookings(rows)
    }

    async fn occupied_room_ids(&self) -> Result<Vec<Uuid>, RepoError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT room_id FROM bookings WHERE status = $1 AND room_id IS NOT NULL",
        )
        .bind(BookingStatus::CheckedIn.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
