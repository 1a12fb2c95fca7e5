use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::repository::{PaymentRepository, RepoError};
use concierge_core::{CoreError, PaymentRecord, PaymentStatus};
use sqlx::PgPool;
use uuid::Uuid;

pub struct StorePaymentRepository {
    pool: PgPool,
}

impl StorePaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PAYMENT_COLUMNS: &str = "id, booking_id, amount, vat_rate_bp, vat_amount, net_amount, currency, \
    method, status, reference, recorded_by, created_at";

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount: i64,
    vat_rate_bp: i32,
    vat_amount: i64,
    net_amount: i64,
    currency: String,
    method: String,
    status: String,
    reference: Option<String>,
    recorded_by: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = CoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PaymentRecord {
            id: row.id,
            booking_id: row.booking_id,
            amount: row.amount,
            vat_rate_bp: row.vat_rate_bp,
            vat_amount: row.vat_amount,
            net_amount: row.net_amount,
            currency: row.currency,
            method: row.method.parse()?,
            status: row.status.parse()?,
            reference: row.reference,
            recorded_by: row.recorded_by,
            created_at: row.created_at,
        })
    }
}

fn into_payments(rows: Vec<PaymentRow>) -> Result<Vec<PaymentRecord>, RepoError> {
    rows.into_iter()
        .map(|row| PaymentRecord::try_from(row).map_err(RepoError::from))
        .collect()
}

#[async_trait]
impl PaymentRepository for StorePaymentRepository {
    async fn record_payment(&self, payment: &PaymentRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, booking_id, amount, vat_rate_bp, vat_amount, net_amount, currency,
                method, status, reference, recorded_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.amount)
        .bind(payment.vat_rate_bp)
        .bind(payment.vat_amount)
        .bind(payment.net_amount)
        .bind(&payment.currency)
        .bind(payment.method.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.reference)
        .bind(&payment.recorded_by)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<PaymentRecord>, RepoError> {
        let sql = format!("SELECT {} FROM payments WHERE id = $1", PAYMENT_COLUMNS);
        let row: Option<PaymentRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(PaymentRecord::try_from).transpose()?)
    }

    async fn update_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE payments SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(format!("payment {} not found", id).into());
        }
        Ok(())
    }

    async fn list_payments_for_booking(&self, booking_id: Uuid) -> Result<Vec<PaymentRecord>, RepoError> {
        let sql = format!(
            "SELECT {} FROM payments WHERE booking_id = $1 ORDER BY created_at",
            PAYMENT_COLUMNS
        );
        let rows: Vec<PaymentRow> = sqlx::query_as(&sql).bind(booking_id).fetch_all(&self.pool).await?;
        into_payments(rows)
    }

    async fn list_payments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentRecord>, RepoError> {
        let sql = format!(
            "SELECT {} FROM payments WHERE created_at >= $1 AND created_at < $2 ORDER BY created_at",
            PAYMENT_COLUMNS
        );
        let rows: Vec<PaymentRow> = sqlx::query_as(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        into_payments(rows)
    }
}
