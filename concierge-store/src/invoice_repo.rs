use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_core::repository::{InvoiceRepository, RepoError};
use concierge_core::Invoice;
use concierge_shared::Masked;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::database::write_error;

pub struct StoreInvoiceRepository {
    pool: PgPool,
}

impl StoreInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INVOICE_COLUMNS: &str = "id, number, booking_id, bill_to_name, bill_to_email, subtotal, \
    vat_rate_bp, vat_amount, total, currency, issued_at, last_sent_at, send_count";

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    number: String,
    booking_id: Uuid,
    bill_to_name: String,
    bill_to_email: String,
    subtotal: i64,
    vat_rate_bp: i32,
    vat_amount: i64,
    total: i64,
    currency: String,
    issued_at: DateTime<Utc>,
    last_sent_at: Option<DateTime<Utc>>,
    send_count: i32,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice {
            id: row.id,
            number: row.number,
            booking_id: row.booking_id,
            bill_to_name: row.bill_to_name,
            bill_to_email: Masked::new(row.bill_to_email),
            subtotal: row.subtotal,
            vat_rate_bp: row.vat_rate_bp,
            vat_amount: row.vat_amount,
            total: row.total,
            currency: row.currency,
            issued_at: row.issued_at,
            last_sent_at: row.last_sent_at,
            send_count: row.send_count,
        }
    }
}

pub(crate) async fn insert_invoice<'e, E: PgExecutor<'e>>(exec: E, invoice: &Invoice) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        INSERT INTO invoices (id, number, booking_id, bill_to_name, bill_to_email, subtotal,
            vat_rate_bp, vat_amount, total, currency, issued_at, last_sent_at, send_count)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(invoice.id)
    .bind(&invoice.number)
    .bind(invoice.booking_id)
    .bind(&invoice.bill_to_name)
    .bind(invoice.bill_to_email.expose())
    .bind(invoice.subtotal)
    .bind(invoice.vat_rate_bp)
    .bind(invoice.vat_amount)
    .bind(invoice.total)
    .bind(&invoice.currency)
    .bind(invoice.issued_at)
    .bind(invoice.last_sent_at)
    .bind(invoice.send_count)
    .execute(exec)
    .await
    .map_err(write_error)?;
    Ok(())
}

#[async_trait]
impl InvoiceRepository for StoreInvoiceRepository {
    async fn next_invoice_sequence(&self) -> Result<i64, RepoError> {
        let next: i64 = sqlx::query_scalar("SELECT nextval('invoice_number_seq')")
            .fetch_one(&self.pool)
            .await?;
        Ok(next)
    }

    async fn create_invoice(&self, invoice: &Invoice) -> Result<(), RepoError> {
        insert_invoice(&self.pool, invoice).await
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, RepoError> {
        let sql = format!("SELECT {} FROM invoices WHERE id = $1", INVOICE_COLUMNS);
        let row: Option<InvoiceRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Invoice::from))
    }

    async fn get_invoice_for_booking(&self, booking_id: Uuid) -> Result<Option<Invoice>, RepoError> {
        let sql = format!("SELECT {} FROM invoices WHERE booking_id = $1", INVOICE_COLUMNS);
        let row: Option<InvoiceRow> = sqlx::query_as(&sql).bind(booking_id).fetch_optional(&self.pool).await?;
        Ok(row.map(Invoice::from))
    }

    async fn list_invoices(&self, limit: i64) -> Result<Vec<Invoice>, RepoError> {
        let sql = format!("SELECT {} FROM invoices ORDER BY issued_at DESC LIMIT $1", INVOICE_COLUMNS);
        let rows: Vec<InvoiceRow> = sqlx::query_as(&sql).bind(limit).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Invoice::from).collect())
    }

    async fn record_invoice_sent(&self, invoice: &Invoice) -> Result<(), RepoError> {
        sqlx::query("UPDATE invoices SET last_sent_at = $2, send_count = $3 WHERE id = $1")
            .bind(invoice.id)
            .bind(invoice.last_sent_at)
            .bind(invoice.send_count)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
