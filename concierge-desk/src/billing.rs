use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use concierge_core::notify::EmailMessage;
use concierge_core::payment::{NewPayment, TakingsReport};
use concierge_core::staff::Actor;
use concierge_core::{AuditEntry, Booking, BookingStatus, Invoice, LedgerSummary, PaymentRecord};
use uuid::Uuid;

use crate::{DeskContext, DeskError, DeskResult};

/// Payment ledger and invoices.
#[derive(Clone)]
pub struct Billing {
    ctx: DeskContext,
}

impl Billing {
    pub fn new(ctx: DeskContext) -> Self {
        Self { ctx }
    }

    pub async fn record_payment(&self, booking_id: Uuid, input: NewPayment, actor: &Actor) -> DeskResult<PaymentRecord> {
        let booking = self.ctx.booking(booking_id).await?;
        if booking.status == BookingStatus::Cancelled {
            return Err(DeskError::Precondition(format!(
                "Booking {} is cancelled; payments cannot be taken",
                booking.reference
            )));
        }

        let payment = PaymentRecord::record(
            booking.id,
            input,
            self.ctx.rules.vat_rate_bp,
            &booking.currency,
            &actor.username,
            Utc::now(),
        )?;
        self.ctx.repos.payments.record_payment(&payment).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "payment.record",
                "payment",
                Some(payment.id),
                serde_json::json!({
                    "booking": booking.reference,
                    "amount": payment.amount,
                    "method": payment.method,
                }),
            ))
            .await?;

        tracing::info!(reference = %booking.reference, amount = payment.amount, method = payment.method.as_str(), "Payment recorded");
        Ok(payment)
    }

    pub async fn payments(&self, booking_id: Uuid) -> DeskResult<Vec<PaymentRecord>> {
        self.ctx.booking(booking_id).await?;
        Ok(self.ctx.repos.payments.list_payments_for_booking(booking_id).await?)
    }

    pub async fn ledger(&self, booking_id: Uuid) -> DeskResult<LedgerSummary> {
        let booking = self.ctx.booking(booking_id).await?;
        let payments = self.ctx.repos.payments.list_payments_for_booking(booking_id).await?;
        Ok(LedgerSummary::build(booking.id, booking.total_amount, &booking.currency, &payments))
    }

    pub async fn refund(&self, payment_id: Uuid, actor: &Actor) -> DeskResult<PaymentRecord> {
        let mut payment = self.payment(payment_id).await?;
        payment.refund()?;
        self.settle(&payment, "payment.refund", actor).await?;
        Ok(payment)
    }

    pub async fn void(&self, payment_id: Uuid, actor: &Actor) -> DeskResult<PaymentRecord> {
        let mut payment = self.payment(payment_id).await?;
        payment.void()?;
        self.settle(&payment, "payment.void", actor).await?;
        Ok(payment)
    }

    async fn payment(&self, id: Uuid) -> DeskResult<PaymentRecord> {
        self.ctx
            .repos
            .payments
            .get_payment(id)
            .await?
            .ok_or_else(|| DeskError::NotFound(format!("payment {}", id)))
    }

    async fn settle(&self, payment: &PaymentRecord, action: &str, actor: &Actor) -> DeskResult<()> {
        self.ctx.repos.payments.update_payment_status(payment.id, payment.status).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                action,
                "payment",
                Some(payment.id),
                serde_json::json!({ "booking_id": payment.booking_id, "amount": payment.amount }),
            ))
            .await?;
        tracing::info!(payment_id = %payment.id, status = %payment.status, "Payment settled");
        Ok(())
    }

    /// Completed payments taken on `date` (UTC day).
    pub async fn takings(&self, date: NaiveDate) -> DeskResult<TakingsReport> {
        let from = date.and_time(NaiveTime::MIN).and_utc();
        let to = from + Duration::days(1);
        let payments = self.ctx.repos.payments.list_payments_between(from, to).await?;
        Ok(TakingsReport::build(date, &self.ctx.rules.currency, &payments))
    }

    /// Issue the booking's invoice. Returns the existing one (and `false`)
    /// if it was already issued.
    pub async fn issue_invoice(&self, booking_id: Uuid, actor: &Actor) -> DeskResult<(Invoice, bool)> {
        let booking = self.ctx.booking(booking_id).await?;
        if let Some(existing) = self.ctx.repos.invoices.get_invoice_for_booking(booking.id).await? {
            return Ok((existing, false));
        }
        if matches!(booking.status, BookingStatus::Tentative | BookingStatus::Cancelled) {
            return Err(DeskError::Precondition(format!(
                "Booking {} is {} and cannot be invoiced",
                booking.reference, booking.status
            )));
        }

        let sequence = self.ctx.repos.invoices.next_invoice_sequence().await?;
        let invoice = Invoice::issue(&booking, sequence, self.ctx.rules.vat_rate_bp, Utc::now());
        self.ctx.repos.invoices.create_invoice(&invoice).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "invoice.issue",
                "invoice",
                Some(invoice.id),
                serde_json::json!({ "number": invoice.number, "booking": booking.reference, "total": invoice.total }),
            ))
            .await?;

        tracing::info!(invoice = %invoice.number, reference = %booking.reference, "Invoice issued");
        Ok((invoice, true))
    }

    pub async fn get_invoice(&self, id: Uuid) -> DeskResult<Invoice> {
        self.ctx
            .repos
            .invoices
            .get_invoice(id)
            .await?
            .ok_or_else(|| DeskError::NotFound(format!("invoice {}", id)))
    }

    pub async fn list_invoices(&self, limit: i64) -> DeskResult<Vec<Invoice>> {
        Ok(self.ctx.repos.invoices.list_invoices(limit.clamp(1, 500)).await?)
    }

    /// Email the invoice again, to the bill-to address or `override_email`.
    pub async fn resend_invoice(&self, id: Uuid, override_email: Option<&str>, actor: &Actor) -> DeskResult<Invoice> {
        let mut invoice = self.get_invoice(id).await?;
        let booking: Booking = self.ctx.booking(invoice.booking_id).await?;
        let to = invoice.recipient(override_email)?;

        let message = EmailMessage::invoice(&invoice, &booking, to);
        self.ctx
            .notifier
            .send_email(&message)
            .await
            .map_err(|e| DeskError::Delivery(e.to_string()))?;

        invoice.mark_sent(Utc::now());
        self.ctx.repos.invoices.record_invoice_sent(&invoice).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "invoice.resend",
                "invoice",
                Some(invoice.id),
                serde_json::json!({
                    "number": invoice.number,
                    "send_count": invoice.send_count,
                    "override_recipient": override_email.is_some(),
                }),
            ))
            .await?;

        tracing::info!(invoice = %invoice.number, send_count = invoice.send_count, "Invoice resent");
        Ok(invoice)
    }
}
