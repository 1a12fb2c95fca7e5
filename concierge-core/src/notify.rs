use async_trait::async_trait;
use concierge_shared::models::events::DomainEvent;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::Booking;
use crate::invoice::Invoice;
use crate::repository::RepoError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    BookingConfirmed,
    TentativeExpired,
    Invoice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub template: EmailTemplate,
    pub booking_id: Option<Uuid>,
}

impl EmailMessage {
    pub fn booking_confirmed(booking: &Booking) -> Self {
        Self {
            to: booking.guest_email.expose().clone(),
            subject: format!("Your booking {} is confirmed", booking.reference),
            body: format!(
                "Dear {},\n\nYour booking {} from {} to {} ({} night(s)) is confirmed.\nTotal: {}\n",
                booking.guest_name,
                booking.reference,
                booking.arrival_date,
                booking.departure_date,
                booking.nights(),
                format_money(booking.total_amount, &booking.currency),
            ),
            template: EmailTemplate::BookingConfirmed,
            booking_id: Some(booking.id),
        }
    }

    pub fn tentative_expired(booking: &Booking) -> Self {
        Self {
            to: booking.guest_email.expose().clone(),
            subject: format!("Your provisional booking {} has lapsed", booking.reference),
            body: format!(
                "Dear {},\n\nThe provisional hold on booking {} ({} to {}) was not confirmed in time and has been released.\nPlease contact us if you would still like to stay.\n",
                booking.guest_name, booking.reference, booking.arrival_date, booking.departure_date,
            ),
            template: EmailTemplate::TentativeExpired,
            booking_id: Some(booking.id),
        }
    }

    pub fn invoice(invoice: &Invoice, booking: &Booking, to: String) -> Self {
        Self {
            to,
            subject: format!("Invoice {} for booking {}", invoice.number, booking.reference),
            body: format!(
                "Dear {},\n\nInvoice {} issued {}.\nNet: {}\nVAT: {}\nTotal: {}\n\nThank you for staying with us.\n",
                invoice.bill_to_name,
                invoice.number,
                invoice.issued_at.date_naive(),
                format_money(invoice.subtotal, &invoice.currency),
                format_money(invoice.vat_amount, &invoice.currency),
                format_money(invoice.total, &invoice.currency),
            ),
            template: EmailTemplate::Invoice,
            booking_id: Some(booking.id),
        }
    }
}

/// `EUR 1150.00` from minor units.
pub fn format_money(amount: i64, currency: &str) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{} {}{}.{:02}", currency, sign, abs / 100, abs % 100)
}

/// Outbound side effects: guest email and domain events.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), RepoError>;

    async fn publish(&self, event: &DomainEvent) -> Result<(), RepoError>;
}

/// Notifier that only writes to the log; used when no broker is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), RepoError> {
        tracing::info!(
            template = ?message.template,
            booking_id = ?message.booking_id,
            "Email queued: {}",
            message.subject
        );
        Ok(())
    }

    async fn publish(&self, event: &DomainEvent) -> Result<(), RepoError> {
        tracing::info!(topic = event.topic(), key = %event.key(), "Event published");
        Ok(())
    }
}
