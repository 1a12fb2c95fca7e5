use chrono::{DateTime, Datelike, Utc};
use concierge_shared::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::{validate_email, Booking};
use crate::payment::vat_portion;
use crate::CoreResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub number: String,
    pub booking_id: Uuid,
    pub bill_to_name: String,
    pub bill_to_email: Masked<String>,
    pub subtotal: i64,
    pub vat_rate_bp: i32,
    pub vat_amount: i64,
    pub total: i64,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub send_count: i32,
}

/// `INV-2026-000042`
pub fn format_invoice_number(year: i32, sequence: i64) -> String {
    format!("INV-{}-{:06}", year, sequence)
}

impl Invoice {
    /// Bill the booking total; the VAT share is carved out of the gross amount.
    pub fn issue(booking: &Booking, sequence: i64, vat_rate_bp: i32, now: DateTime<Utc>) -> Self {
        let total = booking.total_amount;
        let vat_amount = vat_portion(total, vat_rate_bp);
        Self {
            id: Uuid::new_v4(),
            number: format_invoice_number(now.year(), sequence),
            booking_id: booking.id,
            bill_to_name: booking.guest_name.clone(),
            bill_to_email: booking.guest_email.clone(),
            subtotal: total - vat_amount,
            vat_rate_bp,
            vat_amount,
            total,
            currency: booking.currency.clone(),
            issued_at: now,
            last_sent_at: None,
            send_count: 0,
        }
    }

    /// Where a (re)send goes: the override if one was given, else the bill-to address.
    pub fn recipient(&self, override_email: Option<&str>) -> CoreResult<String> {
        match override_email {
            Some(email) => {
                validate_email(email)?;
                Ok(email.trim().to_lowercase())
            }
            None => Ok(self.bill_to_email.expose().clone()),
        }
    }

    pub fn mark_sent(&mut self, now: DateTime<Utc>) {
        self.last_sent_at = Some(now);
        self.send_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{generate_reference, tests::sample_input};

    #[test]
    fn test_issue_invoice_from_booking() {
        let now = Utc::now();
        let mut input = sample_input();
        input.total_amount = 11500;
        let booking = Booking::create(input, generate_reference(), None, now).unwrap();

        let mut invoice = Invoice::issue(&booking, 42, 1500, now);
        assert_eq!(invoice.number, format!("INV-{}-000042", now.year()));
        assert_eq!(invoice.total, 11500);
        assert_eq!(invoice.vat_amount, 1500);
        assert_eq!(invoice.subtotal, 10000);
        assert_eq!(invoice.send_count, 0);

        invoice.mark_sent(now);
        invoice.mark_sent(now);
        assert_eq!(invoice.send_count, 2);
        assert_eq!(invoice.last_sent_at, Some(now));
    }

    #[test]
    fn test_recipient_override() {
        let booking = Booking::create(sample_input(), generate_reference(), None, Utc::now()).unwrap();
        let invoice = Invoice::issue(&booking, 1, 0, Utc::now());

        assert_eq!(invoice.recipient(None).unwrap(), "ada@example.com");
        assert_eq!(invoice.recipient(Some("Accounts@Corp.example")).unwrap(), "accounts@corp.example");
        assert!(invoice.recipient(Some("nope")).is_err());
    }
}
