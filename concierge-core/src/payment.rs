use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Largest single payment accepted, in minor units (ten billion major units).
pub const MAX_PAYMENT_AMOUNT: i64 = 1_000_000_000_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Voucher,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::BankTransfer,
        PaymentMethod::Voucher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Voucher => "VOUCHER",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH" => Ok(PaymentMethod::Cash),
            "CARD" => Ok(PaymentMethod::Card),
            "BANK_TRANSFER" => Ok(PaymentMethod::BankTransfer),
            "VOUCHER" => Ok(PaymentMethod::Voucher),
            other => Err(CoreError::ValidationError(format!("Unknown payment method: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Completed,
    Refunded,
    Void,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Void => "VOID",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            "VOID" => Ok(PaymentStatus::Void),
            other => Err(CoreError::ValidationError(format!("Unknown payment status: {}", other))),
        }
    }
}

/// VAT contained in a VAT-inclusive amount, rate in basis points (1500 = 15%).
/// Rounds half up.
pub fn vat_portion(gross: i64, rate_bp: i32) -> i64 {
    if gross <= 0 || rate_bp <= 0 {
        return 0;
    }
    let rate = rate_bp as i128;
    let denominator = 10_000 + rate;
    let vat = (gross as i128 * rate * 2 + denominator) / (denominator * 2);
    // rate / (10000 + rate) < 1, so the portion never exceeds `gross`
    i64::try_from(vat).unwrap_or(gross)
}

/// A ledger entry tied to a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub vat_rate_bp: i32,
    pub vat_amount: i64,
    pub net_amount: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference: Option<String>,
    pub recorded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPayment {
    pub amount: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

impl PaymentRecord {
    pub fn record(
        booking_id: Uuid,
        input: NewPayment,
        vat_rate_bp: i32,
        currency: &str,
        recorded_by: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        if input.amount <= 0 {
            return Err(CoreError::ValidationError("Payment amount must be positive".to_string()));
        }
        if input.amount > MAX_PAYMENT_AMOUNT {
            return Err(CoreError::ValidationError(format!(
                "Payment amount exceeds the limit of {}",
                MAX_PAYMENT_AMOUNT
            )));
        }
        if !(0..=10_000).contains(&vat_rate_bp) {
            return Err(CoreError::ValidationError(format!("VAT rate out of range: {} bp", vat_rate_bp)));
        }
        let vat_amount = vat_portion(input.amount, vat_rate_bp);
        Ok(Self {
            id: Uuid::new_v4(),
            booking_id,
            amount: input.amount,
            vat_rate_bp,
            vat_amount,
            net_amount: input.amount - vat_amount,
            currency: currency.to_string(),
            method: input.method,
            status: PaymentStatus::Completed,
            reference: input.reference,
            recorded_by: recorded_by.to_string(),
            created_at: now,
        })
    }

    /// Completed → Refunded
    pub fn refund(&mut self) -> CoreResult<()> {
        self.settle_as(PaymentStatus::Refunded)
    }

    /// Completed → Void (entered in error)
    pub fn void(&mut self) -> CoreResult<()> {
        self.settle_as(PaymentStatus::Void)
    }

    fn settle_as(&mut self, next: PaymentStatus) -> CoreResult<()> {
        if self.status != PaymentStatus::Completed {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

/// What a booking owes against what has been taken.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSummary {
    pub booking_id: Uuid,
    pub currency: String,
    pub charged: i64,
    pub paid: i64,
    pub refunded: i64,
    pub vat_paid: i64,
    pub balance: i64,
    pub payments: usize,
}

impl LedgerSummary {
    pub fn build(booking_id: Uuid, charged: i64, currency: &str, payments: &[PaymentRecord]) -> Self {
        let completed = payments.iter().filter(|p| p.status == PaymentStatus::Completed);
        let paid: i64 = completed.clone().map(|p| p.amount).sum();
        let vat_paid: i64 = completed.map(|p| p.vat_amount).sum();
        let refunded: i64 = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Refunded)
            .map(|p| p.amount)
            .sum();

        Self {
            booking_id,
            currency: currency.to_string(),
            charged,
            paid,
            refunded,
            vat_paid,
            balance: charged - paid,
            payments: payments.len(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.balance <= 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodTotal {
    pub method: PaymentMethod,
    pub count: usize,
    pub amount: i64,
}

/// Completed payments taken on one day, per method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakingsReport {
    pub date: NaiveDate,
    pub currency: String,
    pub by_method: Vec<MethodTotal>,
    pub total: i64,
    pub vat_total: i64,
}

impl TakingsReport {
    pub fn build(date: NaiveDate, currency: &str, payments: &[PaymentRecord]) -> Self {
        let taken: Vec<&PaymentRecord> = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed && p.created_at.date_naive() == date)
            .collect();

        let by_method = PaymentMethod::ALL
            .iter()
            .map(|method| {
                let of_method = taken.iter().filter(|p| p.method == *method);
                MethodTotal {
                    method: *method,
                    count: of_method.clone().count(),
                    amount: of_method.map(|p| p.amount).sum(),
                }
            })
            .filter(|t| t.count > 0)
            .collect();

        Self {
            date,
            currency: currency.to_string(),
            by_method,
            total: taken.iter().map(|p| p.amount).sum(),
            vat_total: taken.iter().map(|p| p.vat_amount).sum(),
        }
    }
}
