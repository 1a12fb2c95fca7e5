use chrono::{DateTime, Duration, NaiveDate, Utc};
use concierge_shared::Masked;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Reason recorded when the expiry sweep releases a tentative hold.
pub const HOLD_EXPIRED_REASON: &str = "tentative hold expired";

/// Upper bound for a hold extension or an expiry look-ahead window (one year).
pub const MAX_HOLD_HOURS: i64 = 24 * 366;

const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERENCE_LEN: usize = 6;

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Tentative,
    Confirmed,
    CheckedIn,
    CheckedOut,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Tentative => "TENTATIVE",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::CheckedIn => "CHECKED_IN",
            BookingStatus::CheckedOut => "CHECKED_OUT",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Tentative, Confirmed)
                | (Tentative, Cancelled)
                | (Confirmed, CheckedIn)
                | (Confirmed, Cancelled)
                | (CheckedIn, CheckedOut)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::CheckedOut | BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TENTATIVE" => Ok(BookingStatus::Tentative),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CHECKED_IN" => Ok(BookingStatus::CheckedIn),
            "CHECKED_OUT" => Ok(BookingStatus::CheckedOut),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(CoreError::ValidationError(format!("Unknown booking status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingKind {
    Room,
    Conference,
}

impl BookingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingKind::Room => "ROOM",
            BookingKind::Conference => "CONFERENCE",
        }
    }
}

impl FromStr for BookingKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ROOM" => Ok(BookingKind::Room),
            "CONFERENCE" => Ok(BookingKind::Conference),
            other => Err(CoreError::ValidationError(format!("Unknown booking kind: {}", other))),
        }
    }
}

/// Input for a new reservation. `total_amount` is already resolved (explicit
/// price or room rate times nights).
#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    #[serde(default = "default_kind")]
    pub kind: BookingKind,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub room_id: Option<Uuid>,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    #[serde(default = "default_guests")]
    pub guests: i32,
    pub total_amount: i64,
    pub currency: String,
    pub notes: Option<String>,
}

fn default_kind() -> BookingKind {
    BookingKind::Room
}

fn default_guests() -> i32 {
    1
}

/// Editable guest details and stay dates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingUpdate {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub room_id: Option<Uuid>,
    pub arrival_date: Option<NaiveDate>,
    pub departure_date: Option<NaiveDate>,
    pub guests: Option<i32>,
    pub total_amount: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub reference: String,
    pub kind: BookingKind,
    pub guest_name: String,
    pub guest_email: Masked<String>,
    pub guest_phone: Option<Masked<String>>,
    pub room_id: Option<Uuid>,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub guests: i32,
    pub status: BookingStatus,
    pub tentative_expires_at: Option<DateTime<Utc>>,
    pub total_amount: i64,
    pub currency: String,
    pub notes: Option<String>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Create a booking. With a hold it starts `Tentative` and expires at
    /// `now + hold`, otherwise it is `Confirmed` straight away.
    pub fn create(
        input: NewBooking,
        reference: String,
        hold: Option<Duration>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        validate_guest_name(&input.guest_name)?;
        validate_email(&input.guest_email)?;
        validate_stay(input.arrival_date, input.departure_date)?;
        if input.guests < 1 {
            return Err(CoreError::ValidationError("At least one guest is required".to_string()));
        }
        if input.total_amount < 0 {
            return Err(CoreError::ValidationError("Total amount cannot be negative".to_string()));
        }
        if input.currency.len() != 3 {
            return Err(CoreError::ValidationError(format!("Invalid currency code: {}", input.currency)));
        }

        let (status, tentative_expires_at) = match hold {
            Some(hold) if hold > Duration::zero() => (BookingStatus::Tentative, Some(now + hold)),
            Some(_) => {
                return Err(CoreError::ValidationError("Tentative hold must be positive".to_string()))
            }
            None => (BookingStatus::Confirmed, None),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            reference,
            kind: input.kind,
            guest_name: input.guest_name.trim().to_string(),
            guest_email: Masked::new(input.guest_email.trim().to_lowercase()),
            guest_phone: input.guest_phone.map(Masked::new),
            room_id: input.room_id,
            arrival_date: input.arrival_date,
            departure_date: input.departure_date,
            guests: input.guests,
            status,
            tentative_expires_at,
            total_amount: input.total_amount,
            currency: input.currency.to_uppercase(),
            notes: input.notes,
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn nights(&self) -> i64 {
        (self.departure_date - self.arrival_date).num_days()
    }

    pub fn is_hold_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Tentative
            && self.tentative_expires_at.is_some_and(|expires| expires <= now)
    }

    /// Tentative → Confirmed
    pub fn confirm(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        if self.is_hold_expired(now) {
            return Err(CoreError::Conflict(format!("Tentative hold for {} has expired", self.reference)));
        }
        self.transition(BookingStatus::Confirmed, now)?;
        self.tentative_expires_at = None;
        Ok(())
    }

    /// Tentative/Confirmed → Cancelled
    pub fn cancel(&mut self, reason: &str, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition(BookingStatus::Cancelled, now)?;
        self.tentative_expires_at = None;
        self.cancellation_reason = Some(reason.to_string());
        Ok(())
    }

    /// Confirmed → CheckedIn
    pub fn check_in(&mut self, room_id: Uuid, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition(BookingStatus::CheckedIn, now)?;
        self.room_id = Some(room_id);
        Ok(())
    }

    /// CheckedIn → CheckedOut
    pub fn check_out(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition(BookingStatus::CheckedOut, now)
    }

    /// Push a live tentative hold further out.
    pub fn extend_hold(&mut self, by: Duration, now: DateTime<Utc>) -> CoreResult<()> {
        if self.status != BookingStatus::Tentative {
            return Err(CoreError::Conflict(format!(
                "Only tentative bookings can be extended ({} is {})",
                self.reference, self.status
            )));
        }
        if by <= Duration::zero() {
            return Err(CoreError::ValidationError("Extension must be positive".to_string()));
        }
        if self.is_hold_expired(now) {
            return Err(CoreError::Conflict(format!("Tentative hold for {} has expired", self.reference)));
        }
        let current = self.tentative_expires_at.unwrap_or(now);
        let extended = current
            .checked_add_signed(by)
            .ok_or_else(|| CoreError::ValidationError("Extension is out of range".to_string()))?;
        self.tentative_expires_at = Some(extended);
        self.updated_at = now;
        Ok(())
    }

    /// Apply edits from the booking screen. Only open bookings can change.
    pub fn apply_update(&mut self, update: BookingUpdate, now: DateTime<Utc>) -> CoreResult<()> {
        if !matches!(self.status, BookingStatus::Tentative | BookingStatus::Confirmed) {
            return Err(CoreError::Conflict(format!(
                "Booking {} can no longer be edited ({})",
                self.reference, self.status
            )));
        }

        let arrival = update.arrival_date.unwrap_or(self.arrival_date);
        let departure = update.departure_date.unwrap_or(self.departure_date);
        validate_stay(arrival, departure)?;

        if let Some(name) = update.guest_name {
            validate_guest_name(&name)?;
            self.guest_name = name.trim().to_string();
        }
        if let Some(email) = update.guest_email {
            validate_email(&email)?;
            self.guest_email = Masked::new(email.trim().to_lowercase());
        }
        if let Some(phone) = update.guest_phone {
            self.guest_phone = Some(Masked::new(phone));
        }
        if let Some(guests) = update.guests {
            if guests < 1 {
                return Err(CoreError::ValidationError("At least one guest is required".to_string()));
            }
            self.guests = guests;
        }
        if let Some(total) = update.total_amount {
            if total < 0 {
                return Err(CoreError::ValidationError("Total amount cannot be negative".to_string()));
            }
            self.total_amount = total;
        }
        if update.room_id.is_some() {
            self.room_id = update.room_id;
        }
        if update.notes.is_some() {
            self.notes = update.notes;
        }
        self.arrival_date = arrival;
        self.departure_date = departure;
        self.updated_at = now;
        Ok(())
    }

    fn transition(&mut self, next: BookingStatus, now: DateTime<Utc>) -> CoreResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

/// Client-supplied hour count as a duration, within `0..=MAX_HOLD_HOURS`.
pub fn hold_hours(hours: i64) -> CoreResult<Duration> {
    if !(0..=MAX_HOLD_HOURS).contains(&hours) {
        return Err(CoreError::ValidationError(format!(
            "Hours must be between 0 and {}, got {}",
            MAX_HOLD_HOURS, hours
        )));
    }
    Duration::try_hours(hours).ok_or_else(|| CoreError::ValidationError(format!("Hours out of range: {}", hours)))
}

/// `BK-` plus six characters from an alphabet without look-alikes (0/O, 1/I).
pub fn generate_reference() -> String {
    let mut rng = rand::thread_rng();
    let code: String = (0..REFERENCE_LEN)
        .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect();
    format!("BK-{}", code)
}

pub fn validate_email(email: &str) -> CoreResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid && !email.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(CoreError::ValidationError(format!("Invalid email address: {}", email)))
    }
}

fn validate_guest_name(name: &str) -> CoreResult<()> {
    if name.trim().is_empty() {
        return Err(CoreError::ValidationError("Guest name is required".to_string()));
    }
    Ok(())
}

fn validate_stay(arrival: NaiveDate, departure: NaiveDate) -> CoreResult<()> {
    if departure <= arrival {
        return Err(CoreError::ValidationError(format!(
            "Departure {} must be after arrival {}",
            departure, arrival
        )));
    }
    Ok(())
}
