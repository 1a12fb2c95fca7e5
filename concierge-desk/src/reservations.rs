use chrono::{DateTime, NaiveDate, Utc};
use concierge_core::booking::{generate_reference, hold_hours, BookingUpdate, NewBooking, HOLD_EXPIRED_REASON};
use concierge_core::notify::EmailMessage;
use concierge_core::repository::BookingFilter;
use concierge_core::staff::Actor;
use concierge_core::{AuditEntry, Booking, BookingKind, BookingStatus, CoreError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DeskContext, DeskError, DeskResult};

/// A reservation as entered at the desk. The price defaults to the room's
/// nightly rate times the number of nights.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
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
    pub total_amount: Option<i64>,
    pub notes: Option<String>,
    /// Hold the booking provisionally instead of confirming it.
    #[serde(default)]
    pub tentative: bool,
}

fn default_kind() -> BookingKind {
    BookingKind::Room
}

fn default_guests() -> i32 {
    1
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub cancelled: Vec<String>,
    pub emails_failed: usize,
    pub failed: usize,
}

/// Booking records and the tentative-hold lifecycle.
#[derive(Clone)]
pub struct Reservations {
    ctx: DeskContext,
}

impl Reservations {
    pub fn new(ctx: DeskContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, request: BookingRequest, actor: &Actor) -> DeskResult<Booking> {
        let nights = (request.departure_date - request.arrival_date).num_days();
        let room = match request.room_id {
            Some(room_id) => Some(self.ctx.room(room_id).await?),
            None => None,
        };
        let total_amount = match (request.total_amount, &room) {
            (Some(total), _) => total,
            (None, Some(room)) => room.price_for(nights),
            (None, None) => {
                return Err(CoreError::ValidationError(
                    "A total amount is required when no room is assigned".to_string(),
                )
                .into())
            }
        };

        let input = NewBooking {
            kind: request.kind,
            guest_name: request.guest_name,
            guest_email: request.guest_email,
            guest_phone: request.guest_phone,
            room_id: request.room_id,
            arrival_date: request.arrival_date,
            departure_date: request.departure_date,
            guests: request.guests,
            total_amount,
            currency: self.ctx.rules.currency.clone(),
            notes: request.notes,
        };
        let hold = if request.tentative {
            Some(hold_hours(self.ctx.rules.tentative_hold_hours)?)
        } else {
            None
        };
        let booking = Booking::create(input, generate_reference(), hold, Utc::now())?;

        self.ctx.repos.bookings.create_booking(&booking).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "booking.create",
                "booking",
                Some(booking.id),
                serde_json::json!({
                    "reference": booking.reference,
                    "status": booking.status,
                    "total_amount": booking.total_amount,
                }),
            ))
            .await?;

        tracing::info!(reference = %booking.reference, status = %booking.status, "Booking created");

        if booking.status == BookingStatus::Confirmed {
            self.ctx.email(&EmailMessage::booking_confirmed(&booking)).await;
        }
        Ok(booking)
    }

    pub async fn get(&self, id: Uuid) -> DeskResult<Booking> {
        self.ctx.booking(id).await
    }

    pub async fn list(&self, filter: &BookingFilter) -> DeskResult<Vec<Booking>> {
        Ok(self.ctx.repos.bookings.list_bookings(filter).await?)
    }

    pub async fn update(&self, id: Uuid, update: BookingUpdate, actor: &Actor) -> DeskResult<Booking> {
        let mut booking = self.ctx.booking(id).await?;
        if let Some(room_id) = update.room_id {
            self.ctx.room(room_id).await?;
        }
        booking.apply_update(update, Utc::now())?;

        self.ctx.repos.bookings.update_booking(&booking).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "booking.update",
                "booking",
                Some(booking.id),
                serde_json::json!({ "reference": booking.reference }),
            ))
            .await?;
        Ok(booking)
    }

    /// Tentative → Confirmed, then email the guest.
    pub async fn confirm(&self, id: Uuid, actor: &Actor) -> DeskResult<Booking> {
        let mut booking = self.ctx.booking(id).await?;
        let from = booking.status;
        booking.confirm(Utc::now())?;

        self.ctx.repos.bookings.update_booking(&booking).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "booking.confirm",
                "booking",
                Some(booking.id),
                serde_json::json!({ "reference": booking.reference }),
            ))
            .await?;
        tracing::info!(reference = %booking.reference, "Booking confirmed");

        self.ctx.publish_booking_change(&booking, from.as_str(), &actor.username).await;
        self.ctx.email(&EmailMessage::booking_confirmed(&booking)).await;
        Ok(booking)
    }

    pub async fn cancel(&self, id: Uuid, reason: &str, actor: &Actor) -> DeskResult<Booking> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CoreError::ValidationError("A cancellation reason is required".to_string()).into());
        }
        let mut booking = self.ctx.booking(id).await?;
        let from = booking.status;
        booking.cancel(reason, Utc::now())?;

        self.ctx.repos.bookings.update_booking(&booking).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "booking.cancel",
                "booking",
                Some(booking.id),
                serde_json::json!({ "reference": booking.reference, "from": from, "reason": reason }),
            ))
            .await?;
        tracing::info!(reference = %booking.reference, "Booking cancelled: {}", reason);

        self.ctx.publish_booking_change(&booking, from.as_str(), &actor.username).await;
        Ok(booking)
    }

    pub async fn extend(&self, id: Uuid, hours: i64, actor: &Actor) -> DeskResult<Booking> {
        let mut booking = self.ctx.booking(id).await?;
        booking.extend_hold(hold_hours(hours)?, Utc::now())?;

        self.ctx.repos.bookings.update_booking(&booking).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "booking.extend_hold",
                "booking",
                Some(booking.id),
                serde_json::json!({
                    "reference": booking.reference,
                    "hours": hours,
                    "expires_at": booking.tentative_expires_at,
                }),
            ))
            .await?;
        Ok(booking)
    }

    /// Tentative holds that lapse within the next `within_hours`.
    pub async fn expiring(&self, within_hours: i64) -> DeskResult<Vec<Booking>> {
        let before = Utc::now()
            .checked_add_signed(hold_hours(within_hours)?)
            .ok_or_else(|| CoreError::ValidationError(format!("Window out of range: {} hours", within_hours)))?;
        Ok(self.ctx.repos.bookings.list_tentative_expiring(before).await?)
    }

    /// Cancel every tentative booking whose hold has lapsed by `now` and tell
    /// the guest. One failing booking does not stop the rest.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> DeskResult<SweepReport> {
        let expired = self.ctx.repos.bookings.list_tentative_expiring(now).await?;
        let actor = Actor::system();
        let mut report = SweepReport::default();

        for mut booking in expired {
            if let Err(e) = self.expire_one(&mut booking, &actor, now).await {
                tracing::error!(reference = %booking.reference, "Failed to expire tentative booking: {}", e);
                report.failed += 1;
                continue;
            }
            if !self.ctx.email(&EmailMessage::tentative_expired(&booking)).await {
                report.emails_failed += 1;
            }
            report.cancelled.push(booking.reference);
        }

        if !report.cancelled.is_empty() {
            tracing::info!(count = report.cancelled.len(), "Expired tentative bookings released");
        }
        Ok(report)
    }

    async fn expire_one(&self, booking: &mut Booking, actor: &Actor, now: DateTime<Utc>) -> DeskResult<()> {
        let expires_at = booking.tentative_expires_at;
        booking.cancel(HOLD_EXPIRED_REASON, now)?;
        self.ctx.repos.bookings.update_booking(booking).await?;
        self.ctx
            .audit(AuditEntry::new(
                actor,
                "booking.expire",
                "booking",
                Some(booking.id),
                serde_json::json!({ "reference": booking.reference, "expired_at": expires_at }),
            ))
            .await?;
        self.ctx
            .publish_booking_change(booking, BookingStatus::Tentative.as_str(), &actor.username)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::testing::{actor, fixture, room};
    use concierge_core::notify::EmailTemplate;
    use concierge_core::staff::Role;
    use concierge_shared::models::events::DomainEvent;

    fn request(room_id: Option<Uuid>, tentative: bool) -> BookingRequest {
        let arrival = Utc::now().date_naive() + Duration::days(7);
        BookingRequest {
            kind: BookingKind::Room,
            guest_name: "Ada Lovelace".to_string(),
            guest_email: "ada@example.com".to_string(),
            guest_phone: Some("+44 20 7946 0000".to_string()),
            room_id,
            arrival_date: arrival,
            departure_date: arrival + Duration::days(3),
            guests: 2,
            total_amount: None,
            notes: None,
            tentative,
        }
    }

    #[tokio::test]
    async fn test_create_prices_from_room_rate() {
        let f = fixture();
        let room = room(&f, "101").await;
        let clerk = actor(Role::FrontDesk);

        let booking = f.desk.reservations.create(request(Some(room.id), false), &clerk).await.unwrap();
        assert_eq!(booking.total_amount, 30000);
        assert_eq!(booking.currency, "EUR");
        assert_eq!(booking.status, BookingStatus::Confirmed);

        let emails = f.notifier.emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].template, EmailTemplate::BookingConfirmed);

        // No room and no price is rejected
        let result = f.desk.reservations.create(request(None, false), &clerk).await;
        assert!(matches!(result, Err(DeskError::Domain(CoreError::ValidationError(_)))));
    }

    #[tokio::test]
    async fn test_tentative_confirm_flow() {
        let f = fixture();
        let room = room(&f, "102").await;
        let clerk = actor(Role::FrontDesk);

        let booking = f.desk.reservations.create(request(Some(room.id), true), &clerk).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Tentative);
        assert!(booking.tentative_expires_at.is_some());
        assert!(f.notifier.emails().is_empty());

        let extended = f.desk.reservations.extend(booking.id, 24, &clerk).await.unwrap();
        assert_eq!(
            extended.tentative_expires_at,
            booking.tentative_expires_at.map(|t| t + Duration::hours(24))
        );

        let confirmed = f.desk.reservations.confirm(booking.id, &clerk).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert!(confirmed.tentative_expires_at.is_none());
        assert_eq!(f.notifier.emails().len(), 1);
        assert!(matches!(
            f.notifier.events().last(),
            Some(DomainEvent::BookingStatusChanged(e)) if e.from == "TENTATIVE" && e.to == "CONFIRMED"
        ));

        // Confirming twice is an invalid transition
        let again = f.desk.reservations.confirm(booking.id, &clerk).await;
        assert!(matches!(again, Err(DeskError::Domain(CoreError::InvalidTransition { .. }))));
    }

    #[tokio::test]
    async fn test_oversized_hours_rejected() {
        let f = fixture();
        let room = room(&f, "104").await;
        let clerk = actor(Role::FrontDesk);
        let booking = f.desk.reservations.create(request(Some(room.id), true), &clerk).await.unwrap();

        for hours in [1_000_000_000_000, i64::MAX, -5] {
            let result = f.desk.reservations.extend(booking.id, hours, &clerk).await;
            assert!(matches!(result, Err(DeskError::Domain(CoreError::ValidationError(_)))), "hours={}", hours);
        }
        let unchanged = f.desk.reservations.get(booking.id).await.unwrap();
        assert_eq!(unchanged.tentative_expires_at, booking.tentative_expires_at);

        assert!(matches!(
            f.desk.reservations.expiring(i64::MAX).await,
            Err(DeskError::Domain(CoreError::ValidationError(_)))
        ));
        assert!(f.desk.reservations.expiring(-1).await.is_err());
    }

    #[tokio::test]
    async fn test_sweep_cancels_only_expired_holds() {
        let f = fixture();
        let room = room(&f, "103").await;
        let clerk = actor(Role::FrontDesk);

        let lapsing = f.desk.reservations.create(request(Some(room.id), true), &clerk).await.unwrap();
        let confirmed = f.desk.reservations.create(request(Some(room.id), false), &clerk).await.unwrap();

        // Nothing has lapsed yet
        let report = f.desk.reservations.sweep_expired(Utc::now()).await.unwrap();
        assert!(report.cancelled.is_empty());

        let later = Utc::now() + Duration::hours(49);
        let expiring = f.desk.reservations.expiring(49).await.unwrap();
        assert_eq!(expiring.len(), 1);

        let report = f.desk.reservations.sweep_expired(later).await.unwrap();
        assert_eq!(report.cancelled, vec![lapsing.reference.clone()]);
        assert_eq!(report.emails_failed, 0);

        let swept = f.desk.reservations.get(lapsing.id).await.unwrap();
        assert_eq!(swept.status, BookingStatus::Cancelled);
        assert_eq!(swept.cancellation_reason.as_deref(), Some(HOLD_EXPIRED_REASON));
        assert_eq!(f.desk.reservations.get(confirmed.id).await.unwrap().status, BookingStatus::Confirmed);

        let templates: Vec<EmailTemplate> = f.notifier.emails().iter().map(|e| e.template).collect();
        assert!(templates.contains(&EmailTemplate::TentativeExpired));

        let audit = f.store.repositories().audit.recent(1).await.unwrap();
        assert_eq!(audit[0].action, "booking.expire");
        assert_eq!(audit[0].actor, "system");

        // A second run finds nothing
        let report = f.desk.reservations.sweep_expired(later).await.unwrap();
        assert!(report.cancelled.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_survives_email_failure() {
        let f = fixture();
        let clerk = actor(Role::FrontDesk);
        let mut req = request(None, true);
        req.total_amount = Some(5000);
        let booking = f.desk.reservations.create(req, &clerk).await.unwrap();

        f.notifier.set_email_failure(true);
        let report = f.desk.reservations.sweep_expired(Utc::now() + Duration::hours(72)).await.unwrap();
        assert_eq!(report.cancelled.len(), 1);
        assert_eq!(report.emails_failed, 1);
        assert_eq!(f.desk.reservations.get(booking.id).await.unwrap().status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_requires_reason() {
        let f = fixture();
        let clerk = actor(Role::FrontDesk);
        let mut req = request(None, false);
        req.total_amount = Some(5000);
        let booking = f.desk.reservations.create(req, &clerk).await.unwrap();

        assert!(f.desk.reservations.cancel(booking.id, "  ", &clerk).await.is_err());
        let cancelled = f.desk.reservations.cancel(booking.id, "guest called", &clerk).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(matches!(
            f.desk.reservations.update(booking.id, BookingUpdate::default(), &clerk).await,
            Err(DeskError::Domain(CoreError::Conflict(_)))
        ));
    }
}
