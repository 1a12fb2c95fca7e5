pub mod billing;
pub mod frontdesk;
pub mod housekeeping;
pub mod reservations;
pub mod rooms;

use chrono::Utc;
use concierge_core::notify::{EmailMessage, Notifier};
use concierge_core::repository::{RepoError, Repositories};
use concierge_core::{AuditEntry, Booking, CoreError, Room};
use concierge_shared::models::events::{
    BookingStatusChangedEvent, DomainEvent, RoomStatusChangedEvent,
};
use std::sync::Arc;
use uuid::Uuid;

pub use billing::Billing;
pub use frontdesk::{CheckInRequest, CheckoutOutcome, CheckoutRequest, FrontDesk, FrontDeskBoard};
pub use housekeeping::{HousekeepingDesk, NewTask};
pub use reservations::{BookingRequest, Reservations, SweepReport};
pub use rooms::RoomDesk;

#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Outstanding balance of {balance} {currency} must be settled before checkout")]
    OutstandingBalance { balance: i64, currency: String },

    #[error("Email delivery failed: {0}")]
    Delivery(String),

    #[error("Storage error: {0}")]
    Storage(RepoError),
}

/// Repositories report constraint conflicts as boxed `CoreError`s; unwrap
/// those back into the domain variant.
impl From<RepoError> for DeskError {
    fn from(e: RepoError) -> Self {
        match e.downcast::<CoreError>() {
            Ok(core) => DeskError::Domain(*core),
            Err(e) => DeskError::Storage(e),
        }
    }
}

pub type DeskResult<T> = Result<T, DeskError>;

/// Property-wide settings the workflows apply.
#[derive(Debug, Clone)]
pub struct DeskRules {
    pub currency: String,
    pub vat_rate_bp: i32,
    pub tentative_hold_hours: i64,
}

impl Default for DeskRules {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
            vat_rate_bp: 1500,
            tentative_hold_hours: 48,
        }
    }
}

/// What every workflow needs: the repositories, the outbound notifier and the rules.
#[derive(Clone)]
pub struct DeskContext {
    pub repos: Repositories,
    pub notifier: Arc<dyn Notifier>,
    pub rules: DeskRules,
}

impl DeskContext {
    pub fn new(repos: Repositories, notifier: Arc<dyn Notifier>, rules: DeskRules) -> Self {
        Self { repos, notifier, rules }
    }

    async fn booking(&self, id: Uuid) -> DeskResult<Booking> {
        self.repos
            .bookings
            .get_booking(id)
            .await?
            .ok_or_else(|| DeskError::NotFound(format!("booking {}", id)))
    }

    async fn room(&self, id: Uuid) -> DeskResult<Room> {
        self.repos
            .rooms
            .get_room(id)
            .await?
            .ok_or_else(|| DeskError::NotFound(format!("room {}", id)))
    }

    async fn audit(&self, entry: AuditEntry) -> DeskResult<()> {
        self.repos.audit.append(&entry).await?;
        Ok(())
    }

    /// Events are fire-and-forget once the rows are committed.
    async fn publish(&self, event: DomainEvent) {
        if let Err(e) = self.notifier.publish(&event).await {
            tracing::error!(topic = event.topic(), key = %event.key(), "Failed to publish event: {}", e);
        }
    }

    async fn publish_booking_change(&self, booking: &Booking, from: &str, actor: &str) {
        self.publish(DomainEvent::BookingStatusChanged(BookingStatusChangedEvent {
            booking_id: booking.id,
            reference: booking.reference.clone(),
            from: from.to_string(),
            to: booking.status.to_string(),
            actor: actor.to_string(),
            at: Utc::now(),
        }))
        .await;
    }

    async fn publish_room_change(&self, room_id: Uuid, room_number: &str, from: &str, to: &str) {
        self.publish(DomainEvent::RoomStatusChanged(RoomStatusChangedEvent {
            room_id,
            room_number: room_number.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            at: Utc::now(),
        }))
        .await;
    }

    /// Returns whether the message was handed off; failures are logged only.
    async fn email(&self, message: &EmailMessage) -> bool {
        match self.notifier.send_email(message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    template = ?message.template,
                    booking_id = ?message.booking_id,
                    "Failed to send email: {}",
                    e
                );
                false
            }
        }
    }
}

/// All back-office workflows over one set of repositories.
#[derive(Clone)]
pub struct Desk {
    pub reservations: Reservations,
    pub frontdesk: FrontDesk,
    pub billing: Billing,
    pub housekeeping: HousekeepingDesk,
    pub rooms: RoomDesk,
}

impl Desk {
    pub fn new(repos: Repositories, notifier: Arc<dyn Notifier>, rules: DeskRules) -> Self {
        let ctx = DeskContext::new(repos, notifier, rules);
        Self {
            reservations: Reservations::new(ctx.clone()),
            frontdesk: FrontDesk::new(ctx.clone()),
            billing: Billing::new(ctx.clone()),
            housekeeping: HousekeepingDesk::new(ctx.clone()),
            rooms: RoomDesk::new(ctx),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use concierge_core::booking::{generate_reference, NewBooking};
    use concierge_core::memory::{MemoryStore, RecordingNotifier};
    use concierge_core::room::NewRoom;
    use concierge_core::staff::{Actor, Role};
    use concierge_core::BookingKind;

    pub struct Fixture {
        pub store: Arc<MemoryStore>,
        pub notifier: Arc<RecordingNotifier>,
        pub desk: Desk,
    }

    pub fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let desk = Desk::new(store.repositories(), notifier.clone(), DeskRules::default());
        Fixture { store, notifier, desk }
    }

    pub fn actor(role: Role) -> Actor {
        Actor {
            staff_id: Uuid::new_v4(),
            username: format!("{}-user", role.as_str().to_lowercase()),
            role,
        }
    }

    pub async fn room(f: &Fixture, number: &str) -> Room {
        f.desk
            .rooms
            .create(
                NewRoom {
                    number: number.to_string(),
                    room_type: "DOUBLE".to_string(),
                    floor: 1,
                    nightly_rate: 10000,
                },
                &actor(Role::Manager),
            )
            .await
            .unwrap()
    }

    /// A confirmed booking arriving `arrival`, stored directly.
    pub async fn confirmed_booking(f: &Fixture, room_id: Option<Uuid>, arrival: NaiveDate, total: i64) -> Booking {
        let input = NewBooking {
            kind: BookingKind::Room,
            guest_name: "Grace Hopper".to_string(),
            guest_email: "grace@example.com".to_string(),
            guest_phone: None,
            room_id,
            arrival_date: arrival,
            departure_date: arrival + Duration::days(2),
            guests: 1,
            total_amount: total,
            currency: "EUR".to_string(),
            notes: None,
        };
        let booking = Booking::create(input, generate_reference(), None, Utc::now()).unwrap();
        f.store.repositories().bookings.create_booking(&booking).await.unwrap();
        booking
    }
}
