use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const BOOKING_EVENTS_TOPIC: &str = "backoffice.bookings";
pub const ROOM_EVENTS_TOPIC: &str = "backoffice.rooms";
pub const EMAIL_TOPIC: &str = "notifications.email";

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingStatusChangedEvent {
    pub booking_id: Uuid,
    pub reference: String,
    pub from: String,
    pub to: String,
    pub actor: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct RoomStatusChangedEvent {
    pub room_id: Uuid,
    pub room_number: String,
    pub from: String,
    pub to: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct CheckoutCompletedEvent {
    pub booking_id: Uuid,
    pub room_id: Uuid,
    pub invoice_id: Uuid,
    pub balance: i64,
    pub currency: String,
    pub at: DateTime<Utc>,
}

/// Envelope published on the event bus; `kind` doubles as the message key prefix.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingStatusChanged(BookingStatusChangedEvent),
    RoomStatusChanged(RoomStatusChangedEvent),
    CheckoutCompleted(CheckoutCompletedEvent),
}

impl DomainEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            DomainEvent::RoomStatusChanged(_) => ROOM_EVENTS_TOPIC,
            DomainEvent::BookingStatusChanged(_) | DomainEvent::CheckoutCompleted(_) => BOOKING_EVENTS_TOPIC,
        }
    }

    pub fn key(&self) -> String {
        match self {
            DomainEvent::BookingStatusChanged(e) => e.booking_id.to_string(),
            DomainEvent::RoomStatusChanged(e) => e.room_id.to_string(),
            DomainEvent::CheckoutCompleted(e) => e.booking_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_envelope_is_tagged() {
        let event = DomainEvent::RoomStatusChanged(RoomStatusChangedEvent {
            room_id: Uuid::new_v4(),
            room_number: "204".to_string(),
            from: "DIRTY".to_string(),
            to: "AVAILABLE".to_string(),
            at: Utc::now(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "room_status_changed");
        assert_eq!(json["room_number"], "204");
        assert_eq!(event.topic(), ROOM_EVENTS_TOPIC);
    }
}
