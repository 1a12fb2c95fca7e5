use chrono::{NaiveDate, Utc};
use concierge_core::notify::EmailMessage;
use concierge_core::repository::{BookingFilter, CheckInPlan, CheckoutPlan, TaskFilter};
use concierge_core::room::expected_status;
use concierge_core::staff::{Actor, Permission};
use concierge_core::{
    AuditEntry, Booking, BookingStatus, HousekeepingTask, Invoice, LedgerSummary, RoomStatus,
    TaskPriority,
};
use concierge_shared::models::events::{CheckoutCompletedEvent, DomainEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DeskContext, DeskError, DeskResult};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckInRequest {
    /// Overrides the room on the booking.
    pub room_id: Option<Uuid>,
    #[serde(default)]
    pub allow_early: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutRequest {
    /// Check out despite an unpaid balance (Manager/Admin only).
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub booking: Booking,
    pub invoice: Invoice,
    pub ledger: LedgerSummary,
    pub task: HousekeepingTask,
    pub forced: bool,
    pub email_sent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrontDeskBoard {
    pub date: NaiveDate,
    pub arrivals: Vec<Booking>,
    pub departures: Vec<Booking>,
    pub in_house: Vec<Booking>,
    pub rooms_available: usize,
}

/// Check-in and checkout at the desk.
#[derive(Clone)]
pub struct FrontDesk {
    ctx: DeskContext,
}

impl FrontDesk {
    pub fn new(ctx: DeskContext) -> Self {
        Self { ctx }
    }

    pub async fn check_in(&self, booking_id: Uuid, request: CheckInRequest, actor: &Actor) -> DeskResult<Booking> {
        let mut booking = self.ctx.booking(booking_id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(DeskError::Precondition(format!(
                "Only confirmed bookings can be checked in ({} is {})",
                booking.reference, booking.status
            )));
        }

        let today = Utc::now().date_naive();
        if booking.arrival_date > today && !request.allow_early {
            return Err(DeskError::Precondition(format!(
                "Booking {} arrives on {}; early check-in was not allowed",
                booking.reference, booking.arrival_date
            )));
        }

        let room_id = request
            .room_id
            .or(booking.room_id)
            .ok_or_else(|| DeskError::Precondition(format!("Booking {} has no room assigned", booking.reference)))?;
        let room = self.ctx.room(room_id).await?;
        if room.status != RoomStatus::Available {
            tracing::warn!(room = %room.number, status = %room.status, "Check-in refused: room not available");
            return Err(DeskError::Precondition(format!("Room {} is {}", room.number, room.status)));
        }

        booking.check_in(room.id, Utc::now())?;
        let plan = CheckInPlan {
            booking: booking.clone(),
            room_id: room.id,
            audit: AuditEntry::new(
                actor,
                "booking.check_in",
                "booking",
                Some(booking.id),
                serde_json::json!({
                    "reference": booking.reference,
                    "room_number": room.number,
                    "early": booking.arrival_date > today,
                }),
            ),
        };
        self.ctx.repos.frontdesk.apply_check_in(&plan).await?;

        tracing::info!(reference = %booking.reference, room = %room.number, "Guest checked in");

        self.ctx
            .publish_booking_change(&booking, BookingStatus::Confirmed.as_str(), &actor.username)
            .await;
        self.ctx
            .publish_room_change(room.id, &room.number, room.status.as_str(), RoomStatus::Occupied.as_str())
            .await;
        Ok(booking)
    }

    /// Close a stay: settle-or-force, one transaction over booking, room,
    /// housekeeping and invoice, then notify. The email goes out after commit
    /// and a failure there leaves the checkout in place.
    pub async fn checkout(&self, booking_id: Uuid, request: CheckoutRequest, actor: &Actor) -> DeskResult<CheckoutOutcome> {
        let now = Utc::now();
        let mut booking = self.ctx.booking(booking_id).await?;
        if booking.status != BookingStatus::CheckedIn {
            return Err(DeskError::Precondition(format!(
                "Only checked-in bookings can be checked out ({} is {})",
                booking.reference, booking.status
            )));
        }
        let room_id = booking
            .room_id
            .ok_or_else(|| DeskError::Precondition(format!("Booking {} has no room", booking.reference)))?;

        let payments = self.ctx.repos.payments.list_payments_for_booking(booking.id).await?;
        let ledger = LedgerSummary::build(booking.id, booking.total_amount, &booking.currency, &payments);
        let forced = !ledger.is_settled();
        if forced {
            if !request.force {
                tracing::warn!(reference = %booking.reference, balance = ledger.balance, "Checkout refused: balance outstanding");
                return Err(DeskError::OutstandingBalance {
                    balance: ledger.balance,
                    currency: ledger.currency,
                });
            }
            if !actor.can(Permission::ForceCheckout) {
                return Err(DeskError::Forbidden(format!(
                    "{} may not check out with an outstanding balance",
                    actor.role
                )));
            }
        }

        let room = self.ctx.room(room_id).await?;
        let task = self.turnaround_task(&booking, room_id, now.date_naive()).await?;
        // The guest has left; a reused task that is already under way keeps the room Cleaning
        let room_status = expected_status(room.status, false, Some(task.status));

        let (invoice, new_invoice) = match self.ctx.repos.invoices.get_invoice_for_booking(booking.id).await? {
            Some(existing) => (existing, None),
            None => {
                let sequence = self.ctx.repos.invoices.next_invoice_sequence().await?;
                let issued = Invoice::issue(&booking, sequence, self.ctx.rules.vat_rate_bp, now);
                (issued.clone(), Some(issued))
            }
        };

        booking.check_out(now)?;
        let plan = CheckoutPlan {
            booking: booking.clone(),
            room_id,
            room_status,
            task: task.clone(),
            new_invoice,
            audit: AuditEntry::new(
                actor,
                "booking.checkout",
                "booking",
                Some(booking.id),
                serde_json::json!({
                    "reference": booking.reference,
                    "room_number": room.number,
                    "invoice_number": invoice.number,
                    "forced": forced,
                    "outstanding": if forced { ledger.balance } else { 0 },
                }),
            ),
        };
        self.ctx.repos.frontdesk.apply_checkout(&plan).await?;

        tracing::info!(
            reference = %booking.reference,
            room = %room.number,
            invoice = %invoice.number,
            forced,
            "Guest checked out"
        );

        self.ctx
            .publish_booking_change(&booking, BookingStatus::CheckedIn.as_str(), &actor.username)
            .await;
        if room.status != room_status {
            self.ctx
                .publish_room_change(room.id, &room.number, room.status.as_str(), room_status.as_str())
                .await;
        }
        self.ctx
            .publish(DomainEvent::CheckoutCompleted(CheckoutCompletedEvent {
                booking_id: booking.id,
                room_id,
                invoice_id: invoice.id,
                balance: ledger.balance,
                currency: ledger.currency.clone(),
                at: now,
            }))
            .await;

        let mut invoice = invoice;
        let email_sent = self.send_invoice(&mut invoice, &booking).await;

        Ok(CheckoutOutcome {
            booking,
            invoice,
            ledger,
            task,
            forced,
            email_sent,
        })
    }

    /// The room's open cleaning task, raised to High when someone arrives
    /// in the room today; otherwise a fresh Pending task.
    async fn turnaround_task(&self, booking: &Booking, room_id: Uuid, today: NaiveDate) -> DeskResult<HousekeepingTask> {
        let next_arrival = BookingFilter {
            status: Some(BookingStatus::Confirmed),
            arrival_from: Some(today),
            arrival_to: Some(today),
            room_id: Some(room_id),
            ..Default::default()
        };
        let priority = if self.ctx.repos.bookings.list_bookings(&next_arrival).await?.is_empty() {
            TaskPriority::Normal
        } else {
            TaskPriority::High
        };

        let open = TaskFilter { room_id: Some(room_id), ..Default::default() };
        let existing = self
            .ctx
            .repos
            .housekeeping
            .list_tasks(&open)
            .await?
            .into_iter()
            .find(|t| t.is_open());

        Ok(match existing {
            Some(mut task) => {
                task.priority = task.priority.max(priority);
                task
            }
            None => HousekeepingTask::new(
                room_id,
                None,
                priority,
                Some(format!("Checkout {}", booking.reference)),
                Utc::now(),
            ),
        })
    }

    async fn send_invoice(&self, invoice: &mut Invoice, booking: &Booking) -> bool {
        let to = invoice.bill_to_email.expose().clone();
        if !self.ctx.email(&EmailMessage::invoice(invoice, booking, to)).await {
            return false;
        }
        invoice.mark_sent(Utc::now());
        if let Err(e) = self.ctx.repos.invoices.record_invoice_sent(invoice).await {
            tracing::error!(invoice = %invoice.number, "Failed to record invoice send: {}", e);
        }
        true
    }

    /// Today's arrivals and departures plus everyone currently in house.
    pub async fn board(&self, date: NaiveDate) -> DeskResult<FrontDeskBoard> {
        let bookings = &self.ctx.repos.bookings;
        let arrivals = bookings
            .list_bookings(&BookingFilter {
                status: Some(BookingStatus::Confirmed),
                arrival_from: Some(date),
                arrival_to: Some(date),
                ..Default::default()
            })
            .await?;
        let departures = bookings
            .list_bookings(&BookingFilter {
                status: Some(BookingStatus::CheckedIn),
                departure_on: Some(date),
                ..Default::default()
            })
            .await?;
        let in_house = bookings
            .list_bookings(&BookingFilter {
                status: Some(BookingStatus::CheckedIn),
                ..Default::default()
            })
            .await?;
        let rooms_available = self
            .ctx
            .repos
            .rooms
            .list_rooms()
            .await?
            .iter()
            .filter(|r| r.status == RoomStatus::Available)
            .count();

        Ok(FrontDeskBoard {
            date,
            arrivals,
            departures,
            in_house,
            rooms_available,
        })
    }
}
