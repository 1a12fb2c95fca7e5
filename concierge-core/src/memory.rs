//! HashMap-backed implementations of the repository, session and notifier
//! traits for the test suites. Unique constraints behave like the Postgres
//! schema's: a violation is a `CoreError::Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concierge_shared::models::events::DomainEvent;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::booking::{Booking, BookingStatus};
use crate::housekeeping::HousekeepingTask;
use crate::invoice::Invoice;
use crate::notify::{EmailMessage, Notifier};
use crate::payment::{PaymentRecord, PaymentStatus};
use crate::repository::*;
use crate::room::{Room, RoomStatus, RoomStatusChange};
use crate::session::SessionStore;
use crate::staff::StaffUser;
use crate::CoreError;

#[derive(Default)]
struct Tables {
    bookings: HashMap<Uuid, Booking>,
    rooms: HashMap<Uuid, Room>,
    tasks: HashMap<Uuid, HousekeepingTask>,
    payments: HashMap<Uuid, PaymentRecord>,
    invoices: HashMap<Uuid, Invoice>,
    staff: HashMap<Uuid, StaffUser>,
    audit: Vec<AuditEntry>,
}

/// One lock over every table so multi-table plans apply atomically.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    invoice_sequence: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The same store behind every repository trait.
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            bookings: self.clone(),
            rooms: self.clone(),
            housekeeping: self.clone(),
            payments: self.clone(),
            invoices: self.clone(),
            staff: self.clone(),
            audit: self.clone(),
            frontdesk: self.clone(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepoError> {
        self.tables.lock().map_err(|_| "memory store lock poisoned".into())
    }
}

fn missing(entity: &str, id: Uuid) -> RepoError {
    format!("{} {} not found", entity, id).into()
}

fn duplicate(what: String) -> RepoError {
    Box::new(CoreError::Conflict(format!("Duplicate entry: {}", what)))
}

impl Tables {
    /// Mirrors the partial unique index on open tasks per room.
    fn check_open_task(&self, task: &HousekeepingTask) -> Result<(), RepoError> {
        let clash = task.is_open()
            && self
                .tasks
                .values()
                .any(|t| t.id != task.id && t.room_id == task.room_id && t.is_open());
        if clash {
            return Err(duplicate(format!("open housekeeping task for room {}", task.room_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: &Booking) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        if t.bookings.values().any(|b| b.reference == booking.reference) {
            return Err(duplicate(format!("booking reference {}", booking.reference)));
        }
        t.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    async fn update_booking(&self, booking: &Booking) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        let slot = t.bookings.get_mut(&booking.id).ok_or_else(|| missing("booking", booking.id))?;
        *slot = booking.clone();
        Ok(())
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepoError> {
        let t = self.lock()?;
        let mut rows: Vec<Booking> = t
            .bookings
            .values()
            .filter(|b| filter.status.is_none_or(|s| b.status == s))
            .filter(|b| filter.arrival_from.is_none_or(|d| b.arrival_date >= d))
            .filter(|b| filter.arrival_to.is_none_or(|d| b.arrival_date <= d))
            .filter(|b| filter.departure_on.is_none_or(|d| b.departure_date == d))
            .filter(|b| filter.room_id.is_none_or(|r| b.room_id == Some(r)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.arrival_date.cmp(&b.arrival_date).then(a.created_at.cmp(&b.created_at)));
        if let Some(limit) = filter.limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn list_tentative_expiring(&self, before: DateTime<Utc>) -> Result<Vec<Booking>, RepoError> {
        let t = self.lock()?;
        let mut rows: Vec<Booking> = t
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Tentative)
            .filter(|b| b.tentative_expires_at.is_some_and(|e| e <= before))
            .cloned()
            .collect();
        rows.sort_by_key(|b| b.tentative_expires_at);
        Ok(rows)
    }

    async fn occupied_room_ids(&self) -> Result<Vec<Uuid>, RepoError> {
        let t = self.lock()?;
        Ok(t.bookings
            .values()
            .filter(|b| b.status == BookingStatus::CheckedIn)
            .filter_map(|b| b.room_id)
            .collect())
    }
}

#[async_trait]
impl RoomRepository for MemoryStore {
    async fn create_room(&self, room: &Room) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        if t.rooms.values().any(|r| r.number == room.number) {
            return Err(duplicate(format!("room number {}", room.number)));
        }
        t.rooms.insert(room.id, room.clone());
        Ok(())
    }

    async fn get_room(&self, id: Uuid) -> Result<Option<Room>, RepoError> {
        Ok(self.lock()?.rooms.get(&id).cloned())
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, RepoError> {
        let mut rooms: Vec<Room> = self.lock()?.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(rooms)
    }

    async fn update_room(&self, room: &Room) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        if t.rooms.values().any(|r| r.id != room.id && r.number == room.number) {
            return Err(duplicate(format!("room number {}", room.number)));
        }
        let slot = t.rooms.get_mut(&room.id).ok_or_else(|| missing("room", room.id))?;
        *slot = room.clone();
        Ok(())
    }

    async fn set_room_status(&self, id: Uuid, status: RoomStatus) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        let room = t.rooms.get_mut(&id).ok_or_else(|| missing("room", id))?;
        room.status = status;
        room.updated_at = Utc::now();
        Ok(())
    }

    async fn apply_status_changes(&self, changes: &[RoomStatusChange]) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        if let Some(change) = changes.iter().find(|c| !t.rooms.contains_key(&c.room_id)) {
            return Err(missing("room", change.room_id));
        }
        for change in changes {
            if let Some(room) = t.rooms.get_mut(&change.room_id) {
                room.status = change.to;
                room.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl HousekeepingRepository for MemoryStore {
    async fn create_task(&self, task: &HousekeepingTask) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        t.check_open_task(task)?;
        t.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<HousekeepingTask>, RepoError> {
        Ok(self.lock()?.tasks.get(&id).cloned())
    }

    async fn update_task(&self, task: &HousekeepingTask) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        t.check_open_task(task)?;
        let slot = t.tasks.get_mut(&task.id).ok_or_else(|| missing("task", task.id))?;
        *slot = task.clone();
        Ok(())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<HousekeepingTask>, RepoError> {
        let t = self.lock()?;
        let mut tasks: Vec<HousekeepingTask> = t
            .tasks
            .values()
            .filter(|task| filter.status.is_none_or(|s| task.status == s))
            .filter(|task| filter.assignee_id.is_none_or(|a| task.assignee_id == Some(a)))
            .filter(|task| filter.room_id.is_none_or(|r| task.room_id == r))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        Ok(tasks)
    }

    async fn open_tasks(&self) -> Result<Vec<HousekeepingTask>, RepoError> {
        Ok(self.lock()?.tasks.values().filter(|t| t.is_open()).cloned().collect())
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn record_payment(&self, payment: &PaymentRecord) -> Result<(), RepoError> {
        self.lock()?.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> Result<Option<PaymentRecord>, RepoError> {
        Ok(self.lock()?.payments.get(&id).cloned())
    }

    async fn update_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        let payment = t.payments.get_mut(&id).ok_or_else(|| missing("payment", id))?;
        payment.status = status;
        Ok(())
    }

    async fn list_payments_for_booking(&self, booking_id: Uuid) -> Result<Vec<PaymentRecord>, RepoError> {
        let t = self.lock()?;
        let mut rows: Vec<PaymentRecord> = t.payments.values().filter(|p| p.booking_id == booking_id).cloned().collect();
        rows.sort_by_key(|p| p.created_at);
        Ok(rows)
    }

    async fn list_payments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentRecord>, RepoError> {
        let t = self.lock()?;
        let mut rows: Vec<PaymentRecord> = t
            .payments
            .values()
            .filter(|p| p.created_at >= from && p.created_at < to)
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.created_at);
        Ok(rows)
    }
}

#[async_trait]
impl InvoiceRepository for MemoryStore {
    async fn next_invoice_sequence(&self) -> Result<i64, RepoError> {
        Ok(self.invoice_sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn create_invoice(&self, invoice: &Invoice) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        if t.invoices.values().any(|i| i.booking_id == invoice.booking_id) {
            return Err(duplicate(format!("invoice for booking {}", invoice.booking_id)));
        }
        t.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, RepoError> {
        Ok(self.lock()?.invoices.get(&id).cloned())
    }

    async fn get_invoice_for_booking(&self, booking_id: Uuid) -> Result<Option<Invoice>, RepoError> {
        Ok(self.lock()?.invoices.values().find(|i| i.booking_id == booking_id).cloned())
    }

    async fn list_invoices(&self, limit: i64) -> Result<Vec<Invoice>, RepoError> {
        let mut rows: Vec<Invoice> = self.lock()?.invoices.values().cloned().collect();
        rows.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn record_invoice_sent(&self, invoice: &Invoice) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        let slot = t.invoices.get_mut(&invoice.id).ok_or_else(|| missing("invoice", invoice.id))?;
        slot.last_sent_at = invoice.last_sent_at;
        slot.send_count = invoice.send_count;
        Ok(())
    }
}

#[async_trait]
impl StaffRepository for MemoryStore {
    async fn create_staff(&self, user: &StaffUser) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        if t.staff.values().any(|s| s.username == user.username) {
            return Err(duplicate(format!("username {}", user.username)));
        }
        t.staff.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_staff(&self, id: Uuid) -> Result<Option<StaffUser>, RepoError> {
        Ok(self.lock()?.staff.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<StaffUser>, RepoError> {
        Ok(self.lock()?.staff.values().find(|s| s.username == username).cloned())
    }

    async fn list_staff(&self) -> Result<Vec<StaffUser>, RepoError> {
        let mut rows: Vec<StaffUser> = self.lock()?.staff.values().cloned().collect();
        rows.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(rows)
    }

    async fn update_staff(&self, user: &StaffUser) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        let slot = t.staff.get_mut(&user.id).ok_or_else(|| missing("staff", user.id))?;
        *slot = user.clone();
        Ok(())
    }

    async fn count_staff(&self) -> Result<i64, RepoError> {
        Ok(self.lock()?.staff.len() as i64)
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepoError> {
        self.lock()?.audit.push(entry.clone());
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<AuditEntry>, RepoError> {
        let t = self.lock()?;
        Ok(t.audit.iter().rev().take(limit.max(0) as usize).cloned().collect())
    }
}

#[async_trait]
impl FrontDeskRepository for MemoryStore {
    async fn apply_check_in(&self, plan: &CheckInPlan) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        if !t.bookings.contains_key(&plan.booking.id) {
            return Err(missing("booking", plan.booking.id));
        }
        let room = t.rooms.get_mut(&plan.room_id).ok_or_else(|| missing("room", plan.room_id))?;
        room.status = RoomStatus::Occupied;
        room.updated_at = Utc::now();
        t.bookings.insert(plan.booking.id, plan.booking.clone());
        t.audit.push(plan.audit.clone());
        Ok(())
    }

    async fn apply_checkout(&self, plan: &CheckoutPlan) -> Result<(), RepoError> {
        let mut t = self.lock()?;
        if !t.bookings.contains_key(&plan.booking.id) {
            return Err(missing("booking", plan.booking.id));
        }
        if let Some(invoice) = &plan.new_invoice {
            if t.invoices.values().any(|i| i.booking_id == invoice.booking_id) {
                return Err(duplicate(format!("invoice for booking {}", invoice.booking_id)));
            }
        }
        t.check_open_task(&plan.task)?;
        let room = t.rooms.get_mut(&plan.room_id).ok_or_else(|| missing("room", plan.room_id))?;
        room.status = plan.room_status;
        room.updated_at = Utc::now();
        t.bookings.insert(plan.booking.id, plan.booking.clone());
        t.tasks.insert(plan.task.id, plan.task.clone());
        if let Some(invoice) = &plan.new_invoice {
            t.invoices.insert(invoice.id, invoice.clone());
        }
        t.audit.push(plan.audit.clone());
        Ok(())
    }
}

/// Revocations and counters in process memory; windows are not enforced.
#[derive(Default)]
pub struct MemorySessionStore {
    revoked: Mutex<HashMap<String, u64>>,
    counters: Mutex<HashMap<String, i64>>,
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn revoke_token(&self, jti: &str, ttl_seconds: u64) -> Result<(), RepoError> {
        let mut revoked = self.revoked.lock().map_err(|_| RepoError::from("session lock poisoned"))?;
        revoked.insert(jti.to_string(), ttl_seconds);
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, RepoError> {
        let revoked = self.revoked.lock().map_err(|_| RepoError::from("session lock poisoned"))?;
        Ok(revoked.contains_key(jti))
    }

    async fn check_rate_limit(&self, key: &str, limit: i64, _window_seconds: i64) -> Result<bool, RepoError> {
        let mut counters = self.counters.lock().map_err(|_| RepoError::from("session lock poisoned"))?;
        let count = counters.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count <= limit)
    }

    async fn reset_rate_limit(&self, key: &str) -> Result<(), RepoError> {
        let mut counters = self.counters.lock().map_err(|_| RepoError::from("session lock poisoned"))?;
        counters.remove(key);
        Ok(())
    }
}

/// Keeps everything it is asked to send; can be switched to fail emails.
#[derive(Default)]
pub struct RecordingNotifier {
    emails: Mutex<Vec<EmailMessage>>,
    events: Mutex<Vec<DomainEvent>>,
    fail_email: AtomicBool,
}

impl RecordingNotifier {
    pub fn set_email_failure(&self, fail: bool) {
        self.fail_email.store(fail, Ordering::SeqCst);
    }

    pub fn emails(&self) -> Vec<EmailMessage> {
        self.emails.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), RepoError> {
        if self.fail_email.load(Ordering::SeqCst) {
            return Err("mail relay unavailable".into());
        }
        let mut emails = self.emails.lock().map_err(|_| RepoError::from("notifier lock poisoned"))?;
        emails.push(message.clone());
        Ok(())
    }

    async fn publish(&self, event: &DomainEvent) -> Result<(), RepoError> {
        let mut events = self.events.lock().map_err(|_| RepoError::from("notifier lock poisoned"))?;
        events.push(event.clone());
        Ok(())
    }
}
