use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::audit::AuditEntry;
use crate::booking::{Booking, BookingStatus};
use crate::housekeeping::{HousekeepingTask, TaskStatus};
use crate::invoice::Invoice;
use crate::payment::{PaymentRecord, PaymentStatus};
use crate::room::{Room, RoomStatus, RoomStatusChange};
use crate::staff::StaffUser;

pub type RepoError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub arrival_from: Option<NaiveDate>,
    pub arrival_to: Option<NaiveDate>,
    pub departure_on: Option<NaiveDate>,
    pub room_id: Option<Uuid>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
}

/// Row changes for a check-in, applied in one transaction.
#[derive(Debug, Clone)]
pub struct CheckInPlan {
    pub booking: Booking,
    pub room_id: Uuid,
    pub audit: AuditEntry,
}

/// Row changes for a checkout, applied in one transaction.
#[derive(Debug, Clone)]
pub struct CheckoutPlan {
    pub booking: Booking,
    pub room_id: Uuid,
    pub room_status: RoomStatus,
    pub task: HousekeepingTask,
    /// Only set when the booking had no invoice yet.
    pub new_invoice: Option<Invoice>,
    pub audit: AuditEntry,
}

/// Repository trait for booking data access
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> Result<(), RepoError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError>;

    /// Persist every mutable column of the booking.
    async fn update_booking(&self, booking: &Booking) -> Result<(), RepoError>;

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, RepoError>;

    /// Tentative bookings whose hold ends at or before `before`, soonest first.
    async fn list_tentative_expiring(&self, before: DateTime<Utc>) -> Result<Vec<Booking>, RepoError>;

    /// Rooms that currently have a checked-in booking.
    async fn occupied_room_ids(&self) -> Result<Vec<Uuid>, RepoError>;
}

/// Repository trait for room inventory access
#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn create_room(&self, room: &Room) -> Result<(), RepoError>;

    async fn get_room(&self, id: Uuid) -> Result<Option<Room>, RepoError>;

    async fn list_rooms(&self) -> Result<Vec<Room>, RepoError>;

    async fn update_room(&self, room: &Room) -> Result<(), RepoError>;

    async fn set_room_status(&self, id: Uuid, status: RoomStatus) -> Result<(), RepoError>;

    /// Apply a reconciliation run atomically.
    async fn apply_status_changes(&self, changes: &[RoomStatusChange]) -> Result<(), RepoError>;
}

/// Repository trait for housekeeping assignments
#[async_trait]
pub trait HousekeepingRepository: Send + Sync {
    async fn create_task(&self, task: &HousekeepingTask) -> Result<(), RepoError>;

    async fn get_task(&self, id: Uuid) -> Result<Option<HousekeepingTask>, RepoError>;

    async fn update_task(&self, task: &HousekeepingTask) -> Result<(), RepoError>;

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<HousekeepingTask>, RepoError>;

    /// Pending and in-progress tasks across all rooms.
    async fn open_tasks(&self) -> Result<Vec<HousekeepingTask>, RepoError>;
}

/// Repository trait for the payment ledger
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn record_payment(&self, payment: &PaymentRecord) -> Result<(), RepoError>;

    async fn get_payment(&self, id: Uuid) -> Result<Option<PaymentRecord>, RepoError>;

    async fn update_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<(), RepoError>;

    async fn list_payments_for_booking(&self, booking_id: Uuid) -> Result<Vec<PaymentRecord>, RepoError>;

    async fn list_payments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PaymentRecord>, RepoError>;
}

/// Repository trait for invoices
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn next_invoice_sequence(&self) -> Result<i64, RepoError>;

    async fn create_invoice(&self, invoice: &Invoice) -> Result<(), RepoError>;

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>, RepoError>;

    async fn get_invoice_for_booking(&self, booking_id: Uuid) -> Result<Option<Invoice>, RepoError>;

    async fn list_invoices(&self, limit: i64) -> Result<Vec<Invoice>, RepoError>;

    async fn record_invoice_sent(&self, invoice: &Invoice) -> Result<(), RepoError>;
}

/// Repository trait for staff accounts
#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn create_staff(&self, user: &StaffUser) -> Result<(), RepoError>;

    async fn get_staff(&self, id: Uuid) -> Result<Option<StaffUser>, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<StaffUser>, RepoError>;

    async fn list_staff(&self) -> Result<Vec<StaffUser>, RepoError>;

    async fn update_staff(&self, user: &StaffUser) -> Result<(), RepoError>;

    async fn count_staff(&self) -> Result<i64, RepoError>;
}

/// Repository trait for the activity log
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), RepoError>;

    async fn recent(&self, limit: i64) -> Result<Vec<AuditEntry>, RepoError>;
}

/// Multi-table front-desk writes that must commit together.
#[async_trait]
pub trait FrontDeskRepository: Send + Sync {
    async fn apply_check_in(&self, plan: &CheckInPlan) -> Result<(), RepoError>;

    async fn apply_checkout(&self, plan: &CheckoutPlan) -> Result<(), RepoError>;
}

/// Every repository the back-office works against.
#[derive(Clone)]
pub struct Repositories {
    pub bookings: Arc<dyn BookingRepository>,
    pub rooms: Arc<dyn RoomRepository>,
    pub housekeeping: Arc<dyn HousekeepingRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub staff: Arc<dyn StaffRepository>,
    pub audit: Arc<dyn AuditRepository>,
    pub frontdesk: Arc<dyn FrontDeskRepository>,
}
