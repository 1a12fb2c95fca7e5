pub mod audit;
pub mod booking;
pub mod housekeeping;
pub mod invoice;
pub mod memory;
pub mod notify;
pub mod payment;
pub mod repository;
pub mod room;
pub mod session;
pub mod staff;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: String,
        to: String,
    },
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

pub use audit::AuditEntry;
pub use booking::{Booking, BookingKind, BookingStatus};
pub use housekeeping::{HousekeepingTask, TaskPriority, TaskStatus};
pub use invoice::Invoice;
pub use payment::{LedgerSummary, PaymentMethod, PaymentRecord, PaymentStatus};
pub use room::{Room, RoomStatus, RoomStatusChange};
pub use staff::{Actor, Permission, Role, StaffUser};
