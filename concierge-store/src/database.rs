use chrono::Utc;
use concierge_core::repository::{RepoError, Repositories, StaffRepository};
use concierge_core::staff::{validate_password, Role, StaffUser};
use concierge_core::CoreError;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::app_config::{BootstrapAdmin, BusinessRules};
use crate::audit_repo::StoreAuditRepository;
use crate::booking_repo::StoreBookingRepository;
use crate::frontdesk_repo::StoreFrontDeskRepository;
use crate::housekeeping_repo::StoreHousekeepingRepository;
use crate::invoice_repo::StoreInvoiceRepository;
use crate::payment_repo::StorePaymentRepository;
use crate::room_repo::StoreRoomRepository;
use crate::staff_repo::StoreStaffRepository;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    rule_key: String,
    rule_value: Value,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Every repository backed by this pool.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            bookings: Arc::new(StoreBookingRepository::new(self.pool.clone())),
            rooms: Arc::new(StoreRoomRepository::new(self.pool.clone())),
            housekeeping: Arc::new(StoreHousekeepingRepository::new(self.pool.clone())),
            payments: Arc::new(StorePaymentRepository::new(self.pool.clone())),
            invoices: Arc::new(StoreInvoiceRepository::new(self.pool.clone())),
            staff: Arc::new(StoreStaffRepository::new(self.pool.clone())),
            audit: Arc::new(StoreAuditRepository::new(self.pool.clone())),
            frontdesk: Arc::new(StoreFrontDeskRepository::new(self.pool.clone())),
        }
    }

    /// Rules edited from the admin side live in `business_rules` as
    /// `{"value": ...}` and override the file configuration.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, sqlx::Error> {
        let rows: Vec<RuleRow> = sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        let mut rules = defaults;
        for row in rows {
            let Some(v) = row.rule_value.get("value") else {
                continue;
            };
            match row.rule_key.as_str() {
                "currency" => {
                    if let Some(s) = v.as_str() {
                        rules.currency = s.to_uppercase();
                    }
                }
                "vat_rate_bp" => {
                    if let Some(n) = v.as_i64() {
                        rules.vat_rate_bp = n as i32;
                    }
                }
                "tentative_hold_hours" => {
                    if let Some(n) = v.as_i64() {
                        rules.tentative_hold_hours = n;
                    }
                }
                "sweep_interval_seconds" => {
                    if let Some(n) = v.as_u64() {
                        rules.sweep_interval_seconds = n;
                    }
                }
                _ => {}
            }
        }

        Ok(rules)
    }
}

/// Unique-constraint violations surface as domain conflicts so callers can
/// answer 409; any other failure stays a storage error.
pub(crate) fn write_error(e: sqlx::Error) -> RepoError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            let constraint = db.constraint().unwrap_or("unique constraint");
            Box::new(CoreError::Conflict(format!("Duplicate entry violates {}", constraint)))
        }
        other => Box::new(other),
    }
}

/// Create the first admin account if nobody can log in yet.
pub async fn seed_admin(staff: &dyn StaffRepository, admin: &BootstrapAdmin) -> Result<bool, RepoError> {
    if staff.count_staff().await? > 0 {
        return Ok(false);
    }
    validate_password(&admin.password)?;
    let hash = bcrypt::hash(&admin.password, bcrypt::DEFAULT_COST)?;
    let user = StaffUser::create(&admin.username, "Administrator", &admin.email, Role::Admin, hash, Utc::now())?;
    staff.create_staff(&user).await?;
    info!(username = %user.username, "Bootstrap admin account created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::memory::MemoryStore;

    #[tokio::test]
    async fn test_seed_admin_only_on_empty_table() {
        let store = MemoryStore::new();
        let admin = BootstrapAdmin {
            username: "Admin".to_string(),
            password: "change-me-now".to_string(),
            email: "admin@hotel.example".to_string(),
        };

        assert!(seed_admin(&*store, &admin).await.unwrap());
        assert!(!seed_admin(&*store, &admin).await.unwrap());

        let user = store.find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(bcrypt::verify("change-me-now", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_seed_admin_rejects_short_password() {
        let store = MemoryStore::new();
        let admin = BootstrapAdmin {
            username: "admin".to_string(),
            password: "short".to_string(),
            email: "admin@hotel.example".to_string(),
        };
        assert!(seed_admin(&*store, &admin).await.is_err());
    }

    #[derive(Debug)]
    struct FakeDbError {
        unique: bool,
    }

    impl std::fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "fake database error")
        }
    }

    impl std::error::Error for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "fake database error"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some("rooms_number_key")
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.unique {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::Other
            }
        }
    }

    #[test]
    fn test_unique_violation_becomes_conflict() {
        let err = write_error(sqlx::Error::Database(Box::new(FakeDbError { unique: true })));
        match err.downcast_ref::<CoreError>() {
            Some(CoreError::Conflict(msg)) => assert!(msg.contains("rooms_number_key")),
            other => panic!("expected conflict, got {:?}", other),
        }

        let err = write_error(sqlx::Error::Database(Box::new(FakeDbError { unique: false })));
        assert!(err.downcast_ref::<CoreError>().is_none());
        assert!(write_error(sqlx::Error::RowNotFound).downcast_ref::<sqlx::Error>().is_some());
    }
}
