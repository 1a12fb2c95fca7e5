use async_trait::async_trait;
use concierge_core::repository::{CheckInPlan, CheckoutPlan, FrontDeskRepository, RepoError};
use concierge_core::RoomStatus;
use sqlx::PgPool;
use tracing::debug;

use crate::audit_repo::insert_audit;
use crate::booking_repo::write_booking;
use crate::housekeeping_repo::upsert_task;
use crate::invoice_repo::insert_invoice;
use crate::room_repo::write_room_status;

/// Check-in and checkout each commit as one transaction; any failed
/// statement rolls the whole plan back when `tx` drops.
pub struct StoreFrontDeskRepository {
    pool: PgPool,
}

impl StoreFrontDeskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FrontDeskRepository for StoreFrontDeskRepository {
    async fn apply_check_in(&self, plan: &CheckInPlan) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;

        write_booking(&mut *tx, &plan.booking).await?;
        write_room_status(&mut *tx, plan.room_id, RoomStatus::Occupied).await?;
        insert_audit(&mut *tx, &plan.audit).await?;

        tx.commit().await?;
        debug!(booking_id = %plan.booking.id, "Check-in committed");
        Ok(())
    }

    async fn apply_checkout(&self, plan: &CheckoutPlan) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;

        write_booking(&mut *tx, &plan.booking).await?;
        write_room_status(&mut *tx, plan.room_id, plan.room_status).await?;
        upsert_task(&mut *tx, &plan.task).await?;
        if let Some(invoice) = &plan.new_invoice {
            insert_invoice(&mut *tx, invoice).await?;
        }
        insert_audit(&mut *tx, &plan.audit).await?;

        tx.commit().await?;
        debug!(booking_id = %plan.booking.id, "Checkout committed");
        Ok(())
    }
}
