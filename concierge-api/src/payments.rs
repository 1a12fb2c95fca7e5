use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use concierge_core::payment::{NewPayment, TakingsReport};
use concierge_core::{Actor, LedgerSummary, PaymentRecord, Permission};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, middleware::require, state::AppState};

#[derive(Debug, Deserialize)]
struct TakingsQuery {
    date: Option<NaiveDate>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/{id}/payments", get(list_payments).post(record_payment))
        .route("/v1/bookings/{id}/ledger", get(ledger))
        .route("/v1/payments/{id}/refund", post(refund_payment))
        .route("/v1/payments/{id}/void", post(void_payment))
        .route("/v1/reports/takings", get(takings))
}

async fn list_payments(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Vec<PaymentRecord>>, AppError> {
    require(&actor, Permission::ManagePayments)?;
    Ok(Json(state.desk.billing.payments(booking_id).await?))
}

async fn record_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<NewPayment>,
) -> Result<Json<PaymentRecord>, AppError> {
    require(&actor, Permission::ManagePayments)?;
    Ok(Json(state.desk.billing.record_payment(booking_id, req, &actor).await?))
}

async fn ledger(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<LedgerSummary>, AppError> {
    require(&actor, Permission::ManagePayments)?;
    Ok(Json(state.desk.billing.ledger(booking_id).await?))
}

async fn refund_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentRecord>, AppError> {
    require(&actor, Permission::ManagePayments)?;
    Ok(Json(state.desk.billing.refund(id, &actor).await?))
}

async fn void_payment(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentRecord>, AppError> {
    require(&actor, Permission::ManagePayments)?;
    Ok(Json(state.desk.billing.void(id, &actor).await?))
}

async fn takings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<TakingsQuery>,
) -> Result<Json<TakingsReport>, AppError> {
    require(&actor, Permission::ManagePayments)?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.desk.billing.takings(date).await?))
}
