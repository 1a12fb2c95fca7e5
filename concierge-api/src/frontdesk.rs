use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use concierge_core::{Actor, Booking, Permission};
use concierge_desk::{CheckInRequest, CheckoutOutcome, CheckoutRequest, FrontDeskBoard};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, middleware::require, state::AppState};

#[derive(Debug, Deserialize)]
struct BoardQuery {
    date: Option<NaiveDate>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/frontdesk/bookings/{id}/check-in", post(check_in))
        .route("/v1/frontdesk/bookings/{id}/checkout", post(checkout))
        .route("/v1/frontdesk/board", get(board))
}

async fn check_in(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<CheckInRequest>,
) -> Result<Json<Booking>, AppError> {
    require(&actor, Permission::FrontDesk)?;
    Ok(Json(state.desk.frontdesk.check_in(id, req, &actor).await?))
}

async fn checkout(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutOutcome>, AppError> {
    require(&actor, Permission::FrontDesk)?;
    let outcome = state.desk.frontdesk.checkout(id, req, &actor).await?;
    if !outcome.email_sent {
        tracing::warn!(booking_id = %id, invoice = %outcome.invoice.number, "Checkout finished without invoice email");
    }
    Ok(Json(outcome))
}

async fn board(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<BoardQuery>,
) -> Result<Json<FrontDeskBoard>, AppError> {
    require(&actor, Permission::FrontDesk)?;
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(state.desk.frontdesk.board(date).await?))
}
