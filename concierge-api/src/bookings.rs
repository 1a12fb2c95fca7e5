use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use concierge_core::booking::BookingUpdate;
use concierge_core::repository::BookingFilter;
use concierge_core::{Actor, Booking, BookingStatus, Permission};
use concierge_desk::{BookingRequest, SweepReport};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, middleware::require, state::AppState};

#[derive(Debug, Deserialize)]
struct ListBookingsQuery {
    status: Option<BookingStatus>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    room_id: Option<Uuid>,
    limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CancelRequest {
    reason: String,
}

#[derive(Debug, Deserialize)]
struct ExtendRequest {
    hours: i64,
}

#[derive(Debug, Deserialize)]
struct ExpiringQuery {
    #[serde(default = "default_window")]
    within_hours: i64,
}

fn default_window() -> i64 {
    24
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", get(list_bookings).post(create_booking))
        .route("/v1/bookings/tentative/expiring", get(expiring_bookings))
        .route("/v1/bookings/tentative/sweep", post(sweep_bookings))
        .route("/v1/bookings/{id}", get(get_booking).put(update_booking))
        .route("/v1/bookings/{id}/confirm", post(confirm_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/extend", post(extend_booking))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    require(&actor, Permission::ManageBookings)?;
    let filter = BookingFilter {
        status: query.status,
        arrival_from: query.from,
        arrival_to: query.to,
        room_id: query.room_id,
        limit: query.limit,
        ..Default::default()
    };
    Ok(Json(state.desk.reservations.list(&filter).await?))
}

async fn create_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<BookingRequest>,
) -> Result<Json<Booking>, AppError> {
    require(&actor, Permission::ManageBookings)?;
    Ok(Json(state.desk.reservations.create(req, &actor).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    require(&actor, Permission::ManageBookings)?;
    Ok(Json(state.desk.reservations.get(id).await?))
}

async fn update_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<BookingUpdate>,
) -> Result<Json<Booking>, AppError> {
    require(&actor, Permission::ManageBookings)?;
    Ok(Json(state.desk.reservations.update(id, req, &actor).await?))
}

async fn confirm_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    require(&actor, Permission::ManageBookings)?;
    Ok(Json(state.desk.reservations.confirm(id, &actor).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<Booking>, AppError> {
    require(&actor, Permission::ManageBookings)?;
    Ok(Json(state.desk.reservations.cancel(id, &req.reason, &actor).await?))
}

async fn extend_booking(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<ExtendRequest>,
) -> Result<Json<Booking>, AppError> {
    require(&actor, Permission::ManageBookings)?;
    Ok(Json(state.desk.reservations.extend(id, req.hours, &actor).await?))
}

async fn expiring_bookings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ExpiringQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    require(&actor, Permission::ManageBookings)?;
    Ok(Json(state.desk.reservations.expiring(query.within_hours).await?))
}

async fn sweep_bookings(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<SweepReport>, AppError> {
    require(&actor, Permission::ManageBookings)?;
    tracing::info!(username = %actor.username, "Manual tentative sweep requested");
    Ok(Json(state.desk.reservations.sweep_expired(Utc::now()).await?))
}
