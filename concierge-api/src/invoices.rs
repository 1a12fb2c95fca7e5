use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use concierge_core::{Actor, Invoice, Permission};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, middleware::require, state::AppState};

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Default, Deserialize)]
struct ResendRequest {
    /// Send to this address instead of the bill-to email.
    email: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/{id}/invoice", post(issue_invoice))
        .route("/v1/invoices", get(list_invoices))
        .route("/v1/invoices/{id}", get(get_invoice))
        .route("/v1/invoices/{id}/resend", post(resend_invoice))
}

async fn issue_invoice(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(booking_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    require(&actor, Permission::ManagePayments)?;
    let (invoice, created) = state.desk.billing.issue_invoice(booking_id, &actor).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(invoice)))
}

async fn list_invoices(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    require(&actor, Permission::ManagePayments)?;
    Ok(Json(state.desk.billing.list_invoices(query.limit).await?))
}

async fn get_invoice(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    require(&actor, Permission::ManagePayments)?;
    Ok(Json(state.desk.billing.get_invoice(id).await?))
}

async fn resend_invoice(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResendRequest>,
) -> Result<Json<Invoice>, AppError> {
    require(&actor, Permission::ManagePayments)?;
    Ok(Json(
        state
            .desk
            .billing
            .resend_invoice(id, req.email.as_deref(), &actor)
            .await?,
    ))
}
