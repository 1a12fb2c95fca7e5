use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use concierge_core::repository::TaskFilter;
use concierge_core::{Actor, HousekeepingTask, Permission};
use concierge_desk::NewTask;
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::AppError, middleware::require, state::AppState};

#[derive(Debug, Deserialize)]
struct AssignRequest {
    assignee_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/housekeeping/tasks", get(list_tasks).post(create_task))
        .route("/v1/housekeeping/tasks/{id}", get(get_task))
        .route("/v1/housekeeping/tasks/{id}/assign", post(assign_task))
        .route("/v1/housekeeping/tasks/{id}/start", post(start_task))
        .route("/v1/housekeeping/tasks/{id}/complete", post(complete_task))
        .route("/v1/housekeeping/tasks/{id}/cancel", post(cancel_task))
}

async fn list_tasks(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<Vec<HousekeepingTask>>, AppError> {
    require(&actor, Permission::Housekeeping)?;
    Ok(Json(state.desk.housekeeping.list(filter, &actor).await?))
}

async fn create_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<NewTask>,
) -> Result<Json<HousekeepingTask>, AppError> {
    require(&actor, Permission::Housekeeping)?;
    Ok(Json(state.desk.housekeeping.create(req, &actor).await?))
}

async fn get_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<HousekeepingTask>, AppError> {
    require(&actor, Permission::Housekeeping)?;
    Ok(Json(state.desk.housekeeping.get(id, &actor).await?))
}

async fn assign_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<HousekeepingTask>, AppError> {
    require(&actor, Permission::Housekeeping)?;
    Ok(Json(state.desk.housekeeping.assign(id, req.assignee_id, &actor).await?))
}

async fn start_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<HousekeepingTask>, AppError> {
    require(&actor, Permission::Housekeeping)?;
    Ok(Json(state.desk.housekeeping.start(id, &actor).await?))
}

async fn complete_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<HousekeepingTask>, AppError> {
    require(&actor, Permission::Housekeeping)?;
    Ok(Json(state.desk.housekeeping.complete(id, &actor).await?))
}

async fn cancel_task(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<HousekeepingTask>, AppError> {
    require(&actor, Permission::Housekeeping)?;
    Ok(Json(state.desk.housekeeping.cancel(id, &actor).await?))
}
