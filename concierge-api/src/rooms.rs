use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use concierge_core::room::{NewRoom, RoomUpdate};
use concierge_core::{Actor, Permission, Room, RoomStatus, RoomStatusChange};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::{error::AppError, middleware::require, state::AppState};

#[derive(Debug, Deserialize)]
struct SetStatusRequest {
    status: RoomStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/rooms", get(list_rooms).post(create_room))
        .route("/v1/rooms/reconcile", post(reconcile_rooms))
        .route("/v1/rooms/stream", get(room_stream))
        .route("/v1/rooms/{id}", get(get_room).put(update_room))
        .route("/v1/rooms/{id}/status", post(set_room_status))
}

async fn list_rooms(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Room>>, AppError> {
    require(&actor, Permission::ViewRooms)?;
    Ok(Json(state.desk.rooms.list().await?))
}

async fn create_room(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<NewRoom>,
) -> Result<Json<Room>, AppError> {
    require(&actor, Permission::ManageRooms)?;
    Ok(Json(state.desk.rooms.create(req, &actor).await?))
}

async fn get_room(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Room>, AppError> {
    require(&actor, Permission::ViewRooms)?;
    Ok(Json(state.desk.rooms.get(id).await?))
}

async fn update_room(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<RoomUpdate>,
) -> Result<Json<Room>, AppError> {
    require(&actor, Permission::ManageRooms)?;
    Ok(Json(state.desk.rooms.update(id, req, &actor).await?))
}

async fn set_room_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<Room>, AppError> {
    require(&actor, Permission::ManageRooms)?;
    Ok(Json(state.desk.rooms.set_status(id, req.status, &actor).await?))
}

async fn reconcile_rooms(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<RoomStatusChange>>, AppError> {
    require(&actor, Permission::ManageRooms)?;
    Ok(Json(state.desk.rooms.reconcile(&actor).await?))
}

/// Live room board: one `room_status` event per change, lagged messages dropped.
async fn room_stream(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    require(&actor, Permission::ViewRooms)?;
    let rx = state.sse_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(change) => Some(Event::default().event("room_status").json_data(&change)),
            Err(e) => {
                tracing::warn!("Room stream lagged: {}", e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
