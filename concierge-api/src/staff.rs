use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use concierge_core::staff::validate_password;
use concierge_core::{Actor, AuditEntry, Permission, Role, StaffUser};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{error::AppError, middleware::require, passwords, state::AppState};

#[derive(Debug, Deserialize)]
struct CreateStaffRequest {
    username: String,
    display_name: String,
    email: String,
    role: Role,
    password: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/staff", get(list_staff).post(create_staff))
        .route("/v1/staff/{id}/deactivate", post(deactivate_staff))
}

async fn list_staff(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<StaffUser>>, AppError> {
    require(&actor, Permission::ManageStaff)?;
    Ok(Json(state.repos.staff.list_staff().await?))
}

async fn create_staff(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateStaffRequest>,
) -> Result<Json<StaffUser>, AppError> {
    require(&actor, Permission::ManageStaff)?;
    validate_password(&req.password)?;

    let hash = passwords::hash(req.password).await?;
    let user = StaffUser::create(&req.username, &req.display_name, &req.email, req.role, hash, Utc::now())?;

    if state.repos.staff.find_by_username(&user.username).await?.is_some() {
        return Err(AppError::ConflictError(format!("Username {} is taken", user.username)));
    }
    state.repos.staff.create_staff(&user).await?;
    state
        .repos
        .audit
        .append(&AuditEntry::new(
            &actor,
            "staff.create",
            "staff",
            Some(user.id),
            json!({ "username": user.username, "role": user.role }),
        ))
        .await?;

    tracing::info!(username = %user.username, role = %user.role, "Staff account created");
    Ok(Json(user))
}

async fn deactivate_staff(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<StaffUser>, AppError> {
    require(&actor, Permission::ManageStaff)?;
    if id == actor.staff_id {
        return Err(AppError::ConflictError("You cannot deactivate your own account".to_string()));
    }

    let mut user = state
        .repos
        .staff
        .get_staff(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Staff {} not found", id)))?;
    if user.active {
        user.active = false;
        state.repos.staff.update_staff(&user).await?;
        state
            .repos
            .audit
            .append(&AuditEntry::new(&actor, "staff.deactivate", "staff", Some(user.id), json!({})))
            .await?;
        tracing::info!(username = %user.username, "Staff account deactivated");
    }

    Ok(Json(user))
}
