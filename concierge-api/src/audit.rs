use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use concierge_core::{Actor, AuditEntry, Permission};
use serde::Deserialize;

use crate::{error::AppError, middleware::require, state::AppState};

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/audit", get(recent_audit))
}

async fn recent_audit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    require(&actor, Permission::ViewAudit)?;
    let limit = query.limit.unwrap_or(100).clamp(1, 1000);
    Ok(Json(state.repos.audit.recent(limit).await?))
}
