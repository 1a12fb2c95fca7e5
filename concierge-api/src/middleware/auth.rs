use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use concierge_core::{Actor, Permission};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StaffClaims {
    pub sub: Uuid,
    pub username: String,
    pub role: String,
    /// Token id; logout revokes it.
    pub jti: String,
    pub exp: usize,
}

/// Resolves the bearer token to the current staff account and injects both
/// the claims and the `Actor` into request extensions.
pub async fn staff_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let token_data = decode::<StaffClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(e.to_string()))?;
    let claims = token_data.claims;

    if state.sessions.is_revoked(&claims.jti).await? {
        return Err(AppError::AuthenticationError("Token has been revoked".to_string()));
    }

    // Role changes and deactivation take effect on the next request.
    let user = state
        .repos
        .staff
        .get_staff(claims.sub)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| AppError::AuthenticationError("Account is not active".to_string()))?;

    req.extensions_mut().insert(user.actor());
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

pub fn require(actor: &Actor, permission: Permission) -> Result<(), AppError> {
    if actor.can(permission) {
        Ok(())
    } else {
        tracing::warn!(username = %actor.username, role = %actor.role, ?permission, "Permission denied");
        Err(AppError::AuthorizationError(format!("{} may not {:?}", actor.role, permission)))
    }
}
