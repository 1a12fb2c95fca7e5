use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use concierge_core::staff::{normalize_username, validate_password};
use concierge_core::{Actor, AuditEntry, StaffUser};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{error::AppError, middleware::StaffClaims, passwords, state::AppState};

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    expires_in: u64,
    staff: StaffUser,
}

#[derive(Debug, Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

/// Routes reachable without a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/login", post(login))
        .route("/v1/auth/logout", post(logout))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/me", get(me))
        .route("/v1/auth/password", post(change_password))
}

fn login_key(username: &str) -> String {
    format!("login:{}", username)
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let invalid = || AppError::AuthenticationError("Invalid username or password".to_string());
    let username = normalize_username(&req.username).map_err(|_| invalid())?;
    let key = login_key(&username);

    match state
        .sessions
        .check_rate_limit(&key, state.auth.login_attempt_limit, state.auth.login_window_seconds)
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(%username, "Login attempts exhausted");
            return Err(AppError::TooManyRequests("Too many login attempts, try again later".to_string()));
        }
        Err(e) => tracing::warn!("Login rate limit unavailable: {}", e),
    }

    let Some(mut user) = state.repos.staff.find_by_username(&username).await? else {
        passwords::verify_unknown(req.password).await;
        tracing::warn!(%username, "Login for unknown account");
        return Err(invalid());
    };

    if !passwords::verify(req.password, user.password_hash.clone()).await? {
        tracing::warn!(%username, "Failed login");
        return Err(invalid());
    }
    if !user.active {
        tracing::warn!(%username, "Login to deactivated account");
        return Err(AppError::AuthenticationError("Account is deactivated".to_string()));
    }

    if let Err(e) = state.sessions.reset_rate_limit(&key).await {
        tracing::warn!("Failed to reset login counter: {}", e);
    }

    user.last_login_at = Some(Utc::now());
    state.repos.staff.update_staff(&user).await?;
    state
        .repos
        .audit
        .append(&AuditEntry::new(&user.actor(), "auth.login", "staff", Some(user.id), json!({})))
        .await?;

    let token = issue_token(&state, &user)?;
    tracing::info!(%username, role = %user.role, "Staff logged in");

    Ok(Json(AuthResponse {
        token,
        expires_in: state.auth.expiration,
        staff: user,
    }))
}

pub(crate) fn issue_token(state: &AppState, user: &StaffUser) -> Result<String, AppError> {
    let claims = StaffClaims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role.to_string(),
        jti: Uuid::new_v4().to_string(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(state.auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

async fn logout(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token_data = decode::<StaffClaims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(e.to_string()))?;
    let claims = token_data.claims;

    let remaining = (claims.exp as i64 - Utc::now().timestamp()).max(1) as u64;
    state.sessions.revoke_token(&claims.jti, remaining).await?;
    tracing::info!(username = %claims.username, "Staff logged out");

    Ok(Json(json!({ "logged_out": true })))
}

async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<StaffUser>, AppError> {
    let user = state
        .repos
        .staff
        .get_staff(actor.staff_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Staff account not found".to_string()))?;
    Ok(Json(user))
}

async fn change_password(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut user = state
        .repos
        .staff
        .get_staff(actor.staff_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Staff account not found".to_string()))?;

    if !passwords::verify(req.current_password, user.password_hash.clone()).await? {
        return Err(AppError::AuthenticationError("Current password is incorrect".to_string()));
    }
    validate_password(&req.new_password)?;

    user.password_hash = passwords::hash(req.new_password).await?;
    state.repos.staff.update_staff(&user).await?;
    state
        .repos
        .audit
        .append(&AuditEntry::new(&actor, "staff.password", "staff", Some(user.id), json!({})))
        .await?;

    Ok(Json(json!({ "changed": true })))
}
