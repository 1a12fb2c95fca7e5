use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, Method, StatusCode},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod audit;
pub mod auth;
pub mod bookings;
pub mod error;
pub mod frontdesk;
pub mod housekeeping;
pub mod invoices;
pub mod middleware;
mod passwords;
pub mod payments;
pub mod rooms;
pub mod staff;
pub mod state;
pub mod worker;

pub use state::{AppState, AuthConfig};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::USER_AGENT]);

    let protected = Router::new()
        .merge(auth::routes())
        .merge(staff::routes())
        .merge(bookings::routes())
        .merge(frontdesk::routes())
        .merge(rooms::routes())
        .merge(housekeeping::routes())
        .merge(payments::routes())
        .merge(invoices::routes())
        .merge(audit::routes())
        .route_layer(from_fn_with_state(state.clone(), middleware::staff_auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(auth::public_routes())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Per-client request budget per minute. Requests without a peer address
/// (in-process callers) are not counted, and a session store outage fails open.
async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>().cloned() else {
        return next.run(req).await;
    };
    let key = format!("ratelimit:{}", addr.ip());

    match state.sessions.check_rate_limit(&key, state.requests_per_minute, 60).await {
        Ok(false) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Rate limit exceeded" })),
        )
            .into_response(),
        Ok(true) => next.run(req).await,
        Err(e) => {
            tracing::warn!("Rate limiter unavailable: {}", e);
            next.run(req).await
        }
    }
}
