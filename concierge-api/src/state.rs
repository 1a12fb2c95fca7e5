use async_trait::async_trait;
use concierge_core::notify::{EmailMessage, Notifier};
use concierge_core::repository::{RepoError, Repositories};
use concierge_core::session::SessionStore;
use concierge_desk::{Desk, DeskRules};
use concierge_shared::models::events::{DomainEvent, RoomStatusChangedEvent};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub login_attempt_limit: i64,
    pub login_window_seconds: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub sessions: Arc<dyn SessionStore>,
    pub desk: Desk,
    pub sse_tx: broadcast::Sender<RoomStatusChangedEvent>,
    pub auth: AuthConfig,
    pub requests_per_minute: i64,
}

impl AppState {
    /// Wires the desk so room status changes also reach `/v1/rooms/stream`.
    pub fn new(
        repos: Repositories,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        rules: DeskRules,
        auth: AuthConfig,
        requests_per_minute: i64,
    ) -> Self {
        let (sse_tx, _) = broadcast::channel(100);
        let notifier: Arc<dyn Notifier> = Arc::new(BroadcastNotifier {
            inner: notifier,
            sse_tx: sse_tx.clone(),
        });
        let desk = Desk::new(repos.clone(), notifier, rules);
        Self {
            repos,
            sessions,
            desk,
            sse_tx,
            auth,
            requests_per_minute,
        }
    }
}

/// Forwards room status changes to SSE subscribers before handing every
/// event to the wrapped notifier.
struct BroadcastNotifier {
    inner: Arc<dyn Notifier>,
    sse_tx: broadcast::Sender<RoomStatusChangedEvent>,
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), RepoError> {
        self.inner.send_email(message).await
    }

    async fn publish(&self, event: &DomainEvent) -> Result<(), RepoError> {
        if let DomainEvent::RoomStatusChanged(change) = event {
            // No subscribers is not an error.
            let _ = self.sse_tx.send(change.clone());
        }
        self.inner.publish(event).await
    }
}
