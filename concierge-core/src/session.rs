use async_trait::async_trait;

use crate::repository::RepoError;

/// Short-lived auth state: revoked token ids and attempt counters.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Deny a token id until it would have expired anyway.
    async fn revoke_token(&self, jti: &str, ttl_seconds: u64) -> Result<(), RepoError>;

    async fn is_revoked(&self, jti: &str) -> Result<bool, RepoError>;

    /// Count a hit against `key`; `false` once `limit` is exceeded within the window.
    async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> Result<bool, RepoError>;

    async fn reset_rate_limit(&self, key: &str) -> Result<(), RepoError>;
}
