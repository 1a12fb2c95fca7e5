//! bcrypt is CPU-bound (hundreds of milliseconds at the default cost), so
//! every hash and verify runs on the blocking pool instead of a runtime worker.

use std::sync::OnceLock;

use crate::error::AppError;

static UNKNOWN_ACCOUNT_HASH: OnceLock<String> = OnceLock::new();

pub(crate) async fn hash(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::InternalServerError(format!("Password hashing failed: {}", e)))
}

pub(crate) async fn verify(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::InternalServerError(format!("Password check task failed: {}", e)))?
        .map_err(|e| AppError::InternalServerError(format!("Password check failed: {}", e)))
}

/// Spend the same bcrypt work a real check would, so a login for a missing
/// username takes as long as one with a wrong password.
pub(crate) async fn verify_unknown(password: String) {
    let result = tokio::task::spawn_blocking(move || {
        let hash = UNKNOWN_ACCOUNT_HASH
            .get_or_init(|| bcrypt::hash("no-such-staff-account", bcrypt::DEFAULT_COST).unwrap_or_default());
        bcrypt::verify(password, hash)
    })
    .await;
    if let Ok(Err(e)) = result {
        tracing::warn!("Decoy password check failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify_off_the_runtime() {
        let hashed = hash("correct horse battery".to_string()).await.unwrap();
        assert!(verify("correct horse battery".to_string(), hashed.clone()).await.unwrap());
        assert!(!verify("wrong".to_string(), hashed).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_internal_error() {
        let result = verify("anything".to_string(), "not-a-bcrypt-hash".to_string()).await;
        assert!(matches!(result, Err(AppError::InternalServerError(_))));
    }

    #[tokio::test]
    async fn test_unknown_account_check_does_real_work() {
        verify_unknown("guess".to_string()).await;
        let decoy = UNKNOWN_ACCOUNT_HASH.get().unwrap();
        assert!(decoy.starts_with("$2"));
        assert!(!bcrypt::verify("guess", decoy).unwrap());
    }
}
