use crate::error::{AppError, AppResult};

/// Hash a plaintext password with bcrypt, off the async runtime.
pub async fn hash_password(password: String, cost: u32) -> AppResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Constant-time comparison via bcrypt. A malformed stored hash simply fails to match.
pub async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    let matched = tokio::task::spawn_blocking(move || {
        bcrypt::verify(password, &hash).unwrap_or_else(|e| {
            tracing::warn!("Stored password hash could not be checked: {}", e);
            false
        })
    })
    .await?;
    Ok(matched)
}
