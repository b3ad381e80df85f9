use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Argon2id hash with a random salt, as a PHC string
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// False for a wrong password or an unparsable stored hash
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

/// [`hash_password`] on the blocking pool, keeping Argon2 off the async workers
///
/// # Arguments
/// * `password` - Plain-text password as submitted
///
/// # Returns
/// * `Ok(String)` - PHC hash string
/// * `Err(PasswordError)` - Hashing failed or the blocking task was cancelled
pub async fn hash_password_async(password: &str) -> Result<String, PasswordError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| PasswordError::Hash(e.to_string()))?
}

/// [`verify_password`] on the blocking pool. A cancelled task verifies as false.
pub async fn verify_password_async(password: &str, stored_hash: &str) -> bool {
    let (password, stored_hash) = (password.to_string(), stored_hash.to_string());
    match tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash)).await {
        Ok(verified) => verified,
        Err(e) => {
            tracing::error!("password verification task failed: {}", e);
            false
        }
    }
}
