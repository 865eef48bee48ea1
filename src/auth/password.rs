//! Argon2id password hashing. Both operations are CPU-heavy and run on the blocking pool.

use anyhow::{anyhow, Context};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

fn hash_blocking(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| anyhow!("argon2 hashing failed: {e}"))
}

fn verify_blocking(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(stored).map_err(|e| anyhow!("stored password hash is malformed: {e}"))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Salted hash in PHC string form, as stored in `users.password`.
pub async fn hash_password(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_blocking(&plain))
        .await
        .context("password hashing task")?
        .inspect_err(|e| error!(error = %e, "password hashing failed"))
}

/// `Ok(false)` for a wrong password; `Err` only when `stored` is not a PHC string.
pub async fn verify_password(plain: String, stored: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_blocking(&plain, &stored))
        .await
        .context("password verification task")?
        .inspect_err(|e| error!(error = %e, "password verification failed"))
}
