//! Bearer-token auth — registration and token verification.
//!
//! Tokens are random 32-byte hex values handed out exactly once at
//! registration. Only the SHA-256 hash is stored, so a database leak does
//! not leak credentials. Verification is a single indexed lookup that yields
//! the stable user id every tenant-scoped query keys on.

use std::fmt::Write;

use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Authenticated subject resolved from a bearer token.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthedUser {
    pub id: Uuid,
    pub name: String,
}

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

/// Create a user and return (user, plaintext token). The token is not
/// recoverable afterwards.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn register_user(pool: &PgPool, name: &str) -> Result<(AuthedUser, String), AuthError> {
    let id = Uuid::new_v4();
    let token = generate_token();
    sqlx::query("INSERT INTO users (id, name, token_hash) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(name)
        .bind(hash_token(&token))
        .execute(pool)
        .await?;
    Ok((AuthedUser { id, name: name.to_string() }, token))
}

/// Resolve a bearer token to its user, or `None` when the token is unknown.
///
/// # Errors
///
/// Returns a database error if the lookup fails.
pub async fn verify_token(pool: &PgPool, token: &str) -> Result<Option<AuthedUser>, AuthError> {
    let row = sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM users WHERE token_hash = $1")
        .bind(hash_token(token))
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(id, name)| AuthedUser { id, name }))
}
