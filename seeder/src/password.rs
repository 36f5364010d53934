/// Password hashing for seeded accounts

use argon2::password_hash::{PasswordHasher as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use rand::RngCore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Invalid hashing parameters: {0}")]
    InvalidParams(String),
    #[error("Password hashing failed: {0}")]
    HashFailed(String),
    #[error("Hashing task failed: {0}")]
    TaskFailed(String),
}

#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// One-way salted hash of `plaintext`; `cost` is the work factor
    async fn hash(&self, plaintext: &str, cost: u32) -> Result<String, PasswordError>;
}

/// Argon2id with `cost` as the iteration count.
/// Hashing is CPU bound and runs on tokio's blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2PasswordHasher;

impl Argon2PasswordHasher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    async fn hash(&self, plaintext: &str, cost: u32) -> Result<String, PasswordError> {
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hash_blocking(&plaintext, cost))
            .await
            .map_err(|e| PasswordError::TaskFailed(e.to_string()))?
    }
}

fn hash_blocking(plaintext: &str, cost: u32) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| PasswordError::HashFailed(e.to_string()))?;

    let params = Params::new(
        Params::DEFAULT_M_COST,
        cost.max(1),
        Params::DEFAULT_P_COST,
        None,
    )
    .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashFailed(e.to_string()))
}
