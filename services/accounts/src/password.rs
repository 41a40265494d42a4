//! Argon2id password hashing
//!
//! Hashing and verification are CPU bound, so both run on the blocking
//! thread pool.

use anyhow::Result;
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version,
    password_hash::SaltString,
};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use std::sync::Arc;

/// Argon2id hasher with fixed cost parameters
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    /// Hash of a random string, verified when the account does not exist
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    /// Create a hasher with the given memory (KiB), iteration and lane costs
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| anyhow::anyhow!("Invalid argon2 parameters: {}", e))?;

        let filler: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let dummy_hash = hash_with(&params, &filler)?;

        Ok(Self {
            params,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    /// Hash a plaintext password into a PHC string with a fresh salt
    pub async fn hash(&self, password: &str) -> Result<String> {
        let params = self.params.clone();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || hash_with(&params, &password)).await?
    }

    /// Verify a plaintext password against a stored PHC string
    ///
    /// `None` verifies against the dummy hash and always returns false, so
    /// unknown accounts cost the same as known ones.
    pub async fn verify(&self, password: &str, stored_hash: Option<&str>) -> Result<bool> {
        let known = stored_hash.is_some();
        let hash = stored_hash
            .map(str::to_owned)
            .unwrap_or_else(|| self.dummy_hash.to_string());
        let password = password.to_owned();

        let matched = tokio::task::spawn_blocking(move || verify_with(&password, &hash)).await??;

        Ok(known && matched)
    }
}

fn hash_with(params: &Params, password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(hash)
}

fn verify_with(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;

    // Cost parameters come from the PHC string itself.
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(1024, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = hasher();
        let hash = hasher.hash("s3cret-pass").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("s3cret-pass"));
        assert!(hasher.verify("s3cret-pass", Some(&hash)).await.unwrap());
        assert!(!hasher.verify("wrong-pass", Some(&hash)).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_gets_distinct_salts() {
        let hasher = hasher();
        let first = hasher.hash("s3cret-pass").await.unwrap();
        let second = hasher.hash("s3cret-pass").await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_account_never_verifies() {
        let hasher = hasher();
        assert!(!hasher.verify("anything", None).await.unwrap());
    }

    #[test]
    fn test_invalid_parameters_are_rejected() {
        assert!(PasswordHasher::new(1024, 0, 1).is_err());
    }
}
