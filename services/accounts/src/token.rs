//! Opaque token generation
//!
//! Session and reset tokens are 43 random alphanumeric characters (about
//! 256 bits). Stores only ever see the SHA-256 digest.

use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use sha2::{Digest, Sha256};

/// Length of generated tokens
pub const TOKEN_LENGTH: usize = 43;

/// Generate a new random token
pub fn generate() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Hex SHA-256 digest used as the storage key for a token
pub fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate() {
        let first = generate();
        let second = generate();

        assert_eq!(first.len(), TOKEN_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_digest_is_stable_and_hides_token() {
        let token = generate();

        assert_eq!(digest(&token), digest(&token));
        assert_eq!(digest(&token).len(), 64);
        assert_ne!(digest(&token), token);
        assert_ne!(digest(&token), digest(&generate()));
    }
}
