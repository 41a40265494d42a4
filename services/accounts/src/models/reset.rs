//! Password reset request model

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Password reset request entity
///
/// Only the SHA-256 digest of the token is kept.
#[derive(Debug, Clone)]
pub struct PasswordResetRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub is_used: bool,
}

impl PasswordResetRequest {
    /// Whether the request can still be redeemed given the issuance cutoff
    pub fn is_redeemable(&self, issued_after: DateTime<Utc>) -> bool {
        !self.is_used && self.created_at > issued_after
    }
}

/// New password reset request payload
#[derive(Debug, Clone)]
pub struct NewResetRequest {
    pub user_id: Uuid,
    pub token_hash: String,
}
