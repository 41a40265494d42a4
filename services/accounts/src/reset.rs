//! Password reset and password change

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    credentials::CredentialVerifier,
    delivery::{Delivery, Message},
    error::{AccountError, AccountResult},
    models::{Account, NewResetRequest},
    repositories::{AccountRepository, ResetRepository},
    token,
};

/// Issues and redeems single-use password reset tokens
#[derive(Clone)]
pub struct PasswordResetService {
    verifier: CredentialVerifier,
    accounts: Arc<dyn AccountRepository>,
    resets: Arc<dyn ResetRepository>,
    delivery: Arc<dyn Delivery>,
    ttl: Duration,
}

impl PasswordResetService {
    pub fn new(
        verifier: CredentialVerifier,
        accounts: Arc<dyn AccountRepository>,
        resets: Arc<dyn ResetRepository>,
        delivery: Arc<dyn Delivery>,
        ttl: Duration,
    ) -> Self {
        Self {
            verifier,
            accounts,
            resets,
            delivery,
            ttl,
        }
    }

    /// Start a reset for `email`.
    ///
    /// Succeeds whether or not the email is registered, after the same
    /// single lookup: storing and sending the token happen in a detached
    /// task. The token only leaves the process through the delivery
    /// collaborator.
    pub async fn request_reset(&self, email: &str) -> AccountResult<()> {
        let Some(account) = self
            .accounts
            .find_by_email(email)
            .await?
            .filter(|account| account.is_active)
        else {
            info!("Password reset requested for unknown or inactive email");
            return Ok(());
        };

        let resets = self.resets.clone();
        let delivery = self.delivery.clone();
        let ttl_minutes = self.ttl.num_minutes();

        tokio::spawn(async move {
            let token = token::generate();
            let request = NewResetRequest {
                user_id: account.id,
                token_hash: token::digest(&token),
            };
            if let Err(e) = resets.insert(&request).await {
                error!("Failed to store reset request for account {}: {:#}", account.id, e);
                return;
            }

            info!("Issued password reset token for account: {}", account.id);

            let message = Message {
                subject: "Password reset".to_string(),
                body: format!(
                    "Use this code to reset your password: {}\nIt expires in {} minutes.",
                    token, ttl_minutes
                ),
            };
            if let Err(e) = delivery.send(&account.email, &message).await {
                warn!("Failed to deliver \"{}\": {:#}", message.subject, e);
            }
        });

        Ok(())
    }

    /// Redeem a reset token and set a new password.
    ///
    /// At most one confirmation of a given token succeeds.
    pub async fn confirm_reset(&self, token: &str, new_password: &str) -> AccountResult<Uuid> {
        let password_hash = self.verifier.hasher().hash(new_password).await?;
        let issued_after = Utc::now() - self.ttl;

        match self
            .resets
            .redeem(&token::digest(token), issued_after, &password_hash)
            .await?
        {
            Some(account_id) => {
                info!("Password reset completed for account: {}", account_id);
                Ok(account_id)
            }
            None => {
                warn!("Rejected unknown, used or expired reset token");
                Err(AccountError::InvalidToken)
            }
        }
    }

    /// Change the password of an account after re-proving the current one
    pub async fn change_password(
        &self,
        account: &Account,
        old_password: &str,
        new_password: &str,
    ) -> AccountResult<()> {
        self.verifier.verify_account(account, old_password).await?;

        let password_hash = self.verifier.hasher().hash(new_password).await?;
        if !self
            .accounts
            .update_password(account.id, &password_hash)
            .await?
        {
            return Err(AccountError::Unauthenticated);
        }

        info!("Password changed for account: {}", account.id);
        Ok(())
    }

    /// Delete unused requests that can no longer be redeemed
    pub async fn purge_expired(&self) -> AccountResult<u64> {
        let purged = self.resets.purge_expired(Utc::now() - self.ttl).await?;
        info!("Purged {} expired password reset request(s)", purged);
        Ok(purged)
    }
}
