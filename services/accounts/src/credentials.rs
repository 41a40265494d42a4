//! Credential verification

use std::sync::Arc;
use tracing::warn;

use crate::{
    error::{AccountError, AccountResult},
    models::Account,
    password::PasswordHasher,
    repositories::AccountRepository,
};

/// Checks username/password pairs against the account store
#[derive(Clone)]
pub struct CredentialVerifier {
    accounts: Arc<dyn AccountRepository>,
    hasher: PasswordHasher,
}

impl CredentialVerifier {
    pub fn new(accounts: Arc<dyn AccountRepository>, hasher: PasswordHasher) -> Self {
        Self { accounts, hasher }
    }

    /// The hasher shared with the rest of the lifecycle
    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Verify a username/password pair.
    ///
    /// Unknown usernames, wrong passwords and inactive accounts all return
    /// the same `InvalidCredentials`, after the same amount of hashing work.
    pub async fn verify(&self, username: &str, password: &str) -> AccountResult<Account> {
        let account = self.accounts.find_by_username(username).await?;

        let matched = self
            .hasher
            .verify(password, account.as_ref().map(|a| a.password_hash.as_str()))
            .await?;

        match account {
            Some(account) if matched && account.is_active => Ok(account),
            _ => {
                warn!("Rejected credentials for username: {}", username);
                Err(AccountError::InvalidCredentials)
            }
        }
    }

    /// Re-check the password of an already identified account
    pub async fn verify_account(&self, account: &Account, password: &str) -> AccountResult<()> {
        let matched = self
            .hasher
            .verify(password, Some(&account.password_hash))
            .await?;

        if matched && account.is_active {
            Ok(())
        } else {
            warn!("Rejected password re-check for account: {}", account.id);
            Err(AccountError::InvalidCredentials)
        }
    }
}
