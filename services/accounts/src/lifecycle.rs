//! Account lifecycle operations
//!
//! Composes validation, the credential verifier, the session issuer and the
//! reset service into the operations exposed over HTTP. Every operation
//! validates its input before any store is touched.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    credentials::CredentialVerifier,
    delivery::Delivery,
    error::{AccountError, AccountResult},
    models::{Account, ActivityEntry, Activity, NewAccount, Registration},
    password::PasswordHasher,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{AccountRepository, ActivityRepository, MemoryStore, ResetRepository},
    reset::PasswordResetService,
    session::{IssuedSession, MemorySessionStore, SessionIssuer, SessionStore},
    validation,
};

/// Number of activity entries returned by [`AccountService::activity`]
pub const ACTIVITY_PAGE_SIZE: i64 = 50;

/// Collaborators and settings needed to build an [`AccountService`]
pub struct AccountServiceParts {
    pub accounts: Arc<dyn AccountRepository>,
    pub resets: Arc<dyn ResetRepository>,
    pub activity: Arc<dyn ActivityRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub delivery: Arc<dyn Delivery>,
    pub hasher: PasswordHasher,
    pub session_ttl_seconds: u64,
    pub reset_token_ttl: chrono::Duration,
    pub login_limits: RateLimiterConfig,
}

/// The account lifecycle API
#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountRepository>,
    activity: Arc<dyn ActivityRepository>,
    hasher: PasswordHasher,
    sessions: SessionIssuer,
    resets: PasswordResetService,
    login_limiter: RateLimiter,
}

impl AccountService {
    pub fn new(parts: AccountServiceParts) -> Self {
        let verifier = CredentialVerifier::new(parts.accounts.clone(), parts.hasher.clone());
        let sessions = SessionIssuer::new(
            verifier.clone(),
            parts.accounts.clone(),
            parts.sessions,
            parts.session_ttl_seconds,
        );
        let resets = PasswordResetService::new(
            verifier,
            parts.accounts.clone(),
            parts.resets,
            parts.delivery,
            parts.reset_token_ttl,
        );

        Self {
            accounts: parts.accounts,
            activity: parts.activity,
            hasher: parts.hasher,
            sessions,
            resets,
            login_limiter: RateLimiter::new(parts.login_limits),
        }
    }

    /// Everything in process memory: one [`MemoryStore`] for the rows and a
    /// [`MemorySessionStore`] for sessions
    pub fn in_memory(
        store: MemoryStore,
        delivery: Arc<dyn Delivery>,
        hasher: PasswordHasher,
        session_ttl_seconds: u64,
        reset_token_ttl: chrono::Duration,
        login_limits: RateLimiterConfig,
    ) -> Self {
        Self::new(AccountServiceParts {
            accounts: Arc::new(store.clone()),
            resets: Arc::new(store.clone()),
            activity: Arc::new(store),
            sessions: Arc::new(MemorySessionStore::new()),
            delivery,
            hasher,
            session_ttl_seconds,
            reset_token_ttl,
            login_limits,
        })
    }

    /// Create an account.
    ///
    /// Fails with `Validation` on malformed input and `Conflict` when the
    /// username (case-insensitive) or email is taken.
    pub async fn register(&self, registration: Registration) -> AccountResult<Account> {
        validation::validate_registration(&registration)?;

        let password_hash = self.hasher.hash(&registration.password).await?;
        let new_account = NewAccount {
            username: registration.username,
            email: validation::normalize_email(&registration.email),
            password_hash,
            name: registration.name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            phone_number: registration.phone_number,
            sex: registration.sex,
            age: registration.age,
            height: registration.height,
            weight: registration.weight,
        };

        let account = self.accounts.create(&new_account).await?;
        self.record(account.id, Activity::Register).await;

        info!("Registered account: {}", account.id);
        Ok(account)
    }

    /// Exchange credentials for a session token
    pub async fn login(&self, username: &str, password: &str) -> AccountResult<IssuedSession> {
        if username.is_empty() || password.is_empty() {
            return Err(AccountError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        let limiter_key = username.to_lowercase();
        if !self.login_limiter.is_allowed(&limiter_key).await {
            warn!("Login rate limit hit for username: {}", username);
            return Err(AccountError::TooManyRequests);
        }

        let session = self.sessions.login(username, password).await?;
        self.login_limiter.reset(&limiter_key).await;
        self.record(session.account_id, Activity::Login).await;

        Ok(session)
    }

    /// Revoke a session token; unknown tokens are accepted silently
    pub async fn logout(&self, token: &str) -> AccountResult<()> {
        if let Some(account_id) = self.sessions.logout(token).await? {
            self.record(account_id, Activity::Logout).await;
        }
        Ok(())
    }

    /// Resolve a bearer token to its account
    pub async fn resolve(&self, token: &str) -> AccountResult<Account> {
        self.sessions.resolve(token).await
    }

    /// Change the password after re-proving the current one.
    ///
    /// Every session of the account, including the caller's, is revoked.
    pub async fn change_password(
        &self,
        account: &Account,
        old_password: &str,
        new_password: &str,
    ) -> AccountResult<()> {
        validation::validate_password(new_password).map_err(AccountError::Validation)?;

        self.resets
            .change_password(account, old_password, new_password)
            .await?;
        self.sessions.revoke_all(account.id).await?;
        self.record(account.id, Activity::PasswordChange).await;

        Ok(())
    }

    /// Start a password reset. Reports success whether or not the email
    /// belongs to an account.
    pub async fn request_reset(&self, email: &str) -> AccountResult<()> {
        validation::validate_email(email.trim()).map_err(AccountError::Validation)?;
        self.resets
            .request_reset(&validation::normalize_email(email))
            .await
    }

    /// Redeem a reset token and set a new password.
    ///
    /// Every session of the account is revoked on success.
    pub async fn confirm_reset(&self, token: &str, new_password: &str) -> AccountResult<()> {
        if token.is_empty() {
            return Err(AccountError::Validation("Token is required".to_string()));
        }
        validation::validate_password(new_password).map_err(AccountError::Validation)?;

        let account_id = self.resets.confirm_reset(token, new_password).await?;
        self.sessions.revoke_all(account_id).await?;
        self.record(account_id, Activity::PasswordReset).await;

        Ok(())
    }

    /// Deactivate an account and revoke all of its sessions
    pub async fn deactivate(&self, account: &Account) -> AccountResult<()> {
        if !self.accounts.set_active(account.id, false).await? {
            return Err(AccountError::Unauthenticated);
        }
        self.sessions.revoke_all(account.id).await?;
        self.record(account.id, Activity::Deactivate).await;

        info!("Deactivated account: {}", account.id);
        Ok(())
    }

    /// Latest activity of an account, newest first
    pub async fn activity(&self, account: &Account) -> AccountResult<Vec<ActivityEntry>> {
        Ok(self
            .activity
            .list_recent(account.id, ACTIVITY_PAGE_SIZE)
            .await?)
    }

    /// Delete reset requests that can no longer be redeemed
    pub async fn purge_expired_resets(&self) -> AccountResult<u64> {
        self.resets.purge_expired().await
    }

    /// Append to the activity log. The operation being logged has already
    /// taken effect, so a failed write is only reported.
    async fn record(&self, account_id: Uuid, activity: Activity) {
        if let Err(e) = self.activity.record(account_id, activity.as_str()).await {
            warn!(
                "Failed to record {} activity for account {}: {:#}",
                activity, account_id, e
            );
        }
    }
}
