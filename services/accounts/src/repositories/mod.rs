//! Repositories for account service persistence
//!
//! Each store is a trait so the lifecycle can run against PostgreSQL in
//! production and against [`memory::MemoryStore`] in tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AccountResult,
    models::{Account, ActivityEntry, NewAccount, NewPayment, NewResetRequest, Payment},
};

pub mod account;
pub mod activity;
pub mod memory;
pub mod payment;
pub mod reset;

pub use account::PgAccountRepository;
pub use activity::PgActivityRepository;
pub use memory::MemoryStore;
pub use payment::PgPaymentRepository;
pub use reset::PgResetRepository;

/// Account persistence
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert a new account.
    ///
    /// Fails with `AccountError::Conflict` naming the field when the
    /// username (case-insensitive) or the email is already taken.
    async fn create(&self, new_account: &NewAccount) -> AccountResult<Account>;

    /// Find an account by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>>;

    /// Find an account by username, ignoring case
    async fn find_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// Find an account by its normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Replace the credential hash. Returns false when the account is gone.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool>;

    /// Flip the active flag. Returns false when the account is gone.
    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<bool>;
}

/// Password reset request persistence
#[async_trait]
pub trait ResetRepository: Send + Sync {
    /// Store a new unused request stamped with the current time
    async fn insert(&self, request: &NewResetRequest) -> Result<()>;

    /// Redeem a request and swap the owner's credential in one atomic step.
    ///
    /// Only an unused request created after `issued_after` can be redeemed,
    /// and it transitions `is_used` from false to true exactly once. Returns
    /// the owning account ID on success, `None` otherwise.
    async fn redeem(
        &self,
        token_hash: &str,
        issued_after: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<Uuid>>;

    /// Delete unused requests created at or before `issued_before`
    async fn purge_expired(&self, issued_before: DateTime<Utc>) -> Result<u64>;
}

/// Append-only activity log
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Append an entry stamped with the current time
    async fn record(&self, user_id: Uuid, activity: &str) -> Result<()>;

    /// Most recent entries first
    async fn list_recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<ActivityEntry>>;
}

/// Insert-only payment ledger
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Append a ledger row
    async fn record(&self, payment: &NewPayment) -> Result<Payment>;

    /// Ledger rows of one account, most recent first
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Payment>>;
}
