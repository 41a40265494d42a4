//! In-process store implementing every repository trait
//!
//! One mutex guards all tables, which gives the same guarantees the
//! PostgreSQL repositories get from unique indexes and row locks: a single
//! winner for duplicate registrations and for concurrent reset redemption.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AccountRepository, ActivityRepository, PaymentRepository, ResetRepository};
use crate::{
    error::{AccountError, AccountResult},
    models::{
        Account, ActivityEntry, NewAccount, NewPayment, NewResetRequest, PasswordResetRequest,
        Payment,
    },
};

#[derive(Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    /// Lowercased username -> account ID
    usernames: HashMap<String, Uuid>,
    /// Normalized email -> account ID
    emails: HashMap<String, Uuid>,
    /// Token digest -> request
    resets: HashMap<String, PasswordResetRequest>,
    activity: Vec<ActivityEntry>,
    payments: Vec<Payment>,
}

/// Memory-backed store; clones share the same tables
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reset requests, used or not
    pub async fn reset_request_count(&self) -> usize {
        self.state.lock().await.resets.len()
    }
}

#[async_trait]
impl AccountRepository for MemoryStore {
    async fn create(&self, new_account: &NewAccount) -> AccountResult<Account> {
        let mut state = self.state.lock().await;

        let username_key = new_account.username.to_lowercase();
        if state.usernames.contains_key(&username_key) {
            return Err(AccountError::Conflict("username"));
        }
        if state.emails.contains_key(&new_account.email) {
            return Err(AccountError::Conflict("email"));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            username: new_account.username.clone(),
            email: new_account.email.clone(),
            password_hash: new_account.password_hash.clone(),
            name: new_account.name.clone(),
            last_name: new_account.last_name.clone(),
            phone_number: new_account.phone_number.clone(),
            sex: new_account.sex,
            age: new_account.age,
            height: new_account.height,
            weight: new_account.weight,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        state.usernames.insert(username_key, account.id);
        state.emails.insert(account.email.clone(), account.id);
        state.accounts.insert(account.id, account.clone());

        Ok(account)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.state.lock().await.accounts.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .usernames
            .get(&username.to_lowercase())
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .emails
            .get(email)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.accounts.get_mut(&id) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<bool> {
        let mut state = self.state.lock().await;
        match state.accounts.get_mut(&id) {
            Some(account) => {
                account.is_active = is_active;
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ResetRepository for MemoryStore {
    async fn insert(&self, request: &NewResetRequest) -> Result<()> {
        let mut state = self.state.lock().await;

        if state.resets.contains_key(&request.token_hash) {
            anyhow::bail!("duplicate reset token digest");
        }

        state.resets.insert(
            request.token_hash.clone(),
            PasswordResetRequest {
                id: Uuid::new_v4(),
                user_id: request.user_id,
                token_hash: request.token_hash.clone(),
                created_at: Utc::now(),
                is_used: false,
            },
        );

        Ok(())
    }

    async fn redeem(
        &self,
        token_hash: &str,
        issued_after: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<Uuid>> {
        let mut state = self.state.lock().await;
        let MemoryState {
            accounts, resets, ..
        } = &mut *state;

        let Some(request) = resets.get_mut(token_hash) else {
            return Ok(None);
        };
        if !request.is_redeemable(issued_after) {
            return Ok(None);
        }

        let Some(account) = accounts
            .get_mut(&request.user_id)
            .filter(|account| account.is_active)
        else {
            return Ok(None);
        };

        request.is_used = true;
        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();

        Ok(Some(account.id))
    }

    async fn purge_expired(&self, issued_before: DateTime<Utc>) -> Result<u64> {
        let mut state = self.state.lock().await;
        let before = state.resets.len();
        state
            .resets
            .retain(|_, request| request.is_used || request.created_at > issued_before);
        Ok((before - state.resets.len()) as u64)
    }
}

#[async_trait]
impl ActivityRepository for MemoryStore {
    async fn record(&self, user_id: Uuid, activity: &str) -> Result<()> {
        self.state.lock().await.activity.push(ActivityEntry {
            id: Uuid::new_v4(),
            user_id,
            activity: activity.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn list_recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<ActivityEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .activity
            .iter()
            .rev()
            .filter(|entry| entry.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn record(&self, payment: &NewPayment) -> Result<Payment> {
        let row = Payment {
            id: Uuid::new_v4(),
            user_id: payment.user_id,
            stripe_charge_id: payment.stripe_charge_id.clone(),
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
            success: payment.success,
            timestamp: Utc::now(),
        };
        self.state.lock().await.payments.push(row.clone());
        Ok(row)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Payment>> {
        let state = self.state.lock().await;
        Ok(state
            .payments
            .iter()
            .rev()
            .filter(|payment| payment.user_id == user_id)
            .cloned()
            .collect())
    }
}
