//! PostgreSQL account repository

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::AccountRepository;
use crate::{
    error::{AccountError, AccountResult},
    models::{Account, NewAccount, Sex},
};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, name, last_name, \
     phone_number, sex, age, height, weight, is_active, created_at, updated_at";

/// Account repository backed by the `accounts` table
#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    /// Create a new account repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE {filter}");

        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }
}

fn account_from_row(row: &PgRow) -> Result<Account> {
    let sex = row
        .get::<Option<String>, _>("sex")
        .map(|s| s.parse::<Sex>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(Account {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        last_name: row.get("last_name"),
        phone_number: row.get("phone_number"),
        sex,
        age: row.get("age"),
        height: row.get("height"),
        weight: row.get("weight"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// Map a unique index violation onto the field it protects
fn conflict_field(err: &sqlx::Error) -> Option<&'static str> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };

    if !db_err.is_unique_violation() {
        return None;
    }

    match db_err.constraint() {
        Some("accounts_username_key") => Some("username"),
        Some("accounts_email_key") => Some("email"),
        _ => Some("username or email"),
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn create(&self, new_account: &NewAccount) -> AccountResult<Account> {
        info!("Creating new account: {}", new_account.username);

        let query = format!(
            r#"
            INSERT INTO accounts (id, username, email, password_hash, name, last_name,
                                  phone_number, sex, age, height, weight)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&new_account.username)
            .bind(&new_account.email)
            .bind(&new_account.password_hash)
            .bind(&new_account.name)
            .bind(&new_account.last_name)
            .bind(&new_account.phone_number)
            .bind(new_account.sex.map(|s| s.as_str()))
            .bind(new_account.age)
            .bind(new_account.height)
            .bind(new_account.weight)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match conflict_field(&e) {
                Some(field) => AccountError::Conflict(field),
                None => AccountError::Internal(e.into()),
            })?;

        Ok(account_from_row(&row)?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.find_one("LOWER(username) = LOWER($1)", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.find_one("email = $1", email).await
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_active(&self, id: Uuid, is_active: bool) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET is_active = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(is_active)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
