//! PostgreSQL password reset request repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::ResetRepository;
use crate::models::NewResetRequest;

/// Reset request repository backed by `password_reset_requests`
#[derive(Clone)]
pub struct PgResetRepository {
    pool: PgPool,
}

impl PgResetRepository {
    /// Create a new reset request repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetRepository for PgResetRepository {
    async fn insert(&self, request: &NewResetRequest) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_requests (id, user_id, token_hash)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(&request.token_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn redeem(
        &self,
        token_hash: &str,
        issued_after: DateTime<Utc>,
        password_hash: &str,
    ) -> Result<Option<Uuid>> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken by the UPDATE makes a concurrent redeem of the
        // same token wait, then re-check `is_used` and match nothing.
        let user_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE password_reset_requests
            SET is_used = TRUE
            WHERE token_hash = $1
              AND is_used = FALSE
              AND created_at > $2
            RETURNING user_id
            "#,
        )
        .bind(token_hash)
        .bind(issued_after)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            tx.rollback().await?;
            return Ok(None);
        };

        let updated = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $1, updated_at = NOW()
            WHERE id = $2 AND is_active = TRUE
            "#,
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(user_id))
    }

    async fn purge_expired(&self, issued_before: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM password_reset_requests
            WHERE is_used = FALSE AND created_at <= $1
            "#,
        )
        .bind(issued_before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
