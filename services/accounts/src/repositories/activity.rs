//! PostgreSQL activity log repository

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::ActivityRepository;
use crate::models::ActivityEntry;

/// Activity log backed by `user_activity_logs`
#[derive(Clone)]
pub struct PgActivityRepository {
    pool: PgPool,
}

impl PgActivityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivityRepository for PgActivityRepository {
    async fn record(&self, user_id: Uuid, activity: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_activity_logs (id, user_id, activity)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(activity)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_recent(&self, user_id: Uuid, limit: i64) -> Result<Vec<ActivityEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, activity, timestamp
            FROM user_activity_logs
            WHERE user_id = $1
            ORDER BY timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .into_iter()
            .map(|row| ActivityEntry {
                id: row.get("id"),
                user_id: row.get("user_id"),
                activity: row.get("activity"),
                timestamp: row.get("timestamp"),
            })
            .collect();

        Ok(entries)
    }
}
