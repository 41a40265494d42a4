//! PostgreSQL payment ledger repository

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use super::PaymentRepository;
use crate::models::{NewPayment, Payment};

/// Payment ledger backed by the insert-only `payments` table
#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn payment_from_row(row: PgRow) -> Payment {
    Payment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        stripe_charge_id: row.get("stripe_charge_id"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        success: row.get("success"),
        timestamp: row.get("timestamp"),
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn record(&self, payment: &NewPayment) -> Result<Payment> {
        let row = sqlx::query(
            r#"
            INSERT INTO payments (id, user_id, stripe_charge_id, amount_cents, currency, success)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, stripe_charge_id, amount_cents, currency, success, timestamp
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payment.user_id)
        .bind(&payment.stripe_charge_id)
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.success)
        .fetch_one(&self.pool)
        .await?;

        Ok(payment_from_row(row))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Payment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, stripe_charge_id, amount_cents, currency, success, timestamp
            FROM payments
            WHERE user_id = $1
            ORDER BY timestamp DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(payment_from_row).collect())
    }
}
