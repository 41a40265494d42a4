//! Payment ledger model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ledger row; never updated once written
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stripe_charge_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

/// New ledger row
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub stripe_charge_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub success: bool,
}

/// Public view of a ledger row, v1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub id: Uuid,
    pub charge_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<&Payment> for PaymentSummary {
    fn from(payment: &Payment) -> Self {
        Self {
            id: payment.id,
            charge_id: payment.stripe_charge_id.clone(),
            amount_cents: payment.amount_cents,
            currency: payment.currency.clone(),
            success: payment.success,
            timestamp: payment.timestamp,
        }
    }
}
