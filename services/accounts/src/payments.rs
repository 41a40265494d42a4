//! Payment gateway and ledger
//!
//! Charges go through a gateway client constructed once at startup. Every
//! charge the gateway answers, approved or declined, leaves one ledger row.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::{
    error::{AccountError, AccountResult},
    models::{Account, Activity, NewPayment, PaymentSummary},
    repositories::{ActivityRepository, PaymentRepository},
};

/// A single charge against a payment source
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub source: String,
    pub description: String,
}

/// What the gateway decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeOutcome {
    pub charge_id: Option<String>,
    pub succeeded: bool,
    pub failure_message: Option<String>,
}

/// Client for an external payment processor
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submit a charge. A declined charge is an `Ok` outcome; only
    /// transport or processor failures are errors.
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome>;
}

#[derive(Deserialize)]
struct StripeCharge {
    id: String,
    paid: bool,
    failure_message: Option<String>,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeError,
}

#[derive(Deserialize)]
struct StripeError {
    message: Option<String>,
    charge: Option<String>,
}

/// Stripe charges API client
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeOutcome> {
        let amount = request.amount_cents.to_string();
        let response = self
            .client
            .post(format!("{}/v1/charges", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("amount", amount.as_str()),
                ("currency", request.currency.as_str()),
                ("source", request.source.as_str()),
                ("description", request.description.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let charge: StripeCharge = response.json().await?;
            return Ok(ChargeOutcome {
                charge_id: Some(charge.id),
                succeeded: charge.paid,
                failure_message: charge.failure_message,
            });
        }

        if status == reqwest::StatusCode::PAYMENT_REQUIRED {
            let body: StripeErrorBody = response.json().await?;
            return Ok(ChargeOutcome {
                charge_id: body.error.charge,
                succeeded: false,
                failure_message: body.error.message,
            });
        }

        anyhow::bail!("Stripe responded with {}", status)
    }
}

/// Runs charges and keeps the ledger
#[derive(Clone)]
pub struct PaymentService {
    gateway: Option<Arc<dyn PaymentGateway>>,
    payments: Arc<dyn PaymentRepository>,
    activity: Arc<dyn ActivityRepository>,
    currency: String,
}

impl PaymentService {
    /// `gateway` is `None` when no processor is configured; charges then
    /// fail with a gateway error and nothing is recorded.
    pub fn new(
        gateway: Option<Arc<dyn PaymentGateway>>,
        payments: Arc<dyn PaymentRepository>,
        activity: Arc<dyn ActivityRepository>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            payments,
            activity,
            currency: currency.into(),
        }
    }

    /// Charge `account` and record the result.
    ///
    /// Returns the ledger row of an approved charge. A declined charge is
    /// recorded too and then reported as `PaymentDeclined`.
    pub async fn charge(
        &self,
        account: &Account,
        amount_cents: i64,
        source: &str,
    ) -> AccountResult<PaymentSummary> {
        if amount_cents <= 0 {
            return Err(AccountError::Validation(
                "Amount must be a positive number of cents".to_string(),
            ));
        }
        if source.trim().is_empty() {
            return Err(AccountError::Validation(
                "Payment source is required".to_string(),
            ));
        }

        let Some(gateway) = &self.gateway else {
            warn!("Payment attempted while no gateway is configured");
            return Err(AccountError::Gateway(
                "Payments are not configured".to_string(),
            ));
        };

        let request = ChargeRequest {
            amount_cents,
            currency: self.currency.clone(),
            source: source.trim().to_string(),
            description: format!("Charge for account {}", account.id),
        };

        let outcome = gateway.charge(&request).await.map_err(|e| {
            error!("Payment gateway failure for account {}: {:#}", account.id, e);
            AccountError::Gateway("Payment processor unavailable".to_string())
        })?;

        let payment = self
            .payments
            .record(&NewPayment {
                user_id: account.id,
                stripe_charge_id: outcome.charge_id.clone(),
                amount_cents,
                currency: request.currency,
                success: outcome.succeeded,
            })
            .await?;
        if let Err(e) = self
            .activity
            .record(account.id, Activity::Payment.as_str())
            .await
        {
            warn!(
                "Failed to record payment activity for account {}: {:#}",
                account.id, e
            );
        }

        if !outcome.succeeded {
            warn!("Payment declined for account: {}", account.id);
            return Err(AccountError::PaymentDeclined(
                outcome
                    .failure_message
                    .unwrap_or_else(|| "The charge was declined".to_string()),
            ));
        }

        info!(
            "Recorded payment {} of {} {} for account: {}",
            payment.id, amount_cents, payment.currency, account.id
        );
        Ok(PaymentSummary::from(&payment))
    }

    /// Ledger of one account, most recent first
    pub async fn history(&self, account: &Account) -> AccountResult<Vec<PaymentSummary>> {
        let payments = self.payments.list_for_user(account.id).await?;
        Ok(payments.iter().map(PaymentSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;
    use chrono::Utc;
    use uuid::Uuid;

    struct FixedGateway(ChargeOutcome);

    #[async_trait]
    impl PaymentGateway for FixedGateway {
        async fn charge(&self, _request: &ChargeRequest) -> Result<ChargeOutcome> {
            Ok(self.0.clone())
        }
    }

    struct BrokenGateway;

    #[async_trait]
    impl PaymentGateway for BrokenGateway {
        async fn charge(&self, _request: &ChargeRequest) -> Result<ChargeOutcome> {
            anyhow::bail!("connection reset")
        }
    }

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "runner".to_string(),
            email: "runner@example.com".to_string(),
            password_hash: String::new(),
            name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone_number: None,
            sex: None,
            age: None,
            height: None,
            weight: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(store: &MemoryStore, gateway: Option<Arc<dyn PaymentGateway>>) -> PaymentService {
        PaymentService::new(
            gateway,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            "usd",
        )
    }

    #[tokio::test]
    async fn test_approved_charge_is_recorded_with_charge_id() {
        let store = MemoryStore::new();
        let gateway = FixedGateway(ChargeOutcome {
            charge_id: Some("ch_123".to_string()),
            succeeded: true,
            failure_message: None,
        });
        let payments = service(&store, Some(Arc::new(gateway)));
        let account = account();

        let summary = payments.charge(&account, 1999, "tok_visa").await.unwrap();
        assert!(summary.success);
        assert_eq!(summary.charge_id.as_deref(), Some("ch_123"));
        assert_eq!(summary.currency, "usd");

        let history = payments.history(&account).await.unwrap();
        assert_eq!(history, vec![summary]);
    }

    #[tokio::test]
    async fn test_declined_charge_is_recorded_and_reported() {
        let store = MemoryStore::new();
        let gateway = FixedGateway(ChargeOutcome {
            charge_id: Some("ch_456".to_string()),
            succeeded: false,
            failure_message: Some("Your card was declined.".to_string()),
        });
        let payments = service(&store, Some(Arc::new(gateway)));
        let account = account();

        let result = payments.charge(&account, 500, "tok_chargeDeclined").await;
        assert!(matches!(result, Err(AccountError::PaymentDeclined(_))));

        let history = payments.history(&account).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history[0].success);
    }

    #[tokio::test]
    async fn test_gateway_failure_records_nothing() {
        let store = MemoryStore::new();
        let payments = service(&store, Some(Arc::new(BrokenGateway)));
        let account = account();

        let result = payments.charge(&account, 500, "tok_visa").await;
        assert!(matches!(result, Err(AccountError::Gateway(_))));
        assert!(payments.history(&account).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_bad_input_and_missing_gateway() {
        let store = MemoryStore::new();
        let payments = service(&store, None);
        let account = account();

        assert!(matches!(
            payments.charge(&account, 0, "tok_visa").await,
            Err(AccountError::Validation(_))
        ));
        assert!(matches!(
            payments.charge(&account, 100, "  ").await,
            Err(AccountError::Validation(_))
        ));
        assert!(matches!(
            payments.charge(&account, 100, "tok_visa").await,
            Err(AccountError::Gateway(_))
        ));
    }
}
