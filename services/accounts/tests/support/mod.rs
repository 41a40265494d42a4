//! Shared fixtures for the account service integration tests

#![allow(dead_code)]

use accounts::{
    delivery::{Delivery, Message},
    lifecycle::AccountService,
    models::{Registration, Sex},
    password::PasswordHasher,
    rate_limiter::RateLimiterConfig,
    repositories::MemoryStore,
    token::TOKEN_LENGTH,
};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, mpsc};

/// Delivery that hands every message to the test
pub struct CapturingDelivery {
    sender: mpsc::UnboundedSender<(String, Message)>,
}

#[async_trait]
impl Delivery for CapturingDelivery {
    async fn send(&self, destination: &str, message: &Message) -> anyhow::Result<()> {
        self.sender
            .send((destination.to_string(), message.clone()))
            .map_err(|_| anyhow::anyhow!("test receiver dropped"))
    }
}

/// Receiving end of a [`CapturingDelivery`]
pub struct Outbox {
    receiver: Mutex<mpsc::UnboundedReceiver<(String, Message)>>,
}

impl Outbox {
    /// Wait for the next message and return its destination and token
    pub async fn next_token(&self) -> (String, String) {
        let (destination, message) =
            tokio::time::timeout(Duration::from_secs(5), self.receiver.lock().await.recv())
                .await
                .expect("no message delivered in time")
                .expect("delivery channel closed");

        let token = message
            .body
            .split_whitespace()
            .find(|word| {
                word.len() == TOKEN_LENGTH && word.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .expect("message carries no token")
            .to_string();

        (destination, token)
    }

    /// Whether a message arrives within a short grace period
    pub async fn is_empty(&self) -> bool {
        tokio::time::timeout(
            Duration::from_millis(100),
            self.receiver.lock().await.recv(),
        )
        .await
        .is_err()
    }
}

pub fn capturing_delivery() -> (Arc<CapturingDelivery>, Outbox) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        Arc::new(CapturingDelivery { sender }),
        Outbox {
            receiver: Mutex::new(receiver),
        },
    )
}

/// Cheap hashing parameters for tests
pub fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(1024, 1, 1).expect("valid argon2 parameters")
}

pub struct Harness {
    pub service: AccountService,
    pub store: MemoryStore,
    pub outbox: Outbox,
}

pub fn harness_with(reset_ttl: chrono::Duration, login_limits: RateLimiterConfig) -> Harness {
    let store = MemoryStore::new();
    let (delivery, outbox) = capturing_delivery();
    let service = AccountService::in_memory(
        store.clone(),
        delivery,
        test_hasher(),
        3600,
        reset_ttl,
        login_limits,
    );

    Harness {
        service,
        store,
        outbox,
    }
}

pub fn harness() -> Harness {
    harness_with(chrono::Duration::minutes(60), RateLimiterConfig::default())
}

pub fn registration(username: &str, email: &str, password: &str) -> Registration {
    Registration {
        username: username.to_string(),
        password: password.to_string(),
        email: email.to_string(),
        name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        phone_number: Some("+15551234567".to_string()),
        sex: Some(Sex::Female),
        age: Some(36),
        height: Some(170),
        weight: Some(60),
    }
}
