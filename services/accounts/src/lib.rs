//! Account service for the fitness backend
//!
//! Registration, login/logout with server-side session tokens, password
//! change, token-based password reset, account deactivation, an activity log
//! and a payment ledger, exposed over HTTP with axum.

pub mod config;
pub mod credentials;
pub mod delivery;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod password;
pub mod payments;
pub mod rate_limiter;
pub mod repositories;
pub mod reset;
pub mod routes;
pub mod session;
pub mod token;
pub mod validation;

use crate::{lifecycle::AccountService, payments::PaymentService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub payments: PaymentService,
}
