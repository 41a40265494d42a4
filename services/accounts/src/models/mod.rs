//! Account service models

pub mod account;
pub mod activity;
pub mod payment;
pub mod reset;

// Re-export for convenience
pub use account::{Account, AccountSummary, NewAccount, Registration, Sex};
pub use activity::{Activity, ActivityEntry};
pub use payment::{NewPayment, Payment, PaymentSummary};
pub use reset::{NewResetRequest, PasswordResetRequest};
