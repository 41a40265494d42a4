//! Account activity log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle events recorded against an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Register,
    Login,
    Logout,
    PasswordChange,
    PasswordReset,
    Deactivate,
    Payment,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Register => "register",
            Activity::Login => "login",
            Activity::Logout => "logout",
            Activity::PasswordChange => "password_change",
            Activity::PasswordReset => "password_reset",
            Activity::Deactivate => "deactivate",
            Activity::Payment => "payment",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Activity log row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity: String,
    pub timestamp: DateTime<Utc>,
}
