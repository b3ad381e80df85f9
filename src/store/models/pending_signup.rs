use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An unverified signup awaiting its emailed code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingSignup {
    pub user_name: String,
    pub email_address: String,
    /// Argon2id PHC string
    pub password: String,
    /// Requested plan label, resolved against [`super::Plan`] at verification
    pub plan: String,
    pub otp_generated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
