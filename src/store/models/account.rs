use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A verified user. Created once, when a pending signup is promoted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub user_name: String,
    pub email_address: String,
    /// Argon2id PHC string
    pub password: String,
    pub account_status: String,
    pub subscription_type: String,
    pub total_token_limit: i32,
    pub tokens_used: i32,
    pub is_trial: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inst_access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ig_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_cloud_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_api_secret: Option<String>,

    // Posting criteria, stored as text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_of_posts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dontuseuntil: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posting_hours: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Account {
    pub const STATUS_ACTIVE: &'static str = "Active";

    /// Graph API credentials, when both are configured
    pub fn graph_credentials(&self) -> Option<(&str, &str)> {
        let token = self.inst_access_token.as_deref().filter(|s| !s.is_empty())?;
        let user_id = self.ig_user_id.as_deref().filter(|s| !s.is_empty())?;
        Some((token, user_id))
    }
}
