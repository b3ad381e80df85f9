use serde::{Deserialize, Serialize};

/// A scheduled post. Rows are written by the external publisher; the API
/// only reads, edits and deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_name: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// `YYYY-MM-DD HH:MM:SS`
    #[serde(default)]
    pub scheduled_time: Option<String>,
    #[serde(default)]
    pub posted: Option<String>,
}

impl Post {
    pub const STATUS_COMPLETED: &'static str = "Completed";

    pub fn is_completed(&self) -> bool {
        self.posted.as_deref() == Some(Self::STATUS_COMPLETED)
    }
}
