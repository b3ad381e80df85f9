use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::filter::FilterData;
use crate::store::models::Post;
use crate::store::{CredentialStore, Repository, Row, Table};

use super::ServiceError;

const SCHEDULED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const COLOR_COMPLETED: &str = "#28a745";
const COLOR_PENDING: &str = "#ffc107";

/// One post rendered for the calendar view
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarEvent {
    pub id: i64,
    pub title: String,
    pub start: String,
    pub display: &'static str,
    pub color: &'static str,
    #[serde(rename = "extendedProps")]
    pub extended_props: EventProps,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventProps {
    pub caption: String,
    pub image_url: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub caption: Option<String>,
    pub scheduled_time: Option<String>,
}

impl From<Post> for CalendarEvent {
    fn from(post: Post) -> Self {
        let color = if post.is_completed() { COLOR_COMPLETED } else { COLOR_PENDING };
        let start = format!("{}Z", post.scheduled_time.unwrap_or_default().replace(' ', "T"));
        Self {
            id: post.id,
            title: format!("Post #{}", post.id),
            start,
            display: "block",
            color,
            extended_props: EventProps {
                caption: post.caption.unwrap_or_default(),
                image_url: strip_tags(post.image_url.as_deref().unwrap_or_default()).trim().to_string(),
                status: post.posted,
            },
        }
    }
}

/// Calendar listing and owner-scoped edits of scheduled posts
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn CredentialStore>,
}

impl PostService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    fn posts(&self) -> Repository<Post> {
        Repository::new(Table::Posts, self.store.clone())
    }

    fn owned(username: &str, id: i64) -> Value {
        json!({ "id": id, "user_name": username })
    }

    /// The caller's posts as calendar events, earliest first
    pub async fn events(&self, username: &str) -> Result<Vec<CalendarEvent>, ServiceError> {
        let posts = self
            .posts()
            .select_any(FilterData::matching(json!({ "user_name": username })).order_by("scheduled_time asc, id asc"))
            .await?;
        Ok(posts
            .into_iter()
            .filter(|post| post.scheduled_time.is_some())
            .map(CalendarEvent::from)
            .collect())
    }

    pub async fn update(&self, username: &str, id: i64, update: PostUpdate) -> Result<(), ServiceError> {
        let mut changes = Row::new();
        if let Some(caption) = update.caption {
            changes.insert("caption".to_string(), Value::String(caption));
        }
        if let Some(scheduled_time) = update.scheduled_time {
            changes.insert(
                "scheduled_time".to_string(),
                Value::String(normalize_scheduled_time(&scheduled_time)?),
            );
        }
        if changes.is_empty() {
            return Err(ServiceError::Validation("Nothing to update".to_string()));
        }

        let updated = self.posts().update_where(Self::owned(username, id), changes).await?;
        if updated == 0 {
            return Err(ServiceError::NotFound("Post not found".to_string()));
        }
        info!(%username, id, "post updated");
        Ok(())
    }

    /// Deleting a post that does not exist or belongs to someone else is a no-op
    pub async fn delete(&self, username: &str, id: i64) -> Result<(), ServiceError> {
        let removed = self.posts().delete_where(Self::owned(username, id)).await?;
        info!(%username, id, removed, "post delete");
        Ok(())
    }
}

/// Removes `<...>` markup, leaving an unterminated `<` untouched
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DDTHH:MM[:SS]`
/// and renders the stored `YYYY-MM-DD HH:MM:SS` form in UTC
pub fn normalize_scheduled_time(input: &str) -> Result<String, ServiceError> {
    let input = input.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc).format(SCHEDULED_TIME_FORMAT).to_string());
    }

    const NAIVE_FORMATS: [&str; 4] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .map(|at| at.format(SCHEDULED_TIME_FORMAT).to_string())
        .ok_or_else(|| ServiceError::Validation(format!("Invalid scheduled_time '{}'", input)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn seeded() -> PostService {
        let store = Arc::new(MemoryStore::new());
        for post in [
            json!({ "user_name": "alice", "caption": "later", "image_url": "<p>https://img/2.png</p>", "scheduled_time": "2024-05-02 10:00:00", "posted": "Pending" }),
            json!({ "user_name": "alice", "caption": "sooner", "image_url": " https://img/1.png ", "scheduled_time": "2024-05-01 09:30:00", "posted": "Completed" }),
            json!({ "user_name": "bob", "caption": "bob's", "scheduled_time": "2024-05-01 08:00:00" }),
        ] {
            store.insert(Table::Posts, post.as_object().cloned().unwrap()).await.unwrap();
        }
        PostService::new(store)
    }

    #[test]
    fn strips_markup() {
        assert_eq!(strip_tags("<img src=\"x\">https://a/b.png</img>"), "https://a/b.png");
        assert_eq!(strip_tags("a < b"), "a < b");
        assert_eq!(strip_tags("plain"), "plain");
    }

    #[test]
    fn normalizes_times() {
        assert_eq!(normalize_scheduled_time("2024-05-01T09:30").unwrap(), "2024-05-01 09:30:00");
        assert_eq!(normalize_scheduled_time("2024-05-01 09:30:15").unwrap(), "2024-05-01 09:30:15");
        assert_eq!(normalize_scheduled_time("2024-05-01T11:30:00+02:00").unwrap(), "2024-05-01 09:30:00");
        assert!(normalize_scheduled_time("tomorrow").is_err());
    }

    #[tokio::test]
    async fn events_are_ordered_and_shaped() {
        let service = seeded().await;
        let events = service.events("alice").await.unwrap();
        assert_eq!(events.len(), 2);

        let first = &events[0];
        assert_eq!(first.id, 2);
        assert_eq!(first.title, "Post #2");
        assert_eq!(first.start, "2024-05-01T09:30:00Z");
        assert_eq!(first.color, "#28a745");
        assert_eq!(first.extended_props.image_url, "https://img/1.png");

        let second = &events[1];
        assert_eq!(second.color, "#ffc107");
        assert_eq!(second.extended_props.image_url, "https://img/2.png");

        let json = serde_json::to_value(first).unwrap();
        assert_eq!(json["extendedProps"]["status"], "Completed");
        assert_eq!(json["display"], "block");
    }

    #[tokio::test]
    async fn edits_are_scoped_to_owner() {
        let service = seeded().await;

        let update = PostUpdate {
            caption: Some("changed".to_string()),
            scheduled_time: Some("2024-06-01T12:00".to_string()),
        };
        service.update("alice", 1, update).await.unwrap();
        let events = service.events("alice").await.unwrap();
        let edited = events.iter().find(|e| e.id == 1).unwrap();
        assert_eq!(edited.extended_props.caption, "changed");
        assert_eq!(edited.start, "2024-06-01T12:00:00Z");

        let foreign = service
            .update("bob", 1, PostUpdate { caption: Some("x".to_string()), ..Default::default() })
            .await;
        assert!(matches!(foreign, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            service.update("alice", 1, PostUpdate::default()).await,
            Err(ServiceError::Validation(_))
        ));

        service.delete("bob", 1).await.unwrap();
        assert_eq!(service.events("alice").await.unwrap().len(), 2);
        service.delete("alice", 1).await.unwrap();
        assert_eq!(service.events("alice").await.unwrap().len(), 1);
    }
}
