use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::GraphConfig;
use crate::filter::FilterData;
use crate::store::models::Account;
use crate::store::{CredentialStore, Repository, Table};

use super::ServiceError;

const PROFILE_FIELDS: &str = "username,name,biography,website,profile_picture_url,followers_count,media_count";
const MEDIA_FIELDS: &str = "id,caption,media_type,media_url,timestamp,like_count,comments_count";
const ENGAGEMENT_FIELDS: &str = "like_count,comments_count";

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid graph API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("graph API request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Read-only client for the social graph API
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    base_url: Url,
    api_version: String,
    recent_media_limit: u32,
    insights_media_limit: u32,
}

impl GraphClient {
    pub fn new(config: &GraphConfig) -> Result<Self, GraphError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| GraphError::InvalidBaseUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(GraphError::InvalidBaseUrl(config.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_version: config.api_version.clone(),
            recent_media_limit: config.recent_media_limit,
            insights_media_limit: config.insights_media_limit,
        })
    }

    /// `{base}/{version}/{segments...}`
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push(&self.api_version).extend(segments);
        }
        url
    }

    async fn get_json(&self, url: Url, query: &[(&str, String)]) -> Result<Value, GraphError> {
        debug!(path = url.path(), "graph API request");
        let response = self.client.get(url).query(query).send().await?;
        Ok(response.json::<Value>().await?)
    }

    pub async fn profile(&self, access_token: &str, user_id: &str) -> Result<Value, GraphError> {
        self.get_json(
            self.endpoint(&[user_id]),
            &[("fields", PROFILE_FIELDS.to_string()), ("access_token", access_token.to_string())],
        )
        .await
    }

    pub async fn media(&self, access_token: &str, user_id: &str, fields: &str, limit: u32) -> Result<Vec<Value>, GraphError> {
        let body = self
            .get_json(
                self.endpoint(&[user_id, "media"]),
                &[
                    ("fields", fields.to_string()),
                    ("access_token", access_token.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        Ok(data_array(body))
    }

    pub async fn reach_insights(&self, access_token: &str, user_id: &str) -> Result<Vec<Value>, GraphError> {
        let body = self
            .get_json(
                self.endpoint(&[user_id, "insights"]),
                &[
                    ("metric", "reach".to_string()),
                    ("period", "days_28".to_string()),
                    ("metric_type", "time_series".to_string()),
                    ("access_token", access_token.to_string()),
                ],
            )
            .await?;
        Ok(data_array(body))
    }
}

fn data_array(mut body: Value) -> Vec<Value> {
    match body.get_mut("data").map(Value::take) {
        Some(Value::Array(items)) => items,
        _ => vec![],
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnalyticsReport {
    pub profile: Value,
    pub recent_posts: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReachPoint {
    pub date: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InsightsReport {
    pub reach_series: Vec<ReachPoint>,
    pub total_likes: i64,
    pub total_comments: i64,
}

/// Daily points of the first metric's `values`, dated by `end_time`
pub fn reach_series(metrics: &[Value]) -> Vec<ReachPoint> {
    let Some(values) = metrics.first().and_then(|m| m.get("values")).and_then(Value::as_array) else {
        return vec![];
    };

    values
        .iter()
        .map(|point| ReachPoint {
            date: point
                .get("end_time")
                .and_then(Value::as_str)
                .map(|t| t.chars().take(10).collect())
                .unwrap_or_default(),
            value: point.get("value").cloned().unwrap_or(Value::Null),
        })
        .collect()
}

/// Summed like and comment counts; missing counts read as zero
pub fn engagement_totals(media: &[Value]) -> (i64, i64) {
    let count = |item: &Value, field: &str| item.get(field).and_then(Value::as_i64).unwrap_or(0);
    media.iter().fold((0, 0), |(likes, comments), item| {
        (likes + count(item, "like_count"), comments + count(item, "comments_count"))
    })
}

/// Analytics for the signed-in account, fetched with its stored graph
/// credentials
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn CredentialStore>,
    graph: GraphClient,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn CredentialStore>, graph: GraphClient) -> Self {
        Self { store, graph }
    }

    async fn credentials(&self, username: &str) -> Result<(String, String), ServiceError> {
        let account = Repository::<Account>::new(Table::Accounts, self.store.clone())
            .select_one(FilterData::matching(serde_json::json!({ "user_name": username })))
            .await?
            .ok_or_else(|| ServiceError::NotFound("Account not found".to_string()))?;

        account
            .graph_credentials()
            .map(|(token, user_id)| (token.to_string(), user_id.to_string()))
            .ok_or(ServiceError::ConfigMissing)
    }

    pub async fn analytics(&self, username: &str) -> Result<AnalyticsReport, ServiceError> {
        let (token, user_id) = self.credentials(username).await?;
        let profile = self.graph.profile(&token, &user_id).await?;
        let recent_posts = self
            .graph
            .media(&token, &user_id, MEDIA_FIELDS, self.graph.recent_media_limit)
            .await?;
        Ok(AnalyticsReport { profile, recent_posts })
    }

    pub async fn insights(&self, username: &str) -> Result<InsightsReport, ServiceError> {
        let (token, user_id) = self.credentials(username).await?;
        let metrics = self.graph.reach_insights(&token, &user_id).await?;
        let media = self
            .graph
            .media(&token, &user_id, ENGAGEMENT_FIELDS, self.graph.insights_media_limit)
            .await?;
        let (total_likes, total_comments) = engagement_totals(&media);
        Ok(InsightsReport {
            reach_series: reach_series(&metrics),
            total_likes,
            total_comments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_versioned_endpoints() {
        let client = GraphClient::new(&GraphConfig::default()).unwrap();
        assert_eq!(
            client.endpoint(&["17841", "media"]).as_str(),
            "https://graph.facebook.com/v19.0/17841/media"
        );

        let mut config = GraphConfig::default();
        config.base_url = "http://127.0.0.1:9000/mock/".to_string();
        let client = GraphClient::new(&config).unwrap();
        assert_eq!(client.endpoint(&["1"]).as_str(), "http://127.0.0.1:9000/mock/v19.0/1");

        config.base_url = "not a url".to_string();
        assert!(GraphClient::new(&config).is_err());
    }

    #[test]
    fn reshapes_reach_series() {
        let metrics = vec![json!({
            "name": "reach",
            "values": [
                { "value": 10, "end_time": "2024-05-01T07:00:00+0000" },
                { "value": 12, "end_time": "2024-05-02T07:00:00+0000" }
            ]
        })];
        assert_eq!(
            reach_series(&metrics),
            vec![
                ReachPoint { date: "2024-05-01".to_string(), value: json!(10) },
                ReachPoint { date: "2024-05-02".to_string(), value: json!(12) },
            ]
        );
        assert!(reach_series(&[]).is_empty());
        assert!(reach_series(&[json!({ "name": "reach" })]).is_empty());
    }

    #[test]
    fn sums_engagement() {
        let media = vec![
            json!({ "like_count": 3, "comments_count": 1 }),
            json!({ "like_count": 4 }),
            json!({ "id": "x" }),
        ];
        assert_eq!(engagement_totals(&media), (7, 1));
        assert_eq!(engagement_totals(&[]), (0, 0));
    }

    #[test]
    fn data_array_tolerates_error_bodies() {
        assert_eq!(data_array(json!({ "data": [1, 2] })).len(), 2);
        assert!(data_array(json!({ "error": { "message": "bad token" } })).is_empty());
    }

    #[tokio::test]
    async fn missing_credentials_are_config_errors() {
        let store = Arc::new(crate::store::MemoryStore::new());
        store
            .insert(
                Table::Accounts,
                json!({
                    "user_name": "alice",
                    "email_address": "a@x.com",
                    "password": "hash",
                    "account_status": "Active",
                    "subscription_type": "Standard",
                    "total_token_limit": 60,
                    "tokens_used": 0,
                    "is_trial": false,
                    "inst_access_token": "tok"
                })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        let service = AnalyticsService::new(store, GraphClient::new(&GraphConfig::default()).unwrap());
        assert!(matches!(service.insights("alice").await, Err(ServiceError::ConfigMissing)));
    }
}
