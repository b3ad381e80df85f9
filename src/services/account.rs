use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::{generate_jwt, verify_password_async, Claims};
use crate::config::SecurityConfig;
use crate::filter::FilterData;
use crate::store::models::{Account, BusinessProfile};
use crate::store::repository::to_row;
use crate::store::{CredentialStore, Repository, Row, StoreError, Table};

use super::ServiceError;

const DEFAULT_NUM_OF_POSTS: i64 = 1;
const DEFAULT_FREQUENCY: &str = "Daily";
const DEFAULT_DONTUSEUNTIL: i64 = 90;
const DEFAULT_POSTING_HOURS: &str = "11:00, 15:00";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountStatus {
    pub user_name: String,
    pub account_status: String,
    pub subscription_type: String,
    pub total_token_limit: i32,
    pub tokens_used: i32,
}

/// Third-party credentials stored on the account
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiCredentials {
    pub inst_access_token: String,
    pub ig_user_id: String,
    pub cloudinary_cloud_name: String,
    pub cloudinary_api_key: String,
    pub cloudinary_api_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusinessInput {
    pub business_name: String,
    pub business_introduction: String,
    pub products_services: String,
}

/// Posting criteria as submitted. Numbers may arrive as JSON numbers or text.
#[derive(Debug, Clone, Deserialize)]
pub struct CriteriaInput {
    pub num_of_posts: Value,
    pub frequency: String,
    pub dontuseuntil: Value,
    pub posting_hours: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Criteria {
    pub num_of_posts: i64,
    pub frequency: String,
    pub dontuseuntil: i64,
    pub posting_hours: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CriteriaView {
    Unset { message: &'static str },
    Set(Criteria),
}

/// Login and the per-account settings endpoints
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    security: SecurityConfig,
}

impl AccountService {
    pub fn new(store: Arc<dyn CredentialStore>, security: SecurityConfig) -> Self {
        Self { store, security }
    }

    fn accounts(&self) -> Repository<Account> {
        Repository::new(Table::Accounts, self.store.clone())
    }

    fn by_name(username: &str) -> Value {
        json!({ "user_name": username })
    }

    /// Verifies the password and issues a session token
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ServiceError> {
        let account = self
            .accounts()
            .select_one(FilterData::matching(Self::by_name(username)))
            .await?;

        let verified = match &account {
            Some(account) => verify_password_async(password, &account.password).await,
            None => false,
        };

        match account {
            Some(account) if verified => {
                let token = generate_jwt(&Claims::new(&account.user_name, &self.security), &self.security)?;
                info!(%username, "login succeeded");
                Ok(token)
            }
            _ => {
                warn!(%username, "login failed");
                Err(ServiceError::InvalidCredentials)
            }
        }
    }

    pub async fn account(&self, username: &str) -> Result<Account, ServiceError> {
        self.accounts()
            .select_404(FilterData::matching(Self::by_name(username)))
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => ServiceError::NotFound("Account not found".to_string()),
                other => other.into(),
            })
    }

    pub async fn status(&self, username: &str) -> Result<AccountStatus, ServiceError> {
        let account = self.account(username).await?;
        Ok(AccountStatus {
            user_name: account.user_name,
            account_status: account.account_status,
            subscription_type: account.subscription_type,
            total_token_limit: account.total_token_limit,
            tokens_used: account.tokens_used,
        })
    }

    pub async fn api_credentials(&self, username: &str) -> Result<ApiCredentials, ServiceError> {
        let account = self.account(username).await?;
        Ok(ApiCredentials {
            inst_access_token: account.inst_access_token.unwrap_or_default(),
            ig_user_id: account.ig_user_id.unwrap_or_default(),
            cloudinary_cloud_name: account.cloudinary_cloud_name.unwrap_or_default(),
            cloudinary_api_key: account.cloudinary_api_key.unwrap_or_default(),
            cloudinary_api_secret: account.cloudinary_api_secret.unwrap_or_default(),
        })
    }

    pub async fn set_api_credentials(&self, username: &str, credentials: &ApiCredentials) -> Result<(), ServiceError> {
        self.update_account(username, to_row(credentials)?).await
    }

    pub async fn criteria(&self, username: &str) -> Result<CriteriaView, ServiceError> {
        let account = self.account(username).await?;
        Ok(criteria_view(
            account.num_of_posts.as_deref(),
            account.frequency.as_deref(),
            account.dontuseuntil.as_deref(),
            account.posting_hours.as_deref(),
        ))
    }

    pub async fn set_criteria(&self, username: &str, input: &CriteriaInput) -> Result<(), ServiceError> {
        let mut changes = Row::new();
        changes.insert("num_of_posts".to_string(), Value::String(number_text("num_of_posts", &input.num_of_posts)?));
        changes.insert("frequency".to_string(), Value::String(input.frequency.clone()));
        changes.insert("dontuseuntil".to_string(), Value::String(number_text("dontuseuntil", &input.dontuseuntil)?));
        changes.insert("posting_hours".to_string(), Value::String(input.posting_hours.clone()));
        self.update_account(username, changes).await
    }

    pub async fn business(&self, username: &str) -> Result<Option<BusinessProfile>, ServiceError> {
        Ok(Repository::<BusinessProfile>::new(Table::BusinessProfiles, self.store.clone())
            .select_one(FilterData::matching(Self::by_name(username)))
            .await?)
    }

    pub async fn set_business(&self, username: &str, input: BusinessInput) -> Result<(), ServiceError> {
        let profile = BusinessProfile {
            user_name: username.to_string(),
            business_name: Some(input.business_name),
            business_introduction: Some(input.business_introduction),
            products_services: Some(input.products_services),
        };
        Repository::<BusinessProfile>::new(Table::BusinessProfiles, self.store.clone())
            .upsert(&profile)
            .await?;
        Ok(())
    }

    async fn update_account(&self, username: &str, changes: Row) -> Result<(), ServiceError> {
        let updated = self.accounts().update_where(Self::by_name(username), changes).await?;
        if updated == 0 {
            return Err(ServiceError::NotFound("Account not found".to_string()));
        }
        Ok(())
    }
}

fn is_unset(value: Option<&str>) -> bool {
    matches!(value, None | Some("") | Some("null"))
}

/// Stored criteria with defaults filled in, or the unset marker when no
/// field has been saved
pub fn criteria_view(
    num_of_posts: Option<&str>,
    frequency: Option<&str>,
    dontuseuntil: Option<&str>,
    posting_hours: Option<&str>,
) -> CriteriaView {
    if [num_of_posts, frequency, dontuseuntil, posting_hours].into_iter().all(is_unset) {
        return CriteriaView::Unset {
            message: "No criteria set yet",
        };
    }

    let number = |value: Option<&str>, default: i64| {
        value
            .filter(|v| !is_unset(Some(*v)))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    };
    let text = |value: Option<&str>, default: &str| {
        value.filter(|v| !v.is_empty()).unwrap_or(default).to_string()
    };

    CriteriaView::Set(Criteria {
        num_of_posts: number(num_of_posts, DEFAULT_NUM_OF_POSTS),
        frequency: text(frequency, DEFAULT_FREQUENCY),
        dontuseuntil: number(dontuseuntil, DEFAULT_DONTUSEUNTIL),
        posting_hours: text(posting_hours, DEFAULT_POSTING_HOURS),
    })
}

fn number_text(field: &str, value: &Value) -> Result<String, ServiceError> {
    match value {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        _ => Err(ServiceError::Validation(format!("{} must be a number", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{hash_password, validate_jwt};
    use crate::config::AppConfig;
    use crate::store::MemoryStore;

    async fn service_with_alice() -> AccountService {
        let store = Arc::new(MemoryStore::new());
        let account = json!({
            "user_name": "alice",
            "email_address": "a@x.com",
            "password": hash_password("pw").unwrap(),
            "account_status": "Active",
            "subscription_type": "Standard",
            "total_token_limit": 60,
            "tokens_used": 3,
            "is_trial": false
        });
        store
            .insert(Table::Accounts, account.as_object().cloned().unwrap())
            .await
            .unwrap();
        AccountService::new(store, AppConfig::development().security)
    }

    #[test]
    fn criteria_defaults() {
        assert_eq!(
            criteria_view(None, Some(""), Some("null"), None),
            CriteriaView::Unset {
                message: "No criteria set yet"
            }
        );

        let view = criteria_view(Some("3"), None, Some(""), None);
        assert_eq!(
            view,
            CriteriaView::Set(Criteria {
                num_of_posts: 3,
                frequency: "Daily".to_string(),
                dontuseuntil: 90,
                posting_hours: "11:00, 15:00".to_string(),
            })
        );
        assert_eq!(
            serde_json::to_value(criteria_view(None, None, None, None)).unwrap(),
            json!({ "message": "No criteria set yet" })
        );
    }

    #[tokio::test]
    async fn login_issues_token_for_valid_password() {
        let service = service_with_alice().await;
        let token = service.login("alice", "pw").await.unwrap();
        let claims = validate_jwt(&token, &AppConfig::development().security).unwrap();
        assert_eq!(claims.sub, "alice");

        assert!(matches!(service.login("alice", "nope").await, Err(ServiceError::InvalidCredentials)));
        assert!(matches!(service.login("bob", "pw").await, Err(ServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn status_and_credentials() {
        let service = service_with_alice().await;
        let status = service.status("alice").await.unwrap();
        assert_eq!(status.tokens_used, 3);
        assert_eq!(status.total_token_limit, 60);

        assert_eq!(service.api_credentials("alice").await.unwrap(), ApiCredentials::default());

        let credentials = ApiCredentials {
            inst_access_token: "tok".to_string(),
            ig_user_id: "42".to_string(),
            cloudinary_cloud_name: "cloud".to_string(),
            cloudinary_api_key: "key".to_string(),
            cloudinary_api_secret: "secret".to_string(),
        };
        service.set_api_credentials("alice", &credentials).await.unwrap();
        assert_eq!(service.api_credentials("alice").await.unwrap(), credentials);
        assert_eq!(
            service.account("alice").await.unwrap().graph_credentials(),
            Some(("tok", "42"))
        );
    }

    #[tokio::test]
    async fn criteria_are_stored_as_text() {
        let service = service_with_alice().await;
        assert!(matches!(service.criteria("alice").await.unwrap(), CriteriaView::Unset { .. }));

        let input = CriteriaInput {
            num_of_posts: json!(2),
            frequency: "Weekly".to_string(),
            dontuseuntil: json!("30"),
            posting_hours: "09:00".to_string(),
        };
        service.set_criteria("alice", &input).await.unwrap();

        let account = service.account("alice").await.unwrap();
        assert_eq!(account.num_of_posts.as_deref(), Some("2"));
        assert_eq!(
            service.criteria("alice").await.unwrap(),
            CriteriaView::Set(Criteria {
                num_of_posts: 2,
                frequency: "Weekly".to_string(),
                dontuseuntil: 30,
                posting_hours: "09:00".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn business_profile_upsert() {
        let service = service_with_alice().await;
        assert!(service.business("alice").await.unwrap().is_none());

        for name in ["Cafe", "Bakery"] {
            service
                .set_business(
                    "alice",
                    BusinessInput {
                        business_name: name.to_string(),
                        business_introduction: "intro".to_string(),
                        products_services: "bread".to_string(),
                    },
                )
                .await
                .unwrap();
        }
        let profile = service.business("alice").await.unwrap().unwrap();
        assert_eq!(profile.business_name.as_deref(), Some("Bakery"));
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let service = service_with_alice().await;
        assert!(matches!(service.status("ghost").await, Err(ServiceError::NotFound(_))));
        assert!(matches!(
            service.set_api_credentials("ghost", &ApiCredentials::default()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
