use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::{verification_body, Notifier, NotifyError, VERIFICATION_SUBJECT};
use crate::config::MailConfig;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    text_content: String,
}

/// Sends plain-text mail through a transactional mail HTTP API
/// (Brevo `v3/smtp/email` request shape, `api-key` header auth).
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, NotifyError> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(NotifyError::NotConfigured("MAIL_API_KEY"));
        }
        let sender_email = config.sender_email.trim();
        if sender_email.is_empty() {
            return Err(NotifyError::NotConfigured("MAIL_SENDER_EMAIL"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: api_key.to_string(),
            sender_email: sender_email.to_string(),
            sender_name: config.sender_name.clone(),
        })
    }

    fn body(&self, to_email: &str, code: &str, username: &str) -> SendEmailBody {
        SendEmailBody {
            sender: EmailAddress {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![EmailAddress {
                email: to_email.to_string(),
                name: Some(username.to_string()),
            }],
            subject: VERIFICATION_SUBJECT.to_string(),
            text_content: verification_body(username, code),
        }
    }
}

#[async_trait]
impl Notifier for HttpMailer {
    async fn send_verification_code(&self, to_email: &str, code: &str, username: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&self.body(to_email, code, username))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(to = %to_email, "verification mail accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "mail API rejected message");
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
