pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::{MailConfig, MailProvider};

pub use http::HttpMailer;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0} is required to send mail")]
    NotConfigured(&'static str),

    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail API rejected message (status={status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers verification codes to users
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification_code(&self, to_email: &str, code: &str, username: &str) -> Result<(), NotifyError>;
}

pub const VERIFICATION_SUBJECT: &str = "Your Instagram Manager Verification Code";

pub fn verification_body(username: &str, code: &str) -> String {
    format!(
        "Hello {},\n\nYour verification code is: {}\n\nEnter this on the site to verify your account.",
        username, code
    )
}

/// Writes the message to the log instead of delivering it
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_code(&self, to_email: &str, code: &str, username: &str) -> Result<(), NotifyError> {
        info!(to = %to_email, %username, %code, "verification code (log delivery)");
        Ok(())
    }
}

pub fn from_config(config: &MailConfig) -> Result<Arc<dyn Notifier>, NotifyError> {
    Ok(match config.provider {
        MailProvider::Log => Arc::new(LogNotifier),
        MailProvider::Http => Arc::new(HttpMailer::new(config)?),
    })
}
