use std::sync::Mutex;

use async_trait::async_trait;

use crate::notify::{Notifier, NotifyError};

#[derive(Debug, Clone)]
pub struct SentCode {
    pub to: String,
    pub code: String,
    pub username: String,
}

/// Notifier that keeps every message in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentCode>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<SentCode> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_code(&self) -> String {
        self.sent().last().map(|s| s.code.clone()).expect("no code sent")
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_verification_code(&self, to_email: &str, code: &str, username: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(SentCode {
            to: to_email.to_string(),
            code: code.to_string(),
            username: username.to_string(),
        });
        Ok(())
    }
}

/// Notifier whose every send is rejected
#[derive(Debug, Default)]
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_verification_code(&self, _to: &str, _code: &str, _username: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}
