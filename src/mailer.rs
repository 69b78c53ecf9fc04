use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::config::MailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail relay rejected the message with status {0}")]
    Rejected(u16),
    #[error("simulated mail failure")]
    Simulated,
}

/// A plain-text message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Builds the message carrying a freshly issued verification code.
pub fn verification_email(to: &str, code: &str, valid_for_minutes: u64) -> Email {
    Email {
        to: to.to_string(),
        subject: "Verify your Cavite Venture account".to_string(),
        text: format!(
            "Your verification code is {code}. It expires in {valid_for_minutes} minutes."
        ),
    }
}

/// Mailer
///
/// Outbound email delivery. Signup depends on it to hand out verification codes.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

pub type MailerState = Arc<dyn Mailer>;

/// HttpMailer
///
/// Delivers mail through an HTTP relay API: a JSON POST authenticated with a
/// bearer key.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[tracing::instrument(skip(self, email), fields(to = %email.to))]
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&RelayMessage {
                from: &self.from,
                to: &email.to,
                subject: &email.subject,
                text: &email.text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected(status.as_u16()));
        }
        tracing::debug!("verification email handed to relay");
        Ok(())
    }
}

/// LogMailer
///
/// Used when no relay is configured: the message is written to the log instead.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.text,
            "mail relay not configured, message logged instead of sent"
        );
        Ok(())
    }
}

/// MockMailer
///
/// Records every message for inspection in tests. Can be switched to fail.
#[derive(Default)]
pub struct MockMailer {
    sent: Mutex<Vec<Email>>,
    should_fail: AtomicBool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        let mock = Self::default();
        mock.should_fail.store(true, Ordering::SeqCst);
        mock
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Pulls the six-digit code out of the most recent message sent to `to`.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent().into_iter().rev().find(|e| e.to == to).and_then(|e| {
            e.text
                .split(|c: char| !c.is_ascii_digit())
                .find(|part| part.len() == 6)
                .map(str::to_string)
        })
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(MailError::Simulated);
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_mailer_exposes_the_last_code() {
        let mailer = MockMailer::new();
        mailer
            .send(verification_email("a@example.com", "123456", 10))
            .await
            .unwrap();
        mailer
            .send(verification_email("a@example.com", "654321", 10))
            .await
            .unwrap();

        assert_eq!(mailer.last_code_for("a@example.com").as_deref(), Some("654321"));
        assert!(mailer.last_code_for("b@example.com").is_none());
    }

    #[tokio::test]
    async fn failing_mock_records_nothing() {
        let mailer = MockMailer::new_failing();
        let result = mailer
            .send(verification_email("a@example.com", "123456", 10))
            .await;
        assert!(matches!(result, Err(MailError::Simulated)));
        assert!(mailer.sent().is_empty());
    }
}
