//! Alert dispatch through an HTTP mail relay
//!
//! `Mailer` is a stateless pass-through: one invocation delivers one
//! message to the configured recipient. Transport failures propagate to
//! the caller; a failed alert must never be silently swallowed. Retry and
//! deduplication live in the auditor, not here.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::json;
use tracing::info;

use crate::error::{AuditError, AuditResult};

/// One notification, constructed once per escalation and consumed once
#[derive(Debug, Clone)]
pub struct AlertPayload {
    pub subject: String,
    pub message: String,
    pub screenshot: Option<PathBuf>,
}

#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn send(&self, payload: &AlertPayload) -> AuditResult<()>;
}

/// Mail relay configuration, read once at construction time
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// HTTP endpoint of the mail relay
    pub relay_url: String,

    /// Sender account identifier
    pub sender: String,

    /// Credential secret for the relay
    pub secret: String,

    /// Fixed recipient for all alerts
    pub recipient: String,
}

impl MailerConfig {
    /// Read the relay configuration from the environment.
    ///
    /// Unset credentials do not fail construction; the relay rejects the
    /// send instead. Validating them is the operator's problem, not ours.
    pub fn from_env() -> Self {
        Self {
            relay_url: std::env::var("HEALTHWATCH_RELAY_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:2525/v1/messages".to_string()),
            sender: std::env::var("EMAIL_USER").unwrap_or_default(),
            secret: std::env::var("EMAIL_PASS").unwrap_or_default(),
            recipient: std::env::var("HEALTHWATCH_RECIPIENT")
                .unwrap_or_else(|_| "admin@yourcompany.com".to_string()),
        }
    }

    /// Whether credentials are present
    pub fn is_configured(&self) -> bool {
        !self.sender.is_empty() && !self.secret.is_empty()
    }
}

/// One-shot mail sender backed by an HTTP relay
pub struct Mailer {
    config: MailerConfig,
    client: reqwest::Client,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Render the HTML body: plain message with inline screenshot reference
    fn render_body(message: &str, has_screenshot: bool) -> String {
        let mut body = format!("<p>{}</p>", message.replace('\n', "<br>"));
        if has_screenshot {
            body.push_str(r#"<br><img src="cid:failure-screenshot"/>"#);
        }
        body
    }
}

#[async_trait]
impl AlertTransport for Mailer {
    async fn send(&self, payload: &AlertPayload) -> AuditResult<()> {
        let mut attachments = Vec::new();
        if let Some(path) = &payload.screenshot {
            let bytes = tokio::fs::read(path).await?;
            attachments.push(json!({
                "filename": "failure-screenshot.png",
                "cid": "failure-screenshot",
                "content_type": "image/png",
                "content": base64::engine::general_purpose::STANDARD.encode(bytes),
            }));
        }

        let message = json!({
            "from": format!("\"Health Check Bot\" <{}>", self.config.sender),
            "to": self.config.recipient,
            "subject": format!("ALERT: {}", payload.subject),
            "html": Self::render_body(&payload.message, payload.screenshot.is_some()),
            "attachments": attachments,
        });

        let resp = self
            .client
            .post(&self.config.relay_url)
            .basic_auth(&self.config.sender, Some(&self.config.secret))
            .json(&message)
            .send()
            .await
            .map_err(|e| AuditError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AuditError::Transport(format!(
                "relay returned status {}",
                resp.status()
            )));
        }

        info!(
            recipient = %self.config.recipient,
            subject = %payload.subject,
            "Alert sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_body_replaces_newlines() {
        let body = Mailer::render_body("line one\nline two", false);
        assert_eq!(body, "<p>line one<br>line two</p>");
    }

    #[test]
    fn test_render_body_references_screenshot() {
        let body = Mailer::render_body("boom", true);
        assert!(body.contains(r#"cid:failure-screenshot"#));
    }

    #[test]
    fn test_is_configured() {
        let mut config = MailerConfig {
            relay_url: "http://localhost/".to_string(),
            sender: String::new(),
            secret: String::new(),
            recipient: "ops@example.com".to_string(),
        };
        assert!(!config.is_configured());

        config.sender = "bot@example.com".to_string();
        config.secret = "hunter2".to_string();
        assert!(config.is_configured());
    }
}
