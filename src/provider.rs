//! Disposable-inbox provider seam and the MailSlurp REST implementation.

use crate::constants::{default_timeout, API_KEY_ENV, API_KEY_HEADER};
use crate::error::{Error, Result};
use crate::models::{Mailbox, Message, ProviderConfig};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Disposable-email service consumed by the verifier.
///
/// Any vendor can be substituted by implementing these four operations;
/// the verifier never talks to a provider SDK directly.
#[async_trait]
pub trait InboxProvider: Send + Sync {
    /// Allocate a fresh inbox.
    async fn create_inbox(&self) -> Result<Mailbox>;

    /// Block until the next message arrives in the inbox, up to `timeout`.
    ///
    /// Providers that only return a summary here should still populate the
    /// message id so the caller can upgrade via [`fetch_message`].
    ///
    /// [`fetch_message`]: InboxProvider::fetch_message
    async fn wait_for_next_message(
        &self,
        mailbox_id: &str,
        timeout: Duration,
        unread_only: bool,
    ) -> Result<Message>;

    /// Fetch the full content of a message.
    async fn fetch_message(&self, message_id: &str) -> Result<Message>;

    /// Delete an inbox provider-side.
    async fn delete_inbox(&self, mailbox_id: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InboxEnvelope {
    id: String,
    email_address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct EmailEnvelope {
    id: String,
    subject: Option<String>,
    body: Option<String>,
    // `html` is an HTML-body string on some API versions and a boolean
    // flag on others; only the string form carries content.
    html: Option<serde_json::Value>,
}

impl EmailEnvelope {
    fn into_message(self) -> Message {
        let html_body = match self.html {
            Some(serde_json::Value::String(s)) => s,
            _ => String::new(),
        };
        Message {
            id: self.id,
            subject: self.subject.unwrap_or_default(),
            text_body: self.body.unwrap_or_default(),
            html_body,
        }
    }
}

/// REST client for the MailSlurp disposable-email API.
#[derive(Debug)]
pub struct MailSlurpClient {
    api_key: String,
    config: ProviderConfig,
    client: Client,
}

impl MailSlurpClient {
    /// Build a client from an explicit API key.
    ///
    /// Fails fast with [`Error::Config`] when the key is empty: a missing
    /// credential should surface at construction, not on the first call.
    pub fn new(api_key: impl AsRef<str>, config: Option<ProviderConfig>) -> Result<Self> {
        let api_key = api_key.as_ref().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::Config("inbox provider API key is empty".into()));
        }

        let cfg = config.unwrap_or_default();
        let mut builder = ClientBuilder::new()
            .timeout(cfg.timeout)
            .default_headers(crate::constants::default_headers());

        if let Some(proxy) = &cfg.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy).map_err(Error::Http)?);
        }

        let client = builder.build().map_err(Error::Http)?;

        Ok(Self {
            api_key,
            config: cfg,
            client,
        })
    }

    /// Build a client from the `EMAIL_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::Config(format!("{API_KEY_ENV} is not set")))?;
        Self::new(key, None)
    }
}

#[async_trait]
impl InboxProvider for MailSlurpClient {
    async fn create_inbox(&self) -> Result<Mailbox> {
        let url = format!("{}/inboxes", self.config.base_url);
        let resp = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Status { status, body });
        }

        let envelope: InboxEnvelope =
            serde_json::from_str(&body).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(Mailbox {
            id: envelope.id,
            address: envelope.email_address,
        })
    }

    async fn wait_for_next_message(
        &self,
        mailbox_id: &str,
        timeout: Duration,
        unread_only: bool,
    ) -> Result<Message> {
        let timeout_ms = timeout.as_millis() as u64;
        let timeout_param = timeout_ms.to_string();
        let params = [
            ("inboxId", mailbox_id),
            ("timeout", timeout_param.as_str()),
            ("unreadOnly", if unread_only { "true" } else { "false" }),
        ];

        let url = format!("{}/waitForLatestEmail", self.config.base_url);
        debug!(inbox = mailbox_id, timeout_ms, "waiting for next message");
        let resp = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&params)
            // The server holds the request open for the whole poll window,
            // which the client-level timeout would otherwise cut short.
            .timeout(timeout + default_timeout())
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::NOT_FOUND {
            return Err(Error::PollTimeout { timeout_ms });
        }
        if !status.is_success() {
            return Err(Error::Status { status, body });
        }

        let envelope: EmailEnvelope =
            serde_json::from_str(&body).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(envelope.into_message())
    }

    async fn fetch_message(&self, message_id: &str) -> Result<Message> {
        let url = format!("{}/emails/{}", self.config.base_url, message_id);
        let resp = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::Status { status, body });
        }

        let envelope: EmailEnvelope =
            serde_json::from_str(&body).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(envelope.into_message())
    }

    async fn delete_inbox(&self, mailbox_id: &str) -> Result<()> {
        let url = format!("{}/inboxes/{}", self.config.base_url, mailbox_id);
        let resp = self
            .client
            .delete(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await?;
            return Err(Error::Status { status, body });
        }
        debug!(inbox = mailbox_id, "inbox deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_a_configuration_error() {
        let err = MailSlurpClient::new("   ", None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn html_body_string_is_carried_over() {
        let raw = r#"{"id":"e1","subject":"Confirm","body":"hi","html":"<p>hi</p>"}"#;
        let envelope: EmailEnvelope = serde_json::from_str(raw).unwrap();
        let msg = envelope.into_message();
        assert_eq!(msg.html_body, "<p>hi</p>");
        assert_eq!(msg.text_body, "hi");
    }

    #[test]
    fn html_flag_boolean_is_treated_as_no_html_body() {
        let raw = r#"{"id":"e1","subject":"Confirm","body":"<p>hi</p>","html":true}"#;
        let envelope: EmailEnvelope = serde_json::from_str(raw).unwrap();
        let msg = envelope.into_message();
        assert_eq!(msg.html_body, "");
        assert_eq!(msg.text_body, "<p>hi</p>");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let envelope: EmailEnvelope = serde_json::from_str(r#"{"id":"e2"}"#).unwrap();
        let msg = envelope.into_message();
        assert_eq!(msg.subject, "");
        assert_eq!(msg.text_body, "");
        assert_eq!(msg.html_body, "");
    }
}
