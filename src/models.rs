//! Public data models returned by the resolver.

use crate::constants::{
    default_timeout, APP_BASE_URL, CLICK_TIMEOUT_SECS, CONFIRM_CONTROL_TEXT, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_WAIT_TIMEOUT_MS, OVERALL_DEADLINE_SECS, POST_CONFIRM_URL_PATTERN, PROVIDER_BASE_URL,
    RETRY_BACKOFF_SECS,
};
use regex::Regex;
use serde::Serialize;
use std::time::Duration;

/// A disposable inbox allocated for a single verification attempt.
#[derive(Debug, Clone, Serialize)]
pub struct Mailbox {
    /// Provider-assigned inbox identifier.
    pub id: String,
    /// Email address receiving the verification message.
    pub address: String,
}

/// A received email, immutable once fetched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Message {
    /// Provider-assigned message identifier.
    pub id: String,
    /// Message subject line (may be empty).
    pub subject: String,
    /// Plaintext body (may be empty).
    pub text_body: String,
    /// HTML body (may be empty).
    pub html_body: String,
}

/// Final result of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VerificationOutcome {
    /// The browser reached the post-confirmation landing state.
    Confirmed,
    /// A link was followed but the landing state was never reached.
    NotConfirmed,
    /// The flow failed before confirmation could be attempted.
    Failed(FailureReason),
}

impl VerificationOutcome {
    /// Whether the attempt ended in the confirmed state.
    pub fn is_confirmed(&self) -> bool {
        matches!(self, VerificationOutcome::Confirmed)
    }
}

/// Why a verification attempt failed short of following a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FailureReason {
    /// The provider could not allocate an inbox.
    InboxCreation(String),
    /// The caller-supplied send trigger failed.
    SendTrigger(String),
    /// No matching message within the retry budget.
    MessageTimeout(String),
    /// No pattern matched either message body.
    LinkNotFound,
    /// The overall flow deadline elapsed.
    DeadlineExceeded,
}

/// HTTP settings for the concrete inbox-provider client.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider API root.
    pub base_url: String,
    /// Baseline request timeout. Long-poll calls extend it per request.
    pub timeout: Duration,
    /// Optional proxy URL.
    pub proxy_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: PROVIDER_BASE_URL.to_string(),
            timeout: default_timeout(),
            proxy_url: None,
        }
    }
}

/// Tunables for the verification flow.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Product application root used by the domain-scoped link patterns.
    pub app_base_url: String,
    /// Per-attempt long-poll timeout while waiting for the message.
    pub wait_timeout: Duration,
    /// Total attempts before giving up on a message.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_backoff: Duration,
    /// How long to wait for the landing URL after activating the control.
    pub click_timeout: Duration,
    /// Pattern the post-confirmation URL must match.
    pub post_confirm_pattern: Regex,
    /// Visible text of the confirmation control.
    pub confirm_control_text: String,
    /// Ceiling for the whole flow between inbox creation and deletion.
    pub overall_deadline: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            app_base_url: APP_BASE_URL.to_string(),
            wait_timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: Duration::from_secs(RETRY_BACKOFF_SECS),
            click_timeout: Duration::from_secs(CLICK_TIMEOUT_SECS),
            post_confirm_pattern: default_post_confirm_pattern(),
            confirm_control_text: CONFIRM_CONTROL_TEXT.to_string(),
            overall_deadline: Duration::from_secs(OVERALL_DEADLINE_SECS),
        }
    }
}

// The pattern is a plain literal and `regex` has no infallible constructor
// for a known-good one; the test below pins that it compiles.
fn default_post_confirm_pattern() -> Regex {
    Regex::new(POST_CONFIRM_URL_PATTERN).expect("literal pattern compiles")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_builds_and_matches_the_landing_page() {
        let config = VerifierConfig::default();
        assert!(config
            .post_confirm_pattern
            .is_match("https://app.hubstaff.com/welcome"));
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }
}
