use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

pub const PROVIDER_BASE_URL: &str = "https://api.mailslurp.com";
pub const API_KEY_ENV: &str = "EMAIL_API_KEY";
pub const API_KEY_HEADER: &str = "x-api-key";

pub const APP_BASE_URL: &str = "https://app.hubstaff.com";
pub const CONFIRM_CONTROL_TEXT: &str = "Confirm account";
pub const POST_CONFIRM_URL_PATTERN: &str = "welcome";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 80_000;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const RETRY_BACKOFF_SECS: u64 = 2;
pub const CLICK_TIMEOUT_SECS: u64 = 30;
pub const OVERALL_DEADLINE_SECS: u64 = 300;

pub const DEFAULT_HEADERS: &[(&str, &str)] = &[
    ("accept", "application/json"),
    ("user-agent", "email-verifier-rs/0.1"),
];

pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    for &(k, v) in DEFAULT_HEADERS {
        let name = HeaderName::from_static(k);
        if let Ok(val) = HeaderValue::from_str(v) {
            headers.insert(name, val);
        }
    }
    headers
}

pub fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}
