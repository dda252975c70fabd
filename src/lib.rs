pub mod browser;
pub mod constants;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod provider;
pub mod resolver;
pub mod testdata;

pub use browser::{BrowserDriver, BrowsingContext, Control};
pub use constants::{
    default_headers, default_timeout, API_KEY_ENV, APP_BASE_URL, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_WAIT_TIMEOUT_MS, PROVIDER_BASE_URL,
};
pub use error::{Error, Result};
pub use extract::{LinkExtractor, LinkMatcher};
pub use models::{
    FailureReason, Mailbox, Message, ProviderConfig, VerificationOutcome, VerifierConfig,
};
pub use provider::{InboxProvider, MailSlurpClient};
pub use resolver::EmailVerifier;
pub use testdata::{
    random_amount, random_login_data, random_mailbox_local, unique_name, LoginData,
};
