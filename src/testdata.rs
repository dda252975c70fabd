//! Random data helpers for signup-flow scenarios.

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};

/// Generated signup identity.
#[derive(Debug, Clone)]
pub struct LoginData {
    /// Random first name.
    pub first_name: String,
    /// Random last name.
    pub last_name: String,
    /// Random password meeting typical complexity rules.
    pub password: String,
}

/// Combine a prefix, an optional millisecond timestamp, and a random
/// suffix into a collision-resistant name.
pub fn unique_name(prefix: &str, with_timestamp: bool) -> String {
    let timestamp = if with_timestamp {
        format!("-{}", Utc::now().timestamp_millis())
    } else {
        String::new()
    };
    format!("{prefix}{timestamp}-{}", random_lower(6))
}

/// Generate a fresh signup identity.
pub fn random_login_data() -> LoginData {
    LoginData {
        first_name: unique_name("User", false),
        last_name: unique_name("Test", false),
        password: format!("Test{}!", Utc::now().timestamp_millis()),
    }
}

/// Random payment amount between 0.001 and 999999.99, two decimal places.
pub fn random_amount() -> String {
    const MIN_AMOUNT: f64 = 0.001;
    const MAX_AMOUNT: f64 = 999_999.99;
    let amount = rand::thread_rng().gen_range(MIN_AMOUNT..=MAX_AMOUNT);
    format!("{amount:.2}")
}

/// Generate a random mailbox local part (alphanumeric, lowercased).
pub fn random_mailbox_local(len: usize) -> String {
    random_lower(len.clamp(6, 32))
}

fn random_lower(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let raw: String = (0..len)
        .map(|_| rng.sample(Alphanumeric) as char)
        .collect();
    raw.to_lowercase()
}
