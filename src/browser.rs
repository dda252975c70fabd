//! Browser automation seam used to follow confirmation links.
//!
//! The verifier only needs a narrow slice of a browser: open a context
//! that does not disturb the primary test session, load one URL, click
//! one control, and read the address bar. Bind your automation vendor of
//! choice by implementing these traits.

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use std::time::Duration;

/// Opens isolated browsing contexts on demand.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a browsing context independent of any primary session.
    async fn new_isolated_context(&self) -> Result<Box<dyn BrowsingContext>>;
}

/// One isolated browser session or tab.
#[async_trait]
pub trait BrowsingContext: Send {
    /// Navigate to `url`.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Wait until the current page's content has finished loading.
    async fn wait_for_load(&mut self) -> Result<()>;

    /// Locate a visible control by its visible text, if present.
    async fn find_visible_by_text(&mut self, text: &str) -> Result<Option<Box<dyn Control>>>;

    /// Wait up to `timeout` for the context URL to match `pattern`.
    async fn wait_for_url_match(&mut self, pattern: &Regex, timeout: Duration) -> Result<bool>;

    /// Current context URL.
    fn current_url(&self) -> String;

    /// Release the context. Called exactly once per context.
    async fn close(&mut self) -> Result<()>;
}

/// An activatable page control (button or link).
#[async_trait]
pub trait Control: Send {
    /// Click or otherwise trigger the control.
    async fn activate(&self) -> Result<()>;
}
