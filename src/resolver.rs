//! Verification flow: allocate an inbox, wait for the message, extract the
//! confirmation link, and drive a browser through it.

use crate::browser::{BrowserDriver, BrowsingContext};
use crate::error::{Error, Result};
use crate::extract::LinkExtractor;
use crate::models::{FailureReason, Mailbox, Message, VerificationOutcome, VerifierConfig};
use crate::provider::InboxProvider;
use regex::Regex;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Drives the disposable-inbox email verification flow end to end.
///
/// One verifier can serve many concurrent verification attempts: each
/// attempt owns its own [`Mailbox`] and isolated browsing context, and the
/// provider handle is only read.
pub struct EmailVerifier<P> {
    provider: P,
    config: VerifierConfig,
    extractor: LinkExtractor,
}

impl<P: InboxProvider> EmailVerifier<P> {
    /// Build a verifier over `provider` with the given tunables.
    pub fn new(provider: P, config: VerifierConfig) -> Self {
        let extractor = LinkExtractor::new(&config.app_base_url);
        Self {
            provider,
            config,
            extractor,
        }
    }

    /// Replace the default link-extraction chain.
    pub fn with_extractor(mut self, extractor: LinkExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Tunables this verifier was built with.
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Underlying inbox provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Allocate a disposable inbox for one verification attempt.
    ///
    /// Allocation failures are fatal for the attempt; retrying is the
    /// caller's decision.
    pub async fn create_mailbox(&self) -> Result<Mailbox> {
        let mailbox = self.provider.create_inbox().await?;
        info!(inbox = %mailbox.id, address = %mailbox.address, "allocated disposable inbox");
        Ok(mailbox)
    }

    /// Wait for the first message whose subject contains `subject_keyword`
    /// (case-insensitive), or for any message when no keyword is given.
    ///
    /// Each attempt long-polls the provider for up to `timeout`. A poll
    /// timeout and a subject mismatch both consume an attempt; a fixed
    /// backoff separates attempts. After `max_attempts` failures the last
    /// cause is folded into [`Error::MessageTimeout`].
    pub async fn await_message(
        &self,
        mailbox: &Mailbox,
        subject_keyword: Option<&str>,
        timeout: Duration,
        max_attempts: u32,
    ) -> Result<Message> {
        let attempts = max_attempts.max(1);
        let mut last: Option<Error> = None;

        for attempt in 1..=attempts {
            match self.poll_once(mailbox, subject_keyword, timeout).await {
                Ok(message) => {
                    debug!(attempt, subject = %message.subject, "message accepted");
                    return Ok(message);
                }
                Err(err) => {
                    debug!(attempt, %err, "message wait attempt failed");
                    last = Some(err);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_backoff).await;
            }
        }

        Err(Error::MessageTimeout {
            attempts,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn poll_once(
        &self,
        mailbox: &Mailbox,
        subject_keyword: Option<&str>,
        timeout: Duration,
    ) -> Result<Message> {
        let message = self
            .provider
            .wait_for_next_message(&mailbox.id, timeout, true)
            .await?;

        if let Some(keyword) = subject_keyword {
            if !message
                .subject
                .to_lowercase()
                .contains(&keyword.to_lowercase())
            {
                return Err(Error::SubjectMismatch {
                    keyword: keyword.to_string(),
                    subject: message.subject,
                });
            }
        }

        // Long-poll results can be summaries; upgrade to full content.
        self.provider.fetch_message(&message.id).await
    }

    /// First confirmation link found in `message`, if any.
    ///
    /// `custom` replaces the default matcher chain when given. Absence is
    /// a normal outcome, not an error.
    pub fn extract_confirmation_link(
        &self,
        message: &Message,
        custom: Option<&Regex>,
    ) -> Option<String> {
        self.extractor.extract(message, custom)
    }

    /// Follow `link` in a fresh isolated browsing context and report
    /// whether the post-confirmation landing state was reached.
    ///
    /// A visible control matching the configured text is activated when
    /// present; pages that confirm on load are accepted without a click.
    /// Navigation and activation failures are logged and downgraded to
    /// `false`. The context is closed on every path.
    pub async fn confirm_via_link(
        &self,
        link: &str,
        driver: &dyn BrowserDriver,
        post_confirm_pattern: &Regex,
        click_timeout: Duration,
    ) -> bool {
        let mut ctx = match driver.new_isolated_context().await {
            Ok(ctx) => ctx,
            Err(err) => {
                error!(%err, "could not open isolated browsing context");
                return false;
            }
        };

        let confirmed = match self
            .drive_confirmation(ctx.as_mut(), link, post_confirm_pattern, click_timeout)
            .await
        {
            Ok(confirmed) => confirmed,
            Err(err) => {
                error!(%err, link, "confirmation navigation failed");
                false
            }
        };

        if let Err(err) = ctx.close().await {
            warn!(%err, "failed to close confirmation context");
        }
        confirmed
    }

    async fn drive_confirmation(
        &self,
        ctx: &mut dyn BrowsingContext,
        link: &str,
        post_confirm_pattern: &Regex,
        click_timeout: Duration,
    ) -> Result<bool> {
        ctx.navigate(link).await?;
        ctx.wait_for_load().await?;

        match ctx
            .find_visible_by_text(&self.config.confirm_control_text)
            .await?
        {
            Some(control) => {
                control.activate().await?;
                ctx.wait_for_url_match(post_confirm_pattern, click_timeout)
                    .await?;
            }
            // Some templates confirm on page load with nothing to click.
            None => debug!(link, "no visible confirmation control, skipping activation"),
        }

        Ok(post_confirm_pattern.is_match(&ctx.current_url()))
    }

    /// Delete a disposable inbox.
    ///
    /// Whether a deletion failure is fatal is the caller's decision; the
    /// composite flow logs it and keeps the verification outcome.
    pub async fn delete_mailbox(&self, mailbox: &Mailbox) -> Result<()> {
        self.provider.delete_inbox(&mailbox.id).await?;
        debug!(inbox = %mailbox.id, "deleted disposable inbox");
        Ok(())
    }

    /// Run the whole verification flow and report the outcome.
    ///
    /// `trigger` is invoked with the fresh mailbox so the caller can make
    /// the product send the verification email (a signup form submission,
    /// an API call, whatever the scenario needs). Everything between inbox
    /// creation and deletion runs under the configured overall deadline,
    /// and the mailbox is deleted exactly once on every path.
    pub async fn run_verification<F, Fut>(
        &self,
        driver: &dyn BrowserDriver,
        subject_keyword: Option<&str>,
        custom_pattern: Option<&Regex>,
        trigger: F,
    ) -> VerificationOutcome
    where
        F: FnOnce(Mailbox) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mailbox = match self.create_mailbox().await {
            Ok(mailbox) => mailbox,
            Err(err) => {
                error!(%err, "verification aborted: inbox allocation failed");
                return VerificationOutcome::Failed(FailureReason::InboxCreation(err.to_string()));
            }
        };

        let flow =
            self.verify_with_mailbox(&mailbox, driver, subject_keyword, custom_pattern, trigger);
        let outcome = match tokio::time::timeout(self.config.overall_deadline, flow).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(deadline = ?self.config.overall_deadline, "verification flow deadline elapsed");
                VerificationOutcome::Failed(FailureReason::DeadlineExceeded)
            }
        };

        // Cleanup failure must not mask the verification outcome.
        if let Err(err) = self.delete_mailbox(&mailbox).await {
            warn!(%err, inbox = %mailbox.id, "inbox deletion failed");
        }

        outcome
    }

    async fn verify_with_mailbox<F, Fut>(
        &self,
        mailbox: &Mailbox,
        driver: &dyn BrowserDriver,
        subject_keyword: Option<&str>,
        custom_pattern: Option<&Regex>,
        trigger: F,
    ) -> VerificationOutcome
    where
        F: FnOnce(Mailbox) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if let Err(err) = trigger(mailbox.clone()).await {
            error!(%err, "verification email could not be requested");
            return VerificationOutcome::Failed(FailureReason::SendTrigger(err.to_string()));
        }

        let message = match self
            .await_message(
                mailbox,
                subject_keyword,
                self.config.wait_timeout,
                self.config.max_attempts,
            )
            .await
        {
            Ok(message) => message,
            Err(err) => {
                error!(%err, "no verification message arrived");
                return VerificationOutcome::Failed(FailureReason::MessageTimeout(err.to_string()));
            }
        };

        let Some(link) = self.extract_confirmation_link(&message, custom_pattern) else {
            error!(subject = %message.subject, "no confirmation link in message body or HTML body");
            return VerificationOutcome::Failed(FailureReason::LinkNotFound);
        };

        info!(link = %link, "following confirmation link");
        if self
            .confirm_via_link(
                &link,
                driver,
                &self.config.post_confirm_pattern,
                self.config.click_timeout,
            )
            .await
        {
            VerificationOutcome::Confirmed
        } else {
            VerificationOutcome::NotConfirmed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    enum Poll {
        Timeout,
        Deliver(Message),
    }

    struct ScriptedProvider {
        polls: Mutex<VecDeque<Poll>>,
        poll_count: AtomicU32,
        fetch_count: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(polls: Vec<Poll>) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
                poll_count: AtomicU32::new(0),
                fetch_count: AtomicU32::new(0),
            }
        }

        fn polls_made(&self) -> u32 {
            self.poll_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl InboxProvider for ScriptedProvider {
        async fn create_inbox(&self) -> Result<Mailbox> {
            Ok(Mailbox {
                id: "inbox-1".into(),
                address: "u1@test.io".into(),
            })
        }

        async fn wait_for_next_message(
            &self,
            _mailbox_id: &str,
            timeout: Duration,
            _unread_only: bool,
        ) -> Result<Message> {
            self.poll_count.fetch_add(1, Ordering::SeqCst);
            match self.polls.lock().unwrap().pop_front() {
                Some(Poll::Deliver(message)) => Ok(message),
                _ => Err(Error::PollTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            }
        }

        async fn fetch_message(&self, message_id: &str) -> Result<Message> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            Ok(Message {
                id: message_id.to_string(),
                subject: "Please Confirm Your Account".into(),
                text_body: "https://app.hubstaff.com/users/confirm?t=abc".into(),
                html_body: String::new(),
            })
        }

        async fn delete_inbox(&self, _mailbox_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn summary(subject: &str) -> Message {
        Message {
            id: "e1".into(),
            subject: subject.into(),
            text_body: String::new(),
            html_body: String::new(),
        }
    }

    fn mailbox() -> Mailbox {
        Mailbox {
            id: "inbox-1".into(),
            address: "u1@test.io".into(),
        }
    }

    fn verifier(provider: ScriptedProvider) -> EmailVerifier<ScriptedProvider> {
        EmailVerifier::new(provider, VerifierConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn mismatched_subject_is_retried_until_a_match() {
        let v = verifier(ScriptedProvider::new(vec![
            Poll::Deliver(summary("Welcome aboard")),
            Poll::Deliver(summary("Please Confirm Your Account")),
        ]));

        let message = v
            .await_message(&mailbox(), Some("confirm"), Duration::from_secs(1), 3)
            .await
            .unwrap();

        assert_eq!(message.subject, "Please Confirm Your Account");
        assert_eq!(v.provider.polls_made(), 2);
        // Only the accepted message is upgraded to a full fetch.
        assert_eq!(v.provider.fetch_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_attempts_fail_with_the_last_cause() {
        let v = verifier(ScriptedProvider::new(vec![]));
        let started = tokio::time::Instant::now();

        let err = v
            .await_message(&mailbox(), Some("confirm"), Duration::from_secs(1), 3)
            .await
            .unwrap_err();

        match err {
            Error::MessageTimeout { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.contains("no message within"), "last cause: {last}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(v.provider.polls_made(), 3);
        // Two backoff pauses between the three attempts.
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn mismatches_exhaust_the_budget_too() {
        let v = verifier(ScriptedProvider::new(vec![
            Poll::Deliver(summary("Welcome aboard")),
            Poll::Deliver(summary("Weekly digest")),
            Poll::Deliver(summary("Your invoice")),
        ]));

        let err = v
            .await_message(&mailbox(), Some("confirm"), Duration::from_secs(1), 3)
            .await
            .unwrap_err();

        match err {
            Error::MessageTimeout { attempts, last } => {
                assert_eq!(attempts, 3);
                assert!(last.contains("does not contain"), "last cause: {last}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn without_a_keyword_the_first_message_wins() {
        let v = verifier(ScriptedProvider::new(vec![Poll::Deliver(summary(
            "Weekly digest",
        ))]));

        let message = v
            .await_message(&mailbox(), None, Duration::from_secs(1), 3)
            .await
            .unwrap();

        // The full fetch supplies the content regardless of the summary.
        assert!(!message.text_body.is_empty());
        assert_eq!(v.provider.polls_made(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_polls_once() {
        let v = verifier(ScriptedProvider::new(vec![]));

        let err = v
            .await_message(&mailbox(), None, Duration::from_secs(1), 0)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MessageTimeout { attempts: 1, .. }));
        assert_eq!(v.provider.polls_made(), 1);
    }
}
