//! Confirmation-link extraction from message bodies.
//!
//! Verification emails arrive in wildly different shapes depending on the
//! sending template: a bare URL in the plaintext part, a full HTML document
//! with a styled button, or both. Extraction runs an ordered chain of
//! matchers and takes the first hit; within each rule the plaintext body is
//! searched before the HTML body.

use crate::models::Message;
use regex::Regex;
use scraper::{Html, Selector};

// URL characters stop at whitespace, quotes, and angle brackets so links
// embedded in HTML attributes come out without trailing markup.
const URL_TAIL: &str = r#"[^'"\s<>]"#;

/// One rule in the confirmation-link search chain.
#[derive(Debug, Clone)]
pub enum LinkMatcher {
    /// Regex whose first whole match is taken as the link.
    Url(Regex),
    /// `href` of an anchor whose visible text equals this string,
    /// case-insensitive and whitespace-collapsed.
    AnchorText(String),
}

impl LinkMatcher {
    fn find(&self, body: &str) -> Option<String> {
        match self {
            LinkMatcher::Url(re) => re.find(body).map(|m| m.as_str().to_string()),
            LinkMatcher::AnchorText(text) => find_anchor_href(body, text),
        }
    }
}

/// Ordered, first-match-wins link extraction over message bodies.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    matchers: Vec<LinkMatcher>,
}

impl LinkExtractor {
    /// Build the default chain for an application rooted at `app_base_url`.
    ///
    /// Rule order: any URL containing "confirm", an app-domain URL
    /// containing "confirm", the href of a "Confirm account" anchor, then
    /// any app-domain URL as a last resort.
    pub fn new(app_base_url: &str) -> Self {
        let root = regex::escape(app_base_url.trim_end_matches('/'));
        // A rule that fails to compile is dropped from the chain; the
        // default set is pinned by a test below.
        let ordered = [
            url_matcher(&format!(r"https://{URL_TAIL}+confirm{URL_TAIL}*")),
            url_matcher(&format!(r"{root}/{URL_TAIL}+confirm{URL_TAIL}*")),
            Some(LinkMatcher::AnchorText("Confirm account".to_string())),
            url_matcher(&format!(r"{root}/{URL_TAIL}+")),
        ];
        Self {
            matchers: ordered.into_iter().flatten().collect(),
        }
    }

    /// Append a rule to the end of the chain.
    pub fn push(&mut self, matcher: LinkMatcher) {
        self.matchers.push(matcher);
    }

    /// First link matched by `custom` (when given) or by the default chain.
    ///
    /// Absence is a normal outcome; no rule matching either body yields
    /// `None`, never an error.
    pub fn extract(&self, message: &Message, custom: Option<&Regex>) -> Option<String> {
        if let Some(re) = custom {
            return re
                .find(&message.text_body)
                .or_else(|| re.find(&message.html_body))
                .map(|m| m.as_str().to_string());
        }

        for matcher in &self.matchers {
            if let Some(link) = matcher
                .find(&message.text_body)
                .or_else(|| matcher.find(&message.html_body))
            {
                return Some(link);
            }
        }
        None
    }
}

fn url_matcher(pattern: &str) -> Option<LinkMatcher> {
    Regex::new(pattern).ok().map(LinkMatcher::Url)
}

fn find_anchor_href(body: &str, text: &str) -> Option<String> {
    let doc = Html::parse_fragment(body);
    let selector = Selector::parse("a").ok()?;
    let wanted = collapse_whitespace(text).to_lowercase();
    for node in doc.select(&selector) {
        let label = collapse_whitespace(&node.text().collect::<String>()).to_lowercase();
        if label == wanted {
            if let Some(href) = node.value().attr("href") {
                return Some(href.to_string());
            }
        }
    }
    None
}

fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_ws = false;
    for c in input.chars() {
        if c.is_whitespace() {
            if !last_ws {
                out.push(' ');
            }
            last_ws = true;
        } else {
            out.push(c);
            last_ws = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn extractor() -> LinkExtractor {
        LinkExtractor::new("https://app.hubstaff.com")
    }

    fn message(text: &str, html: &str) -> Message {
        Message {
            id: "m1".into(),
            subject: "Confirm your Hubstaff account".into(),
            text_body: text.into(),
            html_body: html.into(),
        }
    }

    #[test]
    fn default_chain_compiles_in_full() {
        assert_eq!(extractor().matchers.len(), 4);
    }

    #[test]
    fn confirm_url_beats_generic_app_url() {
        let msg = message(
            "Start here https://app.hubstaff.com/dashboard then visit \
             https://app.hubstaff.com/users/confirm?t=abc",
            "",
        );
        assert_eq!(
            extractor().extract(&msg, None).as_deref(),
            Some("https://app.hubstaff.com/users/confirm?t=abc")
        );
    }

    #[test]
    fn text_body_wins_over_html_body_within_a_rule() {
        let msg = message(
            "https://example.com/a/confirm?t=text",
            "https://example.com/b/confirm?t=html",
        );
        assert_eq!(
            extractor().extract(&msg, None).as_deref(),
            Some("https://example.com/a/confirm?t=text")
        );
    }

    #[test]
    fn html_body_is_searched_when_text_body_has_no_match() {
        let msg = message(
            "thanks for signing up",
            r#"click <a href="https://app.hubstaff.com/x/confirm?t=abc">Confirm account</a>"#,
        );
        assert_eq!(
            extractor().extract(&msg, None).as_deref(),
            Some("https://app.hubstaff.com/x/confirm?t=abc")
        );
    }

    #[test]
    fn anchor_text_rule_reads_href() {
        // No raw confirm URL outside the attribute, so the anchor rule fires.
        let msg = message(
            "",
            r#"<a href="/activate?t=9">  confirm
                ACCOUNT </a>"#,
        );
        assert_eq!(extractor().extract(&msg, None).as_deref(), Some("/activate?t=9"));
    }

    #[test]
    fn anchor_with_other_text_is_ignored() {
        let msg = message("", r#"<a href="/activate?t=9">Unsubscribe</a>"#);
        assert_eq!(extractor().extract(&msg, None), None);
    }

    #[test]
    fn app_domain_fallback_applies_without_confirm() {
        let msg = message("see https://app.hubstaff.com/getting_started for tips", "");
        assert_eq!(
            extractor().extract(&msg, None).as_deref(),
            Some("https://app.hubstaff.com/getting_started")
        );
    }

    #[test]
    fn absence_returns_none() {
        let msg = message("no links here", "");
        assert_eq!(extractor().extract(&msg, None), None);
    }

    #[test]
    fn custom_pattern_replaces_the_chain() {
        let re = Regex::new(r"https://mail\.example\.com/v/\w+").unwrap();
        let msg = message(
            "https://app.hubstaff.com/users/confirm?t=abc and https://mail.example.com/v/tok3n",
            "",
        );
        assert_eq!(
            extractor().extract(&msg, Some(&re)).as_deref(),
            Some("https://mail.example.com/v/tok3n")
        );
    }

    #[test]
    fn attribute_quotes_do_not_bleed_into_the_link() {
        let msg = message(
            "",
            r#"<a href="https://app.hubstaff.com/x/confirm?t=abc">Confirm account</a>"#,
        );
        assert_eq!(
            extractor().extract(&msg, None).as_deref(),
            Some("https://app.hubstaff.com/x/confirm?t=abc")
        );
    }

    #[test]
    fn extended_chain_is_consulted_after_the_defaults() {
        let mut ex = extractor();
        ex.push(LinkMatcher::Url(
            Regex::new(r"https://verify\.vendor\.io/\w+").unwrap(),
        ));
        let msg = message("open https://verify.vendor.io/abc123", "");
        assert_eq!(
            ex.extract(&msg, None).as_deref(),
            Some("https://verify.vendor.io/abc123")
        );
    }

    proptest! {
        #[test]
        fn extraction_is_deterministic(text in ".{0,200}", html in ".{0,200}") {
            let ex = extractor();
            let msg = message(&text, &html);
            prop_assert_eq!(ex.extract(&msg, None), ex.extract(&msg, None));
        }

        #[test]
        fn extracted_link_comes_from_a_body(text in ".{0,200}", html in ".{0,200}") {
            let msg = message(&text, &html);
            if let Some(link) = extractor().extract(&msg, None) {
                prop_assert!(
                    msg.text_body.contains(&link) || msg.html_body.contains(&link),
                    "link {:?} not present in either body", link
                );
            }
        }

        #[test]
        fn plain_prose_never_yields_a_link(words in "[a-zA-Z0-9 .,]{0,200}") {
            let msg = message(&words, &words);
            prop_assert_eq!(extractor().extract(&msg, None), None);
        }
    }
}
