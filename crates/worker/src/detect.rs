//! Challenge (CAPTCHA) detection heuristic.
//!
//! A fixed, ordered rule list: structural selector probes first, then
//! case-insensitive phrase searches over the rendered markup. First match
//! wins. A false negative proceeds to completion and a false positive
//! costs one unnecessary escalation, so the rule list is injectable
//! rather than baked in.

use handoff_browser::{AutomationSession, BrowserError};

/// One detection probe, evaluated in list order.
#[derive(Debug, Clone)]
pub enum DetectionRule {
    /// Matches when any element satisfies this CSS selector.
    Selector(String),
    /// Matches when the rendered markup contains this phrase,
    /// case-insensitively.
    Phrase(String),
}

/// Ordered-rule challenge predicate.
pub struct ChallengeDetector {
    rules: Vec<DetectionRule>,
}

impl ChallengeDetector {
    /// Build a detector from a custom rule list.
    pub fn new(rules: Vec<DetectionRule>) -> Self {
        Self { rules }
    }

    /// Check the session's current page against the rules.
    ///
    /// The markup is fetched at most once, lazily, when the first phrase
    /// rule is reached.
    pub async fn detect(&self, session: &dyn AutomationSession) -> Result<bool, BrowserError> {
        let mut markup: Option<String> = None;

        for rule in &self.rules {
            match rule {
                DetectionRule::Selector(selector) => {
                    if session.query_selector(selector).await? {
                        return Ok(true);
                    }
                }
                DetectionRule::Phrase(phrase) => {
                    if markup.is_none() {
                        markup = Some(session.markup().await?.to_lowercase());
                    }
                    let haystack = markup.as_deref().unwrap_or_default();
                    if haystack.contains(&phrase.to_lowercase()) {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }
}

impl Default for ChallengeDetector {
    /// The stock rule list: reCAPTCHA widget markers, generic sitekey
    /// attributes, then the well-known prompt phrases.
    fn default() -> Self {
        Self::new(vec![
            DetectionRule::Selector("iframe[src*='recaptcha']".into()),
            DetectionRule::Selector(".g-recaptcha".into()),
            DetectionRule::Selector("[data-sitekey]".into()),
            DetectionRule::Phrase("i'm not a robot".into()),
            DetectionRule::Phrase("verify you are human".into()),
            DetectionRule::Phrase("select all images".into()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Static page fixture for exercising detection rules.
    #[derive(Default)]
    struct FixturePage {
        selectors: Vec<&'static str>,
        markup: String,
        markup_fetches: AtomicUsize,
    }

    #[async_trait]
    impl AutomationSession for FixturePage {
        async fn navigate(&self, _url: &str) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn current_url(&self) -> Result<String, BrowserError> {
            Ok(String::new())
        }

        async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
            Ok(Vec::new())
        }

        async fn markup(&self) -> Result<String, BrowserError> {
            self.markup_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.markup.clone())
        }

        async fn fill(&self, _selector: &str, _value: &str) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn click(&self, _selector: &str) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn query_selector(&self, selector: &str) -> Result<bool, BrowserError> {
            Ok(self.selectors.contains(&selector))
        }

        async fn close(&self) -> Result<(), BrowserError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn structural_selector_match_detects_without_reading_markup() {
        let page = FixturePage {
            selectors: vec![".g-recaptcha"],
            markup: "irrelevant".into(),
            ..Default::default()
        };

        assert!(ChallengeDetector::default()
            .detect(&page)
            .await
            .expect("detect"));
        assert_eq!(page.markup_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_to_case_insensitive_phrase_search() {
        let page = FixturePage {
            markup: "<p>Please VERIFY you are HUMAN to continue</p>".into(),
            ..Default::default()
        };

        assert!(ChallengeDetector::default()
            .detect(&page)
            .await
            .expect("detect"));
        // The markup is fetched once and reused across phrase rules.
        assert_eq!(page.markup_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clean_page_is_not_a_challenge() {
        let page = FixturePage {
            markup: "<form><input name='q'></form>".into(),
            ..Default::default()
        };

        assert!(!ChallengeDetector::default()
            .detect(&page)
            .await
            .expect("detect"));
    }

    #[tokio::test]
    async fn custom_rule_lists_replace_the_stock_heuristic() {
        let page = FixturePage {
            selectors: vec!["#test-challenge"],
            ..Default::default()
        };
        let detector =
            ChallengeDetector::new(vec![DetectionRule::Selector("#test-challenge".into())]);

        assert!(detector.detect(&page).await.expect("detect"));
    }
}
