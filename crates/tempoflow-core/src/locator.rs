//! Element locator
//!
//! Resolves a [`QueryChain`] into a single interactable element by polling the
//! page. Candidates are evaluated strictly in chain order on every poll, so a
//! later candidate can never shadow an earlier one that becomes available.
//! Precedence belongs to the chain, not the DOM.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::query::{ElementState, QueryCandidate, QueryChain};
use crate::surface::PageHandle;

/// A candidate known to have resolved to a visible, interactable element.
#[derive(Debug, Clone)]
pub struct LocatedElement {
    /// The candidate that matched; reused for subsequent interaction
    pub candidate: QueryCandidate,
    /// The element's observed state at match time
    pub state: ElementState,
}

/// Polling chain resolver. No side effects on the page.
#[derive(Debug, Clone)]
pub struct ElementLocator {
    poll_interval: Duration,
}

impl ElementLocator {
    /// Locator polling at the given interval.
    #[must_use]
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Resolve the chain, polling until `timeout` elapses.
    ///
    /// Returns the first candidate (in chain order) that resolves to an
    /// element which exists, is visible, and is not disabled. `NotFound` after
    /// the full timeout is a normal outcome for optional targets; the caller
    /// decides whether it is fatal.
    pub async fn locate(
        &self,
        page: &dyn PageHandle,
        chain: &QueryChain,
        timeout: Duration,
    ) -> Result<LocatedElement> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(located) = self.probe(page, chain).await? {
                debug!(target = %chain.label, strategy = ?located.candidate.strategy, "located");
                return Ok(located);
            }
            if Instant::now() >= deadline {
                return Err(Error::ElementNotFound(chain.label.clone()));
            }
            sleep(self.poll_interval).await;
        }
    }

    /// One pass over the chain, no waiting. `None` when nothing matched.
    pub async fn probe(
        &self,
        page: &dyn PageHandle,
        chain: &QueryChain,
    ) -> Result<Option<LocatedElement>> {
        for candidate in &chain.candidates {
            match page.query(candidate).await? {
                Some(state) if state.interactable() => {
                    return Ok(Some(LocatedElement {
                        candidate: candidate.clone(),
                        state,
                    }));
                }
                Some(state) => {
                    trace!(
                        target = %chain.label,
                        strategy = ?candidate.strategy,
                        visible = state.visible,
                        enabled = state.enabled,
                        "candidate present but not interactable"
                    );
                }
                None => {}
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryStrategy;
    use crate::surface::MockPageHandle;
    use mockall::predicate::*;

    fn chain_abc() -> QueryChain {
        QueryChain::new(
            "target",
            vec![
                QueryCandidate::by_test_attribute("a"),
                QueryCandidate::by_test_attribute("b"),
                QueryCandidate::by_test_attribute("c"),
            ],
        )
    }

    fn visible() -> ElementState {
        ElementState {
            visible: true,
            enabled: true,
            text: String::new(),
        }
    }

    fn hidden() -> ElementState {
        ElementState {
            visible: false,
            enabled: true,
            text: String::new(),
        }
    }

    #[tokio::test]
    async fn test_hidden_candidate_is_skipped() {
        // A absent, B present but hidden, C present and visible => C wins.
        let mut page = MockPageHandle::new();
        page.expect_query()
            .returning(|c: &QueryCandidate| match c.value.as_str() {
                "a" => Ok(None),
                "b" => Ok(Some(hidden())),
                "c" => Ok(Some(visible())),
                other => unreachable!("unexpected candidate {other}"),
            });

        let locator = ElementLocator::new(Duration::from_millis(10));
        let located = locator
            .locate(&page, &chain_abc(), Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(located.candidate.value, "c");
    }

    #[tokio::test]
    async fn test_chain_order_beats_dom_order() {
        // Both A and B visible => A wins because it comes first in the chain.
        let mut page = MockPageHandle::new();
        page.expect_query()
            .returning(|c: &QueryCandidate| match c.value.as_str() {
                "a" | "b" => Ok(Some(visible())),
                _ => Ok(None),
            });

        let locator = ElementLocator::new(Duration::from_millis(10));
        let located = locator
            .locate(&page, &chain_abc(), Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(located.candidate.value, "a");
    }

    #[tokio::test]
    async fn test_not_found_after_timeout() {
        let mut page = MockPageHandle::new();
        page.expect_query().returning(|_| Ok(None));

        let locator = ElementLocator::new(Duration::from_millis(5));
        let result = locator
            .locate(&page, &chain_abc(), Duration::from_millis(30))
            .await;
        match result {
            Err(Error::ElementNotFound(label)) => assert_eq!(label, "target"),
            other => unreachable!("expected ElementNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_element_appearing_mid_poll_is_found() {
        let mut page = MockPageHandle::new();
        let mut polls = 0u32;
        page.expect_query()
            .with(always())
            .returning(move |c: &QueryCandidate| {
                if c.value == "a" {
                    polls += 1;
                }
                if c.value == "c" && polls >= 3 {
                    Ok(Some(visible()))
                } else {
                    Ok(None)
                }
            });

        let locator = ElementLocator::new(Duration::from_millis(5));
        let located = locator
            .locate(&page, &chain_abc(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(located.candidate.strategy, QueryStrategy::ByTestAttribute);
        assert_eq!(located.candidate.value, "c");
    }

    #[tokio::test]
    async fn test_probe_is_single_pass() {
        let mut page = MockPageHandle::new();
        page.expect_query().times(3).returning(|_| Ok(None));

        let locator = ElementLocator::new(Duration::from_millis(5));
        let probed = locator.probe(&page, &chain_abc()).await.unwrap();
        assert!(probed.is_none());
    }
}
