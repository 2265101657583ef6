//! Interaction policy
//!
//! Some pages swallow plain clicks: handlers bound to mouse events ignore
//! programmatic clicks, React-style handlers ignore native ones, overlays eat
//! the first press. The engine therefore drives important buttons with an
//! ordered battery of techniques, each attempted (and logged) independently.
//! One technique succeeding is enough; individual failures are expected.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::query::QueryCandidate;
use crate::surface::PageHandle;

/// A single way of delivering a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickTechnique {
    /// One native (trusted) click through the input pipeline
    Single,
    /// Two native clicks in quick succession
    Double,
    /// Scroll into view, then click regardless of overlap
    Forced,
    /// `element.click()` from script
    Programmatic,
    /// Hand-dispatched mousedown/mouseup/click events
    SyntheticEvents,
}

impl ClickTechnique {
    /// Stable name for logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ClickTechnique::Single => "single",
            ClickTechnique::Double => "double",
            ClickTechnique::Forced => "forced",
            ClickTechnique::Programmatic => "programmatic",
            ClickTechnique::SyntheticEvents => "synthetic_events",
        }
    }
}

/// Ordered techniques plus how many passes to make over them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPolicy {
    /// Techniques in the order they are attempted
    pub techniques: Vec<ClickTechnique>,
    /// Full passes over the technique list
    pub repetitions: u32,
}

impl InteractionPolicy {
    /// A single plain click.
    #[must_use]
    pub fn single_click() -> Self {
        Self {
            techniques: vec![ClickTechnique::Single],
            repetitions: 1,
        }
    }

    /// The full battery, twice over, for buttons known to swallow events.
    #[must_use]
    pub fn stubborn() -> Self {
        Self {
            techniques: vec![
                ClickTechnique::Single,
                ClickTechnique::Double,
                ClickTechnique::Forced,
                ClickTechnique::Programmatic,
                ClickTechnique::SyntheticEvents,
            ],
            repetitions: 2,
        }
    }
}

impl Default for InteractionPolicy {
    fn default() -> Self {
        Self::single_click()
    }
}

/// Drive one element with every technique the policy lists.
///
/// Returns the number of techniques that went through. Errors only when not a
/// single technique succeeded across all passes.
pub async fn attempt_interaction(
    page: &dyn PageHandle,
    candidate: &QueryCandidate,
    policy: &InteractionPolicy,
) -> Result<u32> {
    let mut delivered = 0u32;
    for pass in 1..=policy.repetitions.max(1) {
        for technique in &policy.techniques {
            match page.click(candidate, *technique).await {
                Ok(()) => {
                    debug!(technique = technique.as_str(), pass, "click delivered");
                    delivered += 1;
                }
                Err(e) => {
                    warn!(
                        technique = technique.as_str(),
                        pass,
                        error = %e,
                        "click technique failed"
                    );
                }
            }
        }
    }
    if delivered == 0 {
        return Err(Error::ElementNotFound(format!(
            "no click technique reached {:?} target",
            candidate.strategy
        )));
    }
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MockPageHandle;

    #[test]
    fn test_stubborn_policy_covers_all_techniques() {
        let policy = InteractionPolicy::stubborn();
        assert_eq!(policy.techniques.len(), 5);
        assert_eq!(policy.repetitions, 2);
    }

    #[tokio::test]
    async fn test_single_failure_is_not_fatal() {
        let mut page = MockPageHandle::new();
        // First technique fails, the rest succeed.
        let mut call = 0u32;
        page.expect_click().times(10).returning(move |_, _| {
            call += 1;
            if call == 1 {
                Err(Error::Browser("node detached".into()))
            } else {
                Ok(())
            }
        });

        let candidate = QueryCandidate::by_text("GM");
        let delivered = attempt_interaction(&page, &candidate, &InteractionPolicy::stubborn())
            .await
            .unwrap();
        assert_eq!(delivered, 9);
    }

    #[tokio::test]
    async fn test_all_failures_is_an_error() {
        let mut page = MockPageHandle::new();
        page.expect_click()
            .returning(|_, _| Err(Error::Browser("gone".into())));

        let candidate = QueryCandidate::by_text("GM");
        let result =
            attempt_interaction(&page, &candidate, &InteractionPolicy::single_click()).await;
        assert!(matches!(result, Err(Error::ElementNotFound(_))));
    }
}
