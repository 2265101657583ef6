//! Detection predicates
//!
//! "Already done" and success/error indicators are page-specific and drift as
//! the target sites evolve. Flows therefore own them as data rather than
//! literals baked into step logic: a predicate is a value describing what to
//! look for, evaluated through the page surface.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::query::{QueryCandidate, QueryChain};
use crate::surface::PageHandle;

/// A swappable indicator check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DetectionPredicate {
    /// Page (or subtree) text contains any of the needles, case-insensitive
    TextContainsAny {
        /// Optional CSS scope; whole page when absent
        scope: Option<String>,
        /// Accepted needles
        needles: Vec<String>,
    },
    /// Some candidate in the chain resolves to a visible element
    ElementVisible(QueryChain),
    /// At least `min` elements match the candidate
    ElementCountAtLeast {
        /// Candidate to count
        candidate: QueryCandidate,
        /// Minimum match count
        min: usize,
    },
    /// A `NNh MMm` countdown is visible in the subtree
    CooldownTimer {
        /// Optional CSS scope; whole page when absent
        scope: Option<String>,
    },
}

/// What a matched predicate reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Note for the step outcome (e.g. `"CD 07h27m"`), empty notes omitted
    pub note: Option<String>,
}

fn cooldown_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,2})\s*h\s*(\d{1,2})\s*m").expect("valid cooldown pattern")
    })
}

impl DetectionPredicate {
    /// Evaluate this predicate once against a page. `None` means not detected.
    pub async fn evaluate(&self, page: &dyn PageHandle) -> Result<Option<Detection>> {
        match self {
            DetectionPredicate::TextContainsAny { scope, needles } => {
                let text = page.inner_text(scope.clone()).await?.to_lowercase();
                let hit = needles
                    .iter()
                    .find(|needle| text.contains(&needle.to_lowercase()));
                Ok(hit.map(|needle| Detection {
                    note: Some(needle.clone()),
                }))
            }
            DetectionPredicate::ElementVisible(chain) => {
                for candidate in &chain.candidates {
                    if let Some(state) = page.query(candidate).await? {
                        if state.visible {
                            return Ok(Some(Detection { note: None }));
                        }
                    }
                }
                Ok(None)
            }
            DetectionPredicate::ElementCountAtLeast { candidate, min } => {
                let count = page.count_matches(candidate).await?;
                Ok((count >= *min).then(|| Detection { note: None }))
            }
            DetectionPredicate::CooldownTimer { scope } => {
                let text = page.inner_text(scope.clone()).await?;
                Ok(parse_cooldown(&text).map(|note| Detection { note: Some(note) }))
            }
        }
    }
}

/// Extract a countdown like `"07h 27m"` and render it as `"CD 07h27m"`.
#[must_use]
pub fn parse_cooldown(text: &str) -> Option<String> {
    let captures = cooldown_pattern().captures(text)?;
    let hours: u32 = captures[1].parse().ok()?;
    let minutes: u32 = captures[2].parse().ok()?;
    Some(format!("CD {hours:02}h{minutes:02}m"))
}
