//! Typed element queries
//!
//! UI targets are never addressed by a single selector string. Each logical
//! target carries an ordered [`QueryChain`] of typed candidates (text match,
//! test attribute, structural CSS path, ARIA role) evaluated left-to-right
//! until one resolves to a visible, interactable element. Chains are data
//! owned by the flow definitions, so markup drift is fixed by editing tables,
//! not executor logic.

use serde::{Deserialize, Serialize};

/// How a candidate addresses an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStrategy {
    /// Case-insensitive substring match on visible text of clickable elements
    ByText,
    /// Match on a `data-testid` attribute value
    ByTestAttribute,
    /// A structural CSS selector path
    ByStructuralPath,
    /// Match on an ARIA `role` attribute value
    ByRole,
}

/// One way of finding a logical UI target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryCandidate {
    /// Selection strategy
    pub strategy: QueryStrategy,
    /// Strategy-specific value (text needle, attribute value, selector, role)
    pub value: String,
    /// Optional CSS selector bounding the search to a subtree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl QueryCandidate {
    /// Candidate matching clickable elements by visible text.
    #[must_use]
    pub fn by_text(value: impl Into<String>) -> Self {
        Self {
            strategy: QueryStrategy::ByText,
            value: value.into(),
            scope: None,
        }
    }

    /// Candidate matching a `data-testid` value.
    #[must_use]
    pub fn by_test_attribute(value: impl Into<String>) -> Self {
        Self {
            strategy: QueryStrategy::ByTestAttribute,
            value: value.into(),
            scope: None,
        }
    }

    /// Candidate matching a structural CSS selector.
    #[must_use]
    pub fn by_structural_path(value: impl Into<String>) -> Self {
        Self {
            strategy: QueryStrategy::ByStructuralPath,
            value: value.into(),
            scope: None,
        }
    }

    /// Candidate matching an ARIA role.
    #[must_use]
    pub fn by_role(value: impl Into<String>) -> Self {
        Self {
            strategy: QueryStrategy::ByRole,
            value: value.into(),
            scope: None,
        }
    }

    /// Restrict this candidate to a subtree.
    #[must_use]
    pub fn within(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// An ordered list of candidates for one logical target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryChain {
    /// Human-readable target name, used in logs and errors
    pub label: String,
    /// Candidates in precedence order
    pub candidates: Vec<QueryCandidate>,
}

impl QueryChain {
    /// Build a chain from a label and candidates.
    #[must_use]
    pub fn new(label: impl Into<String>, candidates: Vec<QueryCandidate>) -> Self {
        Self {
            label: label.into(),
            candidates,
        }
    }

    /// Scope every candidate in the chain to a subtree.
    #[must_use]
    pub fn scoped(mut self, scope: &str) -> Self {
        for candidate in &mut self.candidates {
            if candidate.scope.is_none() {
                candidate.scope = Some(scope.to_string());
            }
        }
        self
    }
}

/// Observed state of a resolved element, as reported by the page surface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementState {
    /// Element has a non-empty box and is not hidden by CSS
    pub visible: bool,
    /// Element is not disabled and accepts pointer events
    pub enabled: bool,
    /// Trimmed visible text, truncated by the surface
    #[serde(default)]
    pub text: String,
}

impl ElementState {
    /// Whether this element can be interacted with right now.
    #[must_use]
    pub fn interactable(&self) -> bool {
        self.visible && self.enabled
    }
}
