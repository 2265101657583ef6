//! Automation surface capabilities
//!
//! The engine never reaches for a process-global browser handle. Every
//! collaborator receives the surface it drives as an explicit capability:
//! a [`PageHandle`] for one page/window, an [`AutomationSurface`] for the
//! whole session (main page plus whatever popup windows are currently open).
//!
//! The CDP-backed implementation lives in the browser collaborator crate;
//! tests substitute mocks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::interaction::ClickTechnique;
use crate::query::{ElementState, QueryCandidate};

/// One open page or window.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigate to a URL and wait for the load to commit.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Reload the page.
    async fn reload(&self) -> Result<()>;

    /// Bring this page's window to the foreground.
    async fn bring_to_front(&self) -> Result<()>;

    /// Current URL, empty if the page is gone.
    async fn current_url(&self) -> Result<String>;

    /// Close this page.
    async fn close_page(&self) -> Result<()>;

    /// Resolve a candidate and report the element's state, if it exists.
    async fn query(&self, candidate: &QueryCandidate) -> Result<Option<ElementState>>;

    /// Click the element a candidate resolves to, using one technique.
    async fn click(&self, candidate: &QueryCandidate, technique: ClickTechnique) -> Result<()>;

    /// Clear and fill a form field.
    async fn fill(&self, candidate: &QueryCandidate, value: &str) -> Result<()>;

    /// Visible text of a subtree (or the whole page when `scope` is `None`).
    async fn inner_text(&self, scope: Option<String>) -> Result<String>;

    /// Count the elements a candidate resolves to.
    async fn count_matches(&self, candidate: &QueryCandidate) -> Result<usize>;

    /// Scroll the element a candidate resolves to into view.
    async fn scroll_into_view(&self, candidate: &QueryCandidate) -> Result<()>;

    /// Hide matching elements at the presentation layer.
    ///
    /// Degraded fallback for overlays that refuse to be clicked away; safe
    /// because overlays only block interaction, they carry no required data.
    async fn hide_matching(&self, candidate: &QueryCandidate) -> Result<()>;
}

/// The full automation surface of one browser session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AutomationSurface: Send + Sync {
    /// The main workflow page. Focus is restored here after popup work.
    fn main_page(&self) -> Arc<dyn PageHandle>;

    /// Every page/window currently open in the session, including popups
    /// that opened after the last call.
    async fn open_pages(&self) -> Result<Vec<Arc<dyn PageHandle>>>;
}
