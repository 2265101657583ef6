//! CDP automation surface
//!
//! Implements the core's page/surface capabilities over chromiumoxide,
//! connected to an already-running remote browser via its DevTools websocket
//! endpoint. One [`CdpSurface`] per session; popup windows show up as
//! additional targets in [`AutomationSurface::open_pages`].

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tempoflow_core::{
    AutomationSurface, ClickTechnique, ElementState, Error as CoreError, PageHandle,
    QueryCandidate, Result as CoreResult,
};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Error, Result};
use crate::js;

fn cdp_err(e: impl std::fmt::Display) -> CoreError {
    CoreError::Browser(e.to_string())
}

/// One CDP-driven page.
pub struct CdpPage {
    page: Page,
}

impl CdpPage {
    fn new(page: Page) -> Self {
        Self { page }
    }

    async fn eval(&self, script: String) -> CoreResult<serde_json::Value> {
        let result = self.page.evaluate(script).await.map_err(cdp_err)?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl PageHandle for CdpPage {
    async fn navigate(&self, url: &str) -> CoreResult<()> {
        self.page.goto(url).await.map_err(cdp_err)?;
        Ok(())
    }

    async fn reload(&self) -> CoreResult<()> {
        // JS reload is more reliable across CDP versions than Page.reload.
        self.eval("window.location.reload()".to_string()).await?;
        Ok(())
    }

    async fn bring_to_front(&self) -> CoreResult<()> {
        self.page.bring_to_front().await.map_err(cdp_err)?;
        Ok(())
    }

    async fn current_url(&self) -> CoreResult<String> {
        let url = self.page.url().await.map_err(cdp_err)?;
        Ok(url.unwrap_or_default())
    }

    async fn close_page(&self) -> CoreResult<()> {
        self.page.clone().close().await.map_err(cdp_err)?;
        Ok(())
    }

    async fn query(&self, candidate: &QueryCandidate) -> CoreResult<Option<ElementState>> {
        let value = self.eval(js::probe(candidate)).await?;
        if value.is_null() {
            return Ok(None);
        }
        let state: ElementState = serde_json::from_value(value)
            .map_err(|e| CoreError::Browser(format!("bad probe result: {e}")))?;
        Ok(Some(state))
    }

    async fn click(&self, candidate: &QueryCandidate, technique: ClickTechnique) -> CoreResult<()> {
        match technique {
            ClickTechnique::Single | ClickTechnique::Double => {
                self.native_click(candidate, technique).await
            }
            _ => {
                self.eval(js::click(candidate, technique)).await?;
                Ok(())
            }
        }
    }

    async fn fill(&self, candidate: &QueryCandidate, value: &str) -> CoreResult<()> {
        self.eval(js::fill(candidate, value)).await?;
        Ok(())
    }

    async fn inner_text(&self, scope: Option<String>) -> CoreResult<String> {
        let value = self.eval(js::inner_text(scope.as_deref())).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn count_matches(&self, candidate: &QueryCandidate) -> CoreResult<usize> {
        let value = self.eval(js::count(candidate)).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn scroll_into_view(&self, candidate: &QueryCandidate) -> CoreResult<()> {
        self.eval(js::scroll_into_view(candidate)).await?;
        Ok(())
    }

    async fn hide_matching(&self, candidate: &QueryCandidate) -> CoreResult<()> {
        self.eval(js::hide(candidate)).await?;
        Ok(())
    }
}

impl CdpPage {
    /// Deliver a click through the real input pipeline: tag the element from
    /// script, pick it up as a CDP element handle, click natively, untag.
    async fn native_click(
        &self,
        candidate: &QueryCandidate,
        technique: ClickTechnique,
    ) -> CoreResult<()> {
        self.eval(js::tag(candidate)).await?;

        let selector = format!("[{}=\"1\"]", js::TAG_ATTRIBUTE);
        let clicked = async {
            let element = self.page.find_element(&selector).await.map_err(cdp_err)?;
            element.click().await.map_err(cdp_err)?;
            if technique == ClickTechnique::Double {
                element.click().await.map_err(cdp_err)?;
            }
            Ok::<(), CoreError>(())
        }
        .await;

        // Untag regardless of click result so stale tags never accumulate.
        if let Err(e) = self.eval(js::untag()).await {
            debug!(error = %e, "untag failed");
        }
        clicked
    }
}

/// CDP surface over one remote browser session.
pub struct CdpSurface {
    browser: Browser,
    handler_task: JoinHandle<()>,
    main: Arc<CdpPage>,
}

impl CdpSurface {
    /// Connect to a browser's DevTools websocket endpoint.
    ///
    /// The main page is the first non-extension page already open, or a fresh
    /// blank one when the browser started empty.
    pub async fn connect(ws_endpoint: &str) -> Result<Self> {
        let (browser, mut handler) = Browser::connect(ws_endpoint)
            .await
            .map_err(|e| Error::Cdp(e.to_string()))?;

        // The handler stream must be drained for the connection to function.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let pages = browser.pages().await.map_err(|e| Error::Cdp(e.to_string()))?;
        let mut main = None;
        for page in pages {
            let url = page.url().await.ok().flatten().unwrap_or_default();
            if !url.starts_with("chrome-extension://") && !url.starts_with("devtools://") {
                main = Some(page);
                break;
            }
        }
        let main = match main {
            Some(page) => page,
            None => browser
                .new_page("about:blank")
                .await
                .map_err(|e| Error::Cdp(e.to_string()))?,
        };

        debug!(ws = ws_endpoint, "cdp surface connected");
        Ok(Self {
            browser,
            handler_task,
            main: Arc::new(CdpPage::new(main)),
        })
    }

    /// Stop servicing the CDP connection.
    ///
    /// The remote browser itself keeps running; stopping it is the
    /// provisioner's job.
    pub fn disconnect(&self) {
        self.handler_task.abort();
    }
}

impl Drop for CdpSurface {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

#[async_trait]
impl AutomationSurface for CdpSurface {
    fn main_page(&self) -> Arc<dyn PageHandle> {
        self.main.clone()
    }

    async fn open_pages(&self) -> CoreResult<Vec<Arc<dyn PageHandle>>> {
        let pages = self.browser.pages().await.map_err(cdp_err)?;
        let mut handles: Vec<Arc<dyn PageHandle>> = Vec::with_capacity(pages.len());
        for page in pages {
            handles.push(Arc::new(CdpPage::new(page)));
        }
        Ok(handles)
    }
}

impl std::fmt::Debug for CdpSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdpSurface").finish_non_exhaustive()
    }
}
