//! Chromium-backed browser capability using chromiumoxide.

use super::rendered::{BrowserLauncher, BrowserSession, RenderedItem};
use crate::error::AcquisitionError;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::{Stream, StreamExt};
use std::fmt;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

/// Launches headless Chromium with sandboxing and `/dev/shm` usage disabled.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
}

impl ChromiumLauncher {
    /// Use `executable` when given, otherwise let chromiumoxide locate a browser.
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }

    fn browser_config(&self) -> Result<BrowserConfig, AcquisitionError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--disable-extensions");
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(AcquisitionError::Launch)
    }
}

impl BrowserLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn launch(&self) -> Result<ChromiumSession, AcquisitionError> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AcquisitionError::Launch(e.to_string()))?;

        let events = tokio::spawn(async move {
            let failed = drain_events(&mut handler).await;
            debug!(failed, "Browser event stream closed");
        });

        Ok(ChromiumSession {
            browser,
            events,
            page: None,
        })
    }
}

/// Drive a CDP handler stream to completion and return how many items were errors.
///
/// Errors are logged and skipped. Commands only resolve while the handler is
/// polled, so stopping on the first undecodable message would stall every
/// later page and element call.
async fn drain_events<S, T, E>(events: &mut S) -> usize
where
    S: Stream<Item = Result<T, E>> + Unpin,
    E: fmt::Display,
{
    let mut failed = 0;
    while let Some(event) = events.next().await {
        if let Err(e) = event {
            failed += 1;
            debug!(error = %e, "Ignoring browser event error");
        }
    }
    failed
}

/// One running Chromium process and its single tab.
pub struct ChromiumSession {
    browser: Browser,
    events: JoinHandle<()>,
    page: Option<Page>,
}

impl BrowserSession for ChromiumSession {
    type Item = ChromiumItem;

    async fn navigate(&mut self, url: &Url) -> Result<(), AcquisitionError> {
        let page = self
            .browser
            .new_page(url.as_str())
            .await
            .map_err(|e| AcquisitionError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        self.page = Some(page);
        Ok(())
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<ChromiumItem>, AcquisitionError> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| AcquisitionError::Query("no page loaded".to_string()))?;
        let elements = page
            .find_elements(selector)
            .await
            .map_err(|e| AcquisitionError::Query(e.to_string()))?;
        Ok(elements.into_iter().map(ChromiumItem).collect())
    }

    async fn quit(mut self) -> Result<(), AcquisitionError> {
        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Failed to reap browser process");
        }
        self.events.abort();
        closed
            .map(|_| ())
            .map_err(|e| AcquisitionError::Release(e.to_string()))
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // No-op after quit(); otherwise stops the event pump so the dropped Browser can shut down
        self.events.abort();
    }
}

/// A list item matched on a rendered page.
pub struct ChromiumItem(Element);

impl RenderedItem for ChromiumItem {
    async fn child_text(&self, selector: &str) -> Result<Option<String>, AcquisitionError> {
        let child = self
            .0
            .find_element(selector)
            .await
            .map_err(|e| AcquisitionError::Query(e.to_string()))?;
        child
            .inner_text()
            .await
            .map_err(|e| AcquisitionError::Query(e.to_string()))
    }

    async fn child_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, AcquisitionError> {
        let child = self
            .0
            .find_element(selector)
            .await
            .map_err(|e| AcquisitionError::Query(e.to_string()))?;
        child
            .attribute(name)
            .await
            .map_err(|e| AcquisitionError::Query(e.to_string()))
    }
}
