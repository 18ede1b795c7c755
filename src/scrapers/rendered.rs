//! Headless-browser headline scraper for script-populated listings.
//!
//! The browser is reached through three small traits so the strategy does not
//! depend on a particular automation library:
//!
//! - [`BrowserLauncher`]: starts one isolated browser instance
//! - [`BrowserSession`]: navigates, queries, and finally quits
//! - [`RenderedItem`]: reads nested text and attributes from one matched element
//!
//! [`super::ChromiumLauncher`] is the production implementation.
//!
//! Every call to [`RenderedFetchStrategy::fetch`] launches its own instance and
//! quits it before returning, whether scraping succeeded or not.

use super::{Extraction, HeadlineSource, SkipReason, collect_records};
use crate::config::RenderedConfig;
use crate::error::AcquisitionError;
use crate::models::HeadlineRecord;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Starts browser instances.
pub trait BrowserLauncher {
    type Session: BrowserSession;

    /// Launch a fresh headless instance.
    async fn launch(&self) -> Result<Self::Session, AcquisitionError>;
}

/// One live browser instance, owned by a single acquisition call.
pub trait BrowserSession {
    type Item: RenderedItem;

    async fn navigate(&mut self, url: &Url) -> Result<(), AcquisitionError>;

    /// All elements on the current page matching `selector`.
    async fn query_all(&self, selector: &str) -> Result<Vec<Self::Item>, AcquisitionError>;

    /// Shut the instance down and release its resources.
    async fn quit(self) -> Result<(), AcquisitionError>;
}

/// A matched element on a rendered page.
pub trait RenderedItem {
    /// Text of the first descendant matching `selector`.
    async fn child_text(&self, selector: &str) -> Result<Option<String>, AcquisitionError>;

    /// Attribute `name` of the first descendant matching `selector`.
    async fn child_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, AcquisitionError>;
}

/// Scrapes headlines after letting client-side script populate the page.
#[derive(Debug)]
pub struct RenderedFetchStrategy<L> {
    launcher: L,
    config: RenderedConfig,
}

impl<L: BrowserLauncher> RenderedFetchStrategy<L> {
    pub fn new(launcher: L, config: RenderedConfig) -> Self {
        Self { launcher, config }
    }

    async fn scrape(
        &self,
        session: &mut L::Session,
        target: &Url,
    ) -> Result<Vec<HeadlineRecord>, AcquisitionError> {
        let nav_secs = self.config.navigation_timeout_secs;
        timeout(Duration::from_secs(nav_secs), session.navigate(target))
            .await
            .map_err(|_| AcquisitionError::Timeout {
                url: target.to_string(),
                secs: nav_secs,
            })??;

        // Fixed settle interval; the listing is filled in asynchronously after load.
        debug!(settle_secs = self.config.settle_secs, "Waiting for page to settle");
        sleep(Duration::from_secs(self.config.settle_secs)).await;

        let items = session.query_all(&self.config.item_selector).await?;
        if items.is_empty() {
            return Err(AcquisitionError::NoHeadlineContainers {
                selector: self.config.item_selector.clone(),
                url: target.to_string(),
            });
        }
        debug!(matched = items.len(), "Matched headline containers");

        let mut extractions = Vec::with_capacity(items.len());
        for item in &items {
            extractions.push(self.extract_item(item, target).await);
        }

        Ok(collect_records(self.name(), extractions))
    }

    async fn extract_item(&self, item: &<L::Session as BrowserSession>::Item, base: &Url) -> Extraction {
        let title = match item.child_text(&self.config.heading_selector).await {
            Ok(title) => title,
            Err(e) => return Extraction::Skipped(SkipReason::LookupFailed(e.to_string())),
        };
        let href = match item
            .child_attribute(&self.config.link_selector, &self.config.link_attribute)
            .await
        {
            Ok(href) => href,
            Err(e) => return Extraction::Skipped(SkipReason::LookupFailed(e.to_string())),
        };
        Extraction::from_parts(base, title.as_deref(), href.as_deref())
    }
}

impl<L: BrowserLauncher> HeadlineSource for RenderedFetchStrategy<L> {
    fn name(&self) -> &'static str {
        "rendered"
    }

    #[instrument(level = "info", skip_all, fields(url = %target))]
    async fn fetch(&self, target: &Url) -> Result<Vec<HeadlineRecord>, AcquisitionError> {
        let mut session = self.launcher.launch().await?;
        debug!("Browser launched");

        let outcome = self.scrape(&mut session, target).await;

        if let Err(e) = session.quit().await {
            warn!(error = %e, "Failed to release browser; keeping scrape outcome");
        } else {
            debug!("Browser released");
        }

        if let Ok(records) = &outcome {
            info!(count = records.len(), source = %target, "Indexed rendered headlines");
        }
        outcome
    }
}
