//! Static fetch-and-parse headline scraper.
//!
//! Issues one GET against the index page and reads headlines straight out of
//! the server-rendered markup. Each headline is a heading element carrying a
//! marker attribute (`h2[data-vr-headline]` on Geo News) nested inside the
//! `<a>` that links to the article:
//!
//! ```html
//! <a href="/latest/612345-rain-lashes-karachi">
//!   <h2 data-vr-headline>Rain lashes Karachi</h2>
//! </a>
//! ```

use super::{Extraction, HeadlineSource, collect_records};
use crate::config::PipelineConfig;
use crate::error::AcquisitionError;
use crate::models::HeadlineRecord;
use reqwest::Client;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Scrapes headlines from server-rendered HTML.
#[derive(Debug, Clone)]
pub struct StaticFetchStrategy {
    client: Client,
    headline_selector: Selector,
    selector_source: String,
}

impl StaticFetchStrategy {
    /// Build the strategy from pipeline settings.
    ///
    /// Fails when the configured headline selector does not parse or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &PipelineConfig) -> Result<Self, AcquisitionError> {
        let selector_source = config.static_html.headline_selector.clone();
        let headline_selector = parse_selector(&selector_source)?;
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            headline_selector,
            selector_source,
        })
    }

    /// Pull headline records out of an already-fetched document.
    ///
    /// `base` is the page URL, used to resolve relative links.
    pub fn extract(&self, base: &Url, html: &str) -> Result<Vec<HeadlineRecord>, AcquisitionError> {
        let document = Html::parse_document(html);
        let headings: Vec<ElementRef> = document.select(&self.headline_selector).collect();

        if headings.is_empty() {
            return Err(AcquisitionError::NoHeadlineContainers {
                selector: self.selector_source.clone(),
                url: base.to_string(),
            });
        }
        debug!(matched = headings.len(), "Matched headline elements");

        let extractions = headings.into_iter().map(|heading| {
            let title = heading_text(heading);
            let href = enclosing_link(heading).and_then(|a| a.value().attr("href"));
            Extraction::from_parts(base, Some(&title), href)
        });

        Ok(collect_records(self.name(), extractions))
    }
}

impl HeadlineSource for StaticFetchStrategy {
    fn name(&self) -> &'static str {
        "static"
    }

    #[instrument(level = "info", skip_all, fields(url = %target))]
    async fn fetch(&self, target: &Url) -> Result<Vec<HeadlineRecord>, AcquisitionError> {
        let response = self.client.get(target.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Status {
                url: target.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await?;
        debug!(bytes = html.len(), "Fetched index page");

        let records = self.extract(target, &html)?;
        info!(count = records.len(), source = %target, "Indexed headlines");
        Ok(records)
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, AcquisitionError> {
    Selector::parse(selector).map_err(|e| AcquisitionError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Full text of `element` with whitespace runs collapsed to single spaces.
///
/// Inline markup does not introduce spaces: `Karachi<span>'s</span>` reads
/// as `Karachi's`, as a browser's `innerText` would.
fn heading_text(element: ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

/// Nearest `<a>` ancestor of `element`.
fn enclosing_link(element: ElementRef) -> Option<ElementRef> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "a")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FIXTURE: &str = r#"
<html><body>
  <ul>
    <li><a href="/latest/1-rain"><div><h2 data-vr-headline>Rain lashes <b>Karachi</b></h2></div></a></li>
    <li><a><h2 data-vr-headline>Headline without href</h2></a></li>
    <li><a href="https://www.thenews.com.pk/story/2"><h2 data-vr-headline> IMF talks resume </h2></a></li>
    <li><h2 data-vr-headline>Headline without link ancestor</h2></li>
    <li><a href="/latest/3-empty"><h2 data-vr-headline>   </h2></a></li>
    <li><a href="/latest/1-rain"><h2 data-vr-headline>Rain lashes Karachi</h2></a></li>
    <li><a href="/latest/4-cricket"><h2>Unmarked heading is ignored</h2></a></li>
    <li><a href="/latest/5-senate"><h2 data-vr-headline>Senate passes budget</h2></a></li>
  </ul>
</body></html>
"#;

    fn strategy() -> StaticFetchStrategy {
        StaticFetchStrategy::new(&PipelineConfig::default()).unwrap()
    }

    fn base() -> Url {
        Url::parse("https://www.geo.tv/latest-news").unwrap()
    }

    #[test]
    fn test_extract_keeps_well_formed_in_order() {
        let records = strategy().extract(&base(), FIXTURE).unwrap();

        let pairs: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.title.as_str(), r.url.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("Rain lashes Karachi", "https://www.geo.tv/latest/1-rain"),
                ("IMF talks resume", "https://www.thenews.com.pk/story/2"),
                ("Senate passes budget", "https://www.geo.tv/latest/5-senate"),
            ]
        );
    }

    #[test]
    fn test_extract_inline_markup_keeps_words_intact() {
        let html = r#"
<a href="/latest/6-mayor">
  <h2 data-vr-headline>
    Karachi<span>'s</span> mayor meets <b>PM</b>, says <i>IMF</i>-backed
    plan
  </h2>
</a>
"#;
        let records = strategy().extract(&base(), html).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Karachi's mayor meets PM, says IMF-backed plan");
    }

    #[test]
    fn test_extract_dedupes_identical_pairs() {
        let html = r#"
<a href="/x"><h2 data-vr-headline>Same story</h2></a>
<a href="/x"><h2 data-vr-headline>Same story</h2></a>
"#;
        let records = strategy().extract(&base(), html).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://www.geo.tv/x");
    }

    #[test]
    fn test_extract_all_malformed_is_empty_not_error() {
        let html = r#"<h2 data-vr-headline>No link</h2><a><h2 data-vr-headline>No href</h2></a>"#;
        let records = strategy().extract(&base(), html).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_extract_without_containers_fails() {
        let err = strategy()
            .extract(&base(), "<html><body><p>maintenance</p></body></html>")
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::NoHeadlineContainers { .. }));
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let mut config = PipelineConfig::default();
        config.static_html.headline_selector = "h2[[".to_string();
        let err = StaticFetchStrategy::new(&config).unwrap_err();
        assert!(matches!(err, AcquisitionError::InvalidSelector { .. }));
    }

    #[tokio::test]
    async fn test_fetch_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/latest-news"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FIXTURE))
            .mount(&server)
            .await;

        let target = Url::parse(&format!("{}/latest-news", server.uri())).unwrap();
        let records = strategy().fetch(&target).await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].url, format!("{}/latest/1-rain", server.uri()));
        assert_eq!(records[1].url, "https://www.thenews.com.pk/story/2");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let target = Url::parse(&format!("{}/latest-news", server.uri())).unwrap();
        let err = strategy().fetch(&target).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_fails() {
        // Nothing listens on port 9 of localhost
        let target = Url::parse("http://127.0.0.1:9/latest-news").unwrap();
        let err = strategy().fetch(&target).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::Http(_)));
    }
}
