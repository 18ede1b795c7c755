//! Headline acquisition strategies.
//!
//! Both strategies fulfil the same contract, [`HeadlineSource::fetch`]: given a
//! target page, return its headlines in document order with duplicates removed.
//!
//! | Strategy | Module | Method | Notes |
//! |----------|--------|--------|-------|
//! | Static | [`static_html`] | HTTP GET + HTML parse | Fast; needs server-rendered markup |
//! | Rendered | [`rendered`] | Headless Chromium + DOM query | For script-populated listings |
//!
//! Which one runs is the operator's choice via [`AcquisitionStrategy`]; nothing
//! here inspects the page to decide.
//!
//! Each discovered element yields an [`Extraction`]. Skipped elements are
//! logged and dropped; only page-level failures become an
//! [`AcquisitionError`](crate::error::AcquisitionError).

pub mod chromium;
pub mod rendered;
pub mod static_html;

use crate::error::AcquisitionError;
use crate::models::HeadlineRecord;
use itertools::Itertools;
use std::fmt;
use tracing::debug;
use url::Url;

pub use chromium::ChromiumLauncher;
pub use rendered::RenderedFetchStrategy;
pub use static_html::StaticFetchStrategy;

/// Anything that can turn a target page into headline records.
pub trait HeadlineSource {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Fetch the headlines on `target`, in document order, without duplicates.
    async fn fetch(&self, target: &Url) -> Result<Vec<HeadlineRecord>, AcquisitionError>;
}

/// Operator-selected acquisition strategy.
#[derive(Debug)]
pub enum AcquisitionStrategy {
    Static(StaticFetchStrategy),
    Rendered(RenderedFetchStrategy<ChromiumLauncher>),
}

impl HeadlineSource for AcquisitionStrategy {
    fn name(&self) -> &'static str {
        match self {
            Self::Static(s) => s.name(),
            Self::Rendered(r) => r.name(),
        }
    }

    async fn fetch(&self, target: &Url) -> Result<Vec<HeadlineRecord>, AcquisitionError> {
        match self {
            Self::Static(s) => s.fetch(target).await,
            Self::Rendered(r) => r.fetch(target).await,
        }
    }
}

/// Why a single headline element produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingTitle,
    MissingLink,
    UnsupportedScheme(String),
    UnresolvableUrl(String),
    LookupFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTitle => write!(f, "missing title"),
            Self::MissingLink => write!(f, "missing link"),
            Self::UnsupportedScheme(href) => write!(f, "unsupported link scheme: {href}"),
            Self::UnresolvableUrl(href) => write!(f, "unresolvable link: {href}"),
            Self::LookupFailed(reason) => write!(f, "lookup failed: {reason}"),
        }
    }
}

/// Outcome of extracting one headline element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Record(HeadlineRecord),
    Skipped(SkipReason),
}

impl Extraction {
    /// Build an extraction from the raw title text and href of one element.
    ///
    /// Whitespace-only titles count as missing.
    pub fn from_parts(base: &Url, title: Option<&str>, href: Option<&str>) -> Self {
        let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => t,
            None => return Self::Skipped(SkipReason::MissingTitle),
        };
        let href = match href.map(str::trim).filter(|h| !h.is_empty()) {
            Some(h) => h,
            None => return Self::Skipped(SkipReason::MissingLink),
        };
        match resolve_url(base, href) {
            Ok(url) => Self::Record(HeadlineRecord {
                title: title.to_string(),
                url,
            }),
            Err(reason) => Self::Skipped(reason),
        }
    }
}

/// Resolve an href found on `base` into an absolute http(s) URL.
///
/// Absolute http(s) links written with `://` are returned unchanged; ones the
/// URL parser only accepts leniently (`https:foo`) come back in canonical
/// form. Root-relative links
/// (`/a/b`) resolve against the origin of `base`; other relative forms
/// resolve against `base` itself.
pub fn resolve_url(base: &Url, href: &str) -> Result<String, SkipReason> {
    match Url::parse(href) {
        Ok(absolute) => match absolute.scheme() {
            "http" | "https" if href.contains("://") => Ok(href.to_string()),
            "http" | "https" => Ok(absolute.to_string()),
            _ => Err(SkipReason::UnsupportedScheme(href.to_string())),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .join(href)
            .map(|u| u.to_string())
            .map_err(|_| SkipReason::UnresolvableUrl(href.to_string())),
        Err(_) => Err(SkipReason::UnresolvableUrl(href.to_string())),
    }
}

/// Fold per-element extractions into the final record sequence.
///
/// Skips are logged at debug level; document order is kept and only the
/// first occurrence of a duplicate survives.
pub fn collect_records<I>(source: &str, extractions: I) -> Vec<HeadlineRecord>
where
    I: IntoIterator<Item = Extraction>,
{
    let mut skipped = 0usize;
    let records: Vec<HeadlineRecord> = extractions
        .into_iter()
        .enumerate()
        .filter_map(|(index, extraction)| match extraction {
            Extraction::Record(record) => Some(record),
            Extraction::Skipped(reason) => {
                skipped += 1;
                debug!(source, index, %reason, "Skipped headline element");
                None
            }
        })
        .unique()
        .collect();

    debug!(source, kept = records.len(), skipped, "Collected headline records");
    records
}
