//! Pipeline configuration loaded from an optional YAML file.
//!
//! Every field has a default, so an empty or partial file is valid. The
//! defaults target the Geo News "latest news" listing.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Top-level pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Index page to scrape headlines from.
    pub target_url: String,
    /// User agent sent by the static strategy.
    pub user_agent: String,
    /// Whole-request timeout for the static strategy.
    pub request_timeout_secs: u64,
    /// Number of ranked entries shown per bucket.
    pub top_n: usize,
    /// Gazetteer YAML to use instead of the embedded one.
    pub gazetteer_path: Option<PathBuf>,
    pub static_html: StaticConfig,
    pub rendered: RenderedConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_url: "https://www.geo.tv/latest-news".to_string(),
            user_agent: concat!("headline_entities/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
            top_n: 10,
            gazetteer_path: None,
            static_html: StaticConfig::default(),
            rendered: RenderedConfig::default(),
        }
    }
}

/// Selectors for the static fetch-and-parse strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Heading elements carrying the site's headline marker attribute.
    pub headline_selector: String,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            headline_selector: "h2[data-vr-headline]".to_string(),
        }
    }
}

/// Selectors and timing for the headless-browser strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderedConfig {
    /// List items wrapping one headline each.
    pub item_selector: String,
    /// Heading inside an item holding the title.
    pub heading_selector: String,
    /// Hyperlink inside an item holding the URL.
    pub link_selector: String,
    /// Attribute of the hyperlink to read.
    pub link_attribute: String,
    /// Fixed wait after navigation before querying the DOM.
    pub settle_secs: u64,
    /// Upper bound on the navigation itself.
    pub navigation_timeout_secs: u64,
    /// Browser binary; auto-detected when unset.
    pub chrome_executable: Option<PathBuf>,
}

impl Default for RenderedConfig {
    fn default() -> Self {
        Self {
            item_selector: "li.border-box".to_string(),
            heading_selector: "h2".to_string(),
            link_selector: "a".to_string(),
            link_attribute: "href".to_string(),
            settle_secs: 5,
            navigation_timeout_secs: 30,
            chrome_executable: None,
        }
    }
}

/// Parse a YAML document into a [`PipelineConfig`].
pub fn parse_config(yaml: &str) -> Result<PipelineConfig, serde_yaml::Error> {
    if yaml.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }
    serde_yaml::from_str(yaml)
}

/// Load the configuration file at `path`, or the defaults when no path is given.
#[instrument(level = "info")]
pub async fn load_config(path: Option<&str>) -> Result<PipelineConfig, Box<dyn Error>> {
    let Some(path) = path else {
        info!("No config file given; using defaults");
        return Ok(PipelineConfig::default());
    };

    let yaml = fs::read_to_string(path).await?;
    let config = parse_config(&yaml)?;
    info!(path, target_url = %config.target_url, "Loaded configuration");
    Ok(config)
}
