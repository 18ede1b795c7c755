//! Error types for acquisition and entity tagging.
//!
//! Only page-level failures surface as [`AcquisitionError`]. A single malformed
//! headline element is never an error; see [`crate::scrapers::SkipReason`].

use thiserror::Error;

/// A run-level failure to obtain headlines from the target page.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Transport failure: DNS, connect, TLS, or the request timeout.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The index page answered with a non-2xx status.
    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },

    /// A configured CSS selector does not parse.
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// Not a single headline container on the page; treated as a total parse failure.
    #[error("no element matching `{selector}` found on {url}")]
    NoHeadlineContainers { selector: String, url: String },

    /// Chromium could not be found or started.
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Navigation exceeded `rendered.navigation_timeout_secs`.
    #[error("timed out after {secs}s waiting for {url}")]
    Timeout { url: String, secs: u64 },

    /// A DOM query against the rendered page failed.
    #[error("browser query failed: {0}")]
    Query(String),

    /// Closing the browser failed. Logged only; never returned from a fetch.
    #[error("browser release failed: {0}")]
    Release(String),
}

/// A failure inside the entity tagger capability.
#[derive(Error, Debug)]
pub enum TaggerError {
    #[error("failed to read gazetteer: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed gazetteer: {0}")]
    Gazetteer(#[from] serde_yaml::Error),

    #[error("failed to compile gazetteer pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The model endpoint could not be reached, or its config/template failed to load.
    #[error("tagger request failed: {0}")]
    Request(String),

    #[cfg(feature = "llm")]
    #[error("tagger returned an unusable response: {0}")]
    Response(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_messages_name_the_page() {
        let err = AcquisitionError::Status {
            url: "https://www.geo.tv/latest-news".to_string(),
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "https://www.geo.tv/latest-news answered with HTTP status 503"
        );

        let err = AcquisitionError::Timeout {
            url: "https://www.geo.tv/latest-news".to_string(),
            secs: 30,
        };
        assert_eq!(
            err.to_string(),
            "timed out after 30s waiting for https://www.geo.tv/latest-news"
        );
    }

    #[test]
    fn test_gazetteer_errors_convert() {
        let yaml_err = serde_yaml::from_str::<Vec<String>>("PERSON: 12").unwrap_err();
        let err: TaggerError = yaml_err.into();
        assert!(matches!(err, TaggerError::Gazetteer(_)));
        assert!(err.to_string().starts_with("malformed gazetteer"));
    }

    #[cfg(feature = "llm")]
    #[test]
    fn test_unusable_response_message() {
        let err = TaggerError::Response("EOF while parsing".to_string());
        assert_eq!(
            err.to_string(),
            "tagger returned an unusable response: EOF while parsing"
        );
    }
}
