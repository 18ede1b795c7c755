//! LLM-backed entity tagger with exponential backoff.
//!
//! Sends the headline blob to an OpenAI-compatible endpoint through `awful_aj`
//! and expects a JSON body of the form:
//!
//! ```json
//! {"entities": [{"text": "Imran Khan", "label": "PERSON"}]}
//! ```
//!
//! # Architecture
//!
//! - [`AskAsync`]: one text-in, text-out model call
//! - [`AskFnWrapper`]: binds `awful_aj::api::ask` to a config and template
//! - [`RetryAsk`]: retries any [`AskAsync`] with backoff
//! - [`LlmTagger`]: the [`EntityTagger`] built from the pieces above
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second, capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay
//!
//! A response that fails to parse because it was cut short is re-asked once.

use super::EntityTagger;
use crate::error::TaggerError;
use crate::models::TaggedSpan;
use crate::utils::truncate_for_log;
use awful_aj::api::ask;
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{Rng, rng};
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Async text-in, text-out model call.
///
/// The tagger only ever sends the full headline blob, so one method is enough.
/// Wrappers such as [`RetryAsk`] implement it too and can be stacked.
pub trait AskAsync {
    /// What a successful call yields; the raw completion text for real models.
    type Response;

    /// Send `text` as the user message.
    ///
    /// # Arguments
    ///
    /// * `text` - Headline blob to tag
    ///
    /// # Returns
    ///
    /// The model's reply, or the transport/API error of this single attempt.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Retries an [`AskAsync`] with exponential backoff and jitter.
///
/// Only transport and API failures are retried. A reply that arrives but does
/// not parse is handled by [`LlmTagger`], not here.
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// Model call being retried.
    inner: T,
    /// Retries allowed after the first attempt.
    max_retries: usize,
    /// Delay before the first retry.
    base_delay: StdDuration,
    /// Upper bound on a single delay, before jitter.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Wrap `inner`, capping each delay at 30 seconds.
    ///
    /// # Arguments
    ///
    /// * `inner` - Model call to retry
    /// * `max_retries` - Retries after the first attempt; `0` disables retrying
    /// * `base_delay` - Delay before the first retry, doubled for each later one
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    /// Delay before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: usize) -> StdDuration {
        let exponent = attempt.saturating_sub(1).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let e = match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => e,
            };
            attempt += 1;
            let total_dt = total_t0.elapsed();

            if attempt > self.max_retries {
                error!(
                    attempt,
                    max = self.max_retries,
                    elapsed_ms_total = total_dt.as_millis(),
                    error = %e,
                    "Tagger request exhausted retries"
                );
                return Err(e);
            }

            let jitter_ms: u64 = rng().random_range(0..=250);
            let delay = self.backoff(attempt) + StdDuration::from_millis(jitter_ms);
            warn!(
                attempt,
                max = self.max_retries,
                elapsed_ms_total = total_dt.as_millis(),
                ?delay,
                error = %e,
                "Tagger request failed; backing off"
            );
            sleep(delay).await;
        }
    }
}

/// Binds `awful_aj::api::ask` to one loaded config and chat template.
///
/// # Lifetime Parameters
///
/// * `'a` - Borrow of the [`LlmTagger`] that owns the config and template
pub struct AskFnWrapper<'a> {
    /// Endpoint, model, and API key settings.
    pub config: &'a AwfulJadeConfig,
    /// System prompt and response format for entity extraction.
    pub template: &'a ChatTemplate,
}

impl AskAsync for AskFnWrapper<'_> {
    type Response = String;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis(), error = %e, "Model call failed");
        }
        res
    }
}

#[derive(Debug, Deserialize)]
struct TaggerResponse {
    entities: Vec<TaggedSpan>,
}

/// Entity tagger delegating to a chat model.
///
/// The template must instruct the model to answer with the `{"entities": [...]}`
/// shape shown in the module docs; labels are passed through unchanged and
/// bucketed like any other tagger's.
pub struct LlmTagger {
    /// Loaded `awful_aj` configuration.
    config: AwfulJadeConfig,
    /// Chat template asking for entity JSON.
    template: ChatTemplate,
}

impl LlmTagger {
    /// Load the model configuration file and the named chat template.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Path to an `awful_aj` `config.yaml`
    /// * `template_name` - Template looked up in the `awful_aj` templates directory
    #[instrument(level = "info")]
    pub async fn load(config_path: &str, template_name: &str) -> Result<Self, TaggerError> {
        let config = awful_aj::config::load_config(config_path)
            .map_err(|e| TaggerError::Request(format!("loading {config_path}: {e}")))?;
        let template = awful_aj::template::load_template(template_name)
            .await
            .map_err(|e| TaggerError::Request(format!("loading template {template_name}: {e}")))?;
        info!(config_path, template_name, "Loaded LLM tagger");
        Ok(Self { config, template })
    }

    async fn ask_with_backoff(&self, text: &str) -> Result<String, TaggerError> {
        let client = AskFnWrapper {
            config: &self.config,
            template: &self.template,
        };
        RetryAsk::new(client, 5, StdDuration::from_secs(1))
            .ask(text)
            .await
            .map_err(|e| TaggerError::Request(e.to_string()))
    }
}

impl EntityTagger for LlmTagger {
    #[instrument(level = "info", skip_all, fields(chars = text.len()))]
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, TaggerError> {
        let mut response = self.ask_with_backoff(text).await?;
        let mut parsed = parse_response(&response);

        if let Err(e) = &parsed {
            if looks_truncated(e) {
                warn!(error = %e, "EOF while parsing; re-asking once");
                response = self.ask_with_backoff(text).await?;
                parsed = parse_response(&response);
            }
        }

        parsed.map(|r| r.entities).map_err(|e| {
            warn!(
                error = %e,
                response_preview = %truncate_for_log(&response, 300),
                "Model returned non-conforming JSON"
            );
            TaggerError::Response(e.to_string())
        })
    }
}

fn parse_response(body: &str) -> Result<TaggerResponse, serde_json::Error> {
    serde_json::from_str(body.trim())
}

/// Whether a parse error means the JSON was cut off mid-document.
pub fn looks_truncated(e: &serde_json::Error) -> bool {
    use serde_json::error::Category;
    matches!(e.classify(), Category::Eof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    impl AskAsync for Flaky {
        type Response = String;

        async fn ask(&self, _text: &str) -> Result<String, Box<dyn Error>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err("upstream 502".into())
            } else {
                Ok("ok".to_string())
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_failures() {
        let flaky = Flaky {
            failures: 2,
            calls: AtomicUsize::new(0),
        };
        let retry = RetryAsk::new(flaky, 5, StdDuration::from_secs(1));
        assert_eq!(retry.ask("x").await.unwrap(), "ok");
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let flaky = Flaky {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
        };
        let retry = RetryAsk::new(flaky, 2, StdDuration::from_secs(1));
        assert!(retry.ask("x").await.is_err());
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let retry = RetryAsk::new(
            Flaky {
                failures: 0,
                calls: AtomicUsize::new(0),
            },
            5,
            StdDuration::from_secs(1),
        );
        let delays: Vec<u64> = (1..=7).map(|a| retry.backoff(a).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30, 30]);
        assert_eq!(retry.backoff(200), StdDuration::from_secs(30));
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"entities":[{"text":"Imran Khan","label":"PERSON"},{"text":"Lahore","label":"GPE"}]}"#;
        let parsed = parse_response(body).unwrap();
        assert_eq!(parsed.entities.len(), 2);
        assert_eq!(parsed.entities[1].label, "GPE");
    }

    #[test]
    fn test_looks_truncated() {
        let err = parse_response(r#"{"entities":[{"text":"Imran"#).unwrap_err();
        assert!(looks_truncated(&err));
        let err = parse_response(r#"{"entities": 5}"#).unwrap_err();
        assert!(!looks_truncated(&err));
    }
}
