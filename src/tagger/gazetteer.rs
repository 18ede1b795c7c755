//! Dictionary-driven entity tagger.
//!
//! A gazetteer is a YAML map from label to surface forms:
//!
//! ```yaml
//! PERSON: [Imran Khan, Shehbaz Sharif]
//! GPE: [Pakistan, Karachi]
//! ORG: [IMF, PTI]
//! ```
//!
//! All surface forms are compiled into one case-sensitive regex. Longer forms
//! are tried first, so "Imran Khan" wins over a bare "Khan", and a form only
//! matches on word boundaries where it starts or ends with a word character.
//!
//! The process-wide instance is built on first use by [`GazetteerTagger::shared`]
//! and never changes afterwards.

use super::EntityTagger;
use crate::error::TaggerError;
use crate::models::TaggedSpan;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Gazetteer compiled into the binary, used when no path is configured.
pub const DEFAULT_GAZETTEER: &str = include_str!("../../assets/gazetteer.yaml");

static SHARED: OnceCell<GazetteerTagger> = OnceCell::new();

/// Tags text by matching it against a fixed list of known entities.
#[derive(Debug)]
pub struct GazetteerTagger {
    pattern: Option<Regex>,
    labels: HashMap<String, String>,
}

impl GazetteerTagger {
    /// Compile a gazetteer from its YAML source.
    pub fn from_yaml(yaml: &str) -> Result<Self, TaggerError> {
        let entries: BTreeMap<String, Vec<String>> = serde_yaml::from_str(yaml)?;

        let mut labels: HashMap<String, String> = HashMap::new();
        for (label, forms) in entries {
            for form in forms {
                let form = form.trim().to_string();
                if form.is_empty() {
                    continue;
                }
                if let Some(previous) = labels.get(&form) {
                    warn!(%form, %previous, %label, "Surface form listed twice; keeping first label");
                    continue;
                }
                labels.insert(form, label.clone());
            }
        }

        let mut forms: Vec<&str> = labels.keys().map(String::as_str).collect();
        forms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));

        let pattern = if forms.is_empty() {
            None
        } else {
            let alternation = forms
                .iter()
                .map(|form| bounded(form))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation)?)
        };

        debug!(forms = labels.len(), "Compiled gazetteer");
        Ok(Self { pattern, labels })
    }

    /// Load a gazetteer file from disk.
    pub fn from_path(path: &Path) -> Result<Self, TaggerError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// The process-wide tagger, built on first call.
    ///
    /// `path` is only consulted by the first successful call; later calls get
    /// the already-built instance.
    #[instrument(level = "info")]
    pub fn shared(path: Option<&Path>) -> Result<&'static GazetteerTagger, TaggerError> {
        SHARED.get_or_try_init(|| {
            let tagger = match path {
                Some(path) => Self::from_path(path)?,
                None => Self::from_yaml(DEFAULT_GAZETTEER)?,
            };
            info!(forms = tagger.len(), custom = path.is_some(), "Initialized gazetteer tagger");
            Ok(tagger)
        })
    }

    /// Number of distinct surface forms.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Synchronous core of [`EntityTagger::tag`].
    pub fn find(&self, text: &str) -> Vec<TaggedSpan> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        pattern
            .find_iter(text)
            .filter_map(|m| {
                self.labels.get(m.as_str()).map(|label| TaggedSpan {
                    text: m.as_str().to_string(),
                    label: label.clone(),
                })
            })
            .collect()
    }
}

impl EntityTagger for GazetteerTagger {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, TaggerError> {
        Ok(self.find(text))
    }
}

/// Escape `form` and add `\b` on each side that starts or ends with a word character.
fn bounded(form: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let lead = if form.chars().next().is_some_and(is_word) { r"\b" } else { "" };
    let trail = if form.chars().last().is_some_and(is_word) { r"\b" } else { "" };
    format!("{lead}{}{trail}", regex::escape(form))
}
