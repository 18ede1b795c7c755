//! Data models for scraped headlines and their entity aggregates.
//!
//! - [`HeadlineRecord`]: one scraped article (title + absolute URL)
//! - [`EntityCategory`] / [`TaggedSpan`]: tagger output and its bucket mapping
//! - [`FrequencyTable`] / [`EntityBuckets`]: per-category occurrence counts
//! - [`RunReport`]: everything a finished run hands to the presentation layer

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One headline discovered during a single acquisition pass.
///
/// Two records are duplicates when both `title` and `url` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeadlineRecord {
    /// Trimmed, non-empty headline text.
    pub title: String,
    /// Absolute article URL.
    pub url: String,
}

/// A labeled substring as returned by an entity tagger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedSpan {
    /// The surface text exactly as the tagger emitted it.
    pub text: String,
    /// The tagger's native label (`PERSON`, `GPE`, `ORG`, ...).
    pub label: String,
}

/// Semantic bucket a tagger label falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    Person,
    Place,
    OrgLike,
    Other,
}

impl EntityCategory {
    /// Map a native tagger label onto a bucket.
    ///
    /// `PERSON` goes to names, `GPE`/`LOC` to places, and
    /// `ORG`/`PRODUCT`/`EVENT` to things. Anything else is [`EntityCategory::Other`].
    pub fn from_label(label: &str) -> Self {
        match label {
            "PERSON" => Self::Person,
            "GPE" | "LOC" => Self::Place,
            "ORG" | "PRODUCT" | "EVENT" => Self::OrgLike,
            _ => Self::Other,
        }
    }
}

/// Surface text to occurrence count for one entity category.
///
/// Keys are case-sensitive; "New York" and "new york" are distinct entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    counts: BTreeMap<String, usize>,
}

impl FrequencyTable {
    /// Count one more occurrence of `text`.
    pub fn record(&mut self, text: &str) {
        *self.counts.entry(text.to_string()).or_insert(0) += 1;
    }

    /// Number of distinct surface texts.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. the number of spans observed.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// The `n` most frequent entries, highest count first.
    ///
    /// Equal counts are ordered by surface text so the ranking is stable.
    pub fn most_common(&self, n: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .counts
            .iter()
            .map(|(text, count)| (text.as_str(), *count))
            .collect();
        // BTreeMap iteration is already key-ordered, so a stable sort on count keeps ties alphabetical.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// The three frequency tables produced by one aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBuckets {
    /// People (`PERSON`).
    pub names: FrequencyTable,
    /// Geopolitical entities and locations (`GPE`, `LOC`).
    pub places: FrequencyTable,
    /// Organizations, products, and events (`ORG`, `PRODUCT`, `EVENT`).
    pub things: FrequencyTable,
}

impl EntityBuckets {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.places.is_empty() && self.things.is_empty()
    }

    /// Buckets paired with their display labels, in presentation order.
    pub fn labeled(&self) -> [(&'static str, &FrequencyTable); 3] {
        [
            ("names", &self.names),
            ("places", &self.places),
            ("things", &self.things),
        ]
    }
}

/// The result of a successful pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// The page the headlines were scraped from.
    pub target_url: String,
    /// Which acquisition strategy produced the headlines ("static" or "rendered").
    pub strategy: String,
    /// RFC 3339 UTC timestamp of when acquisition completed.
    pub acquired_at: String,
    /// Headlines in document order.
    pub headlines: Vec<HeadlineRecord>,
    /// Per-category entity frequencies.
    pub entities: EntityBuckets,
}
