//! Entity aggregation over a batch of headlines.
//!
//! All titles are joined into one blob and tagged with a single call, then the
//! spans are counted into three buckets:
//!
//! | Bucket | Labels |
//! |--------|--------|
//! | names  | `PERSON` |
//! | places | `GPE`, `LOC` |
//! | things | `ORG`, `PRODUCT`, `EVENT` |
//!
//! Surface text is counted exactly as tagged; there is no casing merge,
//! stemming, or entity linking.

use crate::error::TaggerError;
use crate::models::{EntityBuckets, EntityCategory, HeadlineRecord, TaggedSpan};
use crate::tagger::EntityTagger;
use crate::utils::truncate_for_log;
use tracing::{debug, info, instrument};

/// Joins non-empty titles with single spaces.
pub fn title_blob(records: &[HeadlineRecord]) -> String {
    records
        .iter()
        .map(|r| r.title.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sort tagged spans into frequency buckets, dropping unmapped labels.
pub fn bucket_spans<I>(spans: I) -> EntityBuckets
where
    I: IntoIterator<Item = TaggedSpan>,
{
    let mut buckets = EntityBuckets::default();
    for span in spans {
        match EntityCategory::from_label(&span.label) {
            EntityCategory::Person => buckets.names.record(&span.text),
            EntityCategory::Place => buckets.places.record(&span.text),
            EntityCategory::OrgLike => buckets.things.record(&span.text),
            EntityCategory::Other => {}
        }
    }
    buckets
}

/// Counts entities across headline titles using one tagger call per batch.
#[derive(Debug)]
pub struct Aggregator<T> {
    tagger: T,
}

impl<T: EntityTagger> Aggregator<T> {
    pub fn new(tagger: T) -> Self {
        Self { tagger }
    }

    /// Tag all titles at once and bucket the resulting spans.
    ///
    /// An empty batch, or one whose titles are all blank, yields empty buckets
    /// without calling the tagger.
    #[instrument(level = "info", skip_all, fields(records = records.len()))]
    pub async fn aggregate(&self, records: &[HeadlineRecord]) -> Result<EntityBuckets, TaggerError> {
        let blob = title_blob(records);
        if blob.is_empty() {
            debug!("No title text to tag");
            return Ok(EntityBuckets::default());
        }
        debug!(blob = %truncate_for_log(&blob, 200), "Tagging title blob");

        let spans = self.tagger.tag(&blob).await?;
        let span_count = spans.len();
        let buckets = bucket_spans(spans);

        info!(
            spans = span_count,
            names = buckets.names.total(),
            places = buckets.places.total(),
            things = buckets.things.total(),
            "Aggregated entities"
        );
        Ok(buckets)
    }
}
