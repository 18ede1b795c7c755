//! Named-entity tagging capability.
//!
//! The pipeline treats the tagger as a black box: text in, labeled spans out.
//! Labels follow the spaCy/OntoNotes scheme (`PERSON`, `GPE`, `LOC`, `ORG`,
//! `PRODUCT`, `EVENT`, ...); mapping them onto buckets happens in
//! [`crate::aggregate`].
//!
//! - [`gazetteer`]: dictionary tagger, the default
//! - `llm`: OpenAI-compatible model via `awful_aj` (feature `llm`)

pub mod gazetteer;
#[cfg(feature = "llm")]
pub mod llm;

use crate::error::TaggerError;
use crate::models::TaggedSpan;

pub use gazetteer::GazetteerTagger;

/// Finds entity spans in free text.
pub trait EntityTagger {
    /// Tag `text`, returning spans in the order they occur.
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, TaggerError>;
}

impl<T: EntityTagger + ?Sized> EntityTagger for &T {
    async fn tag(&self, text: &str) -> Result<Vec<TaggedSpan>, TaggerError> {
        (**self).tag(text).await
    }
}
