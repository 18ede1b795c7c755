//! Acquire-then-aggregate run controller.
//!
//! ```text
//! Idle -> Acquiring -> AcquisitionFailed
//!                   -> Acquired -> Aggregating -> Done
//!                                              -> AggregationFailed
//! ```
//!
//! A run never retries. Zero headlines is reported as an outcome, not an
//! error, and the tagger is not consulted in that case.

use crate::aggregate::Aggregator;
use crate::error::{AcquisitionError, TaggerError};
use crate::models::RunReport;
use crate::scrapers::HeadlineSource;
use crate::tagger::EntityTagger;
use chrono::{SecondsFormat, Utc};
use std::fmt;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Acquiring,
    AcquisitionFailed,
    Acquired,
    Aggregating,
    AggregationFailed,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::AcquisitionFailed => "acquisition_failed",
            Self::Acquired => "acquired",
            Self::Aggregating => "aggregating",
            Self::AggregationFailed => "aggregation_failed",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Terminal result of one run.
#[derive(Debug)]
pub enum RunOutcome {
    /// The strategy failed at page level.
    AcquisitionFailed(AcquisitionError),
    /// The strategy succeeded but found no usable headlines.
    NoHeadlines,
    /// Headlines were acquired but the tagger failed.
    AggregationFailed(TaggerError),
    Done(RunReport),
}

/// Runs one acquisition strategy followed by aggregation.
///
/// A controller is reusable: each [`PipelineController::run`] starts from
/// `Acquiring` regardless of how the previous run ended.
#[derive(Debug)]
pub struct PipelineController<S, T> {
    /// Operator-selected acquisition strategy.
    source: S,
    /// Batch tagger plus bucket counting.
    aggregator: Aggregator<T>,
    /// Last state entered; `Idle` until the first run.
    state: RunState,
}

impl<S, T> PipelineController<S, T>
where
    S: HeadlineSource,
    T: EntityTagger,
{
    pub fn new(source: S, tagger: T) -> Self {
        Self {
            source,
            aggregator: Aggregator::new(tagger),
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
    }

    /// Acquire headlines from `target` and aggregate their entities.
    #[instrument(level = "info", skip_all, fields(url = %target, strategy = self.source.name()))]
    pub async fn run(&mut self, target: &Url) -> RunOutcome {
        self.transition(RunState::Acquiring);

        let headlines = match self.source.fetch(target).await {
            Ok(headlines) if headlines.is_empty() => {
                warn!("Acquisition produced no headlines");
                self.transition(RunState::AcquisitionFailed);
                return RunOutcome::NoHeadlines;
            }
            Ok(headlines) => headlines,
            Err(e) => {
                warn!(error = %e, "Acquisition failed");
                self.transition(RunState::AcquisitionFailed);
                return RunOutcome::AcquisitionFailed(e);
            }
        };
        let acquired_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.transition(RunState::Acquired);
        info!(count = headlines.len(), "Acquired headlines");

        self.transition(RunState::Aggregating);
        let entities = match self.aggregator.aggregate(&headlines).await {
            Ok(entities) => entities,
            Err(e) => {
                warn!(error = %e, "Entity tagging failed");
                self.transition(RunState::AggregationFailed);
                return RunOutcome::AggregationFailed(e);
            }
        };

        self.transition(RunState::Done);
        RunOutcome::Done(RunReport {
            target_url: target.to_string(),
            strategy: self.source.name().to_string(),
            acquired_at,
            headlines,
            entities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FrequencyTable, HeadlineRecord, TaggedSpan};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn karachi_once() -> FrequencyTable {
        [("Karachi", 1)].into_iter().collect()
    }

    enum Canned {
        Records(Vec<HeadlineRecord>),
        Fail,
    }

    struct CannedSource(Canned);

    impl HeadlineSource for CannedSource {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn fetch(&self, target: &Url) -> Result<Vec<HeadlineRecord>, AcquisitionError> {
            match &self.0 {
                Canned::Records(records) => Ok(records.clone()),
                Canned::Fail => Err(AcquisitionError::Status {
                    url: target.to_string(),
                    status: 502,
                }),
            }
        }
    }

    #[derive(Default)]
    struct CountingTagger {
        calls: AtomicUsize,
        fail: bool,
    }

    impl EntityTagger for CountingTagger {
        async fn tag(&self, _text: &str) -> Result<Vec<TaggedSpan>, TaggerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TaggerError::Request("model offline".to_string()));
            }
            Ok(vec![TaggedSpan {
                text: "Karachi".to_string(),
                label: "GPE".to_string(),
            }])
        }
    }

    fn target() -> Url {
        Url::parse("https://www.geo.tv/latest-news").unwrap()
    }

    fn headlines() -> Vec<HeadlineRecord> {
        vec![HeadlineRecord {
            title: "Rain lashes Karachi".to_string(),
            url: "https://www.geo.tv/latest/1".to_string(),
        }]
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let controller =
            PipelineController::new(CannedSource(Canned::Fail), CountingTagger::default());
        assert_eq!(controller.state(), RunState::Idle);
    }

    #[tokio::test]
    async fn test_zero_records_short_circuits_without_tagging() {
        let tagger = CountingTagger::default();
        let mut controller =
            PipelineController::new(CannedSource(Canned::Records(vec![])), &tagger);

        let outcome = controller.run(&target()).await;

        assert!(matches!(outcome, RunOutcome::NoHeadlines));
        assert_eq!(controller.state(), RunState::AcquisitionFailed);
        assert_eq!(tagger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_acquisition_error_is_terminal() {
        let tagger = CountingTagger::default();
        let mut controller = PipelineController::new(CannedSource(Canned::Fail), &tagger);

        let outcome = controller.run(&target()).await;

        assert!(matches!(
            outcome,
            RunOutcome::AcquisitionFailed(AcquisitionError::Status { status: 502, .. })
        ));
        assert_eq!(controller.state(), RunState::AcquisitionFailed);
        assert_eq!(tagger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_run_reaches_done() {
        let tagger = CountingTagger::default();
        let mut controller =
            PipelineController::new(CannedSource(Canned::Records(headlines())), &tagger);

        let outcome = controller.run(&target()).await;

        let RunOutcome::Done(report) = outcome else {
            panic!("run should reach Done");
        };
        assert_eq!(controller.state(), RunState::Done);
        assert_eq!(tagger.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.strategy, "canned");
        assert_eq!(report.target_url, "https://www.geo.tv/latest-news");
        assert_eq!(report.headlines, headlines());
        assert_eq!(report.entities.places, karachi_once());
        assert!(report.acquired_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_tagger_failure_is_reported() {
        let tagger = CountingTagger {
            fail: true,
            ..Default::default()
        };
        let mut controller =
            PipelineController::new(CannedSource(Canned::Records(headlines())), &tagger);

        let outcome = controller.run(&target()).await;

        assert!(matches!(outcome, RunOutcome::AggregationFailed(_)));
        assert_eq!(controller.state(), RunState::AggregationFailed);
    }

    #[tokio::test]
    async fn test_each_run_rebuilds_tables() {
        let tagger = CountingTagger::default();
        let mut controller =
            PipelineController::new(CannedSource(Canned::Records(headlines())), &tagger);

        controller.run(&target()).await;
        let RunOutcome::Done(second) = controller.run(&target()).await else {
            panic!("second run should succeed");
        };

        assert_eq!(second.entities.places, karachi_once());
        assert_eq!(tagger.calls.load(Ordering::SeqCst), 2);
    }
}
