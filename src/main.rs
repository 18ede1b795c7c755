//! # Headline Entities
//!
//! Scrapes the current headlines from a news index page, tags the people,
//! places, and organizations they mention, and ranks them by frequency.
//!
//! ## Usage
//!
//! ```sh
//! headline_entities --strategy static -j ./reports
//! ```
//!
//! ## Architecture
//!
//! One run is strictly sequential:
//! 1. **Acquisition**: fetch headline records with the chosen strategy
//!    (static HTML or headless Chromium)
//! 2. **Aggregation**: tag all titles in one batch and count entities per bucket
//! 3. **Output**: print a ranked summary and optionally write a JSON report

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use url::Url;

mod aggregate;
mod cli;
mod config;
mod error;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod tagger;
mod utils;

use cli::{Cli, StrategyKind};
use config::PipelineConfig;
use outputs::{json, summary};
use pipeline::{PipelineController, RunOutcome};
use scrapers::{AcquisitionStrategy, ChromiumLauncher, RenderedFetchStrategy, StaticFetchStrategy};
use tagger::{EntityTagger, GazetteerTagger};
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("headline_entities starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = config::load_config(args.config.as_deref()).await?;
    args.apply_to(&mut config);
    let target = Url::parse(&config.target_url)?;

    // Early check: fail before scraping if the report can't be written
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "JSON output directory is not writable");
            return Err(e);
        }
    }

    let strategy = build_strategy(args.strategy, &config)?;
    info!(strategy = ?args.strategy, %target, "Acquisition strategy selected");

    #[cfg(feature = "llm")]
    if let Some(llm_config) = &args.llm_config {
        let tagger = tagger::llm::LlmTagger::load(llm_config, &args.llm_template).await?;
        run(strategy, tagger, &target, &config, args.json_output_dir.as_deref()).await?;
        info!(elapsed = ?start_time.elapsed(), "Execution complete");
        return Ok(());
    }

    let tagger = GazetteerTagger::shared(config.gazetteer_path.as_deref())?;
    run(strategy, tagger, &target, &config, args.json_output_dir.as_deref()).await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

fn build_strategy(
    kind: StrategyKind,
    config: &PipelineConfig,
) -> Result<AcquisitionStrategy, Box<dyn Error>> {
    let strategy = match kind {
        StrategyKind::Static => AcquisitionStrategy::Static(StaticFetchStrategy::new(config)?),
        StrategyKind::Rendered => AcquisitionStrategy::Rendered(RenderedFetchStrategy::new(
            ChromiumLauncher::new(config.rendered.chrome_executable.clone()),
            config.rendered.clone(),
        )),
    };
    Ok(strategy)
}

/// Run the pipeline once and present whatever it produced.
#[instrument(level = "info", skip_all)]
async fn run<T: EntityTagger>(
    strategy: AcquisitionStrategy,
    tagger: T,
    target: &Url,
    config: &PipelineConfig,
    json_output_dir: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let mut controller = PipelineController::new(strategy, tagger);
    let outcome = controller.run(target).await;
    debug!(state = %controller.state(), "Run finished");

    let report = match outcome {
        RunOutcome::Done(report) => report,
        RunOutcome::NoHeadlines => {
            println!("No headlines scraped.");
            return Ok(());
        }
        RunOutcome::AcquisitionFailed(e) => {
            warn!(error = %e, "Run ended without headlines");
            println!("No headlines scraped: {e}");
            return Ok(());
        }
        RunOutcome::AggregationFailed(e) => {
            error!(error = %e, "Run ended without entities");
            println!("Headlines scraped, but entity tagging failed: {e}");
            return Ok(());
        }
    };

    if report.entities.is_empty() {
        info!(headlines = report.headlines.len(), "No entities recognized in headlines");
    }
    print!("{}", summary::render_summary(&report, config.top_n));

    if let Some(dir) = json_output_dir {
        if let Err(e) = json::write_report(&report, dir, Utc::now()).await {
            error!(error = %e, "Failed to write JSON report");
        }
    }
    Ok(())
}
