//! JSON report output.
//!
//! Reports are grouped by the UTC date of the run, one file per run named by
//! its UTC time to the millisecond: `{json_output_dir}/{YYYY-MM-DD}/{HHMMSS}-{mmm}.json`.

use crate::models::RunReport;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Path a report written at `at` lands on.
///
/// Runs started in the same second get distinct files as long as their
/// timestamps differ by at least a millisecond.
pub fn report_path(json_output_dir: &str, at: DateTime<Utc>) -> PathBuf {
    PathBuf::from(json_output_dir)
        .join(at.format("%Y-%m-%d").to_string())
        .join(format!("{}.json", at.format("%H%M%S-%3f")))
}

/// Serialize `report` to its dated path under `json_output_dir`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_report(
    report: &RunReport,
    json_output_dir: &str,
    at: DateTime<Utc>,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    let path = report_path(json_output_dir, at);

    if let Some(dir) = path.parent() {
        info!(dir = %dir.display(), "Ensuring JSON directory exists");
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON report");
    Ok(path)
}
