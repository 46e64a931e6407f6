use std::fs;
use std::path::Path;

use chrono::{DateTime, SecondsFormat};
use chrono_tz::Tz;
use serde_json::{json, Value};
use tracing::debug;

use crate::aggregate::Aggregate;
use crate::config::PipelineConfig;
use crate::error::Result;

pub const METHODOLOGY_VERSION: u32 = 1;

/// Publish the run's artifacts. Called only after the whole pipeline
/// succeeded, so a failed run leaves the previously published files alone.
pub fn write_artifacts(
    config: &PipelineConfig,
    aggregate: &Aggregate,
    raw_rows: &[Value],
    now: DateTime<Tz>,
) -> Result<()> {
    fs::create_dir_all(&config.output_dir)?;

    let mut totals = serde_json::Map::new();
    totals.insert(
        format!("units_built_since_{}", config.since_tag()),
        json!(aggregate.total_units),
    );
    totals.insert(
        "last_updated".to_string(),
        json!(now.to_rfc3339_opts(SecondsFormat::Secs, false)),
    );
    totals.insert("methodology_version".to_string(), json!(METHODOLOGY_VERSION));

    write_atomic(
        &config.output_dir.join("totals.json"),
        &serde_json::to_vec_pretty(&Value::Object(totals))?,
    )?;
    write_atomic(
        &config.output_dir.join("monthly.json"),
        &serde_json::to_vec_pretty(&aggregate.monthly)?,
    )?;

    if config.write_snapshot {
        // Date-stamped, so a snapshot from a different date is never clobbered.
        let name = format!("raw_{}.json", now.date_naive());
        write_atomic(&config.output_dir.join(name), &serde_json::to_vec(raw_rows)?)?;
    }

    debug!("artifacts written to {}", config.output_dir.display());
    Ok(())
}

/// Temp file + rename, so readers never observe a torn artifact.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
