use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

use crate::aggregate;
use crate::config::PipelineConfig;
use crate::dedupe;
use crate::error::{PipelineError, Result};
use crate::normalize;
use crate::outputs;
use crate::source::PermitSource;
use crate::types::{PermitRecord, PACIFIC};
use crate::units;

/// Pause after each full page to bound the request rate.
const PAGE_PAUSE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub raw_rows: usize,
    pub eligible_rows: usize,
    pub representatives: usize,
    pub total_units: i64,
}

/// One logical run: page through the source, normalize, derive, filter,
/// dedupe, aggregate, publish. Any failure aborts before artifacts are
/// written, leaving the previously published state intact.
pub fn run(config: &PipelineConfig, source: &dyn PermitSource) -> Result<RunSummary> {
    let raw_rows = fetch_all(source)?;
    if raw_rows.is_empty() {
        error!("no data returned from API {}", config.api_url);
        return Err(PipelineError::EmptyResultSet);
    }

    let records: Vec<PermitRecord> = normalize::normalize_rows(&raw_rows)?
        .into_iter()
        .map(units::derive)
        .collect();

    let cutoff = config.cutoff();
    let eligible: Vec<PermitRecord> = records
        .into_iter()
        .filter(|record| {
            record
                .completed_date
                .is_some_and(|completed| completed >= cutoff)
                && record.new_units > 0.0
        })
        .collect();
    let eligible_rows = eligible.len();

    let representatives = dedupe::dedupe_by_site(eligible);
    let aggregate = aggregate::aggregate(&representatives);

    let now = Utc::now().with_timezone(&PACIFIC);
    outputs::write_artifacts(config, &aggregate, &raw_rows, now)?;

    let summary = RunSummary {
        raw_rows: raw_rows.len(),
        eligible_rows,
        representatives: representatives.len(),
        total_units: aggregate.total_units,
    };
    info!(
        "OK total={} rows={} deduped={}",
        summary.total_units, summary.raw_rows, summary.representatives
    );
    Ok(summary)
}

fn fetch_all(source: &dyn PermitSource) -> Result<Vec<Value>> {
    let page_size = source.page_size();
    let mut all_rows = Vec::new();
    let mut offset = 0u64;

    loop {
        info!("requesting page offset={offset}");
        let page = source.fetch_page(offset)?;
        if page.is_empty() {
            break;
        }
        let page_len = page.len();
        all_rows.extend(page);
        if page_len < page_size {
            break;
        }
        offset += page_size as u64;
        std::thread::sleep(PAGE_PAUSE);
    }

    Ok(all_rows)
}
