use std::path::PathBuf;

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::types::PACIFIC;

pub const DEFAULT_API_URL: &str = "https://data.sfgov.org/resource/i98e-djp9.json";
pub const DEFAULT_PAGE_SIZE: usize = 50_000;

/// Everything the pipeline driver needs, assembled by the caller. No module
/// reads the environment on its own.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub api_url: String,
    pub app_token: Option<String>,
    pub page_size: usize,
    /// Completions on or after this calendar date (Pacific time) are counted.
    pub since_date: NaiveDate,
    pub output_dir: PathBuf,
    pub write_snapshot: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            app_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            since_date: NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid calendar date"),
            output_dir: PathBuf::from("public_data"),
            write_snapshot: true,
        }
    }
}

impl PipelineConfig {
    /// First instant of the cutoff date in the Pacific zone.
    pub fn cutoff(&self) -> DateTime<Tz> {
        let midnight = self.since_date.and_time(NaiveTime::MIN);
        match PACIFIC.from_local_datetime(&midnight) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => PACIFIC.from_utc_datetime(&midnight),
        }
    }

    /// Cutoff rendered for the totals artifact key, e.g. `2023_01_01`.
    pub fn since_tag(&self) -> String {
        self.since_date.format("%Y_%m_%d").to_string()
    }
}
