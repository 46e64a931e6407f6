use std::cell::Cell;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use permitwatch_core::config::PipelineConfig;
use permitwatch_core::error::{PipelineError, Result};
use permitwatch_core::pipeline;
use permitwatch_core::source::PermitSource;
use permitwatch_core::types::PACIFIC;
use serde_json::{json, Value};

struct InMemorySource {
    page_size: usize,
    pages: Vec<Vec<Value>>,
    calls: Cell<usize>,
}

impl InMemorySource {
    fn new(page_size: usize, pages: Vec<Vec<Value>>) -> Self {
        Self {
            page_size,
            pages,
            calls: Cell::new(0),
        }
    }
}

impl PermitSource for InMemorySource {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn fetch_page(&self, offset: u64) -> Result<Vec<Value>> {
        self.calls.set(self.calls.get() + 1);
        let idx = (offset as usize) / self.page_size;
        Ok(self.pages.get(idx).cloned().unwrap_or_default())
    }
}

fn row(
    permit: &str,
    block: &str,
    lot: &str,
    street: &str,
    proposed: f64,
    existing: f64,
    completed: Option<&str>,
) -> Value {
    let mut value = json!({
        "permit_number": permit,
        "record_id": format!("rid-{permit}"),
        "block": block,
        "lot": lot,
        "street_number": street,
        "proposed_units": proposed.to_string(),
        "existing_units": existing.to_string(),
    });
    if let Some(date) = completed {
        value["completed_date"] = json!(date);
    }
    value
}

fn test_config(name: &str) -> PipelineConfig {
    let output_dir: PathBuf = std::env::temp_dir().join(format!(
        "permitwatch-test-{name}-{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&output_dir);
    PipelineConfig {
        output_dir,
        write_snapshot: false,
        ..PipelineConfig::default()
    }
}

fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn full_run_dedupes_filters_and_publishes() {
    // Noon floating timestamps stay inside the same Pacific calendar day.
    let pages = vec![vec![
        row("A", "100", "200", "455", 3.0, 0.0, Some("2023-05-15T12:00:00.000")),
        row("B", "100", "200", "455", 5.0, 0.0, Some("2023-04-15T12:00:00.000")),
        row("C", "300", "400", "12", 2.0, 0.0, Some("2023-06-15T12:00:00.000")),
        row("D", "500", "600", "9", 7.0, 0.0, None),
        row("E", "700", "800", "77", 4.0, 0.0, Some("2022-06-15T12:00:00.000")),
        row("F", "900", "950", "31", 1.0, 6.0, Some("2023-07-15T12:00:00.000")),
    ]];
    let source = InMemorySource::new(50, pages);
    let config = test_config("full-run");

    let summary = pipeline::run(&config, &source).unwrap();
    assert_eq!(summary.raw_rows, 6);
    assert_eq!(summary.eligible_rows, 3);
    assert_eq!(summary.representatives, 2);
    assert_eq!(summary.total_units, 7);

    let totals = read_json(&config.output_dir.join("totals.json"));
    assert_eq!(totals["units_built_since_2023_01_01"], json!(7));
    assert_eq!(totals["methodology_version"], json!(1));
    assert!(totals["last_updated"].is_string());

    let monthly = read_json(&config.output_dir.join("monthly.json"));
    assert_eq!(
        monthly,
        json!([
            { "month": "2023-04", "new_units": 5.0 },
            { "month": "2023-06", "new_units": 2.0 }
        ])
    );

    let _ = fs::remove_dir_all(&config.output_dir);
}

#[test]
fn short_page_ends_pagination_and_full_page_continues() {
    let full_page = vec![
        row("A", "1", "2", "3", 1.0, 0.0, Some("2023-05-15T12:00:00.000")),
        row("B", "4", "5", "6", 1.0, 0.0, Some("2023-05-15T12:00:00.000")),
    ];
    let short_page = vec![row("C", "7", "8", "9", 1.0, 0.0, Some("2023-05-15T12:00:00.000"))];

    let source = InMemorySource::new(2, vec![full_page, short_page]);
    let config = test_config("pagination");

    let summary = pipeline::run(&config, &source).unwrap();
    assert_eq!(summary.raw_rows, 3);
    // Full first page triggers a second request; the short second page stops.
    assert_eq!(source.calls.get(), 2);

    let _ = fs::remove_dir_all(&config.output_dir);
}

#[test]
fn single_short_page_fetches_exactly_once() {
    let source = InMemorySource::new(
        10,
        vec![vec![row("A", "1", "2", "3", 1.0, 0.0, Some("2023-05-15T12:00:00.000"))]],
    );
    let config = test_config("single-page");

    pipeline::run(&config, &source).unwrap();
    assert_eq!(source.calls.get(), 1);

    let _ = fs::remove_dir_all(&config.output_dir);
}

#[test]
fn zero_rows_fails_the_run_and_writes_nothing() {
    let source = InMemorySource::new(10, vec![]);
    let config = test_config("empty");

    let result = pipeline::run(&config, &source);
    assert!(matches!(result, Err(PipelineError::EmptyResultSet)));
    assert!(!config.output_dir.exists());
}

#[test]
fn malformed_row_fails_the_run_and_writes_nothing() {
    let source = InMemorySource::new(10, vec![vec![json!(["not", "an", "object"])]]);
    let config = test_config("malformed");

    let result = pipeline::run(&config, &source);
    assert!(matches!(result, Err(PipelineError::MalformedPage(_))));
    assert!(!config.output_dir.exists());
}

#[test]
fn rerunning_on_unchanged_input_reproduces_the_same_numbers() {
    let pages = vec![vec![
        row("A", "100", "200", "455", 3.0, 0.0, Some("2023-05-15T12:00:00.000")),
        row("B", "100", "200", "455", 5.0, 0.0, Some("2023-04-15T12:00:00.000")),
        row("C", "300", "400", "12", 2.0, 0.0, Some("2023-06-15T12:00:00.000")),
    ]];
    let source = InMemorySource::new(50, pages);
    let config = test_config("idempotent");

    let first = pipeline::run(&config, &source).unwrap();
    let first_monthly = read_json(&config.output_dir.join("monthly.json"));

    let second = pipeline::run(&config, &source).unwrap();
    let second_monthly = read_json(&config.output_dir.join("monthly.json"));

    assert_eq!(first, second);
    assert_eq!(first_monthly, second_monthly);

    let _ = fs::remove_dir_all(&config.output_dir);
}

#[test]
fn snapshot_is_dated_and_contains_the_raw_rows() {
    let pages = vec![vec![
        row("A", "100", "200", "455", 3.0, 0.0, Some("2023-05-15T12:00:00.000")),
        row("B", "300", "400", "12", 2.0, 0.0, Some("2023-06-15T12:00:00.000")),
    ]];
    let source = InMemorySource::new(50, pages);
    let mut config = test_config("snapshot");
    config.write_snapshot = true;

    pipeline::run(&config, &source).unwrap();

    let today = Utc::now().with_timezone(&PACIFIC).date_naive();
    let snapshot = read_json(&config.output_dir.join(format!("raw_{today}.json")));
    assert_eq!(snapshot.as_array().unwrap().len(), 2);

    let _ = fs::remove_dir_all(&config.output_dir);
}
