use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{error, info};
use ureq::Agent;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::retry::RetryPolicy;

/// Paginated permit source. A page shorter than `page_size` signals
/// end-of-data. Implementations own their transport reliability; the
/// pipeline re-applies every filter itself regardless of what the source
/// claims to have filtered.
pub trait PermitSource {
    fn page_size(&self) -> usize;
    fn fetch_page(&self, offset: u64) -> Result<Vec<Value>>;
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// Server-side projection; keeps payloads small without changing semantics.
const SELECT_COLUMNS: &[&str] = &[
    "permit_number",
    "permit_type",
    "permit_type_definition",
    "filed_date",
    "issued_date",
    "completed_date",
    "status",
    "status_date",
    "block",
    "lot",
    "street_number",
    "street_name",
    "street_suffix",
    "proposed_use",
    "existing_use",
    "proposed_units",
    "existing_units",
    "record_id",
];

/// Socrata-style HTTP source with bounded retries per page.
pub struct SocrataSource {
    agent: Agent,
    api_url: String,
    app_token: Option<String>,
    page_size: usize,
    since: String,
    retry: RetryPolicy,
}

impl SocrataSource {
    pub fn new(config: &PipelineConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .new_agent();

        Self {
            agent,
            api_url: config.api_url.clone(),
            app_token: config.app_token.clone(),
            page_size: config.page_size,
            since: format!("{}T00:00:00.000", config.since_date),
            retry: RetryPolicy::default(),
        }
    }

    /// Server-side mirror of the client-side filters. An optimization only;
    /// the pipeline applies the same filters again after normalization.
    fn where_clause(&self) -> String {
        [
            "completed_date IS NOT NULL".to_string(),
            format!("completed_date >= '{}'", self.since),
            "coalesce(proposed_units::number, 0) - coalesce(existing_units::number, 0) > 0"
                .to_string(),
        ]
        .join(" AND ")
    }

    fn fetch_once(&self, offset: u64) -> Result<Vec<Value>> {
        let started = Instant::now();
        let mut request = self
            .agent
            .get(&self.api_url)
            .query("$limit", &self.page_size.to_string())
            .query("$offset", &offset.to_string())
            .query("$select", &SELECT_COLUMNS.join(","))
            .query("$where", &self.where_clause())
            .header("Accept", "application/json");
        if let Some(token) = &self.app_token {
            request = request.header("X-App-Token", token);
        }

        let mut response = request
            .call()
            .map_err(|err| PipelineError::Http(Box::new(err)))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_string()
            .map_err(|err| PipelineError::Http(Box::new(err)))?;
        let elapsed_ms = started.elapsed().as_millis();

        if status >= 400 {
            // Log the body to help diagnose API errors like unknown columns.
            error!("HTTP {status} from API in {elapsed_ms}ms: {}", excerpt(&body));
            return Err(PipelineError::HttpStatus {
                status,
                body: excerpt(&body),
            });
        }

        let rows = parse_page_body(&body).inspect_err(|err| {
            error!("bad response body in {elapsed_ms}ms: {err}");
        })?;
        info!("fetched page offset={offset} rows={} in {elapsed_ms}ms", rows.len());
        Ok(rows)
    }
}

impl PermitSource for SocrataSource {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn fetch_page(&self, offset: u64) -> Result<Vec<Value>> {
        self.retry.run(|| self.fetch_once(offset))
    }
}

/// Interpret an HTTP-success body. The API occasionally reports errors in a
/// JSON object even with a 200; that is non-retryable.
pub fn parse_page_body(body: &str) -> Result<Vec<Value>> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|err| PipelineError::MalformedPage(format!("response body is not JSON: {err}")))?;

    if let Some(object) = parsed.as_object() {
        if let Some(message) = object.get("message").and_then(Value::as_str) {
            return Err(PipelineError::ApiError(message.to_string()));
        }
        return Err(PipelineError::MalformedPage(
            "expected a JSON array of records".to_string(),
        ));
    }

    match parsed {
        Value::Array(rows) => Ok(rows),
        _ => Err(PipelineError::MalformedPage(
            "expected a JSON array of records".to_string(),
        )),
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(2000).collect()
}
