use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::types::{PermitRecord, PACIFIC};

/// Normalize one fetched page worth of raw rows. Unknown fields are dropped,
/// missing fields become `None`, and per-field coercion failures never fail
/// the row. A row that is not a JSON object fails the whole run.
pub fn normalize_rows(rows: &[Value]) -> Result<Vec<PermitRecord>> {
    rows.iter().map(normalize_row).collect()
}

fn normalize_row(row: &Value) -> Result<PermitRecord> {
    let object = row.as_object().ok_or_else(|| {
        PipelineError::MalformedPage("page contains a non-object record".to_string())
    })?;

    let mut fields: HashMap<String, &Value> = HashMap::with_capacity(object.len());
    for (key, value) in object {
        fields.insert(canonical_key(key), value);
    }

    Ok(PermitRecord {
        permit_number: string_field(&fields, "permit_number"),
        record_id: string_field(&fields, "record_id"),
        permit_type: string_field(&fields, "permit_type"),
        permit_type_definition: string_field(&fields, "permit_type_definition"),
        status: string_field(&fields, "status"),
        block: string_field(&fields, "block"),
        lot: string_field(&fields, "lot"),
        street_number: string_field(&fields, "street_number"),
        street_name: string_field(&fields, "street_name"),
        street_suffix: string_field(&fields, "street_suffix"),
        proposed_use: string_field(&fields, "proposed_use"),
        existing_use: string_field(&fields, "existing_use"),
        proposed_units: numeric_field(&fields, "proposed_units"),
        existing_units: numeric_field(&fields, "existing_units"),
        filed_date: date_field(&fields, "filed_date"),
        issued_date: date_field(&fields, "issued_date"),
        completed_date: date_field(&fields, "completed_date"),
        status_date: date_field(&fields, "status_date"),
        new_units: 0.0,
        parcel_id: String::new(),
    })
}

/// Harmonize mixed-case/spaced keys from the API into canonical snake_case,
/// e.g. `"Permit Number"` and `"permit_number"` both map to `permit_number`.
fn canonical_key(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

fn string_field(fields: &HashMap<String, &Value>, name: &str) -> Option<String> {
    match fields.get(name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn numeric_field(fields: &HashMap<String, &Value>, name: &str) -> Option<f64> {
    match fields.get(name)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn date_field(fields: &HashMap<String, &Value>, name: &str) -> Option<DateTime<Tz>> {
    match fields.get(name)? {
        Value::String(s) => parse_instant(s),
        _ => None,
    }
}

/// Parse a source timestamp into a Pacific-zone instant.
///
/// The dataset emits floating timestamps (`2023-05-01T00:00:00.000`); like the
/// published methodology, those are read as UTC and converted. RFC 3339 values
/// with an explicit offset and bare dates are accepted too. Anything else is
/// absent, not an error.
pub fn parse_instant(raw: &str) -> Option<DateTime<Tz>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&PACIFIC));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc().with_timezone(&PACIFIC));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc().with_timezone(&PACIFIC));
    }
    None
}
