use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::PermitRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyUnits {
    pub month: String,
    pub new_units: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// Sum of representatives' `new_units`, truncated to an integer.
    pub total_units: i64,
    /// One entry per calendar month (Pacific) with at least one
    /// representative, ascending. No zero-filling.
    pub monthly: Vec<MonthlyUnits>,
}

pub fn aggregate(representatives: &[PermitRecord]) -> Aggregate {
    let mut total = 0.0;
    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();

    for record in representatives {
        total += record.new_units;
        if let Some(completed) = record.completed_date {
            *by_month
                .entry(completed.format("%Y-%m").to_string())
                .or_insert(0.0) += record.new_units;
        }
    }

    Aggregate {
        total_units: total as i64,
        monthly: by_month
            .into_iter()
            .map(|(month, new_units)| MonthlyUnits { month, new_units })
            .collect(),
    }
}
