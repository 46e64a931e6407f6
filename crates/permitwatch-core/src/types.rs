use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;

/// The source dataset publishes instants in local San Francisco time.
pub const PACIFIC: Tz = chrono_tz::America::Los_Angeles;

/// One permit filing after normalization. Every source field is an explicit
/// optional; `new_units` and `parcel_id` are attached by [`crate::units::derive`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PermitRecord {
    pub permit_number: Option<String>,
    pub record_id: Option<String>,
    pub permit_type: Option<String>,
    pub permit_type_definition: Option<String>,
    pub status: Option<String>,
    pub block: Option<String>,
    pub lot: Option<String>,
    pub street_number: Option<String>,
    pub street_name: Option<String>,
    pub street_suffix: Option<String>,
    pub proposed_use: Option<String>,
    pub existing_use: Option<String>,
    pub proposed_units: Option<f64>,
    pub existing_units: Option<f64>,
    pub filed_date: Option<DateTime<Tz>>,
    pub issued_date: Option<DateTime<Tz>>,
    pub completed_date: Option<DateTime<Tz>>,
    pub status_date: Option<DateTime<Tz>>,
    pub new_units: f64,
    pub parcel_id: String,
}

impl PermitRecord {
    /// Grouping key assumed to identify one physical project across filings.
    pub fn site_key(&self) -> SiteKey {
        SiteKey {
            parcel_id: self.parcel_id.clone(),
            street_number: self.street_number.clone().unwrap_or_default(),
        }
    }
}

/// `(parcel_id, street_number)` pair; `Ord` so grouping and representative
/// selection do not depend on input row order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SiteKey {
    pub parcel_id: String,
    pub street_number: String,
}

impl fmt::Display for SiteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.parcel_id, self.street_number)
    }
}
