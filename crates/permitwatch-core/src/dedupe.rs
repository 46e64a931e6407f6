use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::types::{PermitRecord, SiteKey};

/// Collapse multiple filings describing the same physical project into one
/// representative per site, so a project's original permit plus its
/// amendments and follow-ups count once.
///
/// Within a `(parcel_id, street_number)` group the representative is the
/// record with the highest `new_units`; ties go to the latest
/// `completed_date`, then to the lexicographically smallest
/// `(permit_number, record_id)` so the choice never depends on input order.
/// Output is ordered ascending by site key.
pub fn dedupe_by_site(records: Vec<PermitRecord>) -> Vec<PermitRecord> {
    let mut groups: BTreeMap<SiteKey, PermitRecord> = BTreeMap::new();

    for record in records {
        match groups.entry(record.site_key()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if prefer(&record, slot.get()).is_gt() {
                    slot.insert(record);
                }
            }
        }
    }

    groups.into_values().collect()
}

/// Total order over group members; `Greater` means `a` is the better
/// representative.
fn prefer(a: &PermitRecord, b: &PermitRecord) -> Ordering {
    a.new_units
        .total_cmp(&b.new_units)
        .then_with(|| a.completed_date.cmp(&b.completed_date))
        .then_with(|| tie_id(b).cmp(&tie_id(a)))
}

fn tie_id(record: &PermitRecord) -> (Option<&str>, Option<&str>) {
    (record.permit_number.as_deref(), record.record_id.as_deref())
}
