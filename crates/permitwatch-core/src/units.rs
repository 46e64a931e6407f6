use crate::types::PermitRecord;

/// Attach the derived fields to a normalized record: `new_units` (absent
/// counts coerce to 0 first) and `parcel_id` as `block + "/" + lot`, string
/// concatenation even when the source values look numeric.
pub fn derive(mut record: PermitRecord) -> PermitRecord {
    let proposed = record.proposed_units.unwrap_or(0.0);
    let existing = record.existing_units.unwrap_or(0.0);
    record.new_units = proposed - existing;
    record.parcel_id = format!(
        "{}/{}",
        record.block.as_deref().unwrap_or(""),
        record.lot.as_deref().unwrap_or("")
    );
    record
}
