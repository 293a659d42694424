use crate::model::UnprocessedRecord;
use std::path::Path;

/// Serialize the whole unprocessed list to the side channel. Callers only
/// invoke this when the list is non-empty.
pub fn write_unprocessed(out: &Path, records: &[UnprocessedRecord]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(out, json)?;
    Ok(())
}
