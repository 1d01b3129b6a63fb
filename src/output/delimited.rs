//! Delimited-text serialization of canonical records

use crate::error::{Error, Result};
use crate::record::CanonicalRecord;
use bytes::Bytes;

/// Serialize records as comma-delimited text with a header row
///
/// The header is the first record's field order. Nulls become empty cells
/// and there is no row-index column. An empty record set yields an empty
/// artifact.
pub fn write_csv(records: &[CanonicalRecord]) -> Result<Bytes> {
    let Some(first) = records.first() else {
        return Ok(Bytes::new());
    };

    let header: Vec<&str> = first.field_names().collect();
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header)?;

    for record in records {
        let row: Vec<String> = header
            .iter()
            .map(|field| {
                record
                    .get(field)
                    .and_then(crate::record::CanonicalValue::render)
                    .unwrap_or_default()
            })
            .collect();
        writer.write_record(&row)?;
    }

    let buffer = writer
        .into_inner()
        .map_err(|e| Error::output(format!("Failed to flush CSV: {e}")))?;
    Ok(Bytes::from(buffer))
}
