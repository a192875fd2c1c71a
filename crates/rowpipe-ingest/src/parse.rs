//! Header-keyed CSV parsing
//!
//! Values are never coerced; every cell stays a string. Records are flexible:
//! a short record only carries the columns it has, and cells beyond the header
//! are dropped. Blank lines are skipped.

use csv::ReaderBuilder;
use rowpipe_common::envelope::Row;

use crate::error::IngestResult;

/// Parse `data` lazily into rows keyed by the header line, in file order
///
/// An empty input has no header and yields no rows.
pub fn parse_rows(
    data: &[u8],
    delimiter: u8,
) -> IngestResult<impl Iterator<Item = IngestResult<Row>> + '_> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data);

    let headers = reader.headers()?.clone();

    Ok(reader.into_records().map(move |record| {
        let record = record?;
        Ok(headers.iter().zip(record.iter()).collect::<Row>())
    }))
}
