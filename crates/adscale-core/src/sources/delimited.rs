use super::RecordSource;
use crate::schema::{validate_fields, REQUIRED_FIELDS};
use crate::{CampaignRecord, RecordSet, SourceError};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

/// Reads comma-delimited files with a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRecordSource;

impl RecordSource for CsvRecordSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn load(&self, location: &Path) -> Result<RecordSet, SourceError> {
        let file = File::open(location).map_err(|source| SourceError::Io {
            path: location.to_path_buf(),
            source,
        })?;

        let set = read_records(file).map_err(|source| SourceError::Csv {
            path: location.to_path_buf(),
            source,
        })?;

        if set.fields().iter().all(String::is_empty) {
            return Err(SourceError::EmptyFile {
                path: location.to_path_buf(),
            });
        }

        if set.skipped_rows() > 0 {
            warn!(
                "{}: skipped {} malformed row(s)",
                location.display(),
                set.skipped_rows()
            );
        }

        if let Err(err) = validate_fields(set.fields(), &REQUIRED_FIELDS) {
            warn!("{}: {}", location.display(), err);
        } else {
            debug!("Loaded {} records from {}", set.len(), location.display());
        }

        Ok(set)
    }
}

/// Decode CSV text into a record set.
///
/// The header is kept as the set's field list. When it lacks a required
/// field no rows are decoded, leaving rejection to schema validation.
/// Rows with a blank, unparseable or non-finite value are dropped and
/// counted in [`RecordSet::skipped_rows`]; only I/O failures abort the read.
pub fn read_records<R: Read>(reader: R) -> Result<RecordSet, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let fields: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if validate_fields(&fields, &REQUIRED_FIELDS).is_err() {
        return Ok(RecordSet::with_fields(fields, Vec::new()));
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for result in reader.deserialize::<CampaignRecord>() {
        match result {
            Ok(record) => records.push(record),
            Err(err) if err.is_io_error() => return Err(err),
            Err(err) => {
                debug!("Skipping malformed row: {}", err);
                skipped += 1;
            }
        }
    }

    Ok(RecordSet::with_fields(fields, records).with_skipped_rows(skipped))
}
