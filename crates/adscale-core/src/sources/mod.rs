//! Record sources
//!
//! Every way of obtaining campaign records implements [`RecordSource`].
//! Adding a new input format means adding a new implementation here.

mod delimited;
mod synthetic;

pub use delimited::{read_records, CsvRecordSource};
pub use synthetic::{generate_campaign_names, generate_records, SyntheticRecordSource, PLATFORMS};

use crate::schema::REQUIRED_FIELDS;
use crate::{RecordSet, SourceError};
use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

pub trait RecordSource: Send + Sync {
    /// Short label used in log lines.
    fn name(&self) -> &'static str;

    fn load(&self, location: &Path) -> Result<RecordSet, SourceError>;
}

/// Load every file through `source` in parallel, keeping the input order.
pub fn load_files<S: RecordSource + ?Sized>(
    source: &S,
    files: &[PathBuf],
) -> Vec<(PathBuf, Result<RecordSet, SourceError>)> {
    files
        .par_iter()
        .map(|path| (path.clone(), source.load(path)))
        .collect()
}

/// Write `records` as CSV with the canonical header, creating parent folders.
pub fn write_records(records: &RecordSet, path: &Path) -> Result<(), SourceError> {
    let io_err = |source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let csv_err = |source| SourceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    // Header is written by hand so an empty set still yields a readable file
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_err)?;
    writer.write_record(REQUIRED_FIELDS).map_err(csv_err)?;
    for record in records.records() {
        writer.serialize(record).map_err(csv_err)?;
    }
    writer.flush().map_err(io_err)?;

    Ok(())
}

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a calendar date, accepting a trailing time of day.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok().or_else(|| {
        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(|dt| dt.date())
    })
}

pub(crate) mod date_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(super::DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::parse_date(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date `{value}`")))
    }
}

pub(crate) mod finite_float {
    use serde::{Deserialize, Deserializer};

    /// Reject `NaN` and infinities, which `f64` parsing otherwise accepts.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(serde::de::Error::custom(format!("non-finite value `{value}`")))
        }
    }
}
