use std::path::PathBuf;
use thiserror::Error;

/// Required fields absent from a record collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required columns: {}", .missing.join(", "))]
pub struct SchemaError {
    pub missing: Vec<String>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{} is empty", .path.display())]
    EmptyFile { path: PathBuf },
}

/// A single chart that could not be produced.
#[derive(Debug, Error)]
#[error("failed to render {chart} chart to {}: {reason}", .path.display())]
pub struct RenderError {
    pub chart: &'static str,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("no data found: {0}")]
    NoData(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{} chart(s) failed to render: {}", .failed.len(), .failed.join("; "))]
    Render { failed: Vec<String> },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Vec<RenderError>> for AnalysisError {
    fn from(errors: Vec<RenderError>) -> Self {
        AnalysisError::Render {
            failed: errors.iter().map(|e| e.to_string()).collect(),
        }
    }
}
