use std::path::PathBuf;

use thiserror::Error;

/// Unrecoverable failures. Field parse misses and filtered rows never end up here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read delimited file {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed geo feature collection {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to open workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    #[error("workbook {path} has no sheet named '{sheet}'")]
    MissingSheet { path: PathBuf, sheet: String },

    #[error("{source_name} is missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    #[error("invalid feature in {path}: {message}")]
    Feature { path: PathBuf, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("geocoding request for '{query}' failed: {source}")]
    Geocode {
        query: String,
        #[source]
        source: reqwest::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv { path: path.into(), source }
    }

    pub fn missing_column(source_name: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            source_name: source_name.into(),
            column: column.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
