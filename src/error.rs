//! Error types for document loading, reference resolution and table output.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading an OpenAPI document or JSON Schema.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("{origin} is not a JSON or YAML document: {source}")]
    NotADocument {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{origin} is neither valid JSON ({json}) nor valid YAML ({yaml})")]
    Parse {
        origin: String,
        json: serde_json::Error,
        #[source]
        yaml: serde_yaml::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            LoadError::NotADocument { .. } | LoadError::Parse { .. } => 2,
        }
    }
}

/// Errors while resolving a `$ref` pointer against a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    #[error("unsupported reference {reference}: only local pointers starting with '#' are supported")]
    UnsupportedReferenceKind { reference: String },

    #[error("pointer not found: {pointer}")]
    PointerNotFound { pointer: String },

    #[error("invalid segment \"{segment}\" in pointer {pointer}")]
    InvalidPointerSegment { pointer: String, segment: String },
}

impl PointerError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while writing a table to its destination.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot write workbook {path}: {source}")]
    Xlsx {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("cannot infer output format from {path}: expected .md, .csv or .xlsx")]
    UnknownFormat { path: PathBuf },
}

impl SinkError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            SinkError::UnknownFormat { .. } => 2,
            _ => 3,
        }
    }
}

/// Errors while scanning an input directory.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("not a directory or does not exist: {path}")]
    InvalidDirectory { path: PathBuf },

    #[error("cannot scan {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

impl ScanError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScanError::InvalidDirectory { .. } => 2,
            ScanError::Walk { .. } => 3,
        }
    }
}

/// Errors reading one input table of `combine`.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot open workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
}

impl InputError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}
