use std::path::PathBuf;
use thiserror::Error;

/// The main error type for beardstore operations.
#[derive(Debug, Error)]
pub enum BeardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot find a dataset config matching '{pattern}' in {folder}")]
    ConfigNotFound { folder: PathBuf, pattern: String },

    #[error("Failed to parse JSON config from {path}: {source}")]
    ConfigJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse YAML config from {path}: {source}")]
    ConfigYamlParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write config to {path}: {source}")]
    ConfigWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid dataset config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to parse {path}:{line}: {message}")]
    Format {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Specified folder {path} does not exist")]
    MissingPath { path: PathBuf },

    #[error("Invalid geometry request: {0}")]
    Geometry(String),

    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Invalid augmentation parameters: {message}")]
    InvalidAugmentParams { message: String },

    #[error("Failed to serialize report: {0}")]
    ReportJson(#[source] serde_json::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl BeardError {
    /// Attach file and line context to a row-level codec failure.
    pub(crate) fn format_at(path: impl Into<PathBuf>, line: usize, err: BeardError) -> Self {
        match err {
            BeardError::Format { message, .. } => BeardError::Format {
                path: path.into(),
                line,
                message,
            },
            other => other,
        }
    }

    /// A row-level failure without file context yet.
    pub(crate) fn format(message: impl Into<String>) -> Self {
        BeardError::Format {
            path: PathBuf::new(),
            line: 0,
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        BeardError::ConfigInvalid {
            message: message.into(),
        }
    }
}
