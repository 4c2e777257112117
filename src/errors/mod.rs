//! Error type definitions for the EPG pipeline
//!
//! Every fatal condition the batch run can hit has one variant here, and each
//! variant maps to a distinct process exit code so scheduled automation can
//! tell apart "feed was garbage" from "disk was full".

use std::path::Path;
use thiserror::Error;

/// Top-level pipeline error type
///
/// Fatal conditions abort the whole run before any output is written.
/// Per-programme extraction misses are not errors and never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Operator invoked the tool incorrectly
    #[error("usage error: {0}")]
    Usage(String),

    /// A required input path is missing or unreadable
    #[error("input not found: {path}: {source}")]
    InputNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Input did not parse as well-formed XMLTV, even after sanitize + recovery
    #[error("malformed XMLTV input: {0}")]
    MalformedInput(String),

    /// The output destination cannot be written
    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Every source failed or produced zero programmes
    #[error("no usable programmes across all sources")]
    EmptyBatch,

    /// Configuration file is present but invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP fetch failure for one source (degraded per source, fatal only
    /// when it leaves the batch empty)
    #[error("fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },
}

impl PipelineError {
    /// Process exit code for this error, distinct per failure class
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Usage(_) | PipelineError::Config(_) => 2,
            PipelineError::InputNotFound { .. } => 3,
            PipelineError::MalformedInput(_) => 4,
            PipelineError::Write { .. } => 5,
            PipelineError::EmptyBatch => 12,
            PipelineError::Fetch { .. } => 1,
        }
    }

    pub fn input_not_found(path: &Path, source: std::io::Error) -> Self {
        Self::InputNotFound {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn write_failed(path: &Path, source: std::io::Error) -> Self {
        Self::Write {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn fetch<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }
}
