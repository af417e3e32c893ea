//! Error types for the credit pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while configuring or running the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("cannot load {dataset} from {path}: {source}")]
    Dataset {
        dataset: &'static str,
        path: PathBuf,
        source: floodosp_core::Error,
    },

    #[error("no communities to process")]
    NoCommunities,

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("cannot write output {path}: {source}")]
    Output {
        path: PathBuf,
        source: floodosp_core::Error,
    },

    #[error("cannot write results {path}: {source}")]
    ResultsWrite {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("core error: {0}")]
    Core(#[from] floodosp_core::Error),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
