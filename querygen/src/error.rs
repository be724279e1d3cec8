//! Error types for a generation run.
//!
//! - [`ConfigError`]: the run never starts.
//! - [`AttemptError`]: one attempt is lost, the run goes on.
//! - [`SinkError`]: writing `map.csv` or `meta.json` failed.
//! - [`RunError`]: the run stops; outputs already on disk stay valid.

use std::path::PathBuf;

use scene::engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required option `{0}`")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("scene engine: {0}")]
    Engine(#[from] EngineError),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize metadata: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to list inputs in {path}: {source}")]
    ListInputs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create output directory {path}: {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("output directory {0} already exists (set `overwrite` to reuse it)")]
    OutputExists(PathBuf),

    #[error(transparent)]
    Sink(#[from] SinkError),
}
