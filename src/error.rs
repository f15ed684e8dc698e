// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Why a guild page could not be turned into table text.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("guild not found: {0}")]
    NotFound(String),

    #[error("access blocked by site ({0})")]
    Blocked(String),

    #[error("member table not found in page")]
    TableMissing,

    #[error("http error: {0}")]
    Http(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store is locked by another run: {0} (delete the file if no run is active)")]
    Locked(PathBuf),

    #[error("sheet does not exist: {sheet_id}/{sheet}")]
    MissingSheet { sheet_id: String, sheet: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io { path: path.into(), source }
    }
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("scrape of {0} produced no members; refusing to reconcile")]
    EmptyRoster(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("fallback write failed at {path}: {source}")]
    Fallback {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
