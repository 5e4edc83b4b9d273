use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the upstream API. Always fatal for the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("http {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid json from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("bootstrap payload has no current gameweek")]
    NoCurrentGameweek,

    #[error("standings for league {0} carry no league block")]
    MissingLeague(u32),
}

/// A single manager's picks payload could not be summarised.
/// The caller drops that manager and carries on.
#[derive(Debug, Error)]
pub enum PickError {
    #[error("payload has no picks list")]
    MissingPicks,

    #[error("payload has no entry_history block")]
    MissingEntryHistory,

    #[error("no pick is flagged as captain")]
    MissingCaptain,

    #[error("no pick is flagged as vice-captain")]
    MissingViceCaptain,

    #[error("malformed picks payload: {0}")]
    Malformed(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("vector {index} has length {found}, expected {expected}")]
    Ragged {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("vector {index} contains a non-finite value")]
    NonFinite { index: usize },

    #[error("{0} decomposition failed")]
    Decomposition(&'static str),
}

/// Everything that can abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}
