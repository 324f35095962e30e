// src/error.rs
//
// Two failure families with different propagation rules:
//   - GestureError: programming/data-shape errors, returned immediately.
//   - LoadError: fatal to a model package load, surfaced to the caller of `load`.
// Per-frame "not ready" conditions are never errors; the recognizer logs them
// and falls back to the cached prediction.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GestureError {
    #[error("unknown feature slot \"{0}\"")]
    UnknownSlot(String),

    #[error("flat buffer has {actual} values, expected {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("target frame count must be greater than 1, got {0}")]
    InvalidFrameCount(usize),

    #[error("operation requires a non-empty sequence")]
    EmptySequence,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("package source has neither a cache path nor a url")]
    NoSource,

    #[error("failed to read cached model package {path}")]
    Cache {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch model package from {url}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("model package is not a readable archive")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to read archive member {name}")]
    Member {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("archive member {name} exceeds {limit} bytes")]
    MemberTooLarge { name: String, limit: u64 },

    #[error("no {extension} file found in model package")]
    MissingMember { extension: String },

    #[error("model package contains more than one {extension} file ({first}, {second})")]
    DuplicateMember {
        extension: String,
        first: String,
        second: String,
    },

    #[error("invalid model metadata")]
    Metadata(#[from] serde_json::Error),

    #[error("invalid model metadata: {0}")]
    InvalidMetadata(String),

    #[error("inference engine failed to initialize model {name}")]
    Initialize {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}
