//! Error types shared by the butterfly-osm routing crates
//!
//! Only data-integrity and environment failures live here. Expected outcomes
//! such as "no route between these points" are plain values returned by the
//! query engine and never surface as an `Error`.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for butterfly-osm routing operations
#[derive(Debug, Error)]
pub enum Error {
    /// An edge payload does not match its original/shortcut tag or its
    /// declared sequence lengths.
    #[error("malformed edge payload: {reason} (got {len} words)")]
    MalformedEdge { reason: &'static str, len: usize },

    /// A vertex id outside `0..vertex_count` was supplied.
    #[error("vertex {vertex} out of range (graph has {vertex_count} vertices)")]
    VertexOutOfRange { vertex: u32, vertex_count: u32 },

    /// An input edge carries a negative or non-finite weight.
    #[error("edge {from} -> {to} has invalid weight {weight}")]
    InvalidWeight { from: u32, to: u32, weight: f32 },

    /// Invalid contraction or query parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A shortcut could not be expanded back to the edges it replaced.
    #[error("cannot unpack shortcut {from} -> {to} via {via}")]
    UnpackFailed { from: u32, to: u32, via: u32 },

    /// A persisted file failed structural or checksum verification.
    #[error("invalid file format in {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience result type for butterfly-osm routing operations
pub type Result<T> = std::result::Result<T, Error>;
