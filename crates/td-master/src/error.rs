//! Control-side error types.

use std::path::PathBuf;

use td_formats::FormatError;

/// Why a deck operation was refused. Deck state is unchanged whenever one
/// of these is returned.
#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("playlist index {index} out of range (playlist has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },
    /// The render side has not drained earlier commands yet.
    #[error("command queue is full")]
    QueueFull,
    #[error("no stream loaded")]
    NoStream,
}

/// Configuration file errors. Loading never fails (it falls back to
/// defaults); only saving reports these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
