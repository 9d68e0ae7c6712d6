//! File handling for the twindeck player.
//!
//! Everything here does I/O and allocates, so it runs on the control thread
//! (or a worker) and hands finished [`StreamData`] to the engine.

mod decode;
mod metadata;
mod wav_format;

use std::path::Path;
use td_ir::StreamData;

pub use decode::decode_file;
pub use metadata::{read_metadata, TrackMetadata, UNKNOWN_ARTIST};
pub use wav_format::{load_wav, wav_bytes, write_wav};

/// Extensions the loader accepts, lower case.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "m4a", "aac"];

/// Error type for file loading.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// File does not exist or is not a regular file
    #[error("file not found: {0}")]
    NotFound(String),
    /// Invalid file header or magic bytes
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// Unexpected end of file
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// Codec or container the decoder cannot handle
    #[error("unsupported format: {0}")]
    Unsupported(String),
    /// Decoder failure after the stream was opened
    #[error("decode error: {0}")]
    Decode(String),
    /// I/O error
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wildcard list for file choosers, e.g. `*.wav;*.mp3;...`.
pub fn wildcard_pattern() -> String {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!("*.{ext}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// True if the path's extension is one the loader accepts.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode an audio file into memory.
///
/// PCM WAV files go through the built-in parser; everything else is handed
/// to symphonia. A WAV the built-in parser rejects (float or extensible
/// formats, for instance) is retried with symphonia.
pub fn load_stream(path: &Path) -> Result<StreamData, FormatError> {
    if !path.is_file() {
        return Err(FormatError::NotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if ext == "wav" {
        let data = std::fs::read(path)?;
        match load_wav(&data) {
            Ok(stream) => return Ok(stream),
            Err(FormatError::Unsupported(reason)) => {
                log::debug!("{}: {reason}, falling back to symphonia", path.display());
            }
            Err(e) => return Err(e),
        }
    }

    decode_file(path)
}
