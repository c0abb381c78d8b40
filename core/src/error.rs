use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading extension data.
///
/// Resolution itself never returns these for ordinary data gaps: a fragment
/// that fails to load is logged and skipped. They surface from the reader,
/// the manifest scan and the config loader.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {} as {format}: {message}", path.display())]
    Decode {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("unsupported file format for {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("manifest error in {}: {message}", path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("theme include cycle: {} was already visited", path.display())]
    IncludeCycle { path: PathBuf },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
