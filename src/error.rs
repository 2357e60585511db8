use thiserror::Error;

/// Errors that can occur while configuring, running or persisting a survey.
#[derive(Debug, Error)]
pub enum Error {
    /// Rule numbers must lie in `0..=255`.
    #[error("rule number {0} out of range (expected 0..=255)")]
    RuleOutOfRange(i64),

    /// Lattice side must be odd and positive so a unique center cell exists.
    #[error("invalid lattice size {0} (must be odd and positive)")]
    InvalidLatticeSize(usize),

    /// At least one generation must be simulated.
    #[error("generation count must be positive")]
    InvalidGenerations,

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame dimensions do not fit a GIF header.
    #[error("image size {width}x{height} exceeds the GIF limit of 65535 pixels")]
    ImageSize { width: u64, height: u64 },

    /// GIF encoder error.
    #[error("gif encoding error: {0}")]
    Gif(#[from] gif::EncodingError),

    /// Worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Malformed line in a classification table.
    #[error("parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
