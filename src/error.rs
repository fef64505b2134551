use std::path::PathBuf;
use thiserror::Error;

/// Errors raised at the fallible edges of the synthesizer (files, codecs,
/// cancelled raster work). The generation pipeline itself never fails: it
/// clamps infeasible input and flags approximate results instead.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("raster {path} is malformed: {reason}")]
    MalformedRaster { path: PathBuf, reason: String },

    #[error("raster grid {width}x{height} does not match {len} cells")]
    InvalidGrid {
        width: usize,
        height: usize,
        len: usize,
    },

    #[error("seasonal step {0} was cancelled")]
    Cancelled(usize),

    #[error("background writer has shut down")]
    WriterClosed,
}

pub type SynthResult<T> = Result<T, SynthError>;
