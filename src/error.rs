use std::path::PathBuf;

use thiserror::Error;

/// Failure classes for a render job. Every variant is terminal for the
/// current job; retries, if any, are the caller's decision.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to decode source image: {0}")]
    DecodeFailure(#[from] image::ImageError),

    #[error("invalid mosaic geometry: {0}")]
    InvalidGeometry(String),

    #[error("font asset '{path}' unusable: {reason}")]
    ResourceNotFound { path: PathBuf, reason: String },

    #[error("could not open video source '{path}': {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("video source '{0}' contains no readable frames")]
    EmptySource(PathBuf),

    #[error("output frame writer failed: {0}")]
    WriterInitFailure(String),

    #[error("final transcode failed: {0}")]
    TranscodeFailure(String),
}
