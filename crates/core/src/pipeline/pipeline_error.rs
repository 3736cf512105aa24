use thiserror::Error;

/// Errors scoped to a single frame request.
///
/// None of these outlive the frame that raised them: they are reported to
/// the originating connection and the next frame starts clean.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid frame: {0}")]
    FrameDecode(String),
    #[error("hand detection failed: {0}")]
    DetectionFailed(String),
    #[error("classification failed: {0}")]
    Classification(String),
    #[error("inference worker panicked: {0}")]
    WorkerPanic(String),
}
