use crate::detection::domain::hand_landmarks::HandLandmarkSet;
use crate::shared::frame::Frame;

/// Domain interface for hand region detection.
///
/// An empty result means "no hand present"; an `Err` means detection could
/// not run at all. Implementations typically wrap a model runtime that is
/// not reentrant, hence `&mut self`.
pub trait HandDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandLandmarkSet>, Box<dyn std::error::Error>>;
}
