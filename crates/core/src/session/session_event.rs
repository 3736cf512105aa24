use crate::classification::domain::prediction::PredictionResult;
use crate::pipeline::pipeline_error::PipelineError;

/// Result of one frame event, addressed to the connection that sent it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// A label, or the "No hand detected" text.
    Translation(String),
    Error(String),
}

impl SessionEvent {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Translation(_) => "translation",
            SessionEvent::Error(_) => "error",
        }
    }

    pub fn data(&self) -> &str {
        match self {
            SessionEvent::Translation(text) | SessionEvent::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SessionEvent::Error(_))
    }

    pub fn failed(message: impl std::fmt::Display) -> Self {
        SessionEvent::Error(format!("Failed to process frame: {message}"))
    }
}

impl From<Result<PredictionResult, PipelineError>> for SessionEvent {
    fn from(result: Result<PredictionResult, PipelineError>) -> Self {
        match result {
            Ok(prediction) => SessionEvent::Translation(prediction.text().to_string()),
            Err(e) => SessionEvent::failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::domain::label_catalog::Label;

    #[test]
    fn test_prediction_becomes_translation() {
        let event = SessionEvent::from(Ok(PredictionResult::Label {
            label: Label::Catalog {
                index: 0,
                name: "A".into(),
            },
            confidences: vec![1.0],
        }));
        assert_eq!(event, SessionEvent::Translation("A".into()));
        assert_eq!(event.name(), "translation");
    }

    #[test]
    fn test_no_hand_becomes_translation_text() {
        let event = SessionEvent::from(Ok(PredictionResult::NoHandDetected));
        assert_eq!(event.data(), "No hand detected");
        assert!(!event.is_error());
    }

    #[test]
    fn test_error_is_prefixed() {
        let event = SessionEvent::from(Err(PipelineError::DetectionFailed("boom".into())));
        assert_eq!(event.name(), "error");
        assert_eq!(
            event.data(),
            "Failed to process frame: hand detection failed: boom"
        );
    }
}
