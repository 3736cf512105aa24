use crate::classification::domain::label_catalog::Label;
use crate::shared::constants::NO_HAND_DETECTED;

/// Outcome of classifying one frame.
#[derive(Clone, Debug, PartialEq)]
pub enum PredictionResult {
    Label {
        label: Label,
        /// Full classifier distribution, in catalog order.
        confidences: Vec<f32>,
    },
    /// No hand in the frame, or the detected region had zero area.
    NoHandDetected,
}

impl PredictionResult {
    /// Text sent to clients in a `translation` event.
    pub fn text(&self) -> &str {
        match self {
            PredictionResult::Label { label, .. } => label.name(),
            PredictionResult::NoHandDetected => NO_HAND_DETECTED,
        }
    }

    /// Confidence of the predicted label, if any.
    pub fn confidence(&self) -> Option<f32> {
        match self {
            PredictionResult::Label {
                label: Label::Catalog { index, .. },
                confidences,
            } => confidences.get(*index).copied(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_of_no_hand() {
        assert_eq!(PredictionResult::NoHandDetected.text(), "No hand detected");
        assert_eq!(PredictionResult::NoHandDetected.confidence(), None);
    }

    #[test]
    fn test_text_and_confidence_of_label() {
        let result = PredictionResult::Label {
            label: Label::Catalog {
                index: 1,
                name: "B".into(),
            },
            confidences: vec![0.1, 0.8, 0.1],
        };
        assert_eq!(result.text(), "B");
        assert_eq!(result.confidence(), Some(0.8));
    }

    #[test]
    fn test_unknown_label_has_no_confidence() {
        let result = PredictionResult::Label {
            label: Label::Unknown,
            confidences: vec![0.1, 0.8],
        };
        assert_eq!(result.text(), "Unknown");
        assert_eq!(result.confidence(), None);
    }
}
