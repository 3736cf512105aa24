/// Default classifier input size (width and height).
pub const DEFAULT_TARGET_SIZE: u32 = 128;

/// Default minimum hand presence score accepted from the landmark model.
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f64 = 0.5;

/// Default label catalog: digits followed by the latin alphabet, in the
/// order of the classifier's output layer.
pub const DEFAULT_LABELS: &[&str] = &[
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "A", "B", "C", "D", "E", "F", "G", "H", "I",
    "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
];

/// Label reported when the classifier's argmax falls outside the catalog.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Wire text for the "no hand detected" result.
pub const NO_HAND_DETECTED: &str = "No hand detected";

/// Hand-landmark model input size when the model doesn't declare one.
pub const DEFAULT_HAND_MODEL_INPUT_SIZE: u32 = 224;

/// Landmarks emitted per hand by the landmark model.
pub const HAND_LANDMARK_COUNT: usize = 21;
