use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::classification::domain::classifier::{argmax, Classifier};
use crate::classification::domain::label_catalog::LabelCatalog;
use crate::classification::domain::prediction::PredictionResult;
use crate::detection::domain::hand_detector::HandDetector;
use crate::imaging::domain::frame_decoder::FrameDecoder;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::imaging::domain::normalizer::{bounding_box, crop, resize_with_padding, to_tensor};
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::frame::Frame;
use crate::shared::frame_payload::FramePayload;

/// Where to dump each normalized hand crop, for inspecting what the
/// classifier actually sees.
pub struct CropDump {
    pub writer: Arc<dyn ImageWriter>,
    pub path: PathBuf,
}

/// Single-frame pipeline: decode → detect → box → crop → pad-resize → classify.
///
/// Stateless across frames; one instance owns one detector and one
/// classifier and must not be shared between threads.
pub struct FramePipeline {
    decoder: Box<dyn FrameDecoder>,
    detector: Box<dyn HandDetector>,
    classifier: Box<dyn Classifier>,
    catalog: Arc<LabelCatalog>,
    target_width: u32,
    target_height: u32,
    logger: Box<dyn PipelineLogger>,
    crop_dump: Option<CropDump>,
}

impl FramePipeline {
    pub fn new(
        decoder: Box<dyn FrameDecoder>,
        detector: Box<dyn HandDetector>,
        classifier: Box<dyn Classifier>,
        catalog: Arc<LabelCatalog>,
        target_width: u32,
        target_height: u32,
    ) -> Self {
        Self {
            decoder,
            detector,
            classifier,
            catalog,
            target_width,
            target_height,
            logger: Box::new(NullPipelineLogger),
            crop_dump: None,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_crop_dump(mut self, crop_dump: Option<CropDump>) -> Self {
        self.crop_dump = crop_dump;
        self
    }

    /// Decodes an encoded frame and classifies the first detected hand.
    pub fn process_frame(&mut self, payload: &FramePayload) -> Result<PredictionResult, PipelineError> {
        let start = Instant::now();
        let decoded = self.decoder.decode(payload);
        self.logger.timing("decode", elapsed_ms(start));

        let result = decoded
            .map_err(|e| PipelineError::FrameDecode(e.to_string()))
            .and_then(|frame| self.process_decoded(&frame));
        self.logger.frame_completed(result.is_err());
        result
    }

    /// Runs detection, normalization and classification on a decoded frame.
    pub fn process_decoded(&mut self, frame: &Frame) -> Result<PredictionResult, PipelineError> {
        let start = Instant::now();
        let hands = self
            .detector
            .detect(frame)
            .map_err(|e| PipelineError::DetectionFailed(e.to_string()))?;
        self.logger.timing("detect", elapsed_ms(start));
        self.logger.metric("hands_detected", hands.len() as f64);

        // Single-hand policy: only the first reported hand is classified.
        let Some(landmarks) = hands.first() else {
            return Ok(PredictionResult::NoHandDetected);
        };

        let start = Instant::now();
        let bbox = bounding_box(landmarks, frame.width(), frame.height());
        let hand = crop(frame, &bbox);
        if hand.is_empty() {
            log::debug!("Degenerate hand region {bbox:?}");
            return Ok(PredictionResult::NoHandDetected);
        }
        let padded = resize_with_padding(&hand, self.target_width, self.target_height);
        self.dump_crop(&padded);
        let tensor = to_tensor(&padded);
        self.logger.timing("normalize", elapsed_ms(start));

        let start = Instant::now();
        let confidences = self
            .classifier
            .classify(&tensor)
            .map_err(|e| PipelineError::Classification(e.to_string()))?;
        self.logger.timing("classify", elapsed_ms(start));

        let index = argmax(&confidences).ok_or_else(|| {
            PipelineError::Classification("classifier returned no valid confidences".into())
        })?;
        Ok(PredictionResult::Label {
            label: self.catalog.resolve(index),
            confidences,
        })
    }

    /// Flushes the logger's summary. Called when the owning worker exits.
    pub fn summary(&self) {
        self.logger.summary();
    }

    fn dump_crop(&self, padded: &Frame) {
        if let Some(dump) = &self.crop_dump {
            if let Err(e) = dump.writer.write(&dump.path, padded) {
                log::warn!("Failed to write hand crop to {}: {e}", dump.path.display());
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::infrastructure::image_frame_decoder::ImageFrameDecoder;
    use crate::classification::domain::label_catalog::Label;
    use crate::detection::domain::hand_landmarks::HandLandmarkSet;
    use crate::imaging::domain::normalizer::NormalizedTensor;
    use std::io::Cursor;
    use std::path::Path;
    use std::sync::Mutex;

    // --- Stubs ---

    struct StubDetector {
        hands: Vec<HandLandmarkSet>,
        seen: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl StubDetector {
        fn new(hands: Vec<HandLandmarkSet>) -> Self {
            Self {
                hands,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl HandDetector for StubDetector {
        fn detect(
            &mut self,
            frame: &Frame,
        ) -> Result<Vec<HandLandmarkSet>, Box<dyn std::error::Error>> {
            self.seen
                .lock()
                .unwrap()
                .push((frame.width(), frame.height()));
            Ok(self.hands.clone())
        }
    }

    struct FailingDetector;

    impl HandDetector for FailingDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<HandLandmarkSet>, Box<dyn std::error::Error>> {
            Err("model runtime crashed".into())
        }
    }

    struct StubClassifier {
        confidences: Vec<f32>,
        calls: Arc<Mutex<Vec<NormalizedTensor>>>,
    }

    impl StubClassifier {
        fn new(confidences: Vec<f32>) -> Self {
            Self {
                confidences,
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl Classifier for StubClassifier {
        fn classify(
            &mut self,
            tensor: &NormalizedTensor,
        ) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
            self.calls.lock().unwrap().push(tensor.clone());
            Ok(self.confidences.clone())
        }
    }

    /// Ignores the payload and yields a fixed frame, or fails.
    struct StubDecoder(Option<Frame>);

    impl FrameDecoder for StubDecoder {
        fn decode(&self, _payload: &FramePayload) -> Result<Frame, Box<dyn std::error::Error>> {
            self.0.clone().ok_or_else(|| "unsupported payload".into())
        }
    }

    struct RecordingWriter {
        written: Mutex<Vec<(PathBuf, u32, u32)>>,
    }

    impl ImageWriter for RecordingWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.width(), frame.height()));
            Ok(())
        }
    }

    // --- Helpers ---

    fn catalog() -> Arc<LabelCatalog> {
        Arc::new(LabelCatalog::new(vec!["A".into(), "B".into(), "C".into()]).unwrap())
    }

    /// Landmarks spanning pixels (100,100)-(300,400) of a 640x480 frame.
    fn hand_in_640x480() -> HandLandmarkSet {
        HandLandmarkSet::new(vec![
            (100.0 / 640.0, 100.0 / 480.0),
            (200.0 / 640.0, 250.0 / 480.0),
            (300.0 / 640.0, 400.0 / 480.0),
        ])
    }

    fn png_payload(width: u32, height: u32) -> FramePayload {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([90, 120, 150]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        FramePayload::Binary(out.into_inner())
    }

    fn pipeline(detector: StubDetector, classifier: StubClassifier) -> FramePipeline {
        FramePipeline::new(
            Box::new(ImageFrameDecoder::new()),
            Box::new(detector),
            Box::new(classifier),
            catalog(),
            128,
            128,
        )
    }

    // --- Tests ---

    #[test]
    fn test_no_hand_skips_classifier() {
        let classifier = StubClassifier::new(vec![0.1, 0.8, 0.1]);
        let calls = classifier.calls.clone();
        let mut p = pipeline(StubDetector::new(vec![]), classifier);

        let result = p.process_frame(&png_payload(64, 48)).unwrap();
        assert_eq!(result, PredictionResult::NoHandDetected);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_detector_sees_decoded_frame() {
        let detector = StubDetector::new(vec![]);
        let seen = detector.seen.clone();
        let mut p = pipeline(detector, StubClassifier::new(vec![1.0, 0.0, 0.0]));

        p.process_frame(&png_payload(640, 480)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(640, 480)]);
    }

    #[test]
    fn test_hand_is_classified_with_catalog_label() {
        let classifier = StubClassifier::new(vec![0.1, 0.7, 0.2]);
        let calls = classifier.calls.clone();
        let mut p = pipeline(StubDetector::new(vec![hand_in_640x480()]), classifier);

        let result = p.process_frame(&png_payload(640, 480)).unwrap();
        assert_eq!(result.text(), "B");
        assert_eq!(
            result,
            PredictionResult::Label {
                label: Label::Catalog {
                    index: 1,
                    name: "B".into()
                },
                confidences: vec![0.1, 0.7, 0.2],
            }
        );

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!((calls[0].width(), calls[0].height()), (128, 128));
    }

    #[test]
    fn test_tall_hand_crop_is_padded_left_and_right() {
        let classifier = StubClassifier::new(vec![1.0, 0.0, 0.0]);
        let calls = classifier.calls.clone();
        let mut p = pipeline(StubDetector::new(vec![hand_in_640x480()]), classifier);

        p.process_frame(&png_payload(640, 480)).unwrap();

        // 200x300 crop → 85x128 pasted at x = 21
        let calls = calls.lock().unwrap();
        let t = calls[0].as_array();
        assert_eq!(t[[64, 20, 0]], 0.0);
        assert!(t[[64, 21, 0]] > 0.0);
        assert!(t[[64, 105, 0]] > 0.0);
        assert_eq!(t[[64, 106, 0]], 0.0);
        assert!(t.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_index_beyond_catalog_is_unknown() {
        let mut p = pipeline(
            StubDetector::new(vec![hand_in_640x480()]),
            StubClassifier::new(vec![0.0, 0.1, 0.1, 0.8]),
        );
        let result = p.process_frame(&png_payload(640, 480)).unwrap();
        assert_eq!(result.text(), "Unknown");
    }

    #[test]
    fn test_only_first_hand_is_used() {
        let second = HandLandmarkSet::new(vec![(0.0, 0.0), (0.01, 0.01)]);
        let classifier = StubClassifier::new(vec![1.0, 0.0, 0.0]);
        let calls = classifier.calls.clone();
        let mut p = pipeline(
            StubDetector::new(vec![hand_in_640x480(), second]),
            classifier,
        );
        p.process_frame(&png_payload(640, 480)).unwrap();
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_degenerate_hand_is_no_detection() {
        let classifier = StubClassifier::new(vec![1.0, 0.0, 0.0]);
        let calls = classifier.calls.clone();
        let coincident = HandLandmarkSet::new(vec![(0.5, 0.5), (0.5, 0.5)]);
        let mut p = pipeline(StubDetector::new(vec![coincident]), classifier);

        let result = p.process_frame(&png_payload(640, 480)).unwrap();
        assert_eq!(result, PredictionResult::NoHandDetected);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_payload_is_decode_error() {
        let mut p = pipeline(StubDetector::new(vec![]), StubClassifier::new(vec![1.0]));
        let result = p.process_frame(&FramePayload::Binary(b"garbage".to_vec()));
        assert!(matches!(result, Err(PipelineError::FrameDecode(_))));

        // The next valid frame is unaffected
        assert!(p.process_frame(&png_payload(8, 8)).is_ok());
    }

    #[test]
    fn test_frames_come_from_the_injected_decoder() {
        let detector = StubDetector::new(vec![]);
        let seen = detector.seen.clone();
        let mut p = FramePipeline::new(
            Box::new(StubDecoder(Some(Frame::zeroed(33, 21)))),
            Box::new(detector),
            Box::new(StubClassifier::new(vec![1.0])),
            catalog(),
            128,
            128,
        );
        p.process_frame(&FramePayload::Text("opaque".into())).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(33, 21)]);
    }

    #[test]
    fn test_decoder_failure_skips_detection() {
        let detector = StubDetector::new(vec![hand_in_640x480()]);
        let seen = detector.seen.clone();
        let mut p = FramePipeline::new(
            Box::new(StubDecoder(None)),
            Box::new(detector),
            Box::new(StubClassifier::new(vec![1.0])),
            catalog(),
            128,
            128,
        );
        match p.process_frame(&FramePayload::Binary(vec![1, 2, 3])) {
            Err(PipelineError::FrameDecode(msg)) => assert!(msg.contains("unsupported payload")),
            other => panic!("expected FrameDecode, got {other:?}"),
        }
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_detector_failure_is_not_an_empty_result() {
        let mut p = FramePipeline::new(
            Box::new(ImageFrameDecoder::new()),
            Box::new(FailingDetector),
            Box::new(StubClassifier::new(vec![1.0])),
            catalog(),
            128,
            128,
        );
        let result = p.process_frame(&png_payload(8, 8));
        match result {
            Err(PipelineError::DetectionFailed(msg)) => assert!(msg.contains("crashed")),
            other => panic!("expected DetectionFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_distribution_is_classification_error() {
        let mut p = pipeline(
            StubDetector::new(vec![hand_in_640x480()]),
            StubClassifier::new(vec![]),
        );
        let result = p.process_frame(&png_payload(640, 480));
        assert!(matches!(result, Err(PipelineError::Classification(_))));
    }

    #[test]
    fn test_crop_dump_receives_padded_crop() {
        let writer = Arc::new(RecordingWriter {
            written: Mutex::new(Vec::new()),
        });
        let mut p = pipeline(
            StubDetector::new(vec![hand_in_640x480()]),
            StubClassifier::new(vec![1.0, 0.0, 0.0]),
        )
        .with_crop_dump(Some(CropDump {
            writer: writer.clone(),
            path: PathBuf::from("hand_crop.png"),
        }));

        p.process_frame(&png_payload(640, 480)).unwrap();
        let written = writer.written.lock().unwrap();
        assert_eq!(*written, vec![(PathBuf::from("hand_crop.png"), 128, 128)]);
    }
}
