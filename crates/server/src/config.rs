use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use handsign_core::classification::domain::label_catalog::LabelCatalog;
use handsign_core::pipeline::infrastructure::inference_pool::DEFAULT_QUEUE_CAPACITY;
use handsign_core::shared::startup_error::StartupError;

/// Real-time hand sign classification over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "handsign-server")]
pub struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Sign classifier ONNX model.
    #[arg(long)]
    pub classifier_model: PathBuf,

    /// Download source for the classifier when the path does not exist.
    #[arg(long)]
    pub classifier_url: Option<String>,

    /// Hand landmark ONNX model.
    #[arg(long)]
    pub hand_model: PathBuf,

    /// Download source for the hand model when the path does not exist.
    #[arg(long)]
    pub hand_model_url: Option<String>,

    /// Label catalog in classifier output order (comma-separated).
    #[arg(long, value_delimiter = ',', conflicts_with = "labels_file")]
    pub labels: Option<Vec<String>>,

    /// File with one label per line, in classifier output order.
    #[arg(long)]
    pub labels_file: Option<PathBuf>,

    /// Classifier input width.
    #[arg(long, default_value = "128")]
    pub target_width: u32,

    /// Classifier input height.
    #[arg(long, default_value = "128")]
    pub target_height: u32,

    /// Minimum hand presence score (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    pub min_detection_confidence: f64,

    /// Inference workers, each with its own model instances.
    #[arg(long, default_value = "1")]
    pub workers: usize,

    /// Frames that may wait for a free worker before new ones are rejected.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Write every normalized hand crop to this directory.
    #[arg(long)]
    pub debug_crop_dir: Option<PathBuf>,
}

impl Cli {
    /// Rejects out-of-range values before any model is loaded.
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.target_width == 0 || self.target_height == 0 {
            return Err(StartupError::InvalidConfig(format!(
                "target size must be positive, got {}x{}",
                self.target_width, self.target_height
            )));
        }
        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return Err(StartupError::InvalidConfig(format!(
                "min detection confidence must be between 0.0 and 1.0, got {}",
                self.min_detection_confidence
            )));
        }
        if self.workers == 0 {
            return Err(StartupError::InvalidConfig(
                "at least one worker is required".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(StartupError::InvalidConfig(
                "queue capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Label catalog from `--labels`, `--labels-file`, or the 36-label default.
    pub fn catalog(&self) -> Result<LabelCatalog, StartupError> {
        match (&self.labels, &self.labels_file) {
            (Some(labels), _) => LabelCatalog::new(
                labels
                    .iter()
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty())
                    .collect(),
            ),
            (None, Some(path)) => LabelCatalog::from_file(path),
            (None, None) => Ok(LabelCatalog::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(extra: &[&str]) -> Result<Cli, clap::Error> {
        let mut args = vec![
            "handsign-server",
            "--classifier-model",
            "sign.onnx",
            "--hand-model",
            "hand.onnx",
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args)
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.listen, "0.0.0.0:5000".parse().unwrap());
        assert_eq!((cli.target_width, cli.target_height), (128, 128));
        assert_eq!(cli.min_detection_confidence, 0.5);
        assert_eq!(cli.workers, 1);
        assert_eq!(cli.queue_capacity, 32);
        assert!(cli.validate().is_ok());
        assert_eq!(cli.catalog().unwrap().len(), 36);
    }

    #[test]
    fn test_models_are_required() {
        assert!(Cli::try_parse_from(["handsign-server"]).is_err());
    }

    #[rstest]
    #[case::confidence_above_one(&["--min-detection-confidence", "1.5"])]
    #[case::confidence_negative(&["--min-detection-confidence=-0.1"])]
    #[case::zero_workers(&["--workers", "0"])]
    #[case::zero_queue(&["--queue-capacity", "0"])]
    #[case::zero_width(&["--target-width", "0"])]
    fn test_invalid_values_are_rejected(#[case] extra: &[&str]) {
        let cli = parse(extra).unwrap();
        assert!(matches!(cli.validate(), Err(StartupError::InvalidConfig(_))));
    }

    #[test]
    fn test_labels_override() {
        let cli = parse(&["--labels", "hello, thanks ,yes"]).unwrap();
        let catalog = cli.catalog().unwrap();
        assert_eq!(catalog.labels(), &["hello", "thanks", "yes"]);
    }

    #[test]
    fn test_labels_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "yes\nno\n").unwrap();
        let cli = parse(&["--labels-file", path.to_str().unwrap()]).unwrap();
        assert_eq!(cli.catalog().unwrap().len(), 2);
    }

    #[test]
    fn test_labels_and_labels_file_conflict() {
        assert!(parse(&["--labels", "a", "--labels-file", "l.txt"]).is_err());
    }

    #[test]
    fn test_empty_labels_are_rejected() {
        let cli = parse(&["--labels", " , "]).unwrap();
        assert!(matches!(cli.catalog(), Err(StartupError::EmptyCatalog)));
    }
}
