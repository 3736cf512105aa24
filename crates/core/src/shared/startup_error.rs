use thiserror::Error;

use crate::shared::model_resolver::ModelResolveError;

/// Configuration or model problems that must abort process startup.
///
/// None of these are ever reported per request: a server that starts has a
/// loaded model whose shape matches the configured tensor and catalog.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    ModelResolve(#[from] ModelResolveError),
    #[error("failed to load model {path}: {message}")]
    ModelLoad { path: String, message: String },
    #[error("classifier expects input {expected}, configured tensor is {configured}")]
    ShapeMismatch { expected: String, configured: String },
    #[error("classifier has {outputs} outputs but the label catalog has {labels} entries")]
    CatalogMismatch { outputs: usize, labels: usize },
    #[error("label catalog is empty")]
    EmptyCatalog,
}

impl StartupError {
    pub fn model_load(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::ModelLoad {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
