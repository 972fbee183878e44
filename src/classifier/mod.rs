//! Severity classifier adapter.
//!
//! The trained retinopathy model is an external artifact: image tensor in,
//! per-grade probability vector out. This module only preprocesses the
//! image and runs the forward pass; interpreting the output belongs to
//! `crate::insight`.

pub mod preprocess;

#[cfg(feature = "onnx-classifier")]
mod onnx;

#[cfg(feature = "onnx-classifier")]
pub use onnx::OnnxClassifier;
pub use preprocess::{ImageTensor, INPUT_SIZE};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::AppConfig;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding failed: {0}")]
    Decode(String),

    #[error("Classifier model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Classifier initialization: {0}")]
    ModelInit(String),

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// A forward pass through the severity model.
///
/// Implementations return the raw output row; length and normalization
/// are not checked here.
pub trait SeverityClassifier: Send + Sync {
    fn classify(&self, input: &ImageTensor) -> Result<Vec<f32>, ClassifierError>;

    /// Backend name for logs and the health endpoint.
    fn name(&self) -> &str;

    /// Preprocess the image at `path` and classify it.
    fn classify_path(&self, path: &Path) -> Result<Vec<f32>, ClassifierError> {
        let tensor = ImageTensor::from_path(path)?;
        self.classify(&tensor)
    }
}

/// First row of a model output tensor: the trailing dimension's worth of
/// values. A batch of N rows must not reach the deriver as one long vector.
#[cfg_attr(not(feature = "onnx-classifier"), allow(dead_code))]
pub(crate) fn first_row(shape: &[i64], data: &[f32]) -> Vec<f32> {
    let row_len = shape
        .last()
        .and_then(|&d| usize::try_from(d).ok())
        .map_or(data.len(), |d| d.min(data.len()));
    data[..row_len].to_vec()
}

/// Classifier that returns the same vector for every image.
///
/// Used in tests and for running the service without a model file.
pub struct FixedClassifier {
    probabilities: Vec<f32>,
}

impl FixedClassifier {
    pub fn new(probabilities: Vec<f32>) -> Self {
        Self { probabilities }
    }
}

impl SeverityClassifier for FixedClassifier {
    fn classify(&self, _input: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        Ok(self.probabilities.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Select the classifier backend from configuration.
pub fn load_classifier(
    config: &AppConfig,
) -> Result<Arc<dyn SeverityClassifier>, ClassifierError> {
    if let Some(fixed) = &config.fixed_prediction {
        tracing::warn!(
            prediction = ?fixed,
            "Using fixed prediction classifier; results are not real diagnoses"
        );
        return Ok(Arc::new(FixedClassifier::new(fixed.clone())));
    }
    load_model(&config.model_path)
}

#[cfg(feature = "onnx-classifier")]
fn load_model(model_path: &Path) -> Result<Arc<dyn SeverityClassifier>, ClassifierError> {
    Ok(Arc::new(OnnxClassifier::load(model_path)?))
}

#[cfg(not(feature = "onnx-classifier"))]
fn load_model(model_path: &Path) -> Result<Arc<dyn SeverityClassifier>, ClassifierError> {
    Err(ClassifierError::ModelInit(format!(
        "cannot load {}: built without the `onnx-classifier` feature",
        model_path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_classifier_ignores_input() {
        let classifier = FixedClassifier::new(vec![0.1, 0.2, 0.3, 0.2, 0.2]);
        let a = ImageTensor::from_image(&image::DynamicImage::new_rgb8(10, 10));
        let b = ImageTensor::from_image(&image::DynamicImage::new_rgb8(300, 20));
        assert_eq!(classifier.classify(&a).unwrap(), classifier.classify(&b).unwrap());
        assert_eq!(classifier.name(), "fixed");
    }

    #[test]
    fn first_row_of_batched_output() {
        let data: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
        assert_eq!(first_row(&[2, 5], &data), vec![0.0, 0.1, 0.2, 0.3, 0.4]);
        assert_eq!(first_row(&[1, 5], &data[..5]), data[..5].to_vec());
        assert_eq!(first_row(&[], &data[..3]), data[..3].to_vec());
    }

    #[test]
    fn classify_path_propagates_missing_file() {
        let classifier = FixedClassifier::new(vec![1.0, 0.0, 0.0, 0.0, 0.0]);
        let err = classifier
            .classify_path(Path::new("/nonexistent/fundus.jpg"))
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Io(_)));
    }

    #[test]
    fn load_prefers_fixed_prediction() {
        let config = AppConfig {
            fixed_prediction: Some(vec![0.0, 0.0, 1.0, 0.0, 0.0]),
            ..AppConfig::default()
        };
        let classifier = load_classifier(&config).unwrap();
        assert_eq!(classifier.name(), "fixed");
    }

    #[cfg(not(feature = "onnx-classifier"))]
    #[test]
    fn load_without_backend_fails() {
        let config = AppConfig::default();
        let err = load_classifier(&config).err().unwrap();
        assert!(matches!(err, ClassifierError::ModelInit(_)));
    }

    #[cfg(feature = "onnx-classifier")]
    #[test]
    fn load_missing_model_fails() {
        let config = AppConfig {
            model_path: PathBuf::from("/nonexistent/model.onnx"),
            ..AppConfig::default()
        };
        let err = load_classifier(&config).err().unwrap();
        assert!(matches!(err, ClassifierError::ModelNotFound(_)));
    }
}
