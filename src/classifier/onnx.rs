use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;

use super::preprocess::ImageTensor;
use super::{first_row, ClassifierError, SeverityClassifier};

/// Severity classifier backed by ONNX Runtime.
///
/// Uses interior mutability (Mutex) because ort::Session::run requires `&mut self`
/// but `SeverityClassifier` exposes `&self` so the handle can be shared across requests.
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl OnnxClassifier {
    /// Load an exported model (`.onnx`) taking a `[1, 224, 224, 3]` float input.
    pub fn load(model_path: &Path) -> Result<Self, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ClassifierError::ModelInit(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e: ort::Error| ClassifierError::ModelInit(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e: ort::Error| ClassifierError::ModelInit(format!("ONNX load failed: {e}")))?;

        tracing::info!(path = %model_path.display(), "ONNX severity classifier loaded");

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl SeverityClassifier for OnnxClassifier {
    fn classify(&self, input: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        use ort::value::TensorRef;

        let [n, h, w, c] = input.shape();
        let array = ndarray::Array4::from_shape_vec((n, h, w, c), input.as_slice().to_vec())
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let tensor = TensorRef::from_array_view(&array)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| ClassifierError::Inference(format!("ONNX inference failed: {e}")))?;

        // Output shape: [batch, classes]. Row length is validated downstream by the insight deriver.
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("Output extraction: {e}")))?;

        Ok(first_row(shape, data))
    }

    fn name(&self) -> &str {
        "onnx"
    }
}
