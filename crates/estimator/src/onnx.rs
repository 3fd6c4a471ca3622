use std::path::Path;

use ndarray::{Array2, Array4, CowArray, Ix2};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};
use tracing::info;

use tempo_domain::TempoError;

use crate::tempo::ClassPredictor;

/// Runs an exported tempo network through ONNX Runtime.
pub struct OnnxPredictor {
    session: Session,
}

impl OnnxPredictor {
    pub fn load(model: &str, path: &Path) -> Result<Self, TempoError> {
        info!("loading model weights: {:?}", path);
        let environment = Environment::builder()
            .with_name("tempo-cnn")
            .build()
            .map_err(|err| TempoError::model_load(model, err))?
            .into_arc();
        let session = SessionBuilder::new(&environment)
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level1))
            .and_then(|builder| builder.with_intra_threads(1))
            .and_then(|builder| builder.with_model_from_file(path))
            .map_err(|err| TempoError::model_load(model, err))?;
        Ok(Self { session })
    }
}

impl ClassPredictor for OnnxPredictor {
    fn predict(&self, input: Array4<f32>) -> Result<Array2<f32>, TempoError> {
        let input = CowArray::from(input.into_dyn());
        let tensor = Value::from_array(self.session.allocator(), &input)
            .map_err(TempoError::estimation)?;
        let outputs = self
            .session
            .run(vec![tensor])
            .map_err(TempoError::estimation)?;
        let output = outputs
            .first()
            .ok_or_else(|| TempoError::estimation("model produced no outputs"))?;
        let extracted = output
            .try_extract::<f32>()
            .map_err(TempoError::estimation)?;
        let probabilities = extracted
            .view()
            .to_owned()
            .into_dimensionality::<Ix2>()
            .map_err(TempoError::estimation)?;
        Ok(probabilities)
    }
}
