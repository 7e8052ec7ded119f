use crate::{
    error::BridgeError,
    registry::{ModelBackend, ModelConfig, ModelSession},
};
use ndarray::{ArrayD, ArrayView4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};

/// ONNX Runtime execution backend.
pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Result<Self, BridgeError> {
        ort::init()
            .commit()
            .map_err(|e| BridgeError::ModelLoadFailure(format!("onnx runtime init: {}", e)))?;
        Ok(Self)
    }
}

impl ModelBackend for OrtBackend {
    type Session = OrtSession;

    fn load(&self, config: &ModelConfig) -> Result<OrtSession, BridgeError> {
        let session = Session::builder()
            .and_then(|builder| builder.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|builder| builder.commit_from_file(&config.model_path))
            .map_err(|e| BridgeError::ModelLoadFailure(e.to_string()))?;

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| BridgeError::ModelLoadFailure("model has no outputs".to_string()))?;

        tracing::info!(
            model = %config.model_path.display(),
            output = %output_name,
            "ONNX session created"
        );

        Ok(OrtSession {
            session,
            output_name,
        })
    }
}

pub struct OrtSession {
    session: Session,
    output_name: String,
}

impl ModelSession for OrtSession {
    fn run(&mut self, input: ArrayView4<'_, f32>) -> Result<ArrayD<f32>, BridgeError> {
        let owned_buffer;
        let input_view = if input.is_standard_layout() {
            input
        } else {
            owned_buffer = input.to_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)
            .map_err(|e| BridgeError::InferenceError(format!("failed to build tensor: {}", e)))?;

        let input_tensor = ort::inputs![tensor_ref];

        let outputs = self
            .session
            .run(input_tensor)
            .map_err(|e| BridgeError::InferenceError(e.to_string()))?;

        let (shape, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                BridgeError::InferenceError(format!("failed to extract tensor: {}", e))
            })?;

        let ix = shape.to_ixdyn();
        ArrayD::from_shape_vec(ix, data.to_vec())
            .map_err(|e| BridgeError::InferenceError(format!("invalid tensor shape: {}", e)))
    }
}
