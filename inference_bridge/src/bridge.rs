use crate::{
    detection::Detection,
    error::BridgeError,
    labels::ClassLabels,
    registry::{ModelBackend, ModelConfig, ModelRegistry},
    request::{BridgeRequest, MethodCall},
};
use std::sync::Arc;
use tokio::task;

/// Successful outcome of a dispatched method call.
#[derive(Debug)]
pub enum BridgeReply {
    Initialized(bool),
    Detections(Vec<Detection>),
}

/// Read-only view of the registry, for embedding callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStatus {
    pub loaded: bool,
    pub config: Option<ModelConfig>,
}

/// The dispatcher: parses channel requests once into [`BridgeRequest`] and
/// routes them through registry, decoder, engine and post-processor.
///
/// Decode, forward pass and post-processing run on the blocking thread pool;
/// the caller awaits the result. No timeout is imposed here: a caller that
/// stops waiting drops the future and the in-flight pass completes with its
/// result discarded.
pub struct Bridge<B: ModelBackend> {
    registry: Arc<ModelRegistry<B>>,
    labels: Arc<ClassLabels>,
}

impl<B: ModelBackend> Clone for Bridge<B> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            labels: Arc::clone(&self.labels),
        }
    }
}

impl<B: ModelBackend> Bridge<B> {
    pub fn new(backend: B, labels: ClassLabels) -> Self {
        Self {
            registry: Arc::new(ModelRegistry::new(backend)),
            labels: Arc::new(labels),
        }
    }

    pub async fn handle(&self, call: MethodCall) -> Result<BridgeReply, BridgeError> {
        match BridgeRequest::parse(call)? {
            BridgeRequest::InitializeModel(config) => self
                .initialize_model(config)
                .await
                .map(BridgeReply::Initialized),
            BridgeRequest::ProcessImage { image } => self
                .process_image(image)
                .await
                .map(BridgeReply::Detections),
        }
    }

    pub async fn initialize_model(&self, config: ModelConfig) -> Result<bool, BridgeError> {
        let registry = Arc::clone(&self.registry);
        task::spawn_blocking(move || registry.install(config))
            .await
            .map_err(|e| BridgeError::ModelLoadFailure(format!("load task failed: {}", e)))??;
        Ok(true)
    }

    pub async fn process_image(&self, image: Vec<u8>) -> Result<Vec<Detection>, BridgeError> {
        let registry = Arc::clone(&self.registry);
        let labels = Arc::clone(&self.labels);
        let detections = task::spawn_blocking(move || registry.infer(&image, &labels))
            .await
            .map_err(|e| BridgeError::InferenceError(format!("inference task failed: {}", e)))??;

        tracing::debug!("Returning {} detections", detections.len());
        for (i, detection) in detections.iter().enumerate() {
            tracing::debug!(
                "Detection {}: label={}, confidence={:.3}, bbox=({:.1}, {:.1}, {:.1}, {:.1})",
                i,
                detection.label,
                detection.confidence,
                detection.bounding_box.x,
                detection.bounding_box.y,
                detection.bounding_box.width,
                detection.bounding_box.height
            );
        }

        Ok(detections)
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            loaded: self.registry.is_loaded(),
            config: self.registry.active_config(),
        }
    }
}
