use crate::{decoder, detection::Detection, error::BridgeError, labels::ClassLabels, postprocess};
use ndarray::{ArrayD, ArrayView4};
use parking_lot::Mutex;
use std::path::PathBuf;

/// Configuration accepted from `initializeModel`. Immutable once installed;
/// a later `initializeModel` replaces it wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model_path: PathBuf,
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

/// Materializes model artifacts into runnable sessions.
pub trait ModelBackend: Send + Sync + 'static {
    type Session: ModelSession;

    fn load(&self, config: &ModelConfig) -> Result<Self::Session, BridgeError>;
}

/// A loaded model's forward pass. `run` takes `&mut self` because engine
/// sessions require exclusive access, but it must not invalidate the
/// session: a failed pass leaves the model usable for subsequent calls.
pub trait ModelSession: Send + 'static {
    fn run(&mut self, input: ArrayView4<'_, f32>) -> Result<ArrayD<f32>, BridgeError>;
}

struct LoadedModel<S> {
    config: ModelConfig,
    session: S,
}

/// Owns the single active model. The mutex serializes `install` against
/// `infer`, so a model swap can never race an in-flight inference.
pub struct ModelRegistry<B: ModelBackend> {
    backend: B,
    active: Mutex<Option<LoadedModel<B::Session>>>,
}

impl<B: ModelBackend> ModelRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            active: Mutex::new(None),
        }
    }

    /// Load the model described by `config` and make it the active one.
    ///
    /// The replacement is fully materialized before the previous model is
    /// released; on failure the previous model, if any, stays active.
    pub fn install(&self, config: ModelConfig) -> Result<(), BridgeError> {
        let mut guard = self.active.lock();
        let session = self.backend.load(&config)?;

        if let Some(previous) = guard.take() {
            tracing::info!(
                previous = %previous.config.model_path.display(),
                replacement = %config.model_path.display(),
                "replacing active model"
            );
            drop(previous);
        }

        tracing::info!(
            model = %config.model_path.display(),
            input_size = config.input_size,
            "model installed"
        );
        *guard = Some(LoadedModel { config, session });
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn active_config(&self) -> Option<ModelConfig> {
        self.active.lock().as_ref().map(|model| model.config.clone())
    }

    /// Decode, run the forward pass, and post-process under the registry
    /// lock. Fails with `ModelNotLoaded` before touching the image if no
    /// model is active.
    pub fn infer(
        &self,
        image_data: &[u8],
        labels: &ClassLabels,
    ) -> Result<Vec<Detection>, BridgeError> {
        let mut guard = self.active.lock();
        let model = guard.as_mut().ok_or(BridgeError::ModelNotLoaded)?;

        let (input, orig_width, orig_height) =
            decoder::decode_image(image_data, model.config.input_size)?;
        let raw = model.session.run(input.view())?;
        let candidates =
            postprocess::parse_output(&raw, model.config.input_size, orig_width, orig_height)?;

        Ok(postprocess::finalize(candidates, &model.config, labels))
    }
}
