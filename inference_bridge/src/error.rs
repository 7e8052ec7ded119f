use thiserror::Error;
use tonic::Status;

/// Failures surfaced by the bridge. Each one is scoped to the request that
/// produced it; none of them invalidates an already-loaded model.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("method `{0}` is not implemented")]
    Unimplemented(String),
    #[error("invalid argument `{field}`: {reason}")]
    InvalidArgument {
        field: &'static str,
        reason: String,
    },
    #[error("failed to load model: {0}")]
    ModelLoadFailure(String),
    #[error("no model loaded, call initializeModel first")]
    ModelNotLoaded,
    #[error("failed to decode image: {0}")]
    DecodeError(String),
    #[error("inference failed: {0}")]
    InferenceError(String),
}

impl BridgeError {
    pub fn invalid_argument(field: &'static str, reason: impl Into<String>) -> Self {
        BridgeError::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }
}

impl From<BridgeError> for Status {
    fn from(err: BridgeError) -> Self {
        let message = err.to_string();
        match err {
            BridgeError::Unimplemented(_) => Status::unimplemented(message),
            BridgeError::InvalidArgument { .. } => Status::invalid_argument(message),
            BridgeError::DecodeError(_) => Status::invalid_argument(message),
            BridgeError::ModelNotLoaded => Status::failed_precondition(message),
            BridgeError::ModelLoadFailure(_) => Status::internal(message),
            BridgeError::InferenceError(_) => Status::internal(message),
        }
    }
}
