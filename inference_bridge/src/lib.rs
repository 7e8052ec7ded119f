mod bridge;
mod decoder;
mod detection;
mod error;
mod labels;
mod ort_backend;
mod postprocess;
mod registry;
mod request;
mod server;
mod service;

pub mod config;

pub use bridge::{Bridge, BridgeReply, ModelStatus};
pub use detection::{BoundingBox, Detection};
pub use error::BridgeError;
pub use labels::ClassLabels;
pub use ort_backend::OrtBackend;
pub use registry::{ModelBackend, ModelConfig, ModelRegistry, ModelSession};
pub use request::{ArgValue, BridgeRequest, MethodCall};
pub use server::start_server;
