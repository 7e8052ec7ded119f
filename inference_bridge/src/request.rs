use crate::{error::BridgeError, registry::ModelConfig};
use std::collections::HashMap;
use std::path::PathBuf;

/// A value carried in the method-call argument map. Channel codecs do not
/// distinguish `1` from `1.0`, so float-typed fields also accept `Integer`.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Blob(Vec<u8>),
    Flag(bool),
}

/// A request as it arrives from the channel: a method name plus named
/// arguments.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: HashMap<String, ArgValue>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, args: HashMap<String, ArgValue>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }
}

/// The closed set of operations the bridge implements. Method-name dispatch
/// happens exactly once, in [`BridgeRequest::parse`]; everything downstream
/// matches on these variants.
#[derive(Debug, Clone)]
pub enum BridgeRequest {
    InitializeModel(ModelConfig),
    ProcessImage { image: Vec<u8> },
}

impl BridgeRequest {
    pub fn parse(call: MethodCall) -> Result<BridgeRequest, BridgeError> {
        let MethodCall { method, mut args } = call;
        match method.as_str() {
            "initializeModel" => {
                let model_path = take_text(&mut args, "modelPath")?;
                let input_size = take_positive_int(&mut args, "inputSize")?;
                let confidence_threshold = take_unit_float(&mut args, "confidenceThreshold")?;
                let iou_threshold = take_unit_float(&mut args, "iouThreshold")?;

                Ok(BridgeRequest::InitializeModel(ModelConfig {
                    model_path: PathBuf::from(model_path),
                    input_size,
                    confidence_threshold,
                    iou_threshold,
                }))
            }
            "processImage" => {
                let image = take_blob(&mut args, "image")?;
                Ok(BridgeRequest::ProcessImage { image })
            }
            _ => Err(BridgeError::Unimplemented(method)),
        }
    }
}

fn take(
    args: &mut HashMap<String, ArgValue>,
    field: &'static str,
) -> Result<ArgValue, BridgeError> {
    args.remove(field)
        .ok_or_else(|| BridgeError::invalid_argument(field, "missing"))
}

fn take_text(
    args: &mut HashMap<String, ArgValue>,
    field: &'static str,
) -> Result<String, BridgeError> {
    match take(args, field)? {
        ArgValue::Text(s) if !s.trim().is_empty() => Ok(s),
        ArgValue::Text(_) => Err(BridgeError::invalid_argument(
            field,
            "must be a non-empty string",
        )),
        _ => Err(BridgeError::invalid_argument(field, "must be a string")),
    }
}

fn take_positive_int(
    args: &mut HashMap<String, ArgValue>,
    field: &'static str,
) -> Result<u32, BridgeError> {
    match take(args, field)? {
        ArgValue::Integer(i) if i > 0 && i <= i64::from(u32::MAX) => Ok(i as u32),
        _ => Err(BridgeError::invalid_argument(
            field,
            "must be a positive integer",
        )),
    }
}

fn take_unit_float(
    args: &mut HashMap<String, ArgValue>,
    field: &'static str,
) -> Result<f32, BridgeError> {
    let value = match take(args, field)? {
        ArgValue::Number(n) => n,
        ArgValue::Integer(i) => i as f64,
        _ => return Err(BridgeError::invalid_argument(field, "must be a number")),
    };
    if (0.0..=1.0).contains(&value) {
        Ok(value as f32)
    } else {
        Err(BridgeError::invalid_argument(
            field,
            "must be within [0, 1]",
        ))
    }
}

fn take_blob(
    args: &mut HashMap<String, ArgValue>,
    field: &'static str,
) -> Result<Vec<u8>, BridgeError> {
    match take(args, field)? {
        ArgValue::Blob(bytes) => Ok(bytes),
        _ => Err(BridgeError::invalid_argument(
            field,
            "must be binary image data",
        )),
    }
}
