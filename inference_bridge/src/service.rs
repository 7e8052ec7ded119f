use crate::{
    bridge::{Bridge, BridgeReply},
    detection::Detection,
    registry::ModelBackend,
    request::{ArgValue, MethodCall},
};
use bridge_proto::{arg_value, detection_bridge_server::DetectionBridge, method_reply};
use std::collections::HashMap;
use tonic::{async_trait, Request, Response, Status};

/// gRPC adapter over the bridge: the channel carries the method-call
/// envelope, the bridge answers with a typed reply or a status code.
#[derive(Clone)]
pub struct BridgeService<B: ModelBackend> {
    bridge: Bridge<B>,
}

impl<B: ModelBackend> BridgeService<B> {
    pub fn new(bridge: Bridge<B>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl<B: ModelBackend> DetectionBridge for BridgeService<B> {
    async fn call(
        &self,
        request: Request<bridge_proto::MethodCall>,
    ) -> Result<Response<bridge_proto::MethodReply>, Status> {
        let call = decode_call(request.into_inner())?;
        tracing::debug!(method = %call.method, "dispatching method call");

        let reply = self.bridge.handle(call).await?;
        Ok(Response::new(encode_reply(reply)))
    }
}

fn decode_call(call: bridge_proto::MethodCall) -> Result<MethodCall, Status> {
    let mut args = HashMap::with_capacity(call.args.len());
    for (name, value) in call.args {
        let kind = value.kind.ok_or_else(|| {
            Status::invalid_argument(format!("argument `{}` carries no value", name))
        })?;
        let value = match kind {
            arg_value::Kind::Text(text) => ArgValue::Text(text),
            arg_value::Kind::Integer(integer) => ArgValue::Integer(integer),
            arg_value::Kind::Number(number) => ArgValue::Number(number),
            arg_value::Kind::Blob(blob) => ArgValue::Blob(blob),
            arg_value::Kind::Flag(flag) => ArgValue::Flag(flag),
        };
        args.insert(name, value);
    }
    Ok(MethodCall::new(call.method, args))
}

fn encode_reply(reply: BridgeReply) -> bridge_proto::MethodReply {
    let outcome = match reply {
        BridgeReply::Initialized(initialized) => method_reply::Outcome::Initialized(initialized),
        BridgeReply::Detections(detections) => {
            method_reply::Outcome::Detections(bridge_proto::DetectionBatch {
                detections: detections.into_iter().map(encode_detection).collect(),
            })
        }
    };
    bridge_proto::MethodReply {
        outcome: Some(outcome),
    }
}

fn encode_detection(detection: Detection) -> bridge_proto::Detection {
    bridge_proto::Detection {
        label: detection.label,
        confidence: detection.confidence,
        bounding_box: Some(bridge_proto::BoundingBox {
            x: detection.bounding_box.x,
            y: detection.bounding_box.y,
            width: detection.bounding_box.width,
            height: detection.bounding_box.height,
        }),
    }
}
