use crate::{
    bridge::Bridge,
    config::Config,
    labels::ClassLabels,
    ort_backend::OrtBackend,
    registry::ModelBackend,
    service::BridgeService,
};
use bridge_proto::detection_bridge_server::DetectionBridgeServer;
use tokio::signal;
use tonic::transport::server::Router;
use tonic::transport::Server;

pub struct GrpcServer {
    router: Router,
    addr: String,
}

impl GrpcServer {
    pub async fn new<B: ModelBackend>(bridge: Bridge<B>, addr: &str) -> Self {
        let bridge_service = BridgeService::new(bridge);
        let reflection_service = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(bridge_proto::FILE_DESCRIPTOR_SET)
            .build_v1alpha()
            .unwrap();

        let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<DetectionBridgeServer<BridgeService<B>>>()
            .await;

        let router = Server::builder()
            .add_service(DetectionBridgeServer::new(bridge_service))
            .add_service(reflection_service)
            .add_service(health_service);

        Self {
            router,
            addr: addr.to_string(),
        }
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.addr.parse().expect("failed to parse address");

        tracing::info!("Detection bridge listening on {}", self.addr);

        let shutdown = async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown")
        };

        self.router.serve_with_shutdown(addr, shutdown).await?;
        Ok(())
    }
}

pub async fn start_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let backend = OrtBackend::new().expect("failed to instantiate onnx runtime backend");
    let labels = ClassLabels::from_file(&config.labels.get_path())?;
    tracing::info!("Loaded {} class labels", labels.len());

    let bridge = Bridge::new(backend, labels);

    let addr = config.server.get_address();
    let grpc_server = GrpcServer::new(bridge, &addr).await;

    grpc_server.run().await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
