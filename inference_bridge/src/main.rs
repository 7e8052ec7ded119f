use inference_bridge::{config::get_configuration, start_server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ort=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_level(true))
        .init();

    let config = get_configuration().expect("failed to load config");

    start_server(config).await?;

    Ok(())
}
