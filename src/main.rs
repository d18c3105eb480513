//! Stream Anomaly entrypoint: serves the scoring API until Ctrl+C.

use stream_anomaly::{
    config::ServiceConfig,
    logging::StructuredLogger,
    service::{build_router, shutdown_signal, ServiceState},
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("STREAM_ANOMALY_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let (config, load_error) = match ServiceConfig::try_load(&config_path) {
        Ok(config) => (config.unwrap_or_default(), None),
        Err(e) => (ServiceConfig::default(), Some(e)),
    };

    StructuredLogger::init(config.log.json, &config.log.level);
    if let Some(e) = load_error {
        warn!(error = %e, "using default config");
    }

    info!(
        listen = %config.listen,
        use_likelihood = config.detector.use_likelihood,
        tm_implementation = %config.detector.tm_implementation,
        "stream-anomaly starting"
    );

    let app = build_router(ServiceState::new(&config));
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("stream-anomaly stopping");
    Ok(())
}
