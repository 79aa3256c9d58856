use std::process;

use clap::Parser;
use sensate_sensor::{
    cli::Cli,
    config::Config,
    core::{MeasurementGenerator, PayloadShape, Publisher},
    logger::LoggerManager,
    print_error,
};
use sensate_transport::Transport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cfg = Config::new(&cli).unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });

    let logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });

    info!("Starting sensate-sensor version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", cfg.logger.level);
    debug!("{:#?}", cfg.transport);

    let identity = cfg.sensor.identity().unwrap_or_else(|e| {
        error!("Invalid sensor identity: {}", e);
        process::exit(1);
    });

    let transport = sensate_transport::from_config(&cfg.transport).unwrap_or_else(|e| {
        error!("Failed to create {} transport: {}", cfg.transport.kind, e);
        process::exit(1);
    });
    info!(
        "Sensor '{}' publishing to {} via {}",
        identity.id(),
        cfg.transport.host,
        transport.name()
    );

    let shutdown = CancellationToken::new();
    let generator = MeasurementGenerator::new(PayloadShape::from(cfg.transport.kind));
    let mut publisher = Publisher::new(transport, identity, generator)
        .with_interval(cfg.sensor.interval())
        .with_retry(cfg.transport.retry.clone())
        .with_cancel_token(shutdown.child_token());

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            signal_token.cancel();
        }
    });

    if let Err(e) = publisher.run().await {
        error!("Stopping: {}", e);
        process::exit(1);
    }
    info!("Shutdown complete");
}
