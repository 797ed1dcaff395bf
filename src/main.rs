use anyhow::Result;
use metron::config::Config;
use metron::coordinator::MeterCoordinator;
use metron::egd::EgdClient;
use metron::registry::CoordinatorRegistry;
use metron::web::{self, AppState};
use tokio::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;
    config.validate()?;

    metron::logging::init_logging(&config.logging)?;

    info!("Metron {} starting up", env!("APP_VERSION"));

    // Validate credentials once up front; a bad client id/secret is an
    // operator problem, not something the poll loop can recover from.
    let mut client = EgdClient::new(&config.api)?;
    client
        .get_access_token()
        .await
        .map_err(|e| anyhow::anyhow!("Credential validation failed: {}", e))?;
    info!("Credentials validated against the identity server");

    let coordinator = MeterCoordinator::new(
        Box::new(client),
        &config.meter,
        Duration::from_secs(config.poll_interval_secs),
    );
    let state = AppState {
        snapshot_rx: coordinator.subscribe_snapshot(),
    };

    let mut registry = CoordinatorRegistry::new();
    registry.spawn(config.meter.ean.clone(), coordinator);

    // Spawn web server
    let web_host = config.web.host.clone();
    let web_port = config.web.port;
    let web_task = tokio::spawn(async move {
        if let Err(e) = web::serve(state, &web_host, web_port).await {
            error!("Web server error: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    registry.shutdown_all().await;
    web_task.abort();

    info!("Shutdown complete");
    Ok(())
}
