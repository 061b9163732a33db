use std::sync::Arc;

use anyhow::{Context, Result};
use telemetry_dashboard::config::load_config;
use telemetry_dashboard::logging::init_logging;
use telemetry_dashboard::{ui, DashboardController, TelemetryClient};

// un seul fil logique : toutes les continuations passent par la même file
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    let (config, origin) = load_config().await;
    init_logging(&config.log_file)
        .with_context(|| format!("failed to open log file {}", config.log_file))?;
    origin.log();

    tracing::info!(
        graphql = %config.endpoints.graphql_url,
        rest = %config.endpoints.rest_url,
        push = %config.endpoints.push_url,
        "starting telemetry dashboard"
    );

    let client = Arc::new(TelemetryClient::new(&config));
    let (mut controller, events) = DashboardController::new(client, &config.registration);
    controller.init();

    ui::run(&mut controller, events).await
}
