use anyhow::Result;
use log::info;
use std::net::SocketAddr;
use tokio::time::{interval, Duration};

use telemetry_devkit::fixtures::{demo_load, history_series, FleetBuilder};
use telemetry_devkit::StubServer;

// ===== Configuration =====
const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const PUSH_PERIOD: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let addr: SocketAddr = std::env::var("TELEMETRY_STUB_ADDR")
        .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
        .parse()?;
    let server = StubServer::bind(addr).await?;

    // flotte de démo avec un historique récent
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_millis() as i64;
    let start = now_ms - 60_000;
    let mut fleet = FleetBuilder::new()
        .machine("1", "web-01", "10.0.0.11")
        .machine("2", "db-01", "10.0.0.21")
        .machine("3", "cache-01", "10.0.0.31");
    for (index, id) in ["1", "2", "3"].iter().enumerate() {
        let loads: Vec<f64> = (0..12).map(|t| demo_load(index, t)).collect();
        fleet = fleet.history(id, &history_series(start, 5_000, &loads));
    }
    fleet.build().load_into(&server);

    info!("🚀 Telemetry stub ready on {}", server.base_url());

    // Boucle principale : un telemetry_update par machine et par seconde
    let mut ticker = interval(PUSH_PERIOD);
    let mut tick: u64 = 0;
    loop {
        ticker.tick().await;
        for (index, machine) in server.machines().iter().enumerate() {
            server.emit_update(&machine.id, demo_load(index, tick));
        }
        tick += 1;
    }
}
