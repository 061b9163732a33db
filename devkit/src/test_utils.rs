/*!
Test Harness pour le dashboard

Facilite l'écriture de tests d'intégration avec:
- Démarrage automatique du serveur stub
- Chargement d'une flotte de test
- Attentes avec timeout (connexion push, conditions d'état)
*/

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

use crate::fixtures::Fleet;
use crate::stub_server::StubServer;

/// Délai d'attente par défaut des helpers `wait_*`.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);

pub struct TestHarness {
    pub server: StubServer,
}

impl TestHarness {
    /// Démarre un stub vide sur un port libre.
    pub async fn start() -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests
        let server = StubServer::start().await?;
        Ok(Self { server })
    }

    pub async fn with_fleet(fleet: Fleet) -> Result<Self> {
        let harness = Self::start().await?;
        fleet.load_into(&harness.server);
        log::info!("📚 Loaded fleet: {} machines", fleet.machines.len());
        Ok(harness)
    }

    pub fn base_url(&self) -> String {
        self.server.base_url()
    }

    /// Attend que `count` clients Socket.IO soient connectés.
    pub async fn wait_for_clients(&self, count: usize) -> Result<()> {
        let server = &self.server;
        wait_until(DEFAULT_WAIT, move || async move { server.connected_clients() >= count })
            .await
            .map_err(|_| anyhow::anyhow!("timeout waiting for {} socket.io client(s)", count))
    }
}

/// Poll `condition` toutes les 20 ms jusqu'à `true` ou timeout.
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition().await {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    log::warn!("⏰ Timeout after {:?}", timeout);
    anyhow::bail!("condition not met within {:?}", timeout)
}
