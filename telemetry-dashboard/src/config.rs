use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::error::{DashboardError, Result};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub endpoints: EndpointsConf,
    pub push: PushConf,
    pub registration: RegistrationConf,
    pub log_file: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EndpointsConf {
    pub graphql_url: String,
    pub rest_url: String,       // ex: "http://localhost:3000/api/machines"
    pub push_url: String,       // base HTTP du serveur Socket.IO
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PushConf {
    pub event_name: String,
    pub reconnect_initial_ms: u64,
    pub reconnect_max_ms: u64,
    pub reconnect_multiplier: f64,
    pub channel_capacity: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RegistrationConf {
    pub default_ip: String,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointsConf::default(),
            push: PushConf::default(),
            registration: RegistrationConf::default(),
            log_file: "telemetry-dashboard.log".into(),
        }
    }
}

impl Default for EndpointsConf {
    fn default() -> Self {
        Self {
            graphql_url: "http://localhost:3000/graphql".into(),
            rest_url: "http://localhost:3000/api/machines".into(),
            push_url: "http://localhost:3000".into(),
        }
    }
}

impl Default for PushConf {
    fn default() -> Self {
        Self {
            event_name: "telemetry_update".into(),
            reconnect_initial_ms: 1_000,
            reconnect_max_ms: 30_000,
            reconnect_multiplier: 2.0,
            channel_capacity: 256,
        }
    }
}

impl Default for RegistrationConf {
    fn default() -> Self {
        Self { default_ip: "127.0.0.1".into(), port: 4000 }
    }
}

impl EndpointsConf {
    /// Toutes les URLs pointent vers le même serveur `base` (dev / tests).
    pub fn for_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            graphql_url: format!("{base}/graphql"),
            rest_url: format!("{base}/api/machines"),
            push_url: base.to_string(),
        }
    }
}

impl PushConf {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_initial_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_ms)
    }
}

impl DashboardConfig {
    pub fn parse(txt: &str) -> Result<Self> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(txt).map_err(|e| DashboardError::Config(e.to_string()))
    }
}

/// Provenance de la config chargée, à logger une fois le subscriber installé.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Missing(PathBuf),
    Invalid { path: PathBuf, error: String },
}

impl ConfigOrigin {
    pub fn log(&self) {
        match self {
            ConfigOrigin::File(path) => tracing::info!(path = %path.display(), "dashboard config loaded"),
            ConfigOrigin::Missing(path) => {
                tracing::info!(path = %path.display(), "no dashboard config file, using defaults")
            }
            ConfigOrigin::Invalid { path, error } => {
                tracing::warn!(path = %path.display(), %error, "invalid dashboard config, using defaults")
            }
        }
    }
}

/// Charge la config depuis `TELEMETRY_DASHBOARD_CONFIG` (défaut `dashboard.yaml`).
/// Fichier absent ou invalide : config par défaut.
pub async fn load_config() -> (DashboardConfig, ConfigOrigin) {
    let path = std::env::var("TELEMETRY_DASHBOARD_CONFIG").unwrap_or_else(|_| "dashboard.yaml".into());
    load_config_from(&path).await
}

pub async fn load_config_from(path: impl AsRef<Path>) -> (DashboardConfig, ConfigOrigin) {
    let path = path.as_ref().to_path_buf();
    if !path.exists() {
        return (DashboardConfig::default(), ConfigOrigin::Missing(path));
    }
    let parsed = match fs::read_to_string(&path).await {
        Ok(txt) => DashboardConfig::parse(&txt),
        Err(e) => Err(DashboardError::Config(e.to_string())),
    };
    match parsed {
        Ok(config) => (config, ConfigOrigin::File(path)),
        Err(e) => {
            // visible même sans subscriber (logs pas encore initialisés)
            eprintln!("[dashboard] config invalide {}: {e}", path.display());
            let origin = ConfigOrigin::Invalid { path, error: e.to_string() };
            (DashboardConfig::default(), origin)
        }
    }
}
