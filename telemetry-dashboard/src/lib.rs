//! Telemetry Dashboard - charge CPU en direct des machines enregistrées
//!
//! - Liste des machines et historique par machine via GraphQL
//! - Enregistrement de machine via REST
//! - Charge CPU en direct via une connexion Socket.IO partagée
//! - TUI ratatui pilotée par un contrôleur de vue mono-fil

pub mod access;
pub mod chart;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod ui;

pub use access::TelemetryClient;
pub use config::DashboardConfig;
pub use controller::{DashboardController, DashboardEvent};
pub use error::DashboardError;
