/*!
# Telemetry DevKit - Stub backend et utilitaires de test

Bibliothèque facilitant le développement du dashboard avec:
- Serveur stub GraphQL + REST + Socket.IO (pas de vrai backend requis)
- Builders de flottes de machines et d'historiques
- Harness de test avec attentes temporisées
*/

pub mod fixtures;
pub mod stub_server;
pub mod test_utils;

pub use fixtures::{Fleet, FleetBuilder};
pub use stub_server::{StubLog, StubMachine, StubServer};
pub use test_utils::{wait_until, TestHarness};
