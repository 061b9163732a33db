//! Erreurs partagées par la couche d'accès et le chargement de config.

/// Erreurs du client télémétrie.
///
/// Jamais affichées à l'utilisateur : le contrôleur se contente de les logger.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// Échec de la requête HTTP elle-même (réseau, DNS, TLS, décodage du corps).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Le serveur a répondu avec un statut non 2xx.
    #[error("API error ({status}): {body}")]
    Api {
        status: u16,
        body: String,
    },

    /// Réponse GraphQL avec `errors` et sans `data`.
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Problème de handshake ou de trame Socket.IO.
    #[error("push channel error: {0}")]
    Push(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
