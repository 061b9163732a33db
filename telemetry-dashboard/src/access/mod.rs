/**
 * ACCESS LAYER - Accès télémétrie : GraphQL + REST + Socket.IO
 *
 * RÔLE :
 * Regroupe les trois canaux client-serveur derrière quelques opérations typées :
 * liste des machines, historique d'une machine, enregistrement, flux temps réel.
 *
 * FONCTIONNEMENT :
 * - GraphQL : requête `machines` en cache (re-émission à chaque écriture du cache),
 *   requête `history` toujours réseau
 * - REST : POST de création de machine
 * - Socket.IO : une seule connexion push par client, diffusée en broadcast
 *
 * UTILITÉ :
 * 🎯 Le contrôleur de vue ne voit jamais le transport, seulement des modèles
 */

pub mod graphql;
pub mod push;
pub mod rest;
pub mod socketio;

use std::sync::Arc;

use futures::stream::{self, Stream};
use tokio::sync::{broadcast, watch};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::models::{HistoryEntry, LiveUpdate, Machine, NewMachine};

use self::graphql::GraphQlClient;
use self::push::{PushChannel, PushHealth};
use self::rest::CommandApi;

pub struct TelemetryClient {
    graphql: GraphQlClient,
    commands: CommandApi,
    push: PushChannel,
    /// Cache de la requête `machines` ; `None` tant qu'elle n'a jamais répondu.
    machines_cache: watch::Sender<Option<Vec<Machine>>>,
}

impl TelemetryClient {
    /// Construit les clients HTTP et ouvre la connexion push.
    /// À appeler dans un runtime tokio.
    pub fn new(config: &DashboardConfig) -> Self {
        let http = reqwest::Client::new();
        let (machines_cache, _) = watch::channel(None);

        Self {
            graphql: GraphQlClient::new(http.clone(), config.endpoints.graphql_url.clone()),
            commands: CommandApi::new(http, config.endpoints.rest_url.clone()),
            push: PushChannel::connect(&config.endpoints.push_url, &config.push),
            machines_cache,
        }
    }

    /// Observe la liste des machines.
    ///
    /// Cache d'abord : part du résultat en cache s'il existe, sinon lance
    /// la requête réseau. Ré-émet à chaque écriture du cache.
    pub fn list_machines(self: &Arc<Self>) -> impl Stream<Item = Vec<Machine>> + Send + 'static {
        let rx = self.machines_cache.subscribe();

        if rx.borrow().is_none() {
            let client = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = client.refetch_machines().await {
                    tracing::warn!(error = %e, "machines query failed");
                }
            });
        }

        stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first {
                rx.changed().await.ok()?;
            }
            loop {
                let current = rx.borrow_and_update().clone();
                if let Some(list) = current {
                    return Some((list, (rx, false)));
                }
                rx.changed().await.ok()?;
            }
        })
    }

    /// Requête `machines` réseau seule ; écrit le cache, ce qui fait
    /// ré-émettre chaque flux [`list_machines`](Self::list_machines).
    pub async fn refetch_machines(&self) -> Result<Vec<Machine>> {
        let list = self.graphql.machines().await?;
        tracing::debug!(count = list.len(), "machines query resolved");
        self.machines_cache.send_replace(Some(list.clone()));
        Ok(list)
    }

    /// Requête `history` d'une machine, toujours réseau.
    pub async fn fetch_history(&self, machine_id: &str) -> Result<Vec<HistoryEntry>> {
        let entries = self.graphql.history(machine_id).await?;
        tracing::debug!(machine_id, count = entries.len(), "history query resolved");
        Ok(entries)
    }

    pub async fn register_machine(&self, name: &str, ip: &str, port: u16) -> Result<Machine> {
        let body = NewMachine {
            name: name.to_string(),
            ip: ip.to_string(),
            port,
        };
        let created = self.commands.create_machine(&body).await?;
        tracing::info!(id = %created.id, name = %created.name, "machine registered");
        Ok(created)
    }

    /// Mises à jour temps réel de la connexion push partagée. Un abonné en
    /// retard saute les événements perdus et continue.
    pub fn subscribe_live_updates(&self) -> impl Stream<Item = LiveUpdate> + Send + 'static {
        let rx = self.push.subscribe();
        stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(update) => return Some((update, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "live update subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
    }

    pub fn push_health(&self) -> &PushHealth {
        self.push.health()
    }
}

/// Statut non 2xx → [`DashboardError::Api`] avec le corps de réponse.
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(DashboardError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}
