/**
 * VIEW CONTROLLER - Pilotage de l'état du dashboard
 *
 * RÔLE : Relie la couche d'accès télémétrie à l'état local de la vue.
 * Chaque opération réseau tourne dans une tâche et poste son résultat
 * dans une file `mpsc` ; seul le contrôleur modifie l'état.
 *
 * ARCHITECTURE : un seul fil logique (runtime current-thread dans le binaire),
 * pas de verrou sur l'état de vue. Les échecs réseau sont loggés, jamais affichés.
 */

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::access::push::PushHealth;
use crate::access::TelemetryClient;
use crate::config::RegistrationConf;
use crate::models::{HistoryEntry, LiveUpdate, Machine};
use crate::state::DashboardState;

/// Résultats asynchrones appliqués par [`DashboardController::handle_event`].
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    MachinesLoaded(Vec<Machine>),
    Live(LiveUpdate),
    /// `seq` : numéro rendu par [`DashboardState::select`] au lancement de la requête.
    HistoryLoaded {
        seq: u64,
        machine_id: String,
        entries: Vec<HistoryEntry>,
    },
    MachineRegistered(Machine),
}

pub struct DashboardController {
    client: Arc<TelemetryClient>,
    state: DashboardState,
    events: mpsc::UnboundedSender<DashboardEvent>,
    registration_port: u16,
}

impl DashboardController {
    /// Renvoie le contrôleur et la file d'événements ; la boucle de l'appelant
    /// repasse chaque événement reçu à [`handle_event`](Self::handle_event).
    pub fn new(
        client: Arc<TelemetryClient>,
        registration: &RegistrationConf,
    ) -> (Self, mpsc::UnboundedReceiver<DashboardEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let controller = Self {
            client,
            state: DashboardState::new(registration.default_ip.clone()),
            events,
            registration_port: registration.port,
        };
        (controller, rx)
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Accès au formulaire (nom / IP) depuis l'UI.
    pub fn state_mut(&mut self) -> &mut DashboardState {
        &mut self.state
    }

    pub fn push_health(&self) -> &PushHealth {
        self.client.push_health()
    }

    /// Ouvre la liste des machines (cache observé) et le flux temps réel.
    /// Les deux alimentent la file jusqu'à la fermeture du récepteur.
    pub fn init(&self) {
        let mut machines = Box::pin(self.client.list_machines());
        let tx = self.events.clone();
        tokio::spawn(async move {
            while let Some(list) = machines.next().await {
                if tx.send(DashboardEvent::MachinesLoaded(list)).is_err() {
                    break;
                }
            }
        });

        let mut live = Box::pin(self.client.subscribe_live_updates());
        let tx = self.events.clone();
        tokio::spawn(async move {
            while let Some(update) = live.next().await {
                if tx.send(DashboardEvent::Live(update)).is_err() {
                    break;
                }
            }
        });

        tracing::info!("dashboard controller initialised");
    }

    pub fn handle_event(&mut self, event: DashboardEvent) {
        match event {
            DashboardEvent::MachinesLoaded(list) => {
                tracing::debug!(count = list.len(), "machine list replaced");
                self.state.replace_machines(list);
            }
            DashboardEvent::Live(update) => {
                if !self.state.apply_live_update(&update) {
                    tracing::trace!(machine_id = %update.machine_id, "live update for unknown machine dropped");
                }
            }
            DashboardEvent::HistoryLoaded { seq, machine_id, entries } => {
                if !self.state.apply_history(seq, &entries) {
                    tracing::debug!(%machine_id, seq, "stale history result discarded");
                }
            }
            DashboardEvent::MachineRegistered(machine) => {
                tracing::info!(id = %machine.id, "registration acknowledged, refreshing list");
                self.state.clear_staged_name();
                self.refresh_machines();
            }
        }
    }

    /// Enregistre la sélection et relance l'historique (jamais en cache).
    pub fn select_machine(&mut self, machine_id: &str) {
        let seq = self.state.select(machine_id);

        let client = Arc::clone(&self.client);
        let tx = self.events.clone();
        let machine_id = machine_id.to_string();
        tokio::spawn(async move {
            match client.fetch_history(&machine_id).await {
                Ok(entries) => {
                    let _ = tx.send(DashboardEvent::HistoryLoaded { seq, machine_id, entries });
                }
                Err(e) => tracing::warn!(%machine_id, error = %e, "history query failed"),
            }
        });
    }

    /// Enregistre le nom / l'IP saisis avec le port configuré.
    pub fn add_machine(&mut self) {
        let client = Arc::clone(&self.client);
        let tx = self.events.clone();
        let name = self.state.new_machine_name.clone();
        let ip = self.state.new_machine_ip.clone();
        let port = self.registration_port;
        tokio::spawn(async move {
            match client.register_machine(&name, &ip, port).await {
                Ok(machine) => {
                    let _ = tx.send(DashboardEvent::MachineRegistered(machine));
                }
                Err(e) => tracing::warn!(%name, %ip, error = %e, "machine registration failed"),
            }
        });
    }

    /// Requête réseau seule : l'écriture du cache fait ré-émettre le flux
    /// ouvert par `init`, qui poste l'unique `MachinesLoaded`.
    fn refresh_machines(&self) {
        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            if let Err(e) = client.refetch_machines().await {
                tracing::warn!(error = %e, "machines refresh failed");
            }
        });
    }
}
