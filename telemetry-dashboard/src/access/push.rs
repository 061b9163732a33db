//! Connexion push Socket.IO partagée.
//!
//! [`PushChannel::connect`] lance une tâche longue par client : connexion,
//! diffusion des `telemetry_update` dans un canal [`tokio::sync::broadcast`],
//! reconnexion avec backoff exponentiel quand la connexion tombe. Tous les
//! abonnés voient les mêmes événements.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::access::socketio::{socket_url, EnginePacket, Handshake, SocketPacket};
use crate::config::PushConf;
use crate::error::{DashboardError, Result};
use crate::models::LiveUpdate;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
}

impl fmt::Display for PushStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PushStatus::Connecting => "connecting",
            PushStatus::Connected => "connected",
            PushStatus::Disconnected => "disconnected",
            PushStatus::Reconnecting => "reconnecting",
        };
        f.write_str(s)
    }
}

/// État de la connexion push, lisible depuis l'UI.
#[derive(Clone)]
pub struct PushHealth {
    status: Arc<Mutex<PushStatus>>,
    reconnects: Arc<AtomicU32>,
}

impl PushHealth {
    pub fn new() -> Self {
        Self {
            status: Arc::new(Mutex::new(PushStatus::Connecting)),
            reconnects: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn status(&self) -> PushStatus {
        *self.status.lock()
    }

    pub fn reconnects(&self) -> u32 {
        self.reconnects.load(Ordering::Relaxed)
    }

    fn mark_connected(&self) {
        *self.status.lock() = PushStatus::Connected;
    }

    fn mark_disconnected(&self) {
        *self.status.lock() = PushStatus::Disconnected;
    }

    fn increment_reconnects(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        *self.status.lock() = PushStatus::Reconnecting;
    }
}

impl Default for PushHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Plancher du délai de reconnexion.
const MIN_RECONNECT_DELAY: Duration = Duration::from_millis(10);

/// Paramètres du backoff exponentiel.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl From<&PushConf> for ReconnectPolicy {
    fn from(conf: &PushConf) -> Self {
        let initial_delay = conf.initial_delay().max(MIN_RECONNECT_DELAY);
        // NaN ou < 1.0 : pas de décroissance du délai
        let multiplier = if conf.reconnect_multiplier >= 1.0 { conf.reconnect_multiplier } else { 1.0 };
        Self {
            initial_delay,
            max_delay: conf.max_delay().max(initial_delay),
            multiplier,
        }
    }
}

impl ReconnectPolicy {
    /// Délai suivant, borné par `max_delay`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let next_ms = (current.as_millis() as f64 * self.multiplier) as u64;
        Duration::from_millis(next_ms).min(self.max_delay)
    }
}

/// Poignée sur l'unique connexion push d'un client.
pub struct PushChannel {
    events: broadcast::Sender<LiveUpdate>,
    health: PushHealth,
    task: JoinHandle<()>,
}

impl PushChannel {
    /// Lance la tâche de connexion. À appeler dans un runtime tokio.
    pub fn connect(base_url: &str, conf: &PushConf) -> Self {
        let (events, _) = broadcast::channel(conf.channel_capacity.max(1));
        let health = PushHealth::new();

        let url = socket_url(base_url);
        let event_name = conf.event_name.clone();
        let policy = ReconnectPolicy::from(conf);
        let tx = events.clone();
        let task_health = health.clone();

        let task = tokio::spawn(async move {
            run_push_loop(&url, &event_name, &policy, &tx, &task_health).await;
        });

        Self { events, health, task }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveUpdate> {
        self.events.subscribe()
    }

    pub fn health(&self) -> &PushHealth {
        &self.health
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Connexion, lecture des événements, attente, reconnexion ; sans fin.
async fn run_push_loop(
    url: &str,
    event_name: &str,
    policy: &ReconnectPolicy,
    tx: &broadcast::Sender<LiveUpdate>,
    health: &PushHealth,
) {
    let mut delay = policy.initial_delay;

    loop {
        match open_session(url).await {
            Ok((mut ws, handshake)) => {
                health.mark_connected();
                delay = policy.initial_delay;
                tracing::info!(url, sid = %handshake.sid, "push channel connected");

                if let Err(e) = pump_events(&mut ws, &handshake, event_name, tx).await {
                    tracing::warn!(url, error = %e, "push channel dropped");
                } else {
                    tracing::info!(url, "push channel closed by server");
                }
                health.mark_disconnected();
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "push channel connection failed");
                health.mark_disconnected();
            }
        }

        tracing::debug!(url, delay_ms = delay.as_millis() as u64, "push channel reconnect scheduled");
        tokio::time::sleep(delay).await;
        delay = policy.next_delay(delay);
        health.increment_reconnects();
    }
}

/// Connexion WebSocket, ouverture Engine.IO puis CONNECT Socket.IO sur `/`.
async fn open_session(url: &str) -> Result<(WsStream, Handshake)> {
    let (mut ws, _response) = connect_async(url)
        .await
        .map_err(|e| DashboardError::Push(format!("failed to connect to {url}: {e}")))?;

    let handshake = loop {
        let text = next_text(&mut ws, None)
            .await?
            .ok_or_else(|| DashboardError::Push("closed before open packet".into()))?;
        match EnginePacket::parse(&text)? {
            EnginePacket::Open(hs) => break hs,
            EnginePacket::Noop => continue,
            other => return Err(DashboardError::Push(format!("expected open packet, got {other:?}"))),
        }
    };

    let connect = EnginePacket::Message(SocketPacket::Connect(None).encode()).encode();
    send_text(&mut ws, connect).await?;

    let wait = ping_deadline(&handshake);
    loop {
        let text = next_text(&mut ws, Some(wait))
            .await?
            .ok_or_else(|| DashboardError::Push("closed during handshake".into()))?;
        match EnginePacket::parse(&text)? {
            EnginePacket::Message(body) => match SocketPacket::parse(&body)? {
                SocketPacket::Connect(_) => return Ok((ws, handshake)),
                SocketPacket::ConnectError(reason) => {
                    return Err(DashboardError::Push(format!("namespace connect refused: {reason}")))
                }
                _ => continue,
            },
            EnginePacket::Ping(data) => send_text(&mut ws, EnginePacket::Pong(data).encode()).await?,
            EnginePacket::Close => return Err(DashboardError::Push("closed during handshake".into())),
            _ => continue,
        }
    }
}

/// Lit les trames jusqu'à la fin de connexion. `Ok(())` sur fermeture propre.
async fn pump_events(
    ws: &mut WsStream,
    handshake: &Handshake,
    event_name: &str,
    tx: &broadcast::Sender<LiveUpdate>,
) -> Result<()> {
    let wait = ping_deadline(handshake);

    while let Some(text) = next_text(ws, Some(wait)).await? {
        let packet = match EnginePacket::parse(&text) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed push frame");
                continue;
            }
        };

        match packet {
            EnginePacket::Ping(data) => send_text(ws, EnginePacket::Pong(data).encode()).await?,
            EnginePacket::Close => return Ok(()),
            EnginePacket::Message(body) => match SocketPacket::parse(&body) {
                Ok(SocketPacket::Event { name, payload }) if name == event_name => {
                    match serde_json::from_value::<LiveUpdate>(payload) {
                        // pas d'abonné = pas d'erreur
                        Ok(update) => {
                            let _ = tx.send(update);
                        }
                        Err(e) => tracing::debug!(error = %e, "ignoring malformed telemetry event"),
                    }
                }
                Ok(SocketPacket::Disconnect) => return Ok(()),
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "ignoring malformed socket.io packet"),
            },
            _ => {}
        }
    }
    Ok(())
}

/// Le serveur doit pinger sous `pingInterval + pingTimeout`.
fn ping_deadline(handshake: &Handshake) -> Duration {
    Duration::from_millis(handshake.ping_interval + handshake.ping_timeout)
}

/// Prochaine trame texte, `None` une fois la websocket fermée.
async fn next_text(ws: &mut WsStream, wait: Option<Duration>) -> Result<Option<String>> {
    loop {
        let next = match wait {
            Some(wait) => tokio::time::timeout(wait, ws.next())
                .await
                .map_err(|_| DashboardError::Push("ping timeout".into()))?,
            None => ws.next().await,
        };

        match next {
            Some(Ok(Message::Text(text))) => return Ok(Some(text)),
            Some(Ok(Message::Close(frame))) => {
                tracing::debug!(?frame, "push websocket close frame");
                return Ok(None);
            }
            // binaires (attachments) non utilisés, ping/pong WS gérés par tungstenite
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(DashboardError::Push(format!("websocket receive error: {e}"))),
            None => return Ok(None),
        }
    }
}

async fn send_text(ws: &mut WsStream, text: String) -> Result<()> {
    ws.send(Message::Text(text))
        .await
        .map_err(|e| DashboardError::Push(format!("websocket send error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        };
        let mut delay = policy.initial_delay;
        let mut seen = Vec::new();
        for _ in 0..7 {
            delay = policy.next_delay(delay);
            seen.push(delay.as_secs());
        }
        assert_eq!(seen, vec![2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn test_health_transitions() {
        let health = PushHealth::new();
        assert_eq!(health.status(), PushStatus::Connecting);
        health.mark_connected();
        assert_eq!(health.status(), PushStatus::Connected);
        health.mark_disconnected();
        health.increment_reconnects();
        assert_eq!(health.status(), PushStatus::Reconnecting);
        assert_eq!(health.reconnects(), 1);
        assert_eq!(health.status().to_string(), "reconnecting");
    }

    #[test]
    fn test_policy_from_degenerate_conf_still_backs_off() {
        let conf = PushConf {
            reconnect_initial_ms: 0,
            reconnect_max_ms: 0,
            reconnect_multiplier: 0.5,
            ..PushConf::default()
        };
        let policy = ReconnectPolicy::from(&conf);
        assert_eq!(policy.initial_delay, MIN_RECONNECT_DELAY);
        assert_eq!(policy.multiplier, 1.0);
        assert!(policy.next_delay(policy.initial_delay) >= MIN_RECONNECT_DELAY);
    }

    #[test]
    fn test_policy_keeps_sane_conf() {
        let policy = ReconnectPolicy::from(&PushConf::default());
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.multiplier, 2.0);
    }

    #[tokio::test]
    async fn test_secure_url_reaches_the_network() {
        // wss:// doit tenter la connexion TCP, pas échouer faute de TLS compilé
        let url = socket_url("https://127.0.0.1:9");
        assert!(url.starts_with("wss://"));
        let err = open_session(&url).await.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(!err.contains("TLS support not compiled in"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_unreachable_server_keeps_retrying() {
        let conf = PushConf {
            reconnect_initial_ms: 10,
            reconnect_max_ms: 20,
            ..PushConf::default()
        };
        // port 9 (discard) : connexion refusée
        let channel = PushChannel::connect("http://127.0.0.1:9", &conf);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(channel.health().reconnects() >= 1);
        assert_ne!(channel.health().status(), PushStatus::Connected);
    }
}
