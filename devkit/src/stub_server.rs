/*!
Serveur stub de télémétrie pour développement sans backend

Expose en local les trois interfaces consommées par le dashboard :
- `POST /graphql`      : requêtes `machines` et `history(machineId:)`
- `POST /api/machines` : création de machine (réponse avec `_id`)
- `GET  /socket.io/`   : Socket.IO v4 en WebSocket, événements `telemetry_update`

Les tests pilotent l'état (machines, historiques, délais, `data: null`) et
déclenchent les événements push à la main.
*/

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use anyhow::Result;

/// Engine.IO close packet; the socket task sends it and hangs up.
const ENGINE_CLOSE: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StubMachine {
    pub id: String,
    pub name: String,
    pub ip: String,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StubLog {
    pub cpu_load: f64,
    pub timestamp: String,
}

#[derive(Default)]
struct StubData {
    machines: Vec<StubMachine>,
    history: HashMap<String, Vec<StubLog>>,
    history_delays: HashMap<String, Duration>,
    null_data: bool,
    next_id: u64,
    graphql_requests: Vec<Value>,
    created_requests: Vec<Value>,
}

#[derive(Clone)]
struct StubState {
    data: Arc<Mutex<StubData>>,
    push_tx: broadcast::Sender<String>,
    clients: Arc<AtomicUsize>,
    ping_interval_ms: u64,
}

/// Serveur stub lancé sur `127.0.0.1:<port libre>` (ou une adresse donnée).
pub struct StubServer {
    addr: SocketAddr,
    state: StubState,
    task: JoinHandle<()>,
}

impl StubServer {
    /// Démarre sur un port libre de la boucle locale.
    pub async fn start() -> Result<Self> {
        Self::bind("127.0.0.1:0".parse()?).await
    }

    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let (push_tx, _) = broadcast::channel(256);
        let state = StubState {
            data: Arc::new(Mutex::new(StubData::default())),
            push_tx,
            clients: Arc::new(AtomicUsize::new(0)),
            ping_interval_ms: 25_000,
        };

        let app = Router::new()
            .route("/graphql", post(graphql))
            .route("/api/machines", post(create_machine))
            .route("/socket.io/", get(socket_io))
            .with_state(state.clone());

        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("❌ [STUB] server error: {}", e);
            }
        });

        log::info!("🚀 [STUB] telemetry stub listening on http://{}", addr);
        Ok(Self { addr, state, task })
    }

    /// `http://127.0.0.1:<port>`
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_machines(&self, machines: Vec<StubMachine>) {
        self.state.data.lock().machines = machines;
    }

    pub fn machines(&self) -> Vec<StubMachine> {
        self.state.data.lock().machines.clone()
    }

    pub fn set_history(&self, machine_id: &str, logs: Vec<StubLog>) {
        self.state.data.lock().history.insert(machine_id.to_string(), logs);
    }

    /// Retarde la réponse `history` de cette machine (simulation de course).
    pub fn delay_history(&self, machine_id: &str, delay: Duration) {
        self.state.data.lock().history_delays.insert(machine_id.to_string(), delay);
    }

    /// Toutes les réponses GraphQL deviennent `{"data": null}`.
    pub fn set_null_data(&self, enabled: bool) {
        self.state.data.lock().null_data = enabled;
    }

    pub fn graphql_requests(&self) -> Vec<Value> {
        self.state.data.lock().graphql_requests.clone()
    }

    /// Corps reçus sur `POST /api/machines`.
    pub fn created_requests(&self) -> Vec<Value> {
        self.state.data.lock().created_requests.clone()
    }

    /// Émet `42["telemetry_update",{machineId,cpu}]` ; renvoie le nombre de sockets servies.
    pub fn emit_update(&self, machine_id: &str, cpu: f64) -> usize {
        let frame = format!("42{}", json!(["telemetry_update", { "machineId": machine_id, "cpu": cpu }]));
        self.emit_raw(frame)
    }

    /// Envoie une trame brute à toutes les sockets connectées.
    pub fn emit_raw(&self, frame: impl Into<String>) -> usize {
        self.state.push_tx.send(frame.into()).unwrap_or(0)
    }

    /// Ferme toutes les connexions Socket.IO (test de reconnexion).
    pub fn disconnect_clients(&self) -> usize {
        self.emit_raw(ENGINE_CLOSE)
    }

    pub fn connected_clients(&self) -> usize {
        self.state.clients.load(Ordering::SeqCst)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// POST /graphql
async fn graphql(State(state): State<StubState>, Json(body): Json<Value>) -> Json<Value> {
    let query = body.get("query").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let machine_id = body
        .pointer("/variables/mid")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let (null_data, delay) = {
        let mut data = state.data.lock();
        data.graphql_requests.push(body.clone());
        (data.null_data, data.history_delays.get(&machine_id).copied())
    };

    if null_data {
        return Json(json!({ "data": null }));
    }

    if query.contains("history") {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let logs = state.data.lock().history.get(&machine_id).cloned().unwrap_or_default();
        log::debug!("📈 [STUB] history for {}: {} entries", machine_id, logs.len());
        return Json(json!({ "data": { "history": logs } }));
    }

    if query.contains("machines") {
        let machines: Vec<Value> = state
            .data
            .lock()
            .machines
            .iter()
            .map(|m| json!({ "id": m.id, "name": m.name, "ip": m.ip }))
            .collect();
        return Json(json!({ "data": { "machines": machines } }));
    }

    Json(json!({ "data": null, "errors": [{ "message": "unknown operation" }] }))
}

#[derive(Debug, Deserialize)]
struct CreateMachineRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    ip: String,
    port: Option<u16>,
}

// POST /api/machines
async fn create_machine(State(state): State<StubState>, Json(body): Json<Value>) -> impl IntoResponse {
    state.data.lock().created_requests.push(body.clone());

    let req: CreateMachineRequest = match serde_json::from_value(body) {
        Ok(req) => req,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))),
    };
    if req.name.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "name is required" })));
    }

    let machine = {
        let mut data = state.data.lock();
        data.next_id += 1;
        let machine = StubMachine {
            id: format!("m-{}", data.next_id),
            name: req.name,
            ip: req.ip,
            port: req.port,
        };
        data.machines.push(machine.clone());
        machine
    };

    log::info!("🆕 [STUB] machine created: {} ({})", machine.name, machine.id);
    (
        StatusCode::CREATED,
        Json(json!({ "_id": machine.id, "name": machine.name, "ip": machine.ip, "port": machine.port })),
    )
}

// GET /socket.io/?EIO=4&transport=websocket
async fn socket_io(ws: WebSocketUpgrade, State(state): State<StubState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: StubState) {
    let sid = uuid::Uuid::new_v4().to_string();
    let open = format!(
        "0{}",
        json!({
            "sid": sid,
            "upgrades": [],
            "pingInterval": state.ping_interval_ms,
            "pingTimeout": 20_000,
            "maxPayload": 1_000_000
        })
    );
    if socket.send(Message::Text(open.into())).await.is_err() {
        return;
    }

    // attendre le CONNECT du namespace "/"
    loop {
        match socket.recv().await {
            Some(Ok(Message::Text(text))) if text.as_str().starts_with("40") => break,
            Some(Ok(_)) => continue,
            _ => return,
        }
    }

    let mut push_rx = state.push_tx.subscribe();
    let ack = format!("40{}", json!({ "sid": sid }));
    if socket.send(Message::Text(ack.into())).await.is_err() {
        return;
    }
    state.clients.fetch_add(1, Ordering::SeqCst);
    log::info!("🔌 [STUB] socket.io client connected: {}", sid);

    let mut ping = tokio::time::interval(Duration::from_millis(state.ping_interval_ms));
    ping.tick().await;

    loop {
        tokio::select! {
            frame = push_rx.recv() => match frame {
                Ok(frame) => {
                    let closing = frame == ENGINE_CLOSE;
                    if socket.send(Message::Text(frame.into())).await.is_err() || closing {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    log::debug!("📨 [STUB] from {}: {}", sid, text.as_str());
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = ping.tick() => {
                if socket.send(Message::Text("2".into())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.clients.fetch_sub(1, Ordering::SeqCst);
    log::info!("👋 [STUB] socket.io client gone: {}", sid);
}
