//! Trames texte Socket.IO v4 / Engine.IO v4.
//!
//! Transport WebSocket uniquement : chaque paquet Engine.IO est une trame
//! texte, un chiffre de type suivi d'un contenu optionnel. Les paquets
//! Socket.IO voyagent dans les paquets Engine.IO `message` (`4`).

use serde::Deserialize;
use serde_json::Value;

use crate::error::{DashboardError, Result};

/// Handshake Engine.IO envoyé par le serveur dans le paquet `open`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn parse(frame: &str) -> Result<Self> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| DashboardError::Push("empty engine.io frame".into()))?;
        let body = chars.as_str();
        let packet = match kind {
            '0' => EnginePacket::Open(serde_json::from_str(body)?),
            '1' => EnginePacket::Close,
            '2' => EnginePacket::Ping(body.to_string()),
            '3' => EnginePacket::Pong(body.to_string()),
            '4' => EnginePacket::Message(body.to_string()),
            '5' => EnginePacket::Upgrade,
            '6' => EnginePacket::Noop,
            other => {
                return Err(DashboardError::Push(format!("unknown engine.io packet type '{other}'")))
            }
        };
        Ok(packet)
    }

    /// Côté client on n'envoie que pong, message et close.
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(_) => "0".to_string(),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(body) => format!("4{body}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, payload: Value },
    ConnectError(Value),
    /// Paquets ack / binaires, ou destinés à un autre namespace.
    Ignored,
}

impl SocketPacket {
    /// Décode le contenu d'un paquet Engine.IO `message`.
    ///
    /// Format: `<type>[<attachments>-][<nsp>,][<ack id>][JSON]`.
    pub fn parse(body: &str) -> Result<Self> {
        let mut chars = body.chars();
        let kind = chars
            .next()
            .ok_or_else(|| DashboardError::Push("empty socket.io packet".into()))?;
        let mut rest = chars.as_str();

        // namespace (défaut "/" omis)
        if rest.starts_with('/') {
            let (nsp, tail) = match rest.find(',') {
                Some(idx) => (&rest[..idx], &rest[idx + 1..]),
                None => (rest, ""),
            };
            if nsp != "/" {
                return Ok(SocketPacket::Ignored);
            }
            rest = tail;
        }

        // ack id
        let data = rest.trim_start_matches(|c: char| c.is_ascii_digit());

        match kind {
            '0' => {
                let payload = if data.is_empty() { None } else { Some(serde_json::from_str(data)?) };
                Ok(SocketPacket::Connect(payload))
            }
            '1' => Ok(SocketPacket::Disconnect),
            '2' => {
                let value: Value = serde_json::from_str(data)?;
                let Value::Array(mut items) = value else {
                    return Err(DashboardError::Push(format!("event packet is not an array: {data}")));
                };
                if items.is_empty() {
                    return Err(DashboardError::Push("event packet without a name".into()));
                }
                let name = match items.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(DashboardError::Push(format!("event name is not a string: {other}")))
                    }
                };
                let payload = if items.is_empty() { Value::Null } else { items.remove(0) };
                Ok(SocketPacket::Event { name, payload })
            }
            '4' => {
                let payload = if data.is_empty() { Value::Null } else { serde_json::from_str(data)? };
                Ok(SocketPacket::ConnectError(payload))
            }
            '3' | '5' | '6' => Ok(SocketPacket::Ignored),
            other => Err(DashboardError::Push(format!("unknown socket.io packet type '{other}'"))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(auth)) => format!("0{auth}"),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, payload } => {
                format!("2{}", Value::Array(vec![Value::String(name.clone()), payload.clone()]))
            }
            SocketPacket::ConnectError(payload) => format!("4{payload}"),
            SocketPacket::Ignored => String::new(),
        }
    }
}

/// `http://host:3000` → `ws://host:3000/socket.io/?EIO=4&transport=websocket`
pub fn socket_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws_base}/socket.io/?EIO=4&transport=websocket")
}
