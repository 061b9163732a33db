use serde::{Deserialize, Serialize};

/// Machine connue du dashboard.
///
/// `current_load` n'existe que côté client : le serveur ne le renvoie pas,
/// il reste à 0 jusqu'au premier événement push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    #[serde(alias = "_id")]
    pub id: String,                 // GraphQL expose `id`, le REST peut renvoyer `_id`
    pub name: String,
    pub ip: String,
    #[serde(default, skip_serializing)]
    pub current_load: f64,
}

impl Machine {
    pub fn new(id: impl Into<String>, name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ip: ip.into(),
            current_load: 0.0,
        }
    }

    /// Entrée de remplacement quand la requête `machines` ne renvoie rien.
    pub fn placeholder() -> Self {
        Self::new("", "", "")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub cpu_load: f64,
    pub timestamp: String,          // epoch millisecondes encodé en chaîne
}

impl HistoryEntry {
    pub fn placeholder() -> Self {
        Self {
            cpu_load: 0.0,
            timestamp: String::new(),
        }
    }
}

/// Événement `telemetry_update` reçu sur le canal push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveUpdate {
    #[serde(rename = "machineId")]
    pub machine_id: String,
    pub cpu: f64,
}

/// Corps de la commande REST de création.
#[derive(Debug, Clone, Serialize)]
pub struct NewMachine {
    pub name: String,
    pub ip: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_accepts_mongo_id() {
        let json = r#"{"_id":"abc","name":"m1","ip":"10.0.0.1","port":4000}"#;
        let m: Machine = serde_json::from_str(json).unwrap();
        assert_eq!(m.id, "abc");
        assert_eq!(m.current_load, 0.0);
    }

    #[test]
    fn test_live_update_wire_names() {
        let u: LiveUpdate = serde_json::from_str(r#"{"machineId":"1","cpu":42}"#).unwrap();
        assert_eq!(u.machine_id, "1");
        assert_eq!(u.cpu, 42.0);
    }
}
