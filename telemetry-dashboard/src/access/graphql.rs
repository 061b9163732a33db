//! Client GraphQL des requêtes (`machines`, `history`).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::access::ensure_success;
use crate::error::{DashboardError, Result};
use crate::models::{HistoryEntry, Machine};

pub const MACHINES_QUERY: &str = "query GetMachines { machines { id name ip } }";
pub const HISTORY_QUERY: &str =
    "query GetHistory($mid: ID!) { history(machineId: $mid) { cpu_load timestamp } }";

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    #[serde(rename = "operationName")]
    operation_name: &'a str,
    query: &'a str,
    variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MachinesData {
    #[serde(default)]
    machines: Option<Vec<Machine>>,
}

#[derive(Debug, Deserialize)]
struct HistoryData {
    #[serde(default)]
    history: Option<Vec<HistoryEntry>>,
}

pub struct GraphQlClient {
    client: reqwest::Client,
    url: String,
}

impl GraphQlClient {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    /// Exécute une opération. `Ok(None)` quand le serveur ne renvoie pas de `data`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        operation_name: &str,
        query: &str,
        variables: Value,
    ) -> Result<Option<T>> {
        let request = GraphQlRequest { operation_name, query, variables };
        let response = self.client.post(&self.url).json(&request).send().await?;
        let response = ensure_success(response).await?;
        let body: GraphQlResponse<T> = serde_json::from_slice(&response.bytes().await?)?;

        if body.data.is_none() && !body.errors.is_empty() {
            return Err(DashboardError::GraphQl(
                body.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        if !body.errors.is_empty() {
            tracing::warn!(operation = operation_name, errors = body.errors.len(), "partial GraphQL response");
        }
        Ok(body.data)
    }

    /// Requête `machines`. Pas de data → une machine de remplacement.
    pub async fn machines(&self) -> Result<Vec<Machine>> {
        let data: Option<MachinesData> = self.execute("GetMachines", MACHINES_QUERY, json!({})).await?;
        Ok(match data {
            Some(d) => d.machines.unwrap_or_default(),
            None => vec![Machine::placeholder()],
        })
    }

    /// Requête `history(machineId:)`. Pas de data → une entrée à zéro.
    pub async fn history(&self, machine_id: &str) -> Result<Vec<HistoryEntry>> {
        let data: Option<HistoryData> = self
            .execute("GetHistory", HISTORY_QUERY, json!({ "mid": machine_id }))
            .await?;
        Ok(match data {
            Some(d) => d.history.unwrap_or_default(),
            None => vec![HistoryEntry::placeholder()],
        })
    }
}
