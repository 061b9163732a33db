//! Client REST des commandes (enregistrement de machine).

use crate::access::ensure_success;
use crate::error::Result;
use crate::models::{Machine, NewMachine};

pub struct CommandApi {
    client: reqwest::Client,
    machines_url: String,
}

impl CommandApi {
    pub fn new(client: reqwest::Client, machines_url: String) -> Self {
        Self { client, machines_url }
    }

    /// `POST {name, ip, port}` ; renvoie la machine telle que créée par le serveur.
    pub async fn create_machine(&self, body: &NewMachine) -> Result<Machine> {
        let response = self
            .client
            .post(&self.machines_url)
            .json(body)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(serde_json::from_slice(&response.bytes().await?)?)
    }
}
