/*!
Builders de données de test pour le stub

Construit des flottes de machines et leurs historiques CPU sans répéter
les structures à la main dans chaque test.
*/

use std::collections::HashMap;

use crate::stub_server::{StubLog, StubMachine, StubServer};

#[derive(Debug, Clone, Default)]
pub struct Fleet {
    pub machines: Vec<StubMachine>,
    pub history: HashMap<String, Vec<StubLog>>,
}

impl Fleet {
    /// Charge la flotte dans le stub (remplace les machines existantes).
    pub fn load_into(&self, server: &StubServer) {
        server.set_machines(self.machines.clone());
        for (id, logs) in &self.history {
            server.set_history(id, logs.clone());
        }
    }
}

/// Builder fluide pour une [`Fleet`]
#[derive(Debug, Default)]
pub struct FleetBuilder {
    fleet: Fleet,
}

impl FleetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn machine(mut self, id: &str, name: &str, ip: &str) -> Self {
        self.fleet.machines.push(StubMachine {
            id: id.to_string(),
            name: name.to_string(),
            ip: ip.to_string(),
            port: None,
        });
        self
    }

    /// Historique `(cpu_load, timestamp_ms)` dans l'ordre donné.
    pub fn history(mut self, machine_id: &str, points: &[(f64, i64)]) -> Self {
        let logs = points
            .iter()
            .map(|(cpu, ts)| StubLog { cpu_load: *cpu, timestamp: ts.to_string() })
            .collect();
        self.fleet.history.insert(machine_id.to_string(), logs);
        self
    }

    pub fn build(self) -> Fleet {
        self.fleet
    }
}

/// Série régulière : un point toutes les `step_ms` à partir de `start_ms`.
pub fn history_series(start_ms: i64, step_ms: i64, loads: &[f64]) -> Vec<(f64, i64)> {
    loads
        .iter()
        .enumerate()
        .map(|(i, load)| (*load, start_ms + step_ms * i as i64))
        .collect()
}

/// Charge CPU de démo déterministe (oscillation 5..95 %).
pub fn demo_load(machine_index: usize, tick: u64) -> f64 {
    let phase = tick as f64 / 6.0 + machine_index as f64 * 1.7;
    let load = 50.0 + 45.0 * phase.sin();
    (load * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fleet_builder() {
        let fleet = FleetBuilder::new()
            .machine("1", "m1", "10.0.0.1")
            .machine("2", "m2", "10.0.0.2")
            .history("1", &[(10.0, 1000), (20.0, 2000)])
            .build();
        assert_eq!(fleet.machines.len(), 2);
        let logs = &fleet.history["1"];
        assert_eq!(logs[1], StubLog { cpu_load: 20.0, timestamp: "2000".into() });
    }

    #[test]
    fn test_history_series_spacing() {
        let series = history_series(1_000, 500, &[1.0, 2.0, 3.0]);
        assert_eq!(series, vec![(1.0, 1_000), (2.0, 1_500), (3.0, 2_000)]);
    }

    #[test]
    fn test_demo_load_bounds() {
        for tick in 0..200 {
            let load = demo_load(3, tick);
            assert!((5.0..=95.0).contains(&load), "load {load} out of range");
        }
    }
}
