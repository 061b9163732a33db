use crate::chart::build_series;
use crate::models::{ChartSeries, HistoryEntry, LiveUpdate, Machine};

/// État local de la vue : machines connues, sélection, graphe, formulaire.
///
/// Pur, sans I/O : le contrôleur applique dessus les résultats du réseau.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub machines: Vec<Machine>,
    pub selected: Option<String>,
    pub chart: ChartSeries,
    pub new_machine_name: String,
    pub new_machine_ip: String,
    /// Numéro de la dernière requête d'historique émise.
    history_seq: u64,
}

impl DashboardState {
    pub fn new(default_ip: impl Into<String>) -> Self {
        Self {
            new_machine_ip: default_ip.into(),
            ..Self::default()
        }
    }

    /// Remplacement complet ; la charge repart à 0 jusqu'au prochain push.
    pub fn replace_machines(&mut self, machines: Vec<Machine>) {
        self.machines = machines
            .into_iter()
            .map(|m| Machine { current_load: 0.0, ..m })
            .collect();
    }

    /// `true` si une machine correspond ; sinon l'événement est ignoré.
    pub fn apply_live_update(&mut self, update: &LiveUpdate) -> bool {
        match self.machines.iter_mut().find(|m| m.id == update.machine_id) {
            Some(machine) => {
                machine.current_load = update.cpu;
                true
            }
            None => false,
        }
    }

    /// Nouvelle sélection : vide le graphe et renvoie le numéro de requête
    /// que devra porter la réponse d'historique.
    pub fn select(&mut self, machine_id: &str) -> u64 {
        self.selected = Some(machine_id.to_string());
        self.chart = ChartSeries::default();
        self.history_seq += 1;
        self.history_seq
    }

    /// Reconstruit le graphe si `seq` est la dernière requête émise ;
    /// toute réponse plus ancienne est ignorée, même pour la même machine.
    pub fn apply_history(&mut self, seq: u64, entries: &[HistoryEntry]) -> bool {
        if seq != self.history_seq {
            return false;
        }
        self.chart = build_series(entries);
        true
    }

    pub fn selected_machine(&self) -> Option<&Machine> {
        let id = self.selected.as_deref()?;
        self.machines.iter().find(|m| m.id == id)
    }

    pub fn clear_staged_name(&mut self) {
        self.new_machine_name.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> DashboardState {
        let mut state = DashboardState::new("127.0.0.1");
        state.replace_machines(vec![
            Machine::new("1", "m1", "10.0.0.1"),
            Machine::new("2", "m2", "10.0.0.2"),
        ]);
        state
    }

    fn update(id: &str, cpu: f64) -> LiveUpdate {
        LiveUpdate { machine_id: id.to_string(), cpu }
    }

    fn entries(loads: &[f64]) -> Vec<HistoryEntry> {
        loads
            .iter()
            .enumerate()
            .map(|(i, cpu)| HistoryEntry { cpu_load: *cpu, timestamp: ((i as i64 + 1) * 1000).to_string() })
            .collect()
    }

    #[test]
    fn test_live_update_sets_matching_machine_only() {
        let mut state = fleet();
        assert!(state.apply_live_update(&update("1", 42.0)));
        assert_eq!(state.machines[0].current_load, 42.0);
        assert_eq!(state.machines[1].current_load, 0.0);
    }

    #[test]
    fn test_live_update_for_unknown_machine_is_dropped() {
        let mut state = fleet();
        let before = state.machines.clone();
        assert!(!state.apply_live_update(&update("99", 80.0)));
        assert_eq!(state.machines, before);
    }

    #[test]
    fn test_replace_resets_loads() {
        let mut state = fleet();
        state.apply_live_update(&update("2", 12.5));
        let mut fresh = Machine::new("2", "m2", "10.0.0.2");
        fresh.current_load = 99.0;
        state.replace_machines(vec![fresh, Machine::new("3", "m3", "10.0.0.3")]);
        assert_eq!(state.machines.len(), 2);
        assert!(state.machines.iter().all(|m| m.current_load == 0.0));
        assert_eq!(state.machines[1].id, "3");
    }

    #[test]
    fn test_history_for_selected_machine_builds_chart() {
        let mut state = fleet();
        let seq = state.select("1");
        assert!(state.apply_history(seq, &entries(&[10.0, 20.0])));
        assert_eq!(state.chart.values(), vec![10.0, 20.0]);
        assert_eq!(state.selected_machine().map(|m| m.name.as_str()), Some("m1"));
    }

    #[test]
    fn test_stale_history_is_discarded() {
        let mut state = fleet();
        let a = state.select("1");
        let b = state.select("2");
        assert!(state.apply_history(b, &entries(&[5.0])));
        assert!(!state.apply_history(a, &entries(&[70.0])));
        assert_eq!(state.chart.values(), vec![5.0]);
    }

    #[test]
    fn test_select_clears_previous_chart() {
        let mut state = fleet();
        let a = state.select("1");
        state.apply_history(a, &entries(&[70.0]));
        state.select("2");
        assert_eq!(state.selected.as_deref(), Some("2"));
        assert!(state.chart.is_empty());
    }

    #[test]
    fn test_reselecting_same_machine_ignores_older_reply() {
        let mut state = fleet();
        let first = state.select("1");
        state.select("2");
        let latest = state.select("1");
        assert!(state.apply_history(latest, &entries(&[11.0])));
        assert!(!state.apply_history(first, &entries(&[99.0])));
        assert_eq!(state.chart.values(), vec![11.0]);
    }

    #[test]
    fn test_clear_staged_name_keeps_ip() {
        let mut state = fleet();
        state.new_machine_name = "db-01".into();
        state.new_machine_ip = "10.0.0.9".into();
        state.clear_staged_name();
        assert!(state.new_machine_name.is_empty());
        assert_eq!(state.new_machine_ip, "10.0.0.9");
    }
}
