//! Historique → série du graphe.

use chrono::{Local, TimeZone};

use crate::models::{ChartPoint, ChartSeries, HistoryEntry};

/// Libellé d'un timestamp qui n'est pas un entier epoch-ms valide.
pub const INVALID_TIME_LABEL: &str = "--:--:--";

/// Série dans l'ordre reçu, libellés en heure locale.
pub fn build_series(entries: &[HistoryEntry]) -> ChartSeries {
    build_series_in(entries, &Local)
}

pub fn build_series_in<Tz: TimeZone>(entries: &[HistoryEntry], tz: &Tz) -> ChartSeries
where
    Tz::Offset: std::fmt::Display,
{
    let points = entries
        .iter()
        .map(|e| ChartPoint {
            label: time_label(&e.timestamp, tz),
            value: e.cpu_load,
        })
        .collect();
    ChartSeries { points }
}

/// `HH:MM:SS` pour une chaîne epoch-ms.
pub fn time_label<Tz: TimeZone>(timestamp: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|ms| tz.timestamp_millis_opt(ms).single())
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| INVALID_TIME_LABEL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(cpu: f64, ts: &str) -> HistoryEntry {
        HistoryEntry { cpu_load: cpu, timestamp: ts.to_string() }
    }

    #[test]
    fn test_series_keeps_order_and_values() {
        let series = build_series_in(&[entry(10.0, "1000"), entry(20.0, "2000")], &Utc);
        assert_eq!(series.len(), 2);
        assert_eq!(series.values(), vec![10.0, 20.0]);
        assert_eq!(series.labels(), vec!["00:00:01", "00:00:02"]);
    }

    #[test]
    fn test_placeholder_timestamp_gets_invalid_label() {
        let series = build_series_in(&[HistoryEntry::placeholder()], &Utc);
        assert_eq!(series.values(), vec![0.0]);
        assert_eq!(series.labels(), vec![INVALID_TIME_LABEL]);
    }

    #[test]
    fn test_label_from_real_timestamp() {
        // 2024-01-01T12:34:56Z
        assert_eq!(time_label("1704112496000", &Utc), "12:34:56");
        assert_eq!(time_label("abc", &Utc), INVALID_TIME_LABEL);
    }
}
