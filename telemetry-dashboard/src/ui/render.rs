//! Mise en page : table des machines, graphe, formulaire, ligne de statut.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph, Row, Table},
    Frame,
};

use crate::access::push::PushStatus;
use crate::controller::DashboardController;
use crate::ui::input::Focus;
use crate::ui::ViewState;

const BAR_WIDTH: usize = 10;

pub fn draw(frame: &mut Frame, controller: &DashboardController, view: &mut ViewState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(3), Constraint::Length(1)])
        .split(frame.area());

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    draw_machines(frame, main[0], controller, view);
    draw_chart(frame, main[1], controller);
    draw_form(frame, rows[1], controller, view.focus);
    draw_status(frame, rows[2], controller);
}

fn draw_machines(frame: &mut Frame, area: Rect, controller: &DashboardController, view: &mut ViewState) {
    let state = controller.state();
    let selected = state.selected.as_deref();

    let rows: Vec<Row> = state
        .machines
        .iter()
        .map(|m| {
            let marker = if Some(m.id.as_str()) == selected { "●" } else { " " };
            Row::new(vec![
                Cell::from(marker),
                Cell::from(m.name.clone()),
                Cell::from(m.ip.clone()),
                Cell::from(load_bar(m.current_load, BAR_WIDTH)).style(load_style(m.current_load)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(1),
        Constraint::Percentage(35),
        Constraint::Percentage(25),
        Constraint::Min(BAR_WIDTH as u16 + 7),
    ];

    let border = if view.focus == Focus::Machines { Color::Cyan } else { Color::DarkGray };
    let table = Table::new(rows, widths)
        .header(Row::new(vec!["", "Name", "IP", "CPU"]).style(Style::default().add_modifier(Modifier::BOLD)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(format!(" Machines ({}) ", state.machines.len())),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    view.table.select(if state.machines.is_empty() { None } else { Some(view.cursor) });
    frame.render_stateful_widget(table, area, &mut view.table);
}

fn draw_chart(frame: &mut Frame, area: Rect, controller: &DashboardController) {
    let state = controller.state();
    let title = match state.selected_machine() {
        Some(m) => format!(" CPU Load % - {} ({}) ", m.name, m.ip),
        None => match &state.selected {
            Some(id) => format!(" CPU Load % - {id} "),
            None => " CPU Load % ".to_string(),
        },
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    if state.chart.is_empty() {
        let hint = if state.selected.is_some() { "Loading history..." } else { "Select a machine (Enter)" };
        frame.render_widget(Paragraph::new(hint).block(block), area);
        return;
    }

    let points: Vec<(f64, f64)> = state
        .chart
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.value))
        .collect();
    let labels = state.chart.labels();
    let first = labels.first().copied().unwrap_or_default().to_string();
    let last = labels.last().copied().unwrap_or_default().to_string();
    let x_max = (points.len().saturating_sub(1)).max(1) as f64;

    let dataset = Dataset::default()
        .name("CPU Load %")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Blue))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(Axis::default().bounds([0.0, x_max]).labels([first, last]))
        .y_axis(Axis::default().bounds([0.0, 100.0]).labels(["0", "50", "100"]));

    frame.render_widget(chart, area);
}

fn draw_form(frame: &mut Frame, area: Rect, controller: &DashboardController, focus: Focus) {
    let state = controller.state();
    let field = |label: &'static str, value: &str, active: bool| {
        let style = if active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if active { "_" } else { "" };
        vec![Span::raw(label), Span::styled(format!("{value}{cursor}"), style), Span::raw("   ")]
    };

    let mut spans = field("Name: ", &state.new_machine_name, focus == Focus::Name);
    spans.extend(field("IP: ", &state.new_machine_ip, focus == Focus::Ip));

    let form = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Add machine (Tab: edit, Enter: add, Esc: back) "),
    );
    frame.render_widget(form, area);
}

fn draw_status(frame: &mut Frame, area: Rect, controller: &DashboardController) {
    let health = controller.push_health();
    let status = health.status();
    let color = match status {
        PushStatus::Connected => Color::Green,
        PushStatus::Connecting | PushStatus::Reconnecting => Color::Yellow,
        PushStatus::Disconnected => Color::Red,
    };
    let line = Line::from(vec![
        Span::raw(" live: "),
        Span::styled(status.to_string(), Style::default().fg(color)),
        Span::raw(format!("  reconnects: {}", health.reconnects())),
        Span::styled("   ↑/↓ move  Enter select  q quit", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// `█████░░░░░  42.0%`
pub fn load_bar(load: f64, width: usize) -> String {
    let clamped = load.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * width as f64).round() as usize;
    format!(
        "{}{} {:>5.1}%",
        "█".repeat(filled),
        "░".repeat(width - filled),
        load
    )
}

fn load_style(load: f64) -> Style {
    let color = if load >= 90.0 {
        Color::Red
    } else if load >= 70.0 {
        Color::Yellow
    } else {
        Color::Green
    };
    Style::default().fg(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_bar() {
        assert_eq!(load_bar(0.0, 10), "░░░░░░░░░░   0.0%");
        assert_eq!(load_bar(42.0, 10), "████░░░░░░  42.0%");
        assert_eq!(load_bar(100.0, 4), "████ 100.0%");
    }

    #[test]
    fn test_load_bar_clamps_overflow() {
        assert!(load_bar(150.0, 4).starts_with("████ "));
        assert!(load_bar(-3.0, 4).starts_with("░░░░ "));
    }
}
