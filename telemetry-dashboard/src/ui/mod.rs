//! Interface terminal du contrôleur de dashboard.

pub mod input;
pub mod render;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, widgets::TableState, Terminal};
use tokio::sync::mpsc;

use crate::controller::{DashboardController, DashboardEvent};
use self::input::{map_key, move_cursor, Focus, UiAction};

/// État purement visuel (focus, curseur), distinct de celui du contrôleur.
#[derive(Debug, Default)]
pub struct ViewState {
    pub focus: Focus,
    pub cursor: usize,
    pub table: TableState,
}

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Prend la main sur le terminal jusqu'à ce que l'utilisateur quitte.
pub async fn run(
    controller: &mut DashboardController,
    mut events: mpsc::UnboundedReceiver<DashboardEvent>,
) -> Result<()> {
    let mut terminal = setup_terminal().context("failed to initialise terminal")?;
    let result = event_loop(&mut terminal, controller, &mut events).await;
    restore_terminal(&mut terminal).context("failed to restore terminal")?;
    result
}

async fn event_loop(
    terminal: &mut Term,
    controller: &mut DashboardController,
    events: &mut mpsc::UnboundedReceiver<DashboardEvent>,
) -> Result<()> {
    let mut keys = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(250));
    let mut view = ViewState::default();

    loop {
        terminal.draw(|frame| render::draw(frame, controller, &mut view))?;

        tokio::select! {
            Some(event) = events.recv() => controller.handle_event(event),
            key = keys.next() => match key {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    let action = map_key(view.focus, key);
                    if apply_action(&mut view, controller, action) {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("terminal input error"),
                None => break,
            },
            // rafraîchit la barre de statut push
            _ = tick.tick() => {}
        }
    }

    tracing::info!("dashboard closed by user");
    Ok(())
}

/// `true` quand l'utilisateur demande à quitter.
fn apply_action(view: &mut ViewState, controller: &mut DashboardController, action: UiAction) -> bool {
    let len = controller.state().machines.len();
    match action {
        UiAction::Quit => return true,
        UiAction::MoveUp | UiAction::MoveDown => {
            view.cursor = move_cursor(view.cursor, len, action);
        }
        UiAction::Select => {
            view.cursor = move_cursor(view.cursor, len, action);
            let id = controller.state().machines.get(view.cursor).map(|m| m.id.clone());
            if let Some(id) = id {
                controller.select_machine(&id);
            }
        }
        UiAction::FocusNext => view.focus = view.focus.next(),
        UiAction::FocusList => view.focus = Focus::Machines,
        UiAction::Submit => {
            controller.add_machine();
            view.focus = Focus::Machines;
        }
        UiAction::Input(c) => {
            if let Some(field) = focused_field(view.focus, controller) {
                field.push(c);
            }
        }
        UiAction::Backspace => {
            if let Some(field) = focused_field(view.focus, controller) {
                field.pop();
            }
        }
        UiAction::None => {}
    }
    false
}

fn focused_field(focus: Focus, controller: &mut DashboardController) -> Option<&mut String> {
    let state = controller.state_mut();
    match focus {
        Focus::Name => Some(&mut state.new_machine_name),
        Focus::Ip => Some(&mut state.new_machine_ip),
        Focus::Machines => None,
    }
}

fn setup_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Term) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}
