//! Traduction des touches en actions, sans I/O terminal.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Machines,
    Name,
    Ip,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Machines => Focus::Name,
            Focus::Name => Focus::Ip,
            Focus::Ip => Focus::Machines,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    None,
    Quit,
    MoveUp,
    MoveDown,
    Select,
    FocusNext,
    FocusList,
    Submit,
    Input(char),
    Backspace,
}

pub fn map_key(focus: Focus, key: KeyEvent) -> UiAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return UiAction::Quit;
    }

    match focus {
        Focus::Machines => match key.code {
            KeyCode::Char('q') => UiAction::Quit,
            KeyCode::Up | KeyCode::Char('k') => UiAction::MoveUp,
            KeyCode::Down | KeyCode::Char('j') => UiAction::MoveDown,
            KeyCode::Enter => UiAction::Select,
            KeyCode::Tab => UiAction::FocusNext,
            _ => UiAction::None,
        },
        Focus::Name | Focus::Ip => match key.code {
            KeyCode::Enter => UiAction::Submit,
            KeyCode::Tab => UiAction::FocusNext,
            KeyCode::Esc => UiAction::FocusList,
            KeyCode::Backspace => UiAction::Backspace,
            KeyCode::Char(c) => UiAction::Input(c),
            _ => UiAction::None,
        },
    }
}

/// Déplacement du curseur borné à `[0, len)`.
pub fn move_cursor(cursor: usize, len: usize, action: UiAction) -> usize {
    if len == 0 {
        return 0;
    }
    match action {
        UiAction::MoveUp => cursor.saturating_sub(1),
        UiAction::MoveDown => (cursor + 1).min(len - 1),
        _ => cursor.min(len - 1),
    }
}
