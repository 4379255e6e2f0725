//! Keyboard event handling for the dashboard

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

/// What a key press asks the dashboard to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    /// Stop the run
    Quit,
}

/// Handles keyboard events for the dashboard
#[derive(Debug, Default)]
pub struct EventHandler;

impl EventHandler {
    /// Create a new event handler
    pub fn new() -> Self {
        Self
    }

    /// Wait up to `timeout` for a key press
    pub fn poll(&mut self, timeout: Duration) -> Result<Option<UiAction>> {
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                return Ok(map_key(key));
            }
        }
        Ok(None)
    }
}

/// Map a key press to an action
///
/// Raw mode swallows SIGINT, so Ctrl+C is handled here as well.
pub fn map_key(key: KeyEvent) -> Option<UiAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(UiAction::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(UiAction::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_keys() {
        for code in [KeyCode::Char('q'), KeyCode::Char('Q'), KeyCode::Esc] {
            assert_eq!(
                map_key(KeyEvent::new(code, KeyModifiers::NONE)),
                Some(UiAction::Quit)
            );
        }
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(UiAction::Quit)
        );
    }

    #[test]
    fn test_other_keys_ignored() {
        assert_eq!(map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)), None);
        assert_eq!(map_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)), None);
    }
}
