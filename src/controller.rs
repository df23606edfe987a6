use std::time::Duration;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyEventKind};
use tracing::trace;

use crate::domain::{ListConfig, ListError, Message};
use crate::model::ListModel;

/// Polls terminal events and maps key presses onto [`Message`]s. While the
/// model is in a text-entry mode the raw key event is passed through
/// unmapped.
pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(config: &ListConfig) -> Self {
        Self {
            event_poll_time: config.event_poll_time,
        }
    }

    pub fn handle_event<T>(&self, model: &ListModel<T>) -> Result<Option<Message>, ListError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.map_key(key.code));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width, height)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn map_key(&self, code: KeyCode) -> Option<Message> {
        let message = match code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Message::MoveDown),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::MoveUp),
            KeyCode::Char('h') | KeyCode::Left => Some(Message::PrevColumn),
            KeyCode::Char('l') | KeyCode::Right => Some(Message::NextColumn),
            KeyCode::Home => Some(Message::MoveBeginning),
            KeyCode::End => Some(Message::MoveEnd),
            KeyCode::Char('g') => Some(Message::FirstPage),
            KeyCode::Char('G') => Some(Message::LastPage),
            KeyCode::Char(']') | KeyCode::PageDown => Some(Message::NextPage),
            KeyCode::Char('[') | KeyCode::PageUp => Some(Message::PrevPage),
            KeyCode::Char(':') => Some(Message::JumpToPage),
            KeyCode::Char('/') => Some(Message::Search),
            KeyCode::Char('f') => Some(Message::OpenFilterMenu),
            KeyCode::Char('F') => Some(Message::ClearFilters),
            KeyCode::Char('c') => Some(Message::OpenColumnMenu),
            KeyCode::Char('s') => Some(Message::SortColumn),
            KeyCode::Char(' ') => Some(Message::ToggleSelect),
            KeyCode::Char('a') => Some(Message::SelectPage),
            KeyCode::Char('u') => Some(Message::ClearSelection),
            KeyCode::Char('b') => Some(Message::BulkActions),
            KeyCode::Char('r') => Some(Message::Refresh),
            KeyCode::Char('+') => Some(Message::AddNew),
            KeyCode::Char('e') => Some(Message::Export),
            KeyCode::Char('i') => Some(Message::Import),
            KeyCode::Char('?') => Some(Message::Help),
            KeyCode::Enter => Some(Message::Enter),
            KeyCode::Esc => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {code:?} => {message:?}");
        message
    }
}
