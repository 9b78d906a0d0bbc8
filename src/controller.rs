use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, TTVConfig, TTVError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &TTVConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, TTVError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    // The command line gets every key unmapped
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Up | KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down | KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left | KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right | KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::Home | KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
            (KeyCode::End | KeyCode::Char('G'), _) => Some(Message::MoveEnd),
            (KeyCode::Tab, _) => Some(Message::NextTab),
            (KeyCode::BackTab, _) => Some(Message::PrevTab),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('s'), _) => Some(Message::ToggleSort),
            (KeyCode::Char(' '), _) => Some(Message::Toggle),
            (KeyCode::Char('e'), _) => Some(Message::Edit),
            (KeyCode::Char('d'), _) => Some(Message::Delete),
            (KeyCode::Char('y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('Y'), _) => Some(Message::CopyView),
            (KeyCode::Char('w'), _) => Some(Message::Constraints),
            (KeyCode::Char('o'), _) => Some(Message::Scope),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn map(code: KeyCode, modifiers: KeyModifiers) -> Option<Message> {
        let controller = Controller::new(&TTVConfig::default());
        controller.handle_key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn vim_and_arrow_keys() {
        assert_eq!(map(KeyCode::Char('j'), KeyModifiers::NONE), Some(Message::MoveDown));
        assert_eq!(map(KeyCode::Down, KeyModifiers::NONE), Some(Message::MoveDown));
        assert_eq!(map(KeyCode::Char('h'), KeyModifiers::NONE), Some(Message::MoveLeft));
        assert_eq!(map(KeyCode::Char('G'), KeyModifiers::SHIFT), Some(Message::MoveEnd));
    }

    #[test]
    fn commands() {
        assert_eq!(map(KeyCode::Char('/'), KeyModifiers::NONE), Some(Message::Search));
        assert_eq!(map(KeyCode::Char('s'), KeyModifiers::NONE), Some(Message::ToggleSort));
        assert_eq!(map(KeyCode::Char('Y'), KeyModifiers::SHIFT), Some(Message::CopyView));
        assert_eq!(map(KeyCode::BackTab, KeyModifiers::SHIFT), Some(Message::PrevTab));
        assert_eq!(map(KeyCode::Char('c'), KeyModifiers::CONTROL), Some(Message::Quit));
        assert_eq!(map(KeyCode::Char('x'), KeyModifiers::NONE), None);
    }
}
