use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::action::Action;

/// Key bindings: `q`/`Esc`/`Ctrl+C` quit, arrows and PgUp/PgDn scroll,
/// `c` copies, `x` dismisses, `r` reconnects.
pub struct KeyParser;

impl KeyParser {
    pub fn parse(key: &KeyEvent) -> Option<Action> {
        if key.kind == KeyEventKind::Release {
            return None;
        }

        let action = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            KeyCode::Up | KeyCode::Char('k') => Action::ScrollUp,
            KeyCode::Down | KeyCode::Char('j') => Action::ScrollDown,
            KeyCode::PageUp => Action::PageUp,
            KeyCode::PageDown | KeyCode::Char(' ') => Action::PageDown,
            KeyCode::Char('c') => Action::CopyContent,
            KeyCode::Char('x') => Action::DismissNotifications,
            KeyCode::Char('r') => Action::Reconnect,
            _ => return None,
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_quit_bindings() {
        assert_eq!(KeyParser::parse(&key(KeyCode::Char('q'))), Some(Action::Quit));
        assert_eq!(KeyParser::parse(&key(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(
            KeyParser::parse(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
    }

    #[test]
    fn test_plain_c_copies() {
        assert_eq!(KeyParser::parse(&key(KeyCode::Char('c'))), Some(Action::CopyContent));
    }

    #[test]
    fn test_scroll_and_misc_bindings() {
        assert_eq!(KeyParser::parse(&key(KeyCode::Up)), Some(Action::ScrollUp));
        assert_eq!(KeyParser::parse(&key(KeyCode::PageDown)), Some(Action::PageDown));
        assert_eq!(KeyParser::parse(&key(KeyCode::Char('x'))), Some(Action::DismissNotifications));
        assert_eq!(KeyParser::parse(&key(KeyCode::Char('r'))), Some(Action::Reconnect));
        assert_eq!(KeyParser::parse(&key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn test_release_events_ignored() {
        let mut release = key(KeyCode::Char('q'));
        release.kind = KeyEventKind::Release;
        assert_eq!(KeyParser::parse(&release), None);
    }
}
