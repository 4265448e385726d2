//! Translates crossterm key events to editor actions.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Actions the inline editor performs in response to key input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorAction {
    /// Insert a character at the cursor position.
    Insert(char),
    /// Split the line at the cursor (Enter).
    Newline,
    /// Delete the byte before the cursor (Backspace / Ctrl+H).
    Backspace,
    /// Delete the byte under the cursor (Delete).
    Delete,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    /// Move to start of line (Home / Ctrl+A).
    Home,
    /// Move to end of line (End / Ctrl+E).
    End,
    PageUp,
    PageDown,
    /// Repaint the owned rows (Ctrl+L).
    Redraw,
    /// Finish editing and keep the result (Ctrl+D).
    Save,
    /// Finish editing and discard the result (Ctrl+C).
    Abort,
    /// Ignore this key event.
    Noop,
}

/// Map a crossterm `KeyEvent` to an `EditorAction`.
pub fn map_key(event: KeyEvent) -> EditorAction {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);

    match event.code {
        // Ctrl key combos
        KeyCode::Char('a') if ctrl => EditorAction::Home,
        KeyCode::Char('e') if ctrl => EditorAction::End,
        KeyCode::Char('b') if ctrl => EditorAction::MoveLeft,
        KeyCode::Char('f') if ctrl => EditorAction::MoveRight,
        KeyCode::Char('p') if ctrl => EditorAction::MoveUp,
        KeyCode::Char('n') if ctrl => EditorAction::MoveDown,
        KeyCode::Char('h') if ctrl => EditorAction::Backspace,
        KeyCode::Char('c') if ctrl => EditorAction::Abort,
        KeyCode::Char('d') if ctrl => EditorAction::Save,
        KeyCode::Char('l') if ctrl => EditorAction::Redraw,
        KeyCode::Char(_) if ctrl => EditorAction::Noop,

        KeyCode::Char(c) => EditorAction::Insert(c),

        // Navigation keys
        KeyCode::Left => EditorAction::MoveLeft,
        KeyCode::Right => EditorAction::MoveRight,
        KeyCode::Up => EditorAction::MoveUp,
        KeyCode::Down => EditorAction::MoveDown,
        KeyCode::Home => EditorAction::Home,
        KeyCode::End => EditorAction::End,
        KeyCode::PageUp => EditorAction::PageUp,
        KeyCode::PageDown => EditorAction::PageDown,

        // Editing keys
        KeyCode::Backspace => EditorAction::Backspace,
        KeyCode::Delete => EditorAction::Delete,
        KeyCode::Enter => EditorAction::Newline,

        // Tabs would desync the one-byte-per-column model.
        _ => EditorAction::Noop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::CONTROL)
    }

    #[test]
    fn insert_regular_chars() {
        assert_eq!(map_key(key(KeyCode::Char('a'))), EditorAction::Insert('a'));
        assert_eq!(map_key(key(KeyCode::Char('é'))), EditorAction::Insert('é'));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT)),
            EditorAction::Insert('Q')
        );
    }

    #[test]
    fn ctrl_d_saves_and_ctrl_c_aborts() {
        assert_eq!(map_key(ctrl(KeyCode::Char('d'))), EditorAction::Save);
        assert_eq!(map_key(ctrl(KeyCode::Char('c'))), EditorAction::Abort);
    }

    #[test]
    fn ctrl_a_e_are_line_ends() {
        assert_eq!(map_key(ctrl(KeyCode::Char('a'))), EditorAction::Home);
        assert_eq!(map_key(ctrl(KeyCode::Char('e'))), EditorAction::End);
    }

    #[test]
    fn ctrl_l_redraws() {
        assert_eq!(map_key(ctrl(KeyCode::Char('l'))), EditorAction::Redraw);
    }

    #[test]
    fn unbound_ctrl_is_ignored() {
        assert_eq!(map_key(ctrl(KeyCode::Char('x'))), EditorAction::Noop);
    }

    #[test]
    fn arrows_and_pages() {
        assert_eq!(map_key(key(KeyCode::Up)), EditorAction::MoveUp);
        assert_eq!(map_key(key(KeyCode::Down)), EditorAction::MoveDown);
        assert_eq!(map_key(key(KeyCode::Left)), EditorAction::MoveLeft);
        assert_eq!(map_key(key(KeyCode::Right)), EditorAction::MoveRight);
        assert_eq!(map_key(key(KeyCode::PageUp)), EditorAction::PageUp);
        assert_eq!(map_key(key(KeyCode::PageDown)), EditorAction::PageDown);
    }

    #[test]
    fn editing_keys() {
        assert_eq!(map_key(key(KeyCode::Enter)), EditorAction::Newline);
        assert_eq!(map_key(key(KeyCode::Backspace)), EditorAction::Backspace);
        assert_eq!(map_key(ctrl(KeyCode::Char('h'))), EditorAction::Backspace);
        assert_eq!(map_key(key(KeyCode::Delete)), EditorAction::Delete);
    }

    #[test]
    fn tab_and_escape_are_noops() {
        assert_eq!(map_key(key(KeyCode::Tab)), EditorAction::Noop);
        assert_eq!(map_key(key(KeyCode::Esc)), EditorAction::Noop);
    }
}
