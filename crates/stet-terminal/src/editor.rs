//! The interactive loop around the display box.

use crate::buffer::{GapBuffer, Whence};
use crate::display::{DisplayBox, DisplayOptions};
use crate::driver::{CrosstermDriver, TerminalDriver, ensure_fresh_row};
use crate::keys::{EditorAction, map_key};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal;
use std::fs::File;
use std::io;
use stet_types::DisplayError;

/// How an editing session ended.
#[derive(Debug)]
pub enum EditResult {
    /// User pressed Ctrl+D; the final text, cursor rewound to the start.
    Saved(GapBuffer),
    /// User pressed Ctrl+C.
    Aborted,
}

/// RAII guard that disables raw mode on drop.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Edits a region of the terminal below the shell cursor.
pub struct InlineEditor {
    options: DisplayOptions,
    capacity: usize,
    initial: Vec<u8>,
}

impl InlineEditor {
    /// Create an editor whose buffer starts with `capacity` bytes.
    pub fn new(options: DisplayOptions, capacity: usize) -> Self {
        Self {
            options,
            capacity,
            initial: Vec::new(),
        }
    }

    /// Text inserted into the buffer before the user gets control.
    pub fn with_content(mut self, content: Vec<u8>) -> Self {
        self.initial = content;
        self
    }

    /// Run the session on `term` until the user saves or aborts.
    ///
    /// Raw mode is always restored when this returns (via RAII guard).
    pub async fn run(self, term: TtyDriver) -> Result<EditResult, DisplayError> {
        tokio::task::spawn_blocking(move || run_sync(self, term))
            .await
            .map_err(io::Error::other)?
    }
}

/// Driver on the controlling terminal.
pub type TtyDriver = CrosstermDriver<File>;

type TtyDisplay = DisplayBox<TtyDriver>;

/// Synchronous session, run inside `spawn_blocking`.
fn run_sync(editor: InlineEditor, mut term: TtyDriver) -> Result<EditResult, DisplayError> {
    let _guard = RawModeGuard::enable()?;
    ensure_fresh_row(&mut term)?;

    let buf = GapBuffer::with_capacity(editor.capacity);
    let mut view = DisplayBox::new(term, buf, editor.options)?;

    let outcome = load(&mut view, &editor.initial).and_then(|()| event_loop(&mut view));
    let parked = park(&mut view);
    let save = match outcome {
        Ok(save) => save,
        Err(e) => {
            if e.is_fatal() {
                let state = view.debug_info();
                tracing::error!(error = %e, state = %state, "screen no longer matches the buffer");
            }
            return Err(e);
        }
    };
    parked?;

    if !save {
        tracing::info!("edit aborted");
        return Ok(EditResult::Aborted);
    }
    let (_, mut buf) = view.into_parts();
    buf.seek(0, Whence::Start)?;
    Ok(EditResult::Saved(buf))
}

/// Feed initial content through the engine so the viewport grows with it.
fn load(view: &mut TtyDisplay, content: &[u8]) -> Result<(), DisplayError> {
    for chunk in content.chunks(128) {
        view.insert(chunk)?;
    }
    tracing::debug!(bytes = content.len(), "initial content loaded");
    Ok(())
}

/// Read key events until Save (true) or Abort (false).
fn event_loop(view: &mut TtyDisplay) -> Result<bool, DisplayError> {
    loop {
        let state = view.debug_info();
        tracing::trace!("{state}");
        let ev = event::read()?;

        match ev {
            Event::Key(key_event) => {
                // crossterm sends Release/Repeat events on some platforms
                if key_event.kind != KeyEventKind::Press {
                    continue;
                }

                match map_key(key_event) {
                    EditorAction::Insert(ch) => {
                        let mut bytes = [0u8; 4];
                        view.insert(ch.encode_utf8(&mut bytes).as_bytes())?;
                    }
                    EditorAction::Newline => view.insert_newline()?,
                    EditorAction::Backspace => view.backspace()?,
                    EditorAction::Delete => view.del()?,
                    EditorAction::MoveLeft => view.mv_left()?,
                    EditorAction::MoveRight => view.mv_right()?,
                    EditorAction::MoveUp => view.mv_up()?,
                    EditorAction::MoveDown => view.mv_down()?,
                    EditorAction::Home => view.mv_bol()?,
                    EditorAction::End => view.mv_eol()?,
                    EditorAction::PageUp => view.mv_page_up()?,
                    EditorAction::PageDown => view.mv_page_down()?,
                    EditorAction::Redraw => view.redraw()?,
                    EditorAction::Save => return Ok(true),
                    EditorAction::Abort => return Ok(false),
                    EditorAction::Noop => {
                        tracing::trace!(?key_event, "unbound key");
                    }
                }
            }
            Event::Resize(cols, rows) => {
                tracing::debug!(cols, rows, "resize event");
                view.terminal_resize()?;
            }
            _ => {}
        }
        view.terminal_mut().flush()?;
    }
}

/// Leave the shell cursor just below the owned rows.
fn park(view: &mut TtyDisplay) -> Result<(), DisplayError> {
    let coord = view.last_owned_row();
    let rows = view.terminal().size()?.rows;
    let term = view.terminal_mut();
    if coord.row > rows {
        term.move_to(rows, 1)?;
        term.write(b"\r\n")?;
    } else {
        term.move_to_coord(coord)?;
    }
    term.flush()?;
    Ok(())
}
