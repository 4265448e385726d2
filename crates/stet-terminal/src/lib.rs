//! Gap buffer, viewport engine and interactive loop for stet.

pub mod buffer;
pub mod display;
pub mod driver;
mod editor;
mod keys;

pub use buffer::{GapBuffer, LineSpan, Whence};
pub use display::{DisplayBox, DisplayOptions};
pub use driver::{CrosstermDriver, Size, TermCoord, TerminalDriver, ensure_fresh_row};
pub use editor::{EditResult, InlineEditor, TtyDriver};
pub use stet_types::BorderGlyphs;
