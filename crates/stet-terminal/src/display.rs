//! Viewport engine mapping the gap buffer onto a region of the terminal.
//!
//! The engine owns a block of `term_owned_rows` terminal rows starting at
//! `first_row`: an optional top border row, `editable_rows` content rows and
//! an optional bottom border row. The cursor is tracked as a viewport
//! coordinate `(x, y)`; every operation leaves the real terminal cursor at
//! the cell that coordinate maps to and then verifies it.

use crate::buffer::{GapBuffer, LineSpan, Whence};
use crate::driver::{Size, TermCoord, TerminalDriver, print_row};
use stet_types::{BorderGlyphs, DisplayError};

/// Construction options for [`DisplayBox`].
#[derive(Debug, Clone, Default)]
pub struct DisplayOptions {
    pub border: bool,
    pub glyphs: BorderGlyphs,
}

/// Border widths, 0 or 1 on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Borders {
    top: u16,
    left: u16,
    right: u16,
    bottom: u16,
}

impl Borders {
    fn new(enabled: bool) -> Self {
        let w = u16::from(enabled);
        Self {
            top: w,
            left: w,
            right: w,
            bottom: w,
        }
    }
}

/// Border rows given up to keep a content row on a very short terminal.
#[derive(Debug, Clone, Copy, Default)]
struct StolenRows {
    top: bool,
    bottom: bool,
}

/// Pick the cursor's column within the visible window of its line.
///
/// A line that fits in the viewport is never scrolled, so `x` is simply the
/// byte column. Otherwise `x` stays as close to `desired` as the window
/// allows: the last cell is reserved for the end-of-line position.
fn fit_x(width: u16, desired: usize, col: usize, len: usize) -> u16 {
    let width = usize::from(width);
    let x = if len < width {
        col
    } else {
        let max_x = if col >= len { width - 1 } else { width - 2 };
        desired.min(col).min(max_x)
    };
    // x never exceeds width - 1, which came from a u16.
    x as u16
}

/// Compose one terminal row for `line` with its window starting at `start`.
fn compose_row(
    line: &[u8],
    start: usize,
    width: u16,
    borders: Borders,
    glyphs: &BorderGlyphs,
) -> Vec<u8> {
    let visible = usize::from(width).saturating_sub(1);
    let start = start.min(line.len());
    let end = line.len().min(start + visible);
    let slice = &line[start..end];

    let mut out = Vec::with_capacity(usize::from(width) + 8);
    if borders.left > 0 {
        let glyph = if start > 0 {
            &glyphs.overflow_left
        } else {
            &glyphs.left
        };
        out.extend_from_slice(glyph.as_bytes());
    }
    out.extend_from_slice(slice);
    if borders.right > 0 {
        out.resize(out.len() + visible - slice.len() + 1, b' ');
        let glyph = if line.len() > start + visible {
            &glyphs.overflow_right
        } else {
            &glyphs.right
        };
        out.extend_from_slice(glyph.as_bytes());
    }
    out
}

/// An editable viewport over a [`GapBuffer`] drawn on a terminal.
pub struct DisplayBox<T: TerminalDriver> {
    term: T,
    buf: GapBuffer,
    glyphs: BorderGlyphs,
    borders: Borders,
    stolen: StolenRows,
    editable_rows: u16,
    term_owned_rows: u16,
    first_row: u16,
    term_size: Size,
    x: u16,
    y: u16,
}

impl<T: TerminalDriver> DisplayBox<T> {
    /// Claim the rows starting at the terminal's current cursor row.
    ///
    /// The buffer is rewound to its start. With borders, the terminal is
    /// scrolled up first if fewer than three rows remain below the cursor.
    pub fn new(
        mut term: T,
        mut buf: GapBuffer,
        options: DisplayOptions,
    ) -> Result<Self, DisplayError> {
        let term_size = term.size()?;
        let start = term.cursor_position()?;
        buf.seek(0, Whence::Start)?;

        let borders = Borders::new(options.border);
        let mut view = Self {
            term,
            buf,
            glyphs: options.glyphs,
            borders,
            stolen: StolenRows::default(),
            editable_rows: 1,
            term_owned_rows: 1 + borders.top + borders.bottom,
            first_row: start.row.max(1),
            term_size,
            x: 0,
            y: 0,
        };
        view.check_size()?;

        let last = view.first_row + view.term_owned_rows - 1;
        if last > term_size.rows {
            let needed = last - term_size.rows;
            for _ in 0..needed {
                view.term.scroll_up()?;
            }
            view.first_row -= needed;
        }
        tracing::debug!(
            first_row = view.first_row,
            cols = term_size.cols,
            rows = term_size.rows,
            border = options.border,
            "display box created"
        );

        view.repaint()?;
        view.check_sync()?;
        Ok(view)
    }

    /// Width of the content area in columns.
    fn width(&self) -> u16 {
        self.term_size
            .cols
            .saturating_sub(self.borders.left + self.borders.right)
    }

    fn check_size(&self) -> Result<(), DisplayError> {
        let too_small = self.width() < 2
            || self.term_size.rows < self.term_owned_rows
            || self.first_row > self.term_size.rows;
        if too_small {
            return Err(DisplayError::TerminalTooSmall {
                cols: self.term_size.cols,
                rows: self.term_size.rows,
            });
        }
        Ok(())
    }

    fn desync(message: String) -> DisplayError {
        tracing::error!("{message}");
        DisplayError::Desync { message }
    }

    fn cursor_line(&self) -> Result<LineSpan, DisplayError> {
        self.buf
            .get_line(0)
            .ok_or_else(|| Self::desync("cursor is not on any line".into()))
    }

    /// Byte column of the cursor within its line, and the line's length.
    fn cursor_col_len(&self) -> Result<(usize, usize), DisplayError> {
        let span = self.cursor_line()?;
        Ok((self.buf.position() - span.start, self.buf.line_len(span)))
    }

    fn cursor_coord(&self) -> TermCoord {
        TermCoord {
            row: self.y + self.first_row + self.borders.top,
            col: self.x + self.borders.left + 1,
        }
    }

    fn content_row(&self, i: u16) -> u16 {
        self.first_row + self.borders.top + i
    }

    /// Verify the terminal cursor, viewport and buffer still agree.
    fn check_sync(&mut self) -> Result<(), DisplayError> {
        self.term.flush()?;
        let expected = self.cursor_coord();
        let actual = self.term.cursor_position()?;
        if actual != expected {
            return Err(Self::desync(format!(
                "expected terminal cursor at {expected} but it is at {actual}"
            )));
        }
        if self.y >= self.editable_rows {
            return Err(Self::desync(format!(
                "cursor y {} outside {} editable rows",
                self.y, self.editable_rows
            )));
        }
        let (col, len) = self.cursor_col_len()?;
        let x = usize::from(self.x);
        let fits = len < usize::from(self.width());
        if (fits && x != col) || x > col {
            return Err(Self::desync(format!(
                "cursor x {x} does not match line offset {col} (line length {len})"
            )));
        }
        Ok(())
    }

    fn move_cursor(&mut self) -> Result<(), DisplayError> {
        let coord = self.cursor_coord();
        self.term.move_to_coord(coord)?;
        Ok(())
    }

    /// Redraw just the cursor's line, then place the cursor.
    fn redraw_line(&mut self) -> Result<(), DisplayError> {
        let span = self.cursor_line()?;
        let col = self.buf.position() - span.start;
        let start = col - usize::from(self.x);
        let text = compose_row(
            &self.buf.line_bytes(span),
            start,
            self.width(),
            self.borders,
            &self.glyphs,
        );
        let row = self.content_row(self.y);
        print_row(&mut self.term, row, &text)?;
        self.move_cursor()
    }

    /// Repaint every owned row and check the cursor is where it belongs.
    pub fn redraw(&mut self) -> Result<(), DisplayError> {
        self.repaint()?;
        self.check_sync()
    }

    /// Repaint every owned row, then place the cursor.
    fn repaint(&mut self) -> Result<(), DisplayError> {
        let y = self.y as isize;
        let width = self.width();

        if self.borders.top > 0 {
            let glyph = if self.buf.get_line(-y - 1).is_some() {
                &self.glyphs.overflow_top
            } else {
                &self.glyphs.top
            };
            print_row(&mut self.term, self.first_row, glyph.as_bytes())?;
        }

        let cursor_start = {
            let span = self.cursor_line()?;
            self.buf.position() - span.start - usize::from(self.x)
        };
        let mut past_end = false;
        for i in 0..self.editable_rows {
            let row = self.content_row(i);
            let text = match self.buf.get_line(i as isize - y) {
                Some(span) => {
                    let start = if i == self.y { cursor_start } else { 0 };
                    let line = self.buf.line_bytes(span);
                    compose_row(&line, start, width, self.borders, &self.glyphs)
                }
                None if !past_end && i > self.y => {
                    past_end = true;
                    if self.borders.bottom > 0 {
                        self.glyphs.bottom.as_bytes().to_vec()
                    } else {
                        Vec::new()
                    }
                }
                None => Vec::new(),
            };
            print_row(&mut self.term, row, &text)?;
        }

        if self.borders.bottom > 0 {
            let below = self.editable_rows as isize - y;
            let glyph = if self.buf.get_line(below).is_some() {
                &self.glyphs.overflow_bottom
            } else {
                &self.glyphs.bottom
            };
            let row = self.content_row(self.editable_rows);
            print_row(&mut self.term, row, glyph.as_bytes())?;
        }

        self.move_cursor()
    }

    /// Move one byte left within the line.
    pub fn mv_left(&mut self) -> Result<(), DisplayError> {
        let (col, len) = self.cursor_col_len()?;
        if col == 0 {
            return Ok(());
        }
        let old_start = col - usize::from(self.x);
        self.buf.seek(-1, Whence::Current)?;
        let col = col - 1;
        self.x = fit_x(self.width(), usize::from(self.x.saturating_sub(1)), col, len);

        if col - usize::from(self.x) != old_start {
            self.redraw_line()?;
        } else {
            self.move_cursor()?;
        }
        self.check_sync()
    }

    /// Move one byte right, stopping at the end of the line.
    pub fn mv_right(&mut self) -> Result<(), DisplayError> {
        let (col, len) = self.cursor_col_len()?;
        if col >= len {
            return Ok(());
        }
        let old_start = col - usize::from(self.x);
        self.buf.seek(1, Whence::Current)?;
        let col = col + 1;
        self.x = fit_x(self.width(), usize::from(self.x) + 1, col, len);

        if col - usize::from(self.x) != old_start {
            self.redraw_line()?;
        } else {
            self.move_cursor()?;
        }
        self.check_sync()
    }

    pub fn mv_up(&mut self) -> Result<(), DisplayError> {
        self.mv_vertical(-1)
    }

    pub fn mv_down(&mut self) -> Result<(), DisplayError> {
        self.mv_vertical(1)
    }

    fn mv_vertical(&mut self, direction: isize) -> Result<(), DisplayError> {
        let Some(target) = self.buf.get_line(direction) else {
            return Ok(());
        };
        let (col, _) = self.cursor_col_len()?;
        let old_start = col - usize::from(self.x);

        let target_len = self.buf.line_len(target);
        let new_col = col.min(target_len);
        self.buf.seek((target.start + new_col) as i64, Whence::Start)?;

        let scrolled = if direction < 0 {
            let at_edge = self.y == 0;
            self.y = self.y.saturating_sub(1);
            at_edge
        } else {
            let at_edge = self.y + 1 >= self.editable_rows;
            self.y = (self.y + 1).min(self.editable_rows - 1);
            at_edge
        };
        self.x = fit_x(self.width(), new_col, new_col, target_len);
        let new_start = new_col - usize::from(self.x);

        if scrolled || old_start > 0 || new_start > 0 {
            self.repaint()?;
        } else {
            self.move_cursor()?;
        }
        self.check_sync()
    }

    /// Move up by as many as `editable_rows` lines with a single redraw.
    pub fn mv_page_up(&mut self) -> Result<(), DisplayError> {
        self.mv_page(-1)
    }

    /// Move down by as many as `editable_rows` lines with a single redraw.
    pub fn mv_page_down(&mut self) -> Result<(), DisplayError> {
        self.mv_page(1)
    }

    fn mv_page(&mut self, direction: isize) -> Result<(), DisplayError> {
        let mut count: u16 = 0;
        let mut target = None;
        while count < self.editable_rows {
            match self.buf.get_line(direction * (count as isize + 1)) {
                Some(span) => {
                    target = Some(span);
                    count += 1;
                }
                None => break,
            }
        }
        let Some(target) = target else {
            return Ok(());
        };
        tracing::trace!(count, direction, "page move");

        let (col, _) = self.cursor_col_len()?;
        let target_len = self.buf.line_len(target);
        let new_col = col.min(target_len);
        self.buf.seek((target.start + new_col) as i64, Whence::Start)?;

        self.y = if direction < 0 {
            self.y.saturating_sub(count)
        } else {
            (self.y + count).min(self.editable_rows - 1)
        };
        self.x = fit_x(self.width(), new_col, new_col, target_len);
        self.repaint()?;
        self.check_sync()
    }

    /// Move to the start of the line.
    pub fn mv_bol(&mut self) -> Result<(), DisplayError> {
        let span = self.cursor_line()?;
        let old_start = self.buf.position() - span.start - usize::from(self.x);
        self.buf.seek(span.start as i64, Whence::Start)?;
        self.x = 0;
        if old_start > 0 {
            self.redraw_line()?;
        } else {
            self.move_cursor()?;
        }
        self.check_sync()
    }

    /// Move past the last content byte of the line.
    pub fn mv_eol(&mut self) -> Result<(), DisplayError> {
        let span = self.cursor_line()?;
        let old_start = self.buf.position() - span.start - usize::from(self.x);
        let len = self.buf.line_len(span);
        self.buf.seek((span.start + len) as i64, Whence::Start)?;
        let width = self.width();
        self.x = fit_x(width, usize::from(width - 1), len, len);
        if len - usize::from(self.x) != old_start {
            self.redraw_line()?;
        } else {
            self.move_cursor()?;
        }
        self.check_sync()
    }

    /// Insert bytes at the cursor. Newlines go through [`insert_newline`].
    ///
    /// Each byte occupies one column, so multi-byte UTF-8 sequences take
    /// several.
    ///
    /// [`insert_newline`]: DisplayBox::insert_newline
    pub fn insert(&mut self, bytes: &[u8]) -> Result<(), DisplayError> {
        for (i, run) in bytes.split(|&b| b == b'\n').enumerate() {
            if i > 0 {
                self.insert_newline()?;
            }
            if !run.is_empty() {
                self.insert_run(run)?;
            }
        }
        Ok(())
    }

    fn insert_run(&mut self, run: &[u8]) -> Result<(), DisplayError> {
        let n = self.buf.insert(run);
        let (col, len) = self.cursor_col_len()?;
        self.x = fit_x(self.width(), usize::from(self.x) + n, col, len);
        self.redraw_line()?;
        self.check_sync()
    }

    /// Split the line at the cursor.
    ///
    /// Room for the new line comes from, in order: an unused viewport row,
    /// free terminal rows below the block, free rows above it (by scrolling
    /// the terminal), and finally scrolling the viewport itself.
    pub fn insert_newline(&mut self) -> Result<(), DisplayError> {
        let room = self.editable_rows - 1 - self.y;
        let mut lines_below: u16 = 0;
        while lines_below < room
            && self.buf.get_line(lines_below as isize + 1).is_some()
        {
            lines_below += 1;
        }

        self.buf.insert(b"\n");

        if self.y + lines_below + 1 < self.editable_rows {
            self.y += 1;
        } else if self.first_row + self.term_owned_rows <= self.term_size.rows {
            self.editable_rows += 1;
            self.term_owned_rows += 1;
            self.y += 1;
        } else if self.first_row > 1 {
            self.term.scroll_up()?;
            self.first_row -= 1;
            self.editable_rows += 1;
            self.term_owned_rows += 1;
            self.y += 1;
        } else {
            self.y = (self.y + 1).min(self.editable_rows - 1);
        }
        self.x = 0;
        tracing::trace!(
            editable_rows = self.editable_rows,
            first_row = self.first_row,
            y = self.y,
            "newline"
        );

        self.repaint()?;
        self.check_sync()
    }

    /// Delete the byte before the cursor, joining lines on a newline.
    pub fn backspace(&mut self) -> Result<(), DisplayError> {
        if self.buf.position() == 0 {
            return Ok(());
        }
        let removed = self.buf.delete(1);
        let (col, len) = self.cursor_col_len()?;
        if removed == b"\n" {
            self.y = self.y.saturating_sub(1);
            self.x = fit_x(self.width(), col, col, len);
            self.repaint()?;
        } else {
            self.x = fit_x(self.width(), usize::from(self.x.saturating_sub(1)), col, len);
            self.redraw_line()?;
        }
        self.check_sync()
    }

    /// Delete the byte under the cursor. Does nothing at the end of a line.
    pub fn del(&mut self) -> Result<(), DisplayError> {
        let before = self.buf.position();
        self.mv_right()?;
        if self.buf.position() != before {
            self.backspace()?;
        }
        Ok(())
    }

    /// Adapt the owned block to the terminal's new size and repaint it.
    pub fn terminal_resize(&mut self) -> Result<(), DisplayError> {
        let old = self.term_size;
        let new = self.term.size()?;
        self.term_size = new;
        tracing::debug!(
            old_cols = old.cols,
            old_rows = old.rows,
            cols = new.cols,
            rows = new.rows,
            "terminal resized"
        );

        if new.rows > old.rows {
            self.grow_rows(new.rows - old.rows);
        } else if new.rows < old.rows {
            self.shrink_rows()?;
        }

        if self.width() < 2 {
            return Err(DisplayError::TerminalTooSmall {
                cols: new.cols,
                rows: new.rows,
            });
        }
        let (col, len) = self.cursor_col_len()?;
        self.x = fit_x(self.width(), usize::from(self.x), col, len);

        self.repaint()?;
        self.check_sync()
    }

    fn grow_rows(&mut self, delta: u16) {
        let last = self.first_row + self.term_owned_rows - 1;
        let mut extra = delta.min(self.term_size.rows.saturating_sub(last));

        if extra > 0 && self.stolen.top {
            self.stolen.top = false;
            self.borders.top = 1;
            self.term_owned_rows += 1;
            extra -= 1;
        }
        if extra > 0 && self.stolen.bottom {
            self.stolen.bottom = false;
            self.borders.bottom = 1;
            self.term_owned_rows += 1;
            extra -= 1;
        }
        self.editable_rows += extra;
        self.term_owned_rows += extra;
    }

    fn shrink_rows(&mut self) -> Result<(), DisplayError> {
        let last = self.first_row + self.term_owned_rows - 1;
        if last <= self.term_size.rows {
            return Ok(());
        }
        let mut overflow = last - self.term_size.rows;

        let scroll = overflow.min(self.first_row - 1);
        for _ in 0..scroll {
            self.term.scroll_up()?;
        }
        self.first_row -= scroll;
        overflow -= scroll;
        if overflow == 0 {
            return Ok(());
        }

        let from_content = overflow.min(self.editable_rows - 1);
        self.editable_rows -= from_content;
        self.term_owned_rows -= from_content;
        self.y = self
            .y
            .saturating_sub(overflow)
            .min(self.editable_rows - 1);
        overflow -= from_content;

        if overflow > 0 && self.borders.bottom > 0 {
            self.borders.bottom = 0;
            self.stolen.bottom = true;
            self.term_owned_rows -= 1;
            overflow -= 1;
        }
        if overflow > 0 && self.borders.top > 0 {
            self.borders.top = 0;
            self.stolen.top = true;
            self.term_owned_rows -= 1;
            overflow -= 1;
        }
        if overflow > 0 {
            return Err(DisplayError::TerminalTooSmall {
                cols: self.term_size.cols,
                rows: self.term_size.rows,
            });
        }
        Ok(())
    }

    /// The coordinate just below the owned block.
    pub fn last_owned_row(&self) -> TermCoord {
        TermCoord {
            row: self.first_row + self.term_owned_rows,
            col: 1,
        }
    }

    /// Human-readable dump of the engine's geometry and cursor.
    pub fn debug_info(&self) -> String {
        let line_offset = self
            .buf
            .get_line(0)
            .map_or(0, |span| self.buf.position() - span.start);
        format!(
            "editable_rows={} term_owned_rows={} first_row={} line_offset={} cursor_x={} cursor_y={} size={}x{}",
            self.editable_rows,
            self.term_owned_rows,
            self.first_row,
            line_offset,
            self.x,
            self.y,
            self.term_size.cols,
            self.term_size.rows,
        )
    }

    pub fn buffer(&self) -> &GapBuffer {
        &self.buf
    }

    pub fn terminal(&self) -> &T {
        &self.term
    }

    pub fn terminal_mut(&mut self) -> &mut T {
        &mut self.term
    }

    /// Give back the terminal and the buffer.
    pub fn into_parts(self) -> (T, GapBuffer) {
        (self.term, self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Borders {
        Borders::new(false)
    }

    fn boxed() -> Borders {
        Borders::new(true)
    }

    fn test_glyphs() -> BorderGlyphs {
        BorderGlyphs {
            overflow_left: "<".into(),
            overflow_right: ">".into(),
            ..BorderGlyphs::default()
        }
    }

    #[test]
    fn short_line_x_tracks_column() {
        assert_eq!(fit_x(10, 0, 4, 6), 4);
        assert_eq!(fit_x(10, 9, 9, 9), 9);
    }

    #[test]
    fn long_line_reserves_last_cell_for_eol() {
        // 13 bytes in a 9-wide viewport.
        assert_eq!(fit_x(9, 20, 13, 13), 8);
        assert_eq!(fit_x(9, 20, 12, 13), 7);
        assert_eq!(fit_x(9, 3, 12, 13), 3);
        assert_eq!(fit_x(9, 5, 2, 13), 2);
    }

    #[test]
    fn plain_row_shows_window() {
        let row = compose_row(b"abcdefghijklm", 3, 11, plain(), &test_glyphs());
        assert_eq!(row, b"defghijklm");
    }

    #[test]
    fn bordered_row_pads_to_right_glyph() {
        let row = compose_row(b"hi", 0, 9, boxed(), &test_glyphs());
        assert_eq!(String::from_utf8(row).unwrap(), "~hi       ~");
    }

    #[test]
    fn bordered_row_marks_both_overflows() {
        let row = compose_row(b"abcdefghijklm", 2, 11, boxed(), &test_glyphs());
        assert_eq!(String::from_utf8(row).unwrap(), "<cdefghijkl >");
    }

    #[test]
    fn bordered_row_scrolled_to_end() {
        let row = compose_row(b"abcdefghijklm", 3, 11, boxed(), &test_glyphs());
        assert_eq!(String::from_utf8(row).unwrap(), "<defghijklm ~");
    }
}
