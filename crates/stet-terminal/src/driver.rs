//! Terminal driver abstraction and its crossterm implementation.

use crossterm::{cursor, queue, terminal};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};

/// Terminal dimensions in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub cols: u16,
    pub rows: u16,
}

/// A 1-indexed terminal cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermCoord {
    pub row: u16,
    pub col: u16,
}

impl std::fmt::Display for TermCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{};{}", self.row, self.col)
    }
}

/// The terminal operations the viewport engine needs.
///
/// All coordinates are 1-indexed. Writes may be buffered until
/// [`flush`](TerminalDriver::flush) or a cursor position query.
pub trait TerminalDriver {
    fn size(&self) -> io::Result<Size>;

    /// Query where the terminal's cursor currently is.
    fn cursor_position(&mut self) -> io::Result<TermCoord>;

    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn move_to(&mut self, row: u16, col: u16) -> io::Result<()>;

    fn move_to_coord(&mut self, coord: TermCoord) -> io::Result<()> {
        self.move_to(coord.row, coord.col)
    }

    fn clear_to_end_of_line(&mut self) -> io::Result<()>;

    /// Scroll the whole screen up one row.
    fn scroll_up(&mut self) -> io::Result<()>;

    fn save_cursor_position(&mut self) -> io::Result<()>;

    fn restore_cursor_position(&mut self) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

/// Longest cursor position reply, typeahead included, read before giving up.
const MAX_REPLY_BYTES: usize = 64;

/// Driver that emits crossterm commands to a terminal device.
///
/// The device is normally the controlling terminal (`/dev/tty`), which keeps
/// stdout free for the edited text. Cursor position queries are written to
/// the device and the reply is read back from it.
pub struct CrosstermDriver<T: Read + Write> {
    tty: BufWriter<T>,
}

impl<T: Read + Write> CrosstermDriver<T> {
    pub fn new(tty: T) -> Self {
        Self {
            tty: BufWriter::new(tty),
        }
    }

    /// The underlying device. Queued output is not included until flushed.
    pub fn get_ref(&self) -> &T {
        self.tty.get_ref()
    }
}

impl CrosstermDriver<File> {
    /// Open the controlling terminal for reading and writing.
    pub fn open_tty() -> io::Result<Self> {
        let tty = File::options().read(true).write(true).open("/dev/tty")?;
        Ok(Self::new(tty))
    }
}

impl<T: Read + Write> TerminalDriver for CrosstermDriver<T> {
    fn size(&self) -> io::Result<Size> {
        let (cols, rows) = terminal::size()?;
        Ok(Size { cols, rows })
    }

    fn cursor_position(&mut self) -> io::Result<TermCoord> {
        // DSR: the terminal answers with CSI row ; col R
        self.tty.write_all(b"\x1b[6n")?;
        self.tty.flush()?;
        read_position_reply(self.tty.get_mut())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.tty.write_all(bytes)
    }

    fn move_to(&mut self, row: u16, col: u16) -> io::Result<()> {
        queue!(
            self.tty,
            cursor::MoveTo(col.saturating_sub(1), row.saturating_sub(1))
        )
    }

    fn clear_to_end_of_line(&mut self) -> io::Result<()> {
        queue!(self.tty, terminal::Clear(terminal::ClearType::UntilNewLine))
    }

    fn scroll_up(&mut self) -> io::Result<()> {
        queue!(self.tty, terminal::ScrollUp(1))
    }

    fn save_cursor_position(&mut self) -> io::Result<()> {
        queue!(self.tty, cursor::SavePosition)
    }

    fn restore_cursor_position(&mut self) -> io::Result<()> {
        queue!(self.tty, cursor::RestorePosition)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.tty.flush()
    }
}

/// Read bytes until a complete cursor position reply has arrived.
///
/// Keys typed before the reply are discarded.
fn read_position_reply<R: Read>(input: &mut R) -> io::Result<TermCoord> {
    let mut reply = Vec::with_capacity(16);
    let mut byte = [0u8; 1];
    while reply.len() < MAX_REPLY_BYTES {
        if input.read(&mut byte)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "terminal closed before answering the cursor position query",
            ));
        }
        reply.push(byte[0]);
        if byte[0] == b'R' {
            if let Some(coord) = parse_position_reply(&reply) {
                return Ok(coord);
            }
        }
    }
    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "no cursor position reply from the terminal",
    ))
}

/// Parse the last `ESC [ row ; col R` sequence at the end of `bytes`.
fn parse_position_reply(bytes: &[u8]) -> Option<TermCoord> {
    let body = bytes.strip_suffix(b"R")?;
    let esc = body.windows(2).rposition(|w| w == b"\x1b[")?;
    if esc > 0 {
        tracing::debug!(skipped = esc, "discarded input before cursor position reply");
    }
    let text = std::str::from_utf8(&body[esc + 2..]).ok()?;
    let (row, col) = text.split_once(';')?;
    Some(TermCoord {
        row: row.parse().ok()?,
        col: col.parse().ok()?,
    })
}

/// Write `text` at the start of `row`, replacing what was there.
pub(crate) fn print_row<T: TerminalDriver + ?Sized>(
    term: &mut T,
    row: u16,
    text: &[u8],
) -> io::Result<()> {
    term.move_to(row, 1)?;
    term.clear_to_end_of_line()?;
    term.write(text)
}

/// Emit `\r\n` unless the cursor is already in the first column.
pub fn ensure_fresh_row<T: TerminalDriver + ?Sized>(term: &mut T) -> io::Result<()> {
    if term.cursor_position()?.col != 1 {
        term.write(b"\r\n")?;
        term.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A terminal that records output and answers reads from a script.
    struct Loopback {
        written: Vec<u8>,
        input: io::Cursor<Vec<u8>>,
    }

    impl Loopback {
        fn answering(input: &[u8]) -> Self {
            Self {
                written: Vec::new(),
                input: io::Cursor::new(input.to_vec()),
            }
        }
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn driver() -> CrosstermDriver<Loopback> {
        CrosstermDriver::new(Loopback::answering(b""))
    }

    fn written(driver: &mut CrosstermDriver<Loopback>) -> Vec<u8> {
        driver.flush().unwrap();
        driver.get_ref().written.clone()
    }

    #[test]
    fn move_to_converts_to_zero_indexed() {
        let mut driver = driver();
        driver.move_to(3, 7).unwrap();
        assert_eq!(written(&mut driver), b"\x1b[3;7H");
    }

    #[test]
    fn clear_scroll_and_save_sequences() {
        let mut driver = driver();
        driver.clear_to_end_of_line().unwrap();
        driver.scroll_up().unwrap();
        driver.save_cursor_position().unwrap();
        driver.restore_cursor_position().unwrap();
        assert_eq!(written(&mut driver), b"\x1b[K\x1b[1S\x1b7\x1b8");
    }

    #[test]
    fn print_row_moves_clears_and_writes() {
        let mut driver = driver();
        print_row(&mut driver, 2, b"~~~~").unwrap();
        assert_eq!(written(&mut driver), b"\x1b[2;1H\x1b[K~~~~");
    }

    #[test]
    fn cursor_query_goes_to_the_device() {
        let mut driver = CrosstermDriver::new(Loopback::answering(b"\x1b[12;34R"));
        driver.write(b"abc").unwrap();
        let coord = driver.cursor_position().unwrap();
        assert_eq!(coord, TermCoord { row: 12, col: 34 });
        assert_eq!(driver.get_ref().written, b"abc\x1b[6n");
    }

    #[test]
    fn typeahead_before_the_reply_is_skipped() {
        let mut driver = CrosstermDriver::new(Loopback::answering(b"xR\x1b[3;1Rrest"));
        assert_eq!(
            driver.cursor_position().unwrap(),
            TermCoord { row: 3, col: 1 }
        );
    }

    #[test]
    fn missing_reply_is_an_error() {
        let mut driver = CrosstermDriver::new(Loopback::answering(b"\x1b[3;"));
        let err = driver.cursor_position().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let noise = vec![b'x'; MAX_REPLY_BYTES + 1];
        let mut driver = CrosstermDriver::new(Loopback::answering(&noise));
        let err = driver.cursor_position().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn reply_parsing() {
        assert_eq!(
            parse_position_reply(b"\x1b[1;1R"),
            Some(TermCoord { row: 1, col: 1 })
        );
        assert_eq!(parse_position_reply(b"\x1b[;1R"), None);
        assert_eq!(parse_position_reply(b"\x1b[1;1"), None);
        assert_eq!(parse_position_reply(b"1;1R"), None);
    }

    #[test]
    fn coord_display() {
        assert_eq!(TermCoord { row: 4, col: 9 }.to_string(), "4;9");
    }
}
