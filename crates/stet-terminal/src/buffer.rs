//! Gap buffer text store with cursor-relative line lookup.
//!
//! The backing store is one `Vec<u8>` laid out as
//!
//! ```text
//! [ front segment | gap (unused) | back segment ]
//!   0..front        front..cap-back  cap-back..cap
//! ```
//!
//! `front` doubles as the cursor's absolute byte offset. Lines are found by
//! scanning for `\n` outward from the cursor; there is no line index.

use std::io;
use stet_types::BufferError;

/// Capacity used when a buffer is requested with fewer than two bytes.
pub const MIN_CAPACITY: usize = 1 << 16;

/// Reference point for [`GapBuffer::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl TryFrom<i32> for Whence {
    type Error = BufferError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            whence => Err(BufferError::InvalidArgument { whence }),
        }
    }
}

/// Absolute byte range of one line.
///
/// `end` is the offset of the line's trailing newline. For a final line with
/// no newline it is the last content byte, or `start` when that line is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

/// Growable byte buffer with a movable gap at the cursor.
#[derive(Debug, Clone)]
pub struct GapBuffer {
    buf: Vec<u8>,
    front: usize,
    back: usize,
}

impl Default for GapBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl GapBuffer {
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    /// Create an empty buffer. Requests below two bytes get [`MIN_CAPACITY`].
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = if capacity < 2 { MIN_CAPACITY } else { capacity };
        Self {
            buf: vec![0; capacity],
            front: 0,
            back: 0,
        }
    }

    /// Content length in bytes.
    pub fn len(&self) -> usize {
        self.front + self.back
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn gap_len(&self) -> usize {
        self.capacity() - self.len()
    }

    /// The cursor's absolute byte offset.
    pub fn position(&self) -> usize {
        self.front
    }

    fn back_start(&self) -> usize {
        self.capacity() - self.back
    }

    fn front_slice(&self) -> &[u8] {
        &self.buf[..self.front]
    }

    fn back_slice(&self) -> &[u8] {
        &self.buf[self.back_start()..]
    }

    /// The byte at absolute offset `pos`, if it exists.
    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        if pos < self.front {
            Some(self.buf[pos])
        } else if pos < self.len() {
            Some(self.buf[pos - self.front + self.back_start()])
        } else {
            None
        }
    }

    /// Copy the whole content out, ignoring the gap.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        out.extend_from_slice(self.front_slice());
        out.extend_from_slice(self.back_slice());
        out
    }

    /// Move the cursor and return its new absolute offset.
    ///
    /// Targets past the end clamp to the end; negative targets are an error
    /// and leave the cursor where it was.
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<usize, BufferError> {
        let base = match whence {
            Whence::Start => 0,
            Whence::Current => self.front as i64,
            Whence::End => self.len() as i64,
        };
        let target = base.saturating_add(offset);
        if target < 0 {
            return Err(BufferError::InvalidPosition { position: target });
        }
        let target = usize::try_from(target).map_or(self.len(), |t| t.min(self.len()));
        self.move_gap_to(target);
        Ok(target)
    }

    fn move_gap_to(&mut self, pos: usize) {
        if pos < self.front {
            let n = self.front - pos;
            let dest = self.back_start() - n;
            self.buf.copy_within(pos..self.front, dest);
            self.front = pos;
            self.back += n;
        } else if pos > self.front {
            let n = pos - self.front;
            let src = self.back_start();
            self.buf.copy_within(src..src + n, self.front);
            self.front = pos;
            self.back -= n;
        }
    }

    /// Insert `data` at the cursor, leaving the cursor after it.
    pub fn insert(&mut self, data: &[u8]) -> usize {
        if data.len() > self.gap_len() {
            self.grow(data.len());
        }
        self.buf[self.front..self.front + data.len()].copy_from_slice(data);
        self.front += data.len();
        data.len()
    }

    fn grow(&mut self, needed: usize) {
        let old_cap = self.capacity();
        let mut new_cap = old_cap;
        while new_cap - self.len() < needed {
            new_cap *= 2;
        }
        tracing::trace!(old_cap, new_cap, "growing gap buffer");

        let mut buf = vec![0; new_cap];
        buf[..self.front].copy_from_slice(self.front_slice());
        buf[new_cap - self.back..].copy_from_slice(self.back_slice());
        self.buf = buf;
    }

    /// Remove up to `n` bytes before the cursor and return them.
    pub fn delete(&mut self, n: usize) -> Vec<u8> {
        let n = n.min(self.front);
        let removed = self.buf[self.front - n..self.front].to_vec();
        self.front -= n;
        removed
    }

    /// Fill `out` starting at absolute `offset` without moving the cursor.
    ///
    /// A short read returns [`BufferError::EndOfStream`] carrying the number
    /// of bytes that were copied.
    pub fn read_at(&self, out: &mut [u8], offset: usize) -> Result<usize, BufferError> {
        let mut read = 0;
        if offset < self.front {
            let chunk = &self.buf[offset..self.front];
            let n = chunk.len().min(out.len());
            out[..n].copy_from_slice(&chunk[..n]);
            read = n;
        }
        if read < out.len() {
            let back_offset = (offset + read).saturating_sub(self.front);
            let back = self.back_slice();
            if back_offset < back.len() {
                let chunk = &back[back_offset..];
                let n = chunk.len().min(out.len() - read);
                out[read..read + n].copy_from_slice(&chunk[..n]);
                read += n;
            }
        }
        if read < out.len() {
            return Err(BufferError::EndOfStream { read });
        }
        Ok(read)
    }

    /// Read forward from the cursor, advancing it past the bytes read.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize, BufferError> {
        let result = self.read_at(out, self.front);
        let n = match &result {
            Ok(n) => *n,
            Err(BufferError::EndOfStream { read }) => *read,
            Err(_) => 0,
        };
        self.move_gap_to(self.front + n);
        result
    }

    fn find_newline_forward(&self, from: usize) -> Option<usize> {
        if from < self.front {
            if let Some(i) = self.front_slice()[from..].iter().position(|&b| b == b'\n') {
                return Some(from + i);
            }
        }
        let skip = from.saturating_sub(self.front);
        self.back_slice()
            .get(skip..)?
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| self.front + skip + i)
    }

    /// Offset of the last newline strictly before `before`.
    fn find_newline_backward(&self, before: usize) -> Option<usize> {
        if before > self.front {
            let back = &self.back_slice()[..before - self.front];
            if let Some(i) = back.iter().rposition(|&b| b == b'\n') {
                return Some(self.front + i);
            }
        }
        let limit = before.min(self.front);
        self.front_slice()[..limit]
            .iter()
            .rposition(|&b| b == b'\n')
    }

    fn line_start_at(&self, pos: usize) -> usize {
        self.find_newline_backward(pos).map_or(0, |nl| nl + 1)
    }

    fn span_from(&self, start: usize) -> LineSpan {
        let end = match self.find_newline_forward(start) {
            Some(nl) => nl,
            None if start == self.len() => start,
            None => self.len() - 1,
        };
        assert!(start <= end, "line span start {start} is past end {end}");
        LineSpan { start, end }
    }

    /// The line `offset` lines away from the cursor's line.
    ///
    /// Returns `None` when no such line exists.
    ///
    /// # Panics
    ///
    /// Panics if the computed span has `start > end`, which would mean the
    /// segment bookkeeping is corrupt.
    pub fn get_line(&self, offset: isize) -> Option<LineSpan> {
        let mut start = self.line_start_at(self.front);
        if offset < 0 {
            for _ in 0..offset.unsigned_abs() {
                if start == 0 {
                    return None;
                }
                start = self.line_start_at(start - 1);
            }
        } else {
            for _ in 0..offset {
                start = self.find_newline_forward(start)? + 1;
            }
        }
        Some(self.span_from(start))
    }

    /// Number of content bytes in `span`, newline excluded.
    pub fn line_len(&self, span: LineSpan) -> usize {
        if span.start >= self.len() {
            return 0;
        }
        match self.byte_at(span.end) {
            Some(b'\n') => span.end - span.start,
            _ => span.end - span.start + 1,
        }
    }

    /// The content bytes of `span`, newline excluded.
    pub fn line_bytes(&self, span: LineSpan) -> Vec<u8> {
        let mut out = vec![0; self.line_len(span)];
        // A span from get_line always lies inside the content.
        let n = match self.read_at(&mut out, span.start) {
            Ok(n) => n,
            Err(BufferError::EndOfStream { read }) => read,
            Err(_) => 0,
        };
        out.truncate(n);
        out
    }
}

impl io::Read for GapBuffer {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        match GapBuffer::read(self, out) {
            Ok(n) => Ok(n),
            Err(BufferError::EndOfStream { read }) => Ok(read),
            Err(e) => Err(io::Error::new(io::ErrorKind::InvalidInput, e)),
        }
    }
}

impl io::Seek for GapBuffer {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(n) => (i64::try_from(n).unwrap_or(i64::MAX), Whence::Start),
            io::SeekFrom::Current(n) => (n, Whence::Current),
            io::SeekFrom::End(n) => (n, Whence::End),
        };
        GapBuffer::seek(self, offset, whence)
            .map(|p| p as u64)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }
}
