use core::fmt;
use core::ops::Range;

use bstr::BStr;
use memchr::{memchr, memchr2, memchr3, memchr_iter};
use tracing::trace;

use crate::source::Source;

/// A refillable view over a fixed-size buffer.
///
/// The window is the range of buffered bytes that have not been consumed
/// yet. Refilling first moves the window to the front of the buffer and then
/// reads from the source into the free space behind it, so the buffer length
/// bounds how much unconsumed data can be held at once.
///
/// `B` is anything that derefs to a byte slice: a `&mut [u8]` borrowed from
/// the caller, an array, or a `Vec<u8>`. The window never resizes it.
pub struct ByteWindow<S, B> {
    src: S,
    buf: B,
    /// Start of the unconsumed bytes.
    start: usize,
    /// End of the bytes read from `src`.
    end: usize,
    /// Set once `src` returned `0`.
    exhausted: bool,
    /// Total number of bytes consumed.
    consumed: u64,
    /// Total number of `\n` bytes consumed.
    lines: u64,
}

impl<S: Source, B: AsRef<[u8]> + AsMut<[u8]>> ByteWindow<S, B> {
    /// Create an empty window that will read from `src` into `buf`.
    pub fn new(src: S, buf: B) -> ByteWindow<S, B> {
        ByteWindow {
            src,
            buf,
            start: 0,
            end: 0,
            exhausted: false,
            consumed: 0,
            lines: 0,
        }
    }

    /// Consume and return the next byte, refilling first if the window is
    /// empty.
    ///
    /// Returns `None` only when the window is empty and the source has no
    /// more data.
    pub fn next_byte(&mut self) -> Result<Option<u8>, S::Error> {
        let b = self.peek()?;
        if b.is_some() {
            self.consume(1);
        }
        Ok(b)
    }

    /// Return the next byte without consuming it, refilling first if the
    /// window is empty.
    ///
    /// Calling this repeatedly without consuming anything in between
    /// returns the same byte every time.
    pub fn peek(&mut self) -> Result<Option<u8>, S::Error> {
        if !self.ensure_data()? {
            return Ok(None);
        }
        Ok(Some(self.buf.as_ref()[self.start]))
    }

    /// Return the window bytes preceding the first occurrence of any of the
    /// given terminators. The terminator itself is not included.
    ///
    /// This never refills. `None` means the terminator was not seen in the
    /// bytes buffered so far, not that it is absent from the input.
    pub fn until(&self, terminators: &[u8]) -> Option<&[u8]> {
        let window = self.as_slice();
        find_any(terminators, window).map(|i| &window[..i])
    }

    /// Return the raw contents of a quoted field, up to but excluding its
    /// closing quote. The window must start just past the opening quote.
    ///
    /// A doubled quote is an escaped literal and does not close the field.
    /// The returned bytes still contain the doubled quotes; see
    /// [`unescape_in_place`](crate::unescape_in_place).
    ///
    /// If a quote is the very last buffered byte and the source is not
    /// exhausted, then it is unknown whether it closes the field or starts
    /// an escape, so this returns `None`. It also returns `None` when no
    /// closing quote is buffered at all.
    pub fn until_closing_quote(&self, quote: u8) -> Option<&[u8]> {
        let window = self.as_slice();
        let mut at = 0;
        while let Some(i) = memchr(quote, &window[at..]) {
            let i = at + i;
            match window.get(i + 1) {
                Some(&b) if b == quote => at = i + 2,
                Some(_) => return Some(&window[..i]),
                None if self.exhausted => return Some(&window[..i]),
                None => return None,
            }
        }
        None
    }

    /// Move the unconsumed bytes to the front of the buffer and read more
    /// data into the space behind them.
    ///
    /// Returns `true` if new bytes were read. `false` means either that the
    /// source is exhausted or that the buffer is completely occupied by
    /// unconsumed bytes, in which case the source is not touched.
    pub fn read(&mut self) -> Result<bool, S::Error> {
        if self.exhausted {
            return Ok(false);
        }
        let len = self.len();
        if self.start > 0 {
            self.buf.as_mut().copy_within(self.start..self.end, 0);
            self.start = 0;
            self.end = len;
        }
        let free = &mut self.buf.as_mut()[self.end..];
        if free.is_empty() {
            trace!(len, "window fills the buffer, refill skipped");
            return Ok(false);
        }
        let n = self.src.read(free)?;
        if n == 0 {
            trace!(len, "source exhausted");
            self.exhausted = true;
            return Ok(false);
        }
        trace!(kept = len, read = n, "refilled window");
        self.end = (self.end + n).min(self.capacity());
        Ok(true)
    }

    /// Returns `true` if the window has at least one byte, refilling once if
    /// it is empty.
    pub fn ensure_data(&mut self) -> Result<bool, S::Error> {
        if !self.is_empty() {
            return Ok(true);
        }
        self.read()
    }

    /// Advance the window past `n` bytes.
    ///
    /// # Panics
    ///
    /// When `n` exceeds the window length.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.len(), "cannot consume past the end of the window");
        let bytes = &self.buf.as_ref()[self.start..self.start + n];
        self.lines += memchr_iter(b'\n', bytes).count() as u64;
        self.consumed += n as u64;
        self.start += n;
    }

    /// Consume `n` bytes and return their location in the buffer.
    pub(crate) fn take(&mut self, n: usize) -> Range<usize> {
        let start = self.start;
        self.consume(n);
        start..start + n
    }

    /// Bytes at the given buffer location.
    pub(crate) fn get(&self, range: Range<usize>) -> &[u8] {
        &self.buf.as_ref()[range]
    }

    /// Mutable bytes at the given buffer location.
    pub(crate) fn get_mut(&mut self, range: Range<usize>) -> &mut [u8] {
        &mut self.buf.as_mut()[range]
    }
}

impl<S, B: AsRef<[u8]>> ByteWindow<S, B> {
    /// The unconsumed bytes currently buffered.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf.as_ref()[self.start..self.end]
    }

    /// The number of unconsumed bytes currently buffered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if no unconsumed bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The total size of the buffer.
    pub fn capacity(&self) -> usize {
        self.buf.as_ref().len()
    }

    /// Returns true once the source has reported that it has no more data.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// The number of bytes consumed so far.
    pub fn byte_offset(&self) -> u64 {
        self.consumed
    }

    /// The 1-based line number of the next unconsumed byte.
    pub fn line(&self) -> u64 {
        self.lines + 1
    }

    /// A reference to the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.src
    }

    /// Unwrap this window into its source and buffer. Unconsumed bytes are
    /// lost.
    pub fn into_parts(self) -> (S, B) {
        (self.src, self.buf)
    }
}

impl<S, B: AsRef<[u8]>> fmt::Debug for ByteWindow<S, B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ByteWindow")
            .field("window", &BStr::new(self.as_slice()))
            .field("capacity", &self.capacity())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

fn find_any(needles: &[u8], haystack: &[u8]) -> Option<usize> {
    match *needles {
        [] => None,
        [a] => memchr(a, haystack),
        [a, b] => memchr2(a, b, haystack),
        [a, b, c] => memchr3(a, b, c, haystack),
        _ => haystack.iter().position(|b| needles.contains(b)),
    }
}
