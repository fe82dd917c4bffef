use core::cmp;
use core::convert::Infallible;

/// A source of bytes for a [`ByteWindow`](crate::ByteWindow).
///
/// This mirrors `std::io::Read` without requiring `std`. A call to `read`
/// may fill any prefix of `buf` (short reads are fine), and returning `0`
/// means the source is exhausted. Implementations may block.
pub trait Source {
    /// The error produced by a failed read. It is passed through to the
    /// caller of the tokenizer untouched.
    type Error;

    /// Read bytes into `buf`, returning how many were written.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

impl<'a> Source for &'a [u8] {
    type Error = Infallible;

    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Infallible> {
        let n = cmp::min(buf.len(), self.len());
        let (head, tail) = self.split_at(n);
        buf[..n].copy_from_slice(head);
        *self = tail;
        Ok(n)
    }
}

impl<'a, S: Source + ?Sized> Source for &'a mut S {
    type Error = S::Error;

    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, S::Error> {
        (**self).read(buf)
    }
}
