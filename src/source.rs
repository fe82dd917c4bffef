use std::io;

use csvtok_core::Source;

/// Adapts any `std::io::Read` into a tokenizer [`Source`].
///
/// Reads interrupted by a signal (`io::ErrorKind::Interrupted`) are retried.
/// Every other I/O error is passed through unchanged.
#[derive(Debug)]
pub struct IoSource<R> {
    rdr: R,
}

impl<R: io::Read> IoSource<R> {
    /// Wrap the given reader.
    pub fn new(rdr: R) -> IoSource<R> {
        IoSource { rdr }
    }
}

impl<R> IoSource<R> {
    /// Return a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.rdr
    }

    /// Return a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.rdr
    }

    /// Unwrap this source, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.rdr
    }
}

impl<R: io::Read> Source for IoSource<R> {
    type Error = io::Error;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.rdr.read(buf) {
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use csvtok_core::Source;

    use super::IoSource;

    /// Fails with `Interrupted` before every successful read.
    struct Flaky<'a> {
        data: &'a [u8],
        interrupt: bool,
    }

    impl<'a> io::Read for Flaky<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                let kind = io::ErrorKind::Interrupted;
                return Err(io::Error::new(kind, "signal"));
            }
            io::Read::read(&mut self.data, buf)
        }
    }

    #[test]
    fn retries_interrupted() {
        let mut src = IoSource::new(Flaky { data: b"abc", interrupt: false });
        let mut buf = [0; 8];
        assert_eq!(src.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(src.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn passes_other_errors() {
        struct Broken;

        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
        }

        let mut src = IoSource::new(Broken);
        let err = src.read(&mut [0; 4]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
