use std::fs::File;
use std::io;
use std::path::Path;

use csvtok_core::{Position, Token, Tokenizer, TokenizerBuilder};
use tracing::debug;

use crate::byte_record::ByteRecord;
use crate::error::{Error, Result};
use crate::source::IoSource;

const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// Builds a CSV reader with various configuration knobs.
///
/// This builder can be used to tweak the field delimiter, record terminator
/// and more. Once a CSV `Reader` is built, its configuration cannot be
/// changed.
#[derive(Clone, Debug)]
pub struct ReaderBuilder {
    builder: TokenizerBuilder,
    capacity: usize,
}

impl Default for ReaderBuilder {
    fn default() -> ReaderBuilder {
        ReaderBuilder {
            builder: TokenizerBuilder::new(),
            capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl ReaderBuilder {
    /// Create a new builder for configuring CSV parsing.
    ///
    /// To convert a builder into a reader, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use csvtok::ReaderBuilder;
    ///
    /// # fn main() -> csvtok::Result<()> {
    /// let data = "city;pop\nBoston;4628910\n";
    /// let mut rdr = ReaderBuilder::new()
    ///     .delimiter(b';')
    ///     .from_reader(data.as_bytes())?;
    ///
    /// let mut total = 0;
    /// for result in rdr.byte_records() {
    ///     let record = result?;
    ///     total += record.len();
    /// }
    /// assert_eq!(total, 4);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new() -> ReaderBuilder {
        ReaderBuilder::default()
    }

    /// Build a CSV reader from this configuration that reads data from
    /// `rdr`.
    ///
    /// This allocates the tokenizer buffer up front. No other allocation
    /// happens while tokenizing.
    pub fn from_reader<R: io::Read>(&self, rdr: R) -> Result<Reader<R>> {
        let buf = vec![0; self.capacity];
        let tok = self.builder.build(IoSource::new(rdr), buf)?;
        debug!(capacity = self.capacity, "built CSV reader");
        Ok(Reader { tok, done: false })
    }

    /// Build a CSV reader from this configuration that reads data from the
    /// given file path.
    ///
    /// If there was a problem opening the file, then this returns an error.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Reader<File>> {
        self.from_reader(File::open(path)?)
    }

    /// The field delimiter to use when parsing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut ReaderBuilder {
        self.builder.delimiter(delimiter);
        self
    }

    /// The record terminator to use when parsing CSV.
    ///
    /// The default is `b'\n'`.
    pub fn terminator(&mut self, terminator: u8) -> &mut ReaderBuilder {
        self.builder.terminator(terminator);
        self
    }

    /// The quote character to use when parsing CSV.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut ReaderBuilder {
        self.builder.quote(quote);
        self
    }

    /// Use the ASCII unit separator and record separator as the delimiter
    /// and terminator.
    pub fn ascii(&mut self) -> &mut ReaderBuilder {
        self.builder.ascii();
        self
    }

    /// Set the capacity (in bytes) of the tokenizer buffer.
    ///
    /// No single field may be as long as this capacity. The default is 64
    /// KiB. A capacity of zero is rejected when the reader is built.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut ReaderBuilder {
        self.capacity = capacity;
        self
    }
}

/// A streaming CSV reader.
///
/// The reader owns one fixed-size buffer and reports fields either one
/// token at a time through [`Reader::next_token`], or collected into
/// records through [`Reader::read_byte_record`].
#[derive(Debug)]
pub struct Reader<R> {
    tok: Tokenizer<IoSource<R>, Vec<u8>>,
    done: bool,
}

impl<R: io::Read> Reader<R> {
    /// Create a new CSV reader with the default configuration.
    ///
    /// To customize CSV parsing, use a `ReaderBuilder`.
    pub fn from_reader(rdr: R) -> Result<Reader<R>> {
        ReaderBuilder::new().from_reader(rdr)
    }

    /// Return the next token.
    ///
    /// A field borrows the reader's buffer until the next call. After
    /// `Token::Eof` or an error, every further call fails. A parse error
    /// carries the position at which the failing token began.
    pub fn next_token(&mut self) -> Result<Token<'_>> {
        let pos = self.tok.position();
        match self.tok.next() {
            Ok(token) => Ok(token),
            Err(err) => {
                self.done = true;
                Err(Error::tokenizer(err, pos))
            }
        }
    }

    /// Read the next record into `record`, replacing its contents.
    ///
    /// This returns `false` once there are no more records. An error ends
    /// the stream as well: later calls return `false`.
    ///
    /// # Example
    ///
    /// ```
    /// use csvtok::{ByteRecord, Reader};
    ///
    /// # fn main() -> csvtok::Result<()> {
    /// let mut rdr = Reader::from_reader(&b"a,\"b,c\"\nd,e\n"[..])?;
    /// let mut record = ByteRecord::new();
    ///
    /// assert!(rdr.read_byte_record(&mut record)?);
    /// assert_eq!(record, ByteRecord::from(vec!["a", "b,c"]));
    /// assert!(rdr.read_byte_record(&mut record)?);
    /// assert_eq!(record, ByteRecord::from(vec!["d", "e"]));
    /// assert!(!rdr.read_byte_record(&mut record)?);
    /// # Ok(())
    /// # }
    /// ```
    pub fn read_byte_record(
        &mut self,
        record: &mut ByteRecord,
    ) -> Result<bool> {
        record.clear();
        if self.done {
            return Ok(false);
        }
        loop {
            let eof = match self.next_token()? {
                Token::Field(field) => {
                    record.push_field(field);
                    continue;
                }
                Token::RowEnd => false,
                Token::Eof => true,
            };
            if eof {
                self.done = true;
            }
            return Ok(!eof);
        }
    }

    /// Returns a borrowed iterator over all records as `ByteRecord`s.
    ///
    /// The iterator stops after the first error it yields.
    pub fn byte_records(&mut self) -> ByteRecordsIter<'_, R> {
        ByteRecordsIter { rdr: self, rec: ByteRecord::new() }
    }

    /// Returns an owned iterator over all records as `ByteRecord`s.
    pub fn into_byte_records(self) -> ByteRecordsIntoIter<R> {
        ByteRecordsIntoIter { rdr: self, rec: ByteRecord::new() }
    }
}

impl Reader<File> {
    /// Create a new CSV reader with the default configuration for the file
    /// at the given path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Reader<File>> {
        ReaderBuilder::new().from_path(path)
    }
}

impl<R> Reader<R> {
    /// The current position of the reader.
    ///
    /// The byte offset counts every byte consumed so far, the line number
    /// starts at `1` and the record count is the number of records that
    /// have ended.
    pub fn position(&self) -> Position {
        self.tok.position()
    }

    /// Returns true once the reader reached the end of input or failed.
    pub fn is_done(&self) -> bool {
        self.done || self.tok.is_finished()
    }

    /// Return a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        self.tok.window().get_ref().get_ref()
    }

    /// Unwrap this CSV reader, returning the underlying reader.
    ///
    /// Any data still buffered by the tokenizer is lost.
    pub fn into_inner(self) -> R {
        self.tok.into_parts().0.into_inner()
    }
}

/// A borrowed iterator over byte records.
///
/// The lifetime parameter `'r` refers to the lifetime of the underlying CSV
/// `Reader`.
#[derive(Debug)]
pub struct ByteRecordsIter<'r, R> {
    rdr: &'r mut Reader<R>,
    rec: ByteRecord,
}

impl<'r, R: io::Read> ByteRecordsIter<'r, R> {
    /// Return a reference to the underlying CSV reader.
    pub fn reader(&self) -> &Reader<R> {
        &self.rdr
    }
}

impl<'r, R: io::Read> Iterator for ByteRecordsIter<'r, R> {
    type Item = Result<ByteRecord>;

    fn next(&mut self) -> Option<Result<ByteRecord>> {
        match self.rdr.read_byte_record(&mut self.rec) {
            Ok(true) => Some(Ok(self.rec.clone())),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// An owned iterator over byte records.
#[derive(Debug)]
pub struct ByteRecordsIntoIter<R> {
    rdr: Reader<R>,
    rec: ByteRecord,
}

impl<R: io::Read> ByteRecordsIntoIter<R> {
    /// Drop this iterator and return the underlying CSV reader.
    pub fn into_reader(self) -> Reader<R> {
        self.rdr
    }
}

impl<R: io::Read> Iterator for ByteRecordsIntoIter<R> {
    type Item = Result<ByteRecord>;

    fn next(&mut self) -> Option<Result<ByteRecord>> {
        match self.rdr.read_byte_record(&mut self.rec) {
            Ok(true) => Some(Ok(self.rec.clone())),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use csvtok_core::{ConfigError, ParseError, Token};

    use super::{Reader, ReaderBuilder};
    use crate::byte_record::ByteRecord;
    use crate::error::Error;

    fn b(s: &str) -> &[u8] {
        s.as_bytes()
    }

    fn records(rdr: &mut Reader<&[u8]>) -> Vec<ByteRecord> {
        records_of(rdr)
    }

    fn records_of<R: io::Read>(rdr: &mut Reader<R>) -> Vec<ByteRecord> {
        rdr.byte_records().collect::<Result<_, _>>().unwrap()
    }

    /// Hands out at most `step` bytes per read.
    struct Chunked<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl<'a> io::Read for Chunked<'a> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn read_records() {
        let mut rdr = Reader::from_reader(b("a,b\n\"c\"\"d\",\n")).unwrap();
        assert_eq!(
            records(&mut rdr),
            vec![
                ByteRecord::from(vec!["a", "b"]),
                ByteRecord::from(vec!["c\"d", ""]),
            ]
        );
        assert!(rdr.is_done());
        assert_eq!(rdr.position().record(), 2);
    }

    #[test]
    fn read_without_final_terminator() {
        let mut rdr = Reader::from_reader(b("a,b\nc")).unwrap();
        assert_eq!(
            records(&mut rdr),
            vec![ByteRecord::from(vec!["a", "b"]), ByteRecord::from(vec!["c"])]
        );
    }

    #[test]
    fn read_empty() {
        let mut rdr = Reader::from_reader(b("")).unwrap();
        assert!(records(&mut rdr).is_empty());

        let mut rec = ByteRecord::from(vec!["stale"]);
        assert!(!rdr.read_byte_record(&mut rec).unwrap());
        assert!(rec.is_empty());
    }

    #[test]
    fn tokens() {
        let mut rdr = Reader::from_reader(b("x,y\n")).unwrap();
        assert_eq!(rdr.next_token().unwrap(), Token::Field(b"x"));
        assert_eq!(rdr.next_token().unwrap(), Token::Field(b"y"));
        assert_eq!(rdr.next_token().unwrap(), Token::RowEnd);
        assert_eq!(rdr.next_token().unwrap(), Token::Eof);
        match rdr.next_token() {
            Err(Error::Parse { err: ParseError::Finished, .. }) => {}
            result => panic!("expected finished error, got {:?}", result),
        }
    }

    #[test]
    fn custom_config() {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .terminator(b';')
            .quote(b'\'')
            .from_reader(b("a\t'b;c'\t'it''s';d;"))
            .unwrap();
        assert_eq!(
            records(&mut rdr),
            vec![
                ByteRecord::from(vec!["a", "b;c", "it's"]),
                ByteRecord::from(vec!["d"]),
            ]
        );
    }

    #[test]
    fn ascii_config() {
        let mut rdr = ReaderBuilder::new()
            .ascii()
            .from_reader(b("a\x1Fb,c\x1Ed\x1E"))
            .unwrap();
        assert_eq!(
            records(&mut rdr),
            vec![
                ByteRecord::from(vec!["a", "b,c"]),
                ByteRecord::from(vec!["d"]),
            ]
        );
    }

    #[test]
    fn config_errors() {
        let err =
            ReaderBuilder::new().quote(b',').from_reader(b("")).unwrap_err();
        match err {
            Error::Config(ConfigError::DuplicateByte(b',')) => {}
            err => panic!("unexpected error: {:?}", err),
        }

        let err = ReaderBuilder::new()
            .buffer_capacity(0)
            .from_reader(b(""))
            .unwrap_err();
        match err {
            Error::Config(ConfigError::EmptyBuffer) => {}
            err => panic!("unexpected error: {:?}", err),
        }
    }

    #[test]
    fn field_too_long_for_buffer() {
        let mut rdr = ReaderBuilder::new()
            .buffer_capacity(4)
            .from_reader(b("abc,abcd\n"))
            .unwrap();
        let mut rec = ByteRecord::new();
        let err = rdr.read_byte_record(&mut rec).unwrap_err();
        match err {
            Error::Parse { err: ParseError::ShortBuffer, pos } => {
                assert_eq!(pos.byte(), 4);
                assert_eq!(pos.record(), 0);
            }
            err => panic!("unexpected error: {:?}", err),
        }
        assert!(rdr.is_done());
        assert!(!rdr.read_byte_record(&mut rec).unwrap());
    }

    #[test]
    fn iterator_stops_after_error() {
        let mut rdr = Reader::from_reader(b("a,b\nc\"d\ne,f\n")).unwrap();
        let mut it = rdr.byte_records();
        let first = it.next().unwrap().unwrap();
        assert_eq!(first, ByteRecord::from(vec!["a", "b"]));
        match it.next() {
            Some(Err(Error::Parse {
                err: ParseError::MisplacedQuote, ..
            })) => {}
            result => panic!("unexpected result: {:?}", result),
        }
        assert!(it.next().is_none());
    }

    #[test]
    fn small_reads_fill_the_buffer() {
        let data = b("alpha,beta\ngamma,delta");
        let mut rdr = ReaderBuilder::new()
            .buffer_capacity(8)
            .from_reader(Chunked { data, step: 1 })
            .unwrap();
        assert_eq!(
            records_of(&mut rdr),
            vec![
                ByteRecord::from(vec!["alpha", "beta"]),
                ByteRecord::from(vec!["gamma", "delta"]),
            ]
        );

        let mut rdr = ReaderBuilder::new()
            .buffer_capacity(8)
            .from_reader(Chunked { data: b("alphabetical,b\n"), step: 3 })
            .unwrap();
        let mut rec = ByteRecord::new();
        match rdr.read_byte_record(&mut rec) {
            Err(Error::Parse { err: ParseError::ShortBuffer, .. }) => {}
            result => panic!("unexpected result: {:?}", result),
        }
    }

    #[test]
    fn owned_iterator() {
        let rdr = Reader::from_reader(b("1\n2\n3\n")).unwrap();
        let mut it = rdr.into_byte_records();
        assert_eq!(it.by_ref().count(), 3);
        let rdr = it.into_reader();
        assert!(rdr.is_done());
        assert_eq!(rdr.into_inner(), b(""));
    }

    #[test]
    fn io_errors_pass_through() {
        struct Broken;

        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }

        let mut rdr = Reader::from_reader(Broken).unwrap();
        match rdr.next_token() {
            Err(Error::Io(err)) => {
                assert_eq!(err.kind(), io::ErrorKind::ConnectionReset)
            }
            result => panic!("unexpected result: {:?}", result),
        }
    }
}
