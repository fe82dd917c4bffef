use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use csvtok_core::{Config, QuoteStyle, WriterBuilder as CoreWriterBuilder};

use crate::byte_record::ByteRecord;
use crate::error::{Error, Result};

const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Builds a CSV writer with various configuration knobs.
///
/// This builder can be used to tweak the field delimiter, record terminator
/// and more. Once a CSV `Writer` is built, its configuration cannot be
/// changed.
#[derive(Clone, Debug)]
pub struct WriterBuilder {
    builder: CoreWriterBuilder,
    capacity: usize,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            builder: CoreWriterBuilder::new(),
            capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    ///
    /// To convert a builder into a writer, call one of the methods starting
    /// with `from_`.
    ///
    /// # Example
    ///
    /// ```
    /// use csvtok::WriterBuilder;
    ///
    /// # fn main() -> csvtok::Result<()> {
    /// let mut wtr =
    ///     WriterBuilder::new().delimiter(b';').from_writer(vec![])?;
    /// wtr.write_record(&["a", "b;c"])?;
    ///
    /// let data = wtr.into_inner()?;
    /// assert_eq!(data, b"a;\"b;c\"\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer from this configuration that writes data to `wtr`.
    ///
    /// Note that the CSV writer is buffered automatically, so you should not
    /// wrap `wtr` in a buffered writer like `io::BufWriter`.
    ///
    /// This fails when the delimiter, terminator and quote are not distinct.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Result<Writer<W>> {
        let core = self.builder.build()?;
        Ok(Writer {
            core,
            scratch: vec![],
            wtr: io::BufWriter::with_capacity(self.capacity, wtr),
        })
    }

    /// Build a CSV writer from this configuration that writes data to the
    /// given file path. The file is truncated if it already exists.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        self.from_writer(File::create(path)?)
    }

    /// The field delimiter to use when writing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.builder.delimiter(delimiter);
        self
    }

    /// The record terminator to use when writing CSV.
    ///
    /// The default is `b'\n'`.
    pub fn terminator(&mut self, terminator: u8) -> &mut WriterBuilder {
        self.builder.terminator(terminator);
        self
    }

    /// The quote character to use when writing CSV.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut WriterBuilder {
        self.builder.quote(quote);
        self
    }

    /// The quoting style to use when writing CSV.
    ///
    /// By default, this is set to `QuoteStyle::Necessary`, which will only
    /// use quotes when they are necessary to preserve the integrity of data.
    pub fn quote_style(&mut self, style: QuoteStyle) -> &mut WriterBuilder {
        self.builder.quote_style(style);
        self
    }

    /// Write with the same delimiter, terminator and quote that a reader
    /// uses.
    pub fn config(&mut self, config: Config) -> &mut WriterBuilder {
        self.builder.config(config);
        self
    }

    /// Set the capacity (in bytes) of the internal output buffer.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }
}

/// A buffered CSV writer.
///
/// Everything written can be read back by a [`Reader`](crate::Reader) with
/// the same configuration, field for field. The buffer is flushed when the
/// writer is dropped, but errors from that final flush are ignored: call
/// [`Writer::flush`] to observe them.
#[derive(Debug)]
pub struct Writer<W: io::Write> {
    core: csvtok_core::Writer,
    scratch: Vec<u8>,
    wtr: io::BufWriter<W>,
}

impl Writer<File> {
    /// Create a new CSV writer with the default configuration that writes
    /// to the file at the given path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        WriterBuilder::new().from_path(path)
    }
}

impl<W: io::Write> Writer<W> {
    /// Create a new CSV writer with the default configuration.
    pub fn from_writer(wtr: W) -> Writer<W> {
        Writer {
            core: csvtok_core::Writer::new(),
            scratch: vec![],
            wtr: io::BufWriter::with_capacity(DEFAULT_BUFFER_CAPACITY, wtr),
        }
    }

    /// Write a single field, quoting it if the quoting style asks for it.
    ///
    /// Call `write_terminator` to end the record. If the underlying writer
    /// fails, the writer forgets the field, so the next field is not
    /// preceded by a delimiter. Bytes the underlying writer accepted before
    /// failing are not taken back.
    pub fn write_field<T: AsRef<[u8]>>(&mut self, field: T) -> Result<()> {
        let field = field.as_ref();
        // A delimiter, two quotes and every byte doubled.
        let worst = 3 + 2 * field.len();
        if self.scratch.len() < worst {
            self.scratch.resize(worst, 0);
        }
        let prev = self.core.clone();
        let n = self.core.field(field, &mut self.scratch)?;
        if let Err(err) = self.wtr.write_all(&self.scratch[..n]) {
            self.core = prev;
            return Err(Error::Io(err));
        }
        Ok(())
    }

    /// End the current record.
    ///
    /// As with `write_field`, a failed write leaves the record open.
    pub fn write_terminator(&mut self) -> Result<()> {
        let mut term = [0; 1];
        let prev = self.core.clone();
        let n = self.core.terminator(&mut term)?;
        if let Err(err) = self.wtr.write_all(&term[..n]) {
            self.core = prev;
            return Err(Error::Io(err));
        }
        Ok(())
    }

    /// Write a whole record followed by the record terminator.
    ///
    /// A record with no fields is written as an empty line, which reads
    /// back as a record with one empty field.
    pub fn write_record<I, T>(&mut self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        for field in record {
            self.write_field(field)?;
        }
        self.write_terminator()
    }

    /// Write a byte record followed by the record terminator.
    pub fn write_byte_record(&mut self, record: &ByteRecord) -> Result<()> {
        self.write_record(record.iter())
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.wtr.flush()
    }

    /// Return a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        self.wtr.get_ref()
    }

    /// Flush the internal buffer and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.wtr.into_inner().map_err(|err| Error::Io(err.into_error()))
    }
}
