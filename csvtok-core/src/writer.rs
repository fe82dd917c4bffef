use memchr::{memchr, memchr3, memchr_iter};

use crate::error::{ConfigError, WriteError};
use crate::tokenizer::Config;

/// The quoting style to use when writing CSV data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuoteStyle {
    /// This puts quotes around every field. Always.
    Always,
    /// This puts quotes around fields only when necessary.
    ///
    /// They are necessary when fields contain a quote, delimiter or record
    /// terminator.
    ///
    /// This is the default.
    Necessary,
    /// This *never* writes quotes.
    ///
    /// If a field requires quotes, then the writer will report an error.
    Never,
}

impl Default for QuoteStyle {
    fn default() -> QuoteStyle {
        QuoteStyle::Necessary
    }
}

/// A builder for configuring a CSV writer.
///
/// This builder permits specifying the CSV delimiter, terminator, quote and
/// quoting style.
#[derive(Clone, Debug, Default)]
pub struct WriterBuilder {
    wtr: Writer,
}

impl WriterBuilder {
    /// Create a new builder for configuring a CSV writer.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer from this configuration.
    ///
    /// This fails when the delimiter, terminator and quote are not
    /// distinct.
    pub fn build(&self) -> Result<Writer, ConfigError> {
        self.wtr.config.validate()?;
        Ok(self.wtr.clone())
    }

    /// The field delimiter to use when writing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.wtr.config.delimiter = delimiter;
        self
    }

    /// The record terminator to use when writing CSV.
    ///
    /// The default is `b'\n'`.
    pub fn terminator(&mut self, terminator: u8) -> &mut WriterBuilder {
        self.wtr.config.terminator = terminator;
        self
    }

    /// The quote character to use when writing CSV.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut WriterBuilder {
        self.wtr.config.quote = quote;
        self
    }

    /// The quoting style to use when writing CSV.
    ///
    /// By default, this is set to `QuoteStyle::Necessary`, which will only
    /// use quotes when they are necessary to preserve the integrity of data.
    pub fn quote_style(&mut self, style: QuoteStyle) -> &mut WriterBuilder {
        self.wtr.style = style;
        self
    }

    /// Use the same delimiter, terminator and quote as a tokenizer.
    pub fn config(&mut self, config: Config) -> &mut WriterBuilder {
        self.wtr.config = config;
        self
    }
}

/// A writer for CSV data that the tokenizer reads back field for field.
///
/// Quotes inside a quoted field are escaped by doubling them. The writer
/// keeps no buffer of its own: every call writes into caller provided
/// output, and either writes everything it was asked to or nothing.
#[derive(Clone, Debug)]
pub struct Writer {
    config: Config,
    style: QuoteStyle,
    first_field_in_record: bool,
}

impl Default for Writer {
    fn default() -> Writer {
        Writer {
            config: Config::default(),
            style: QuoteStyle::default(),
            first_field_in_record: true,
        }
    }
}

impl Writer {
    /// Creates a new CSV writer with the default configuration.
    pub fn new() -> Writer {
        Writer::default()
    }

    /// The delimiter, terminator and quote used by this writer.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Write a single field to `output`, preceded by a delimiter unless it
    /// is the first field of the record. Returns the number of bytes
    /// written.
    pub fn field(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, WriteError> {
        let quoted = self.should_quote(input)?;
        let Config { delimiter, quote, .. } = self.config;
        let mut needed = input.len();
        if !self.first_field_in_record {
            needed += 1;
        }
        if quoted {
            needed += 2 + memchr_iter(quote, input).count();
        }
        if needed > output.len() {
            return Err(WriteError::OutputFull);
        }

        let mut nout = 0;
        if !self.first_field_in_record {
            output[0] = delimiter;
            nout = 1;
        }
        if !quoted {
            nout += copy(input, &mut output[nout..]);
        } else {
            output[nout] = quote;
            nout += 1;
            let mut rest = input;
            while let Some(i) = memchr(quote, rest) {
                nout += copy(&rest[..=i], &mut output[nout..]);
                output[nout] = quote;
                nout += 1;
                rest = &rest[i + 1..];
            }
            nout += copy(rest, &mut output[nout..]);
            output[nout] = quote;
            nout += 1;
        }
        self.first_field_in_record = false;
        Ok(nout)
    }

    /// Write the record terminator to `output`. Returns the number of bytes
    /// written.
    pub fn terminator(
        &mut self,
        output: &mut [u8],
    ) -> Result<usize, WriteError> {
        match output.first_mut() {
            None => Err(WriteError::OutputFull),
            Some(b) => {
                *b = self.config.terminator;
                self.first_field_in_record = true;
                Ok(1)
            }
        }
    }

    /// Returns true if `input` must be quoted to be read back unchanged.
    pub fn needs_quotes(&self, input: &[u8]) -> bool {
        let Config { delimiter, terminator, quote } = self.config;
        memchr3(delimiter, terminator, quote, input).is_some()
    }

    fn should_quote(&self, input: &[u8]) -> Result<bool, WriteError> {
        match self.style {
            QuoteStyle::Always => Ok(true),
            QuoteStyle::Necessary => Ok(self.needs_quotes(input)),
            QuoteStyle::Never if self.needs_quotes(input) => {
                Err(WriteError::QuoteRequired)
            }
            QuoteStyle::Never => Ok(false),
        }
    }
}

fn copy(src: &[u8], dst: &mut [u8]) -> usize {
    dst[..src.len()].copy_from_slice(src);
    src.len()
}
