use core::fmt;
use core::ops::Range;

use bstr::BStr;
use memchr::memchr;
use tracing::debug;

use crate::error::{ConfigError, Error, ParseError};
use crate::source::Source;
use crate::window::ByteWindow;

/// The bytes that give CSV data its structure.
///
/// All three must be distinct.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// The byte that separates fields. The default is `b','`.
    pub delimiter: u8,
    /// The byte that ends a record. The default is `b'\n'`.
    pub terminator: u8,
    /// The byte that starts and ends a quoted field. The default is `b'"'`.
    pub quote: u8,
}

impl Default for Config {
    fn default() -> Config {
        Config { delimiter: b',', terminator: b'\n', quote: b'"' }
    }
}

impl Config {
    /// Check that no byte is used for more than one role.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Config { delimiter, terminator, quote } = *self;
        if delimiter == terminator || delimiter == quote {
            Err(ConfigError::DuplicateByte(delimiter))
        } else if terminator == quote {
            Err(ConfigError::DuplicateByte(terminator))
        } else {
            Ok(())
        }
    }
}

/// Builds a tokenizer with various configuration knobs.
///
/// Once a `Tokenizer` is built, its configuration cannot be changed.
#[derive(Clone, Debug, Default)]
pub struct TokenizerBuilder {
    config: Config,
}

impl TokenizerBuilder {
    /// Create a new builder.
    pub fn new() -> TokenizerBuilder {
        TokenizerBuilder::default()
    }

    /// Build a tokenizer that reads from `src` through `buf`.
    ///
    /// This fails when the configured bytes are not distinct or when `buf`
    /// is empty.
    pub fn build<S, B>(
        &self,
        src: S,
        buf: B,
    ) -> Result<Tokenizer<S, B>, ConfigError>
    where
        S: Source,
        B: AsRef<[u8]> + AsMut<[u8]>,
    {
        self.config.validate()?;
        if buf.as_ref().is_empty() {
            return Err(ConfigError::EmptyBuffer);
        }
        Ok(Tokenizer {
            config: self.config,
            window: ByteWindow::new(src, buf),
            state: State::Initial,
            records: 0,
        })
    }

    /// The field delimiter to use when tokenizing.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut TokenizerBuilder {
        self.config.delimiter = delimiter;
        self
    }

    /// The record terminator to use when tokenizing.
    ///
    /// The default is `b'\n'`. A `\r` preceding it is treated as data.
    pub fn terminator(&mut self, terminator: u8) -> &mut TokenizerBuilder {
        self.config.terminator = terminator;
        self
    }

    /// The quote character to use when tokenizing.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut TokenizerBuilder {
        self.config.quote = quote;
        self
    }

    /// A convenience method for specifying a configuration to read ASCII
    /// delimited text.
    ///
    /// This sets the delimiter and record terminator to the ASCII unit
    /// separator (`\x1F`) and record separator (`\x1E`), respectively.
    pub fn ascii(&mut self) -> &mut TokenizerBuilder {
        self.delimiter(b'\x1F').terminator(b'\x1E')
    }
}

/// A single unit of tokenizer output.
#[derive(Clone, Copy, Eq, PartialEq)]
pub enum Token<'a> {
    /// The contents of one field, with quotes removed and escaped quotes
    /// collapsed. Borrowed from the tokenizer's buffer.
    Field(&'a [u8]),
    /// The end of a record.
    RowEnd,
    /// The end of the input. Produced exactly once.
    Eof,
}

impl<'a> Token<'a> {
    /// The field contents, if this is a field.
    pub fn as_field(&self) -> Option<&'a [u8]> {
        match *self {
            Token::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Returns true if and only if this marks the end of the input.
    pub fn is_eof(&self) -> bool {
        *self == Token::Eof
    }
}

impl<'a> fmt::Debug for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Token::Field(field) => write!(f, "Field({:?})", BStr::new(field)),
            Token::RowEnd => write!(f, "RowEnd"),
            Token::Eof => write!(f, "Eof"),
        }
    }
}

/// Where the tokenizer is in its input.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Position {
    byte: u64,
    line: u64,
    record: u64,
}

impl Position {
    /// The number of input bytes consumed.
    pub fn byte(&self) -> u64 {
        self.byte
    }

    /// The 1-based line number, counted by `\n` bytes.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The number of completed records.
    pub fn record(&self) -> u64 {
        self.record
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Initial,
    RowStart,
    Field,
    QuotedFieldEnd,
    RowEnd,
    Eof,
    Finished,
}

/// What a single state transition produced.
enum Step {
    Continue,
    Field(Range<usize>),
    RowEnd,
    Eof,
}

/// A pull based CSV tokenizer.
///
/// Each call to [`next`](Tokenizer::next) returns one [`Token`]. A record
/// is a run of `Field` tokens followed by `RowEnd`, and the input ends with
/// a single `Eof`. Every record has at least one field: an empty line is a
/// record with one empty field.
///
/// The grammar is strict. Quotes are only allowed around a whole field,
/// a quote inside a quoted field is escaped by doubling it, and a closing
/// quote must be followed by a delimiter, a terminator or the end of input.
/// Violations are reported as errors and end tokenization.
///
/// A trailing delimiter right before the end of input does not produce an
/// empty field: `a,b,` has two fields, while `a,b,\n` has three.
pub struct Tokenizer<S, B> {
    config: Config,
    window: ByteWindow<S, B>,
    state: State,
    records: u64,
}

impl<S, B> Tokenizer<S, B>
where
    S: Source,
    B: AsRef<[u8]> + AsMut<[u8]>,
{
    /// Create a tokenizer with the default configuration.
    ///
    /// This fails only if `buf` is empty.
    pub fn new(src: S, buf: B) -> Result<Tokenizer<S, B>, ConfigError> {
        TokenizerBuilder::new().build(src, buf)
    }

    /// Produce the next token.
    ///
    /// A returned field borrows the buffer until the next call. After `Eof`
    /// or any error, every further call returns
    /// `Error::Parse(ParseError::Finished)`.
    pub fn next(&mut self) -> Result<Token<'_>, Error<S::Error>> {
        loop {
            let step = match self.step() {
                Ok(step) => step,
                Err(err) => {
                    self.state = State::Finished;
                    return Err(err);
                }
            };
            match step {
                Step::Continue => {}
                Step::Field(range) => {
                    return Ok(Token::Field(self.window.get(range)));
                }
                Step::RowEnd => return Ok(Token::RowEnd),
                Step::Eof => return Ok(Token::Eof),
            }
        }
    }

    fn step(&mut self) -> Result<Step, Error<S::Error>> {
        match self.state {
            State::Initial => self.initial(),
            State::RowStart => self.row_start(),
            State::Field => self.field(),
            State::QuotedFieldEnd => self.quoted_field_end(),
            State::RowEnd => self.row_end(),
            State::Eof => {
                self.state = State::Finished;
                Ok(Step::Eof)
            }
            State::Finished => Err(Error::Parse(ParseError::Finished)),
        }
    }

    fn initial(&mut self) -> Result<Step, Error<S::Error>> {
        self.state = if self.window.read().map_err(Error::Source)? {
            State::RowStart
        } else {
            State::Eof
        };
        Ok(Step::Continue)
    }

    fn row_start(&mut self) -> Result<Step, Error<S::Error>> {
        self.state = if self.window.ensure_data().map_err(Error::Source)? {
            State::Field
        } else {
            State::Eof
        };
        Ok(Step::Continue)
    }

    fn field(&mut self) -> Result<Step, Error<S::Error>> {
        match self.window.peek().map_err(Error::Source)? {
            None => {
                self.state = State::RowEnd;
                Ok(Step::Continue)
            }
            Some(b) if b == self.config.quote => self.quoted_field(),
            Some(_) => self.unquoted_field(),
        }
    }

    fn unquoted_field(&mut self) -> Result<Step, Error<S::Error>> {
        let Config { delimiter, terminator, quote } = self.config;
        let stops = [delimiter, terminator, quote];
        let found = self.scan(|w| match w.until(&stops) {
            Some(field) => Some(field.len()),
            // Nothing more is coming, so the input ends the field.
            None if w.is_exhausted() => Some(w.len()),
            None => None,
        })?;
        let len = match found {
            Some(len) => len,
            None => return self.short_buffer(),
        };
        match self.window.as_slice().get(len).copied() {
            None => {
                self.state = State::RowEnd;
                Ok(Step::Field(self.window.take(len)))
            }
            Some(b) if b == delimiter => {
                let range = self.window.take(len + 1);
                Ok(Step::Field(range.start..range.end - 1))
            }
            Some(b) if b == terminator => {
                self.state = State::RowEnd;
                Ok(Step::Field(self.window.take(len)))
            }
            Some(b) if b == quote => self.fail(ParseError::MisplacedQuote),
            Some(_) => self.fail(ParseError::ShortBuffer),
        }
    }

    fn quoted_field(&mut self) -> Result<Step, Error<S::Error>> {
        let quote = self.config.quote;
        self.window.consume(1);
        let found =
            self.scan(|w| w.until_closing_quote(quote).map(<[u8]>::len))?;
        let len = match found {
            Some(len) => len,
            None if self.window.is_exhausted() => {
                return self.fail(ParseError::UnclosedQuote);
            }
            None => return self.short_buffer(),
        };
        let raw = self.window.take(len);
        let unescaped =
            unescape_in_place(self.window.get_mut(raw.clone()), quote);
        self.state = State::QuotedFieldEnd;
        Ok(Step::Field(raw.start..raw.start + unescaped))
    }

    fn quoted_field_end(&mut self) -> Result<Step, Error<S::Error>> {
        let Config { delimiter, terminator, quote } = self.config;
        // The closing quote was located by the previous scan and is still
        // buffered.
        self.window.consume(1);
        match self.window.peek().map_err(Error::Source)? {
            None => self.state = State::RowEnd,
            Some(b) if b == delimiter => {
                self.window.consume(1);
                self.state = State::Field;
            }
            Some(b) if b == terminator => self.state = State::RowEnd,
            Some(b) if b == quote => {
                return self.fail(ParseError::ShortBuffer);
            }
            Some(_) => return self.fail(ParseError::NoSeparatorAfterField),
        }
        Ok(Step::Continue)
    }

    fn row_end(&mut self) -> Result<Step, Error<S::Error>> {
        if self.window.ensure_data().map_err(Error::Source)? {
            self.window.consume(1);
            self.state = State::RowStart;
        } else {
            self.state = State::Eof;
        }
        self.records += 1;
        Ok(Step::RowEnd)
    }

    /// Run `find` over the window, forcing a refill each time it comes up
    /// empty.
    ///
    /// Short reads are retried, so `None` means the window fills the whole
    /// buffer or the source is exhausted. Every refill either adds bytes or
    /// ends the scan, which bounds the loop by the buffer capacity.
    fn scan<F>(&mut self, find: F) -> Result<Option<usize>, Error<S::Error>>
    where
        F: Fn(&ByteWindow<S, B>) -> Option<usize>,
    {
        loop {
            if let Some(n) = find(&self.window) {
                return Ok(Some(n));
            }
            if !self.window.read().map_err(Error::Source)? {
                return Ok(find(&self.window));
            }
        }
    }

    /// Report a field that does not fit. Only a full buffer qualifies.
    fn short_buffer<T>(&self) -> Result<T, Error<S::Error>> {
        debug_assert_eq!(self.window.len(), self.window.capacity());
        self.fail(ParseError::ShortBuffer)
    }

    fn fail<T>(&self, err: ParseError) -> Result<T, Error<S::Error>> {
        let pos = self.position();
        debug!(
            byte = pos.byte(),
            line = pos.line(),
            record = pos.record(),
            buffered = self.window.len(),
            capacity = self.window.capacity(),
            "tokenizer error: {}",
            err
        );
        Err(Error::Parse(err))
    }
}

impl<S, B: AsRef<[u8]>> Tokenizer<S, B> {
    /// The configuration this tokenizer was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The current position in the input.
    pub fn position(&self) -> Position {
        Position {
            byte: self.window.byte_offset(),
            line: self.window.line(),
            record: self.records,
        }
    }

    /// Returns true once `Eof` or an error has been returned.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Access the underlying window.
    pub fn window(&self) -> &ByteWindow<S, B> {
        &self.window
    }

    /// Unwrap this tokenizer into its source and buffer.
    pub fn into_parts(self) -> (S, B) {
        self.window.into_parts()
    }
}

impl<S, B: AsRef<[u8]>> fmt::Debug for Tokenizer<S, B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("window", &self.window)
            .field("records", &self.records)
            .finish()
    }
}

/// Collapse every doubled `quote` in `field` into a single one, shifting the
/// remaining bytes left. Returns the new length; bytes past it are left
/// over from the original.
///
/// `field` is expected to be the raw contents of a quoted field. A quote
/// that is not followed by another one is kept as is.
pub fn unescape_in_place(field: &mut [u8], quote: u8) -> usize {
    let (mut read, mut write) = (0, 0);
    while let Some(i) = memchr(quote, &field[read..]) {
        let end = read + i + 1;
        field.copy_within(read..end, write);
        write += end - read;
        read = end;
        if field.get(read) == Some(&quote) {
            read += 1;
        }
    }
    field.copy_within(read.., write);
    write + (field.len() - read)
}
