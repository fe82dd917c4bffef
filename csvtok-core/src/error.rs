use core::fmt;

/// An error that can occur while tokenizing.
///
/// `E` is the error type of the underlying [`Source`](crate::Source). Every
/// error is fatal: once one is returned, the tokenizer only ever reports
/// [`ParseError::Finished`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error<E> {
    /// Reading from the source failed.
    Source(E),
    /// The CSV data could not be tokenized.
    Parse(ParseError),
}

impl<E> From<ParseError> for Error<E> {
    fn from(err: ParseError) -> Error<E> {
        Error::Parse(err)
    }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Source(ref err) => err.fmt(f),
            Error::Parse(ref err) => err.fmt(f),
        }
    }
}

/// The ways in which tokenizing CSV data can fail.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// A field (or the boundary of a quoted field) could not be resolved
    /// even after refilling, because the buffer is already full.
    ///
    /// The input is not necessarily malformed. Retry with a larger buffer.
    ShortBuffer,
    /// A quote appeared inside an unquoted field.
    MisplacedQuote,
    /// A closing quote was followed by something other than a delimiter or
    /// record terminator.
    NoSeparatorAfterField,
    /// The input ended inside a quoted field.
    UnclosedQuote,
    /// The tokenizer already produced `Token::Eof` or an error.
    Finished,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::ShortBuffer => {
                write!(f, "field does not fit in the tokenizer buffer")
            }
            ParseError::MisplacedQuote => {
                write!(f, "misplaced quote in unquoted field")
            }
            ParseError::NoSeparatorAfterField => write!(
                f,
                "expected a delimiter or record terminator after \
                 closing quote"
            ),
            ParseError::UnclosedQuote => {
                write!(f, "input ended inside a quoted field")
            }
            ParseError::Finished => {
                write!(f, "tokenizer already reached the end of input")
            }
        }
    }
}

/// An error that occurs when building a tokenizer from an invalid
/// configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// The delimiter, terminator and quote must be pairwise distinct. This
    /// carries the byte that was configured for more than one role.
    DuplicateByte(u8),
    /// The buffer has a length of zero, so no input could ever be read.
    EmptyBuffer,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::DuplicateByte(b) => write!(
                f,
                "delimiter, terminator and quote must be distinct, \
                 but {:?} is used more than once",
                b as char
            ),
            ConfigError::EmptyBuffer => {
                write!(f, "tokenizer buffer must not be empty")
            }
        }
    }
}

/// An error that occurs when writing a CSV field or terminator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteError {
    /// The output buffer is too small to hold the data. Nothing was written.
    OutputFull,
    /// The field needs quotes, but the writer is set to never quote.
    QuoteRequired,
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            WriteError::OutputFull => write!(f, "output buffer is full"),
            WriteError::QuoteRequired => {
                write!(f, "field requires quotes but quoting is disabled")
            }
        }
    }
}
