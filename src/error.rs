use std::error;
use std::fmt;
use std::io;
use std::result;

use csvtok_core::{ConfigError, ParseError, Position, WriteError};

/// A type alias for `Result<T, csvtok::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when reading or writing CSV data.
///
/// Every error returned by a [`Reader`](crate::Reader) is fatal: afterwards
/// the reader reports no further records.
#[derive(Debug)]
pub enum Error {
    /// An I/O error that occurred while reading or writing CSV data.
    Io(io::Error),
    /// The CSV data could not be tokenized.
    Parse {
        /// The position at which the failing token began.
        pos: Position,
        /// The corresponding parse error.
        err: ParseError,
    },
    /// The reader or writer was configured with bytes that collide, or with
    /// a buffer capacity of zero.
    Config(ConfigError),
    /// A field could not be written.
    Write(WriteError),
}

impl Error {
    /// Build an error from a failure reported by the tokenizer.
    pub(crate) fn tokenizer(
        err: csvtok_core::Error<io::Error>,
        pos: Position,
    ) -> Error {
        match err {
            csvtok_core::Error::Source(err) => Error::Io(err),
            csvtok_core::Error::Parse(err) => Error::Parse { pos, err },
        }
    }

    /// Return the position at which this error occurred, if available.
    pub fn position(&self) -> Option<&Position> {
        match *self {
            Error::Parse { ref pos, .. } => Some(pos),
            _ => None,
        }
    }

    /// Returns true if this is an I/O error.
    pub fn is_io_error(&self) -> bool {
        match *self {
            Error::Io(_) => true,
            _ => false,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Error {
        Error::Config(err)
    }
}

impl From<WriteError> for Error {
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        match err {
            Error::Io(err) => err,
            err => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref err) => err.fmt(f),
            Error::Parse { ref pos, ref err } => write!(
                f,
                "CSV parse error: record {} (byte {}, line {}): {}",
                pos.record(),
                pos.byte(),
                pos.line(),
                err
            ),
            Error::Config(ref err) => write!(f, "CSV config error: {}", err),
            Error::Write(ref err) => write!(f, "CSV write error: {}", err),
        }
    }
}
