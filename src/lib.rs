/*!
The `csvtok` crate reads and writes CSV data through one fixed-size buffer.

It wraps the allocation-free tokenizer from `csvtok-core` with the pieces
that need `std`: a [`Reader`] over any `std::io::Read`, owned
[`ByteRecord`]s, a buffered [`Writer`] and an [`Error`] type that knows
where in the input a failure happened.

# Example

This reads records from standard input and counts their fields:

```no_run
use std::io;

fn main() -> csvtok::Result<()> {
    let mut rdr = csvtok::Reader::from_reader(io::stdin())?;
    let mut fields = 0;
    for result in rdr.byte_records() {
        fields += result?.len();
    }
    println!("{}", fields);
    Ok(())
}
```

# Tokens

When records are not needed, [`Reader::next_token`] hands out fields that
borrow the reader's buffer, so reading never copies:

```
use csvtok::{Reader, Token};

# fn main() -> csvtok::Result<()> {
let mut rdr = Reader::from_reader(&b"a,\"b\"\"c\"\n"[..])?;
assert_eq!(rdr.next_token()?, Token::Field(b"a"));
assert_eq!(rdr.next_token()?, Token::Field(b"b\"c"));
assert_eq!(rdr.next_token()?, Token::RowEnd);
assert_eq!(rdr.next_token()?, Token::Eof);
# Ok(())
# }
```
*/

#![deny(missing_docs)]

pub use csvtok_core::{
    Config, ConfigError, ParseError, Position, QuoteStyle, Source, Token,
    WriteError,
};

pub use crate::byte_record::{ByteRecord, ByteRecordIter};
pub use crate::error::{Error, Result};
pub use crate::reader::{
    ByteRecordsIntoIter, ByteRecordsIter, Reader, ReaderBuilder,
};
pub use crate::source::IoSource;
pub use crate::writer::{Writer, WriterBuilder};

mod byte_record;
mod error;
mod reader;
mod source;
mod writer;
