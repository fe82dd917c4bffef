/*!
`csvtok-core` provides a streaming CSV tokenizer that never allocates.

All input is staged in a single fixed-size buffer handed over by the caller.
A [`ByteWindow`] refills that buffer from a [`Source`] on demand, and a
[`Tokenizer`] walks the buffered bytes with a small state machine, returning
[`Token`]s whose field slices point straight into the buffer.

# Example

```
use csvtok_core::{Token, Tokenizer};

let data = "city,pop\n\"Boston, MA\",4628910\n";
let mut buf = [0; 64];
let mut tok = Tokenizer::new(data.as_bytes(), &mut buf[..]).unwrap();

let mut fields = 0;
let mut rows = 0;
loop {
    match tok.next().unwrap() {
        Token::Field(_) => fields += 1,
        Token::RowEnd => rows += 1,
        Token::Eof => break,
    }
}
assert_eq!((fields, rows), (4, 2));
```

# Buffer size

The buffer length is a hard upper bound on the raw length of any single field
(including its quotes and doubled-quote escapes). A field that does not fit
is reported as [`ParseError::ShortBuffer`]; the caller must start over with a
larger buffer.

# Field lifetimes

A [`Token::Field`] borrows the tokenizer. It is valid until the next call to
[`Tokenizer::next`], which may shift or overwrite the bytes while refilling.
Copy the field if it needs to outlive that call.
*/

#![deny(missing_docs)]
#![cfg_attr(not(test), no_std)]

pub use crate::error::{ConfigError, Error, ParseError, WriteError};
pub use crate::source::Source;
pub use crate::tokenizer::{
    unescape_in_place, Config, Position, Token, Tokenizer, TokenizerBuilder,
};
pub use crate::window::ByteWindow;
pub use crate::writer::{QuoteStyle, Writer, WriterBuilder};

mod error;
mod source;
mod tokenizer;
mod window;
mod writer;
