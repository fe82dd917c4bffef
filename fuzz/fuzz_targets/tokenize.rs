#![no_main]

use csvtok_core::{Token, TokenizerBuilder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Two leading bytes pick the buffer size and the delimiter.
    let (size, delimiter, input) = match *data {
        [size, delimiter, ref input @ ..] => {
            (size as usize % 64 + 1, delimiter, input)
        }
        _ => return,
    };
    let mut buf = [0; 64];
    let mut tok = match TokenizerBuilder::new()
        .delimiter(delimiter)
        .build(input, &mut buf[..size])
    {
        Ok(tok) => tok,
        Err(_) => return,
    };
    loop {
        match tok.next() {
            Ok(Token::Field(field)) => assert!(field.len() < size),
            Ok(Token::RowEnd) => {}
            Ok(Token::Eof) | Err(_) => break,
        }
    }
    assert!(tok.is_finished());
});
