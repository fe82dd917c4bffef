use std::io::{self, Read};

use csvtok::{
    ByteRecord, Error, ParseError, Reader, ReaderBuilder, Token, Writer,
    WriterBuilder,
};
use proptest::collection::vec;
use proptest::prelude::*;

/// A reader that hands out its input in the chunk sizes given, cycling
/// through them.
struct Chunks<'a> {
    data: &'a [u8],
    sizes: &'a [usize],
    next: usize,
}

impl<'a> Chunks<'a> {
    fn new(data: &'a [u8], sizes: &'a [usize]) -> Chunks<'a> {
        Chunks { data, sizes, next: 0 }
    }
}

impl<'a> Read for Chunks<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.sizes[self.next % self.sizes.len()];
        self.next += 1;
        let n = size.min(buf.len()).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

fn read_all<R: Read>(mut rdr: Reader<R>) -> csvtok::Result<Vec<ByteRecord>> {
    rdr.byte_records().collect()
}

fn records(rows: &[&[&str]]) -> Vec<ByteRecord> {
    rows.iter().map(|row| ByteRecord::from(row.to_vec())).collect()
}

fn tokens(data: &[u8], capacity: usize) -> Vec<String> {
    let mut rdr = ReaderBuilder::new()
        .buffer_capacity(capacity)
        .from_reader(data)
        .unwrap();
    let mut out = vec![];
    loop {
        match rdr.next_token().unwrap() {
            Token::Field(f) => {
                out.push(format!("F({})", String::from_utf8_lossy(f)))
            }
            Token::RowEnd => out.push("RowEnd".to_string()),
            Token::Eof => {
                out.push("Eof".to_string());
                return out;
            }
        }
    }
}

#[test]
fn simple_two_rows() {
    assert_eq!(
        tokens(b"a,b\nc,d\n", 64),
        vec!["F(a)", "F(b)", "RowEnd", "F(c)", "F(d)", "RowEnd", "Eof"]
    );
}

#[test]
fn quoted_with_escaped_quote() {
    assert_eq!(
        tokens(b"\"he said \"\"hi\"\"\",x\n", 64),
        vec!["F(he said \"hi\")", "F(x)", "RowEnd", "Eof"]
    );
}

#[test]
fn field_straddles_refill() {
    assert_eq!(
        tokens(b"aaa,bbbbbbb\n", 8),
        vec!["F(aaa)", "F(bbbbbbb)", "RowEnd", "Eof"]
    );
}

#[test]
fn field_equal_to_buffer_is_too_long() {
    let mut rdr = ReaderBuilder::new()
        .buffer_capacity(4)
        .from_reader(&b"abcdef\n"[..])
        .unwrap();
    match rdr.next_token() {
        Err(Error::Parse { err: ParseError::ShortBuffer, .. }) => {}
        result => panic!("unexpected result: {:?}", result),
    }
}

#[test]
fn empty_input() {
    assert_eq!(tokens(b"", 8), vec!["Eof"]);
}

#[test]
fn carriage_return_is_data() {
    let data = "name,note\r\n\"Smith, J\",a\r\n";
    let rdr = Reader::from_reader(data.as_bytes()).unwrap();
    assert_eq!(
        read_all(rdr).unwrap(),
        records(&[&["name", "note\r"], &["Smith, J", "a\r"]])
    );

    let rdr = Reader::from_reader(&b"\"x\"\r\n"[..]).unwrap();
    match read_all(rdr) {
        Err(Error::Parse { err: ParseError::NoSeparatorAfterField, .. }) => {}
        result => panic!("unexpected result: {:?}", result),
    }
}

#[test]
fn chunked_input() {
    let data =
        b"col_a,col_b,col_c\n0aaaa,0bbbb,0cccc\n\"1a,aa\",1bbbb,1cccc\n";
    let expected = records(&[
        &["col_a", "col_b", "col_c"],
        &["0aaaa", "0bbbb", "0cccc"],
        &["1a,aa", "1bbbb", "1cccc"],
    ]);
    for sizes in &[&[1][..], &[2, 3], &[7], &[5, 1, 11], &[64]] {
        let rdr = ReaderBuilder::new()
            .buffer_capacity(16)
            .from_reader(Chunks::new(data, sizes))
            .unwrap();
        assert_eq!(read_all(rdr).unwrap(), expected, "sizes: {:?}", sizes);
    }
}

#[test]
fn last_row_crosses_refill_at_end_of_input() {
    let mut data = "aaaa,bbbb\n".repeat(6553);
    data.push_str("cc,dddd");
    let rdr = Reader::from_reader(data.as_bytes()).unwrap();
    let got = read_all(rdr).unwrap();
    assert_eq!(got.len(), 6554);
    assert_eq!(got[6553], ByteRecord::from(vec!["cc", "dddd"]));
}

#[test]
fn stdin_like_short_reads() {
    let data = b"id,name\n1,\"Smith, J\"\n2,Doe";
    let rdr = ReaderBuilder::new()
        .buffer_capacity(64)
        .from_reader(Chunks::new(data, &[3]))
        .unwrap();
    assert_eq!(
        read_all(rdr).unwrap(),
        records(&[&["id", "name"], &["1", "Smith, J"], &["2", "Doe"]])
    );
}

#[test]
fn position_after_error() {
    let data = b"a,b\nc,\"d\"e\n";
    let mut rdr = Reader::from_reader(&data[..]).unwrap();
    let mut rec = ByteRecord::new();
    assert!(rdr.read_byte_record(&mut rec).unwrap());
    let err = rdr.read_byte_record(&mut rec).unwrap_err();
    let pos = match err {
        Error::Parse { err: ParseError::NoSeparatorAfterField, ref pos } => {
            *pos
        }
        ref err => panic!("unexpected error: {:?}", err),
    };
    assert_eq!(pos.record(), 1);
    assert_eq!(pos.line(), 2);
    assert!(err.to_string().starts_with("CSV parse error: record 1 ("));
}

#[test]
fn unclosed_quote() {
    let rdr = Reader::from_reader(&b"a,\"bc\n"[..]).unwrap();
    match read_all(rdr) {
        Err(Error::Parse { err: ParseError::UnclosedQuote, .. }) => {}
        result => panic!("unexpected result: {:?}", result),
    }
}

#[test]
fn file_round_trip() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("csvtok-test-{}.csv", std::process::id()));
    let rows = records(&[&["id", "text"], &["1", "comma, and \"quote\""]]);

    let mut wtr = Writer::from_path(&path).unwrap();
    for row in &rows {
        wtr.write_byte_record(row).unwrap();
    }
    wtr.flush().unwrap();
    drop(wtr);

    let got = read_all(Reader::from_path(&path).unwrap()).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(got, rows);
}

/// Any byte except the three structural ones.
fn plain_byte() -> impl Strategy<Value = u8> {
    any::<u8>().prop_filter("structural byte", |b| {
        !matches!(*b, b',' | b'\n' | b'"')
    })
}

/// Any byte at all, including the structural ones.
fn any_byte() -> impl Strategy<Value = u8> {
    prop_oneof![any::<u8>(), Just(b','), Just(b'\n'), Just(b'"')]
}

proptest! {
    #[test]
    fn write_then_read(
        rows in vec(vec(vec(any_byte(), 0..12), 1..5), 0..8),
        capacity in 32usize..128,
        chunk in 1usize..9,
        drop_last_terminator in any::<bool>(),
    ) {
        let mut wtr = Writer::from_writer(vec![]);
        for row in &rows {
            wtr.write_record(row).unwrap();
        }
        let mut data = wtr.into_inner().unwrap();
        // Without its terminator, a final empty field would vanish.
        let last_field_filled = rows
            .last()
            .and_then(|row| row.last())
            .map_or(false, |field| !field.is_empty());
        if drop_last_terminator && last_field_filled {
            data.pop();
        }

        let sizes = [chunk];
        let rdr = ReaderBuilder::new()
            .buffer_capacity(capacity)
            .from_reader(Chunks::new(&data, &sizes))
            .unwrap();
        let got = read_all(rdr).unwrap();
        let expected: Vec<ByteRecord> =
            rows.iter().map(|row| ByteRecord::from(row.clone())).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn unquoted_rows_rebuild_input(
        rows in vec(vec(vec(plain_byte(), 1..10), 1..5), 1..8),
        capacity in 12usize..64,
        trailing_terminator in any::<bool>(),
    ) {
        let mut data = vec![];
        for row in &rows {
            data.extend_from_slice(&row.join(&b','));
            data.push(b'\n');
        }
        let expected = data.clone();
        if !trailing_terminator {
            data.pop();
        }

        let mut rdr = ReaderBuilder::new()
            .buffer_capacity(capacity)
            .from_reader(&data[..])
            .unwrap();
        let mut rebuilt = vec![];
        let mut first = true;
        loop {
            match rdr.next_token().unwrap() {
                Token::Field(f) => {
                    if !first {
                        rebuilt.push(b',');
                    }
                    rebuilt.extend_from_slice(f);
                    first = false;
                }
                Token::RowEnd => {
                    rebuilt.push(b'\n');
                    first = true;
                }
                Token::Eof => break,
            }
        }
        prop_assert_eq!(rebuilt, expected);
    }

    #[test]
    fn never_panics(data in vec(any_byte(), 0..256), capacity in 1usize..32) {
        let mut rdr = ReaderBuilder::new()
            .buffer_capacity(capacity)
            .from_reader(&data[..])
            .unwrap();
        let mut rec = ByteRecord::new();
        while let Ok(true) = rdr.read_byte_record(&mut rec) {}
        prop_assert!(rdr.is_done());
    }
}

#[test]
fn builder_writer_with_ascii_bytes() {
    let mut wtr = WriterBuilder::new()
        .delimiter(b'\x1F')
        .terminator(b'\x1E')
        .from_writer(vec![])
        .unwrap();
    wtr.write_record(&["a,b", "c"]).unwrap();
    let data = wtr.into_inner().unwrap();
    assert_eq!(data, b"a,b\x1Fc\x1E");

    let rdr = ReaderBuilder::new().ascii().from_reader(&data[..]).unwrap();
    assert_eq!(read_all(rdr).unwrap(), records(&[&["a,b", "c"]]));
}
