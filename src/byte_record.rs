use std::fmt;
use std::iter::FromIterator;
use std::ops::{self, Range};

use bstr::BStr;

/// A single CSV record stored as raw bytes.
///
/// Field contents are stored contiguously, so a record can be reused across
/// reads without reallocating once it has grown large enough.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct ByteRecord {
    /// All fields in this record, stored contiguously.
    fields: Vec<u8>,
    /// The ending offset of each field in `fields`.
    ends: Vec<usize>,
}

impl ByteRecord {
    /// Create a new empty `ByteRecord`.
    pub fn new() -> ByteRecord {
        ByteRecord::default()
    }

    /// Create a new empty `ByteRecord` with room for `buffer` bytes of
    /// field data spread over `fields` fields.
    pub fn with_capacity(buffer: usize, fields: usize) -> ByteRecord {
        ByteRecord {
            fields: Vec::with_capacity(buffer),
            ends: Vec::with_capacity(fields),
        }
    }

    /// Return the field at index `i`.
    ///
    /// If no field at index `i` exists, then this returns `None`.
    pub fn get(&self, i: usize) -> Option<&[u8]> {
        self.range(i).map(|range| &self.fields[range])
    }

    /// Returns true if and only if this record has no fields.
    ///
    /// A record holding a single empty field is not empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of fields in this record.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Clear this record so that it has zero fields, keeping its storage.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.ends.clear();
    }

    /// Add a new field to the end of this record.
    pub fn push_field(&mut self, field: &[u8]) {
        self.fields.extend_from_slice(field);
        self.ends.push(self.fields.len());
    }

    /// Returns an iterator over all fields in this record.
    pub fn iter(&self) -> ByteRecordIter<'_> {
        ByteRecordIter { rec: self, front: 0, back: self.len() }
    }

    /// Return the contents of every field concatenated together.
    pub fn as_slice(&self) -> &[u8] {
        &self.fields
    }

    fn range(&self, i: usize) -> Option<Range<usize>> {
        let end = *self.ends.get(i)?;
        let start = match i.checked_sub(1) {
            None => 0,
            Some(prev) => self.ends[prev],
        };
        Some(start..end)
    }
}

impl fmt::Debug for ByteRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ByteRecord(")?;
        f.debug_list().entries(self.iter().map(BStr::new)).finish()?;
        write!(f, ")")
    }
}

impl ops::Index<usize> for ByteRecord {
    type Output = [u8];

    fn index(&self, i: usize) -> &[u8] {
        match self.range(i) {
            Some(range) => &self.fields[range],
            None => panic!(
                "field index {} out of bounds for record with {} fields",
                i,
                self.len()
            ),
        }
    }
}

impl<T: AsRef<[u8]>> From<Vec<T>> for ByteRecord {
    fn from(xs: Vec<T>) -> ByteRecord {
        ByteRecord::from_iter(xs)
    }
}

impl<'a, T: AsRef<[u8]>> From<&'a [T]> for ByteRecord {
    fn from(xs: &'a [T]) -> ByteRecord {
        ByteRecord::from_iter(xs)
    }
}

impl<T: AsRef<[u8]>> FromIterator<T> for ByteRecord {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> ByteRecord {
        let mut rec = ByteRecord::new();
        rec.extend(iter);
        rec
    }
}

impl<T: AsRef<[u8]>> Extend<T> for ByteRecord {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for field in iter {
            self.push_field(field.as_ref());
        }
    }
}

impl<'a> IntoIterator for &'a ByteRecord {
    type IntoIter = ByteRecordIter<'a>;
    type Item = &'a [u8];

    fn into_iter(self) -> ByteRecordIter<'a> {
        self.iter()
    }
}

/// An iterator over the fields in a byte record.
///
/// The `'r` lifetime variable refers to the lifetime of the `ByteRecord`
/// that is being iterated over.
#[derive(Clone, Debug)]
pub struct ByteRecordIter<'r> {
    rec: &'r ByteRecord,
    front: usize,
    back: usize,
}

impl<'r> Iterator for ByteRecordIter<'r> {
    type Item = &'r [u8];

    fn next(&mut self) -> Option<&'r [u8]> {
        if self.front == self.back {
            return None;
        }
        self.front += 1;
        self.rec.get(self.front - 1)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl<'r> DoubleEndedIterator for ByteRecordIter<'r> {
    fn next_back(&mut self) -> Option<&'r [u8]> {
        if self.front == self.back {
            return None;
        }
        self.back -= 1;
        self.rec.get(self.back)
    }
}

impl<'r> ExactSizeIterator for ByteRecordIter<'r> {}
