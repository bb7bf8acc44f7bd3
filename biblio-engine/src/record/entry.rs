//! A single bibliographic record and its fixed-width on-disk layout.

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

/// Maximum byte length of [`Entry::title`], including the NUL terminator.
pub const TITLE_LEN: usize = 300;
/// Maximum byte length of [`Entry::authors`], including the NUL terminator.
pub const AUTHORS_LEN: usize = 1024;
/// Maximum byte length of [`Entry::update_timestamp`], including the NUL terminator.
pub const TIMESTAMP_LEN: usize = 20;
/// Maximum byte length of [`Entry::snippet`], including the NUL terminator.
pub const SNIPPET_LEN: usize = 1024;

/// Encoded size of one [`Entry`], in bytes: `valid(1) + id(4) + title(300)
/// + year(4) + authors(1024) + citations(4) + update_timestamp(20) +
/// snippet(1024)`.
pub const ENCODED_SIZE: usize =
    1 + 4 + TITLE_LEN + 4 + AUTHORS_LEN + 4 + TIMESTAMP_LEN + SNIPPET_LEN;

/// One bibliographic article record (§3).
///
/// Every string field is stored C-style: a fixed-size byte buffer holding
/// UTF-8 text followed by a NUL terminator, with the remainder of the
/// buffer undefined. Fields longer than their buffer are truncated by the
/// caller before encoding; `Entry::encode` truncates defensively too.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// `false` marks a phantom block standing in for a missing id.
    pub valid: bool,
    /// Article identifier.
    pub id: i32,
    /// Article title.
    pub title: String,
    /// Publication year.
    pub year: i32,
    /// Semicolon-joined author list, as supplied by the input adapter.
    pub authors: String,
    /// Citation count.
    pub citations: i32,
    /// Opaque timestamp string, copied verbatim from the input.
    pub update_timestamp: String,
    /// Short abstract or snippet text.
    pub snippet: String,
}

impl Entry {
    /// A phantom entry for a record-file slot with no corresponding id.
    pub fn phantom() -> Self {
        Entry {
            valid: false,
            id: 0,
            title: String::new(),
            year: 0,
            authors: String::new(),
            citations: 0,
            update_timestamp: String::new(),
            snippet: String::new(),
        }
    }

    /// Encodes this entry into its fixed-size on-disk representation.
    pub fn encode(&self) -> io::Result<[u8; ENCODED_SIZE]> {
        let mut out = [0u8; ENCODED_SIZE];
        let mut cursor = Cursor::new(&mut out[..]);
        cursor.write_u8(self.valid as u8)?;
        cursor.write_i32::<LittleEndian>(self.id)?;
        write_fixed(&mut cursor, &self.title, TITLE_LEN)?;
        cursor.write_i32::<LittleEndian>(self.year)?;
        write_fixed(&mut cursor, &self.authors, AUTHORS_LEN)?;
        cursor.write_i32::<LittleEndian>(self.citations)?;
        write_fixed(&mut cursor, &self.update_timestamp, TIMESTAMP_LEN)?;
        write_fixed(&mut cursor, &self.snippet, SNIPPET_LEN)?;
        Ok(out)
    }

    /// Decodes an entry previously produced by [`Entry::encode`].
    pub fn decode(buf: &[u8; ENCODED_SIZE]) -> io::Result<Self> {
        let mut cursor = Cursor::new(&buf[..]);
        let valid = cursor.read_u8()? != 0;
        let id = cursor.read_i32::<LittleEndian>()?;
        let title = read_fixed(&mut cursor, TITLE_LEN)?;
        let year = cursor.read_i32::<LittleEndian>()?;
        let authors = read_fixed(&mut cursor, AUTHORS_LEN)?;
        let citations = cursor.read_i32::<LittleEndian>()?;
        let update_timestamp = read_fixed(&mut cursor, TIMESTAMP_LEN)?;
        let snippet = read_fixed(&mut cursor, SNIPPET_LEN)?;
        Ok(Entry {
            valid,
            id,
            title,
            year,
            authors,
            citations,
            update_timestamp,
            snippet,
        })
    }
}

/// Writes `s` into a `len`-byte NUL-terminated, NUL-padded buffer,
/// truncating at a char boundary if it (plus its terminator) would not
/// fit.
fn write_fixed<W: Write>(w: &mut W, s: &str, len: usize) -> io::Result<()> {
    let limit = len.saturating_sub(1);
    let mut take = s.len().min(limit);
    while !s.is_char_boundary(take) {
        take -= 1;
    }
    let mut buf = vec![0u8; len];
    buf[..take].copy_from_slice(&s.as_bytes()[..take]);
    w.write_all(&buf)
}

/// Reads a `len`-byte NUL-terminated buffer back into a `String`,
/// stopping at the first NUL.
fn read_fixed<R: Read>(r: &mut R, len: usize) -> io::Result<String> {
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    let nul = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    Ok(String::from_utf8_lossy(&buf[..nul]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_round_trips_a_populated_entry() {
        let entry = Entry {
            valid: true,
            id: 42,
            title: "On the Nature of Things".to_string(),
            year: 1971,
            authors: "Lucretius".to_string(),
            citations: 7,
            update_timestamp: "2024-01-01".to_string(),
            snippet: "A long poem.".to_string(),
        };
        let encoded = entry.encode().unwrap();
        let decoded = Entry::decode(&encoded).unwrap();
        assert_eq!(entry, decoded);
    }

    #[test]
    fn it_truncates_fields_longer_than_their_buffer() {
        let long_title = "x".repeat(TITLE_LEN + 50);
        let entry = Entry {
            title: long_title.clone(),
            ..Entry::phantom()
        };
        let encoded = entry.encode().unwrap();
        let decoded = Entry::decode(&encoded).unwrap();
        assert_eq!(decoded.title.len(), TITLE_LEN - 1);
        assert_ne!(decoded.title, long_title);
    }

    #[test]
    fn it_truncates_multibyte_titles_on_a_char_boundary() {
        // Each "é" is 2 bytes; choose a count that lands the naive byte
        // cut (`TITLE_LEN - 1`) mid-codepoint.
        let long_title = "é".repeat((TITLE_LEN - 1) / 2 + 5);
        let entry = Entry {
            title: long_title,
            ..Entry::phantom()
        };
        let encoded = entry.encode().unwrap();
        let decoded = Entry::decode(&encoded).unwrap();
        assert!(!decoded.title.contains('\u{FFFD}'));
        assert!(decoded.title.len() < TITLE_LEN);
    }

    #[test]
    fn phantom_entries_decode_as_invalid() {
        let encoded = Entry::phantom().encode().unwrap();
        let decoded = Entry::decode(&encoded).unwrap();
        assert!(!decoded.valid);
    }
}
