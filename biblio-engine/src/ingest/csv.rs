//! The semicolon-delimited CSV adapter that turns input lines into
//! [`Entry`] values (§6 CSV input format).
//!
//! Fields, in order: id, title, year, authors, citations, update
//! timestamp, snippet. Every field is double-quoted, including the
//! numeric ones (`id`, `year`, `citations`); a text field may instead be
//! the bare literal `NULL` for an empty value. Lines end in `\n` or
//! `\r\n`.

use std::io::BufRead;

use crate::error::CsvError;
use crate::record::entry::{Entry, AUTHORS_LEN, SNIPPET_LEN, TIMESTAMP_LEN, TITLE_LEN};

const FIELD_COUNT: usize = 7;

/// Iterates a CSV input, yielding one [`Entry`] per non-empty line.
pub struct CsvEntries<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> CsvEntries<R> {
    /// Wraps a buffered reader over the raw CSV text.
    pub fn new(reader: R) -> Self {
        CsvEntries {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for CsvEntries<R> {
    type Item = anyhow::Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line_no += 1;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            return Some(parse_line(line, self.line_no).map_err(Into::into));
        }
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<Entry, CsvError> {
    let fields = split_fields(line, line_no)?;
    if fields.len() < FIELD_COUNT {
        return Err(CsvError::TooFewFields {
            line: line_no,
            expected: FIELD_COUNT,
            found: fields.len(),
        });
    }

    let id = parse_int(&fields[0], "id", line_no)?;
    let title = parse_text(&fields[1], TITLE_LEN);
    let year = parse_int(&fields[2], "year", line_no)?;
    let authors = parse_text(&fields[3], AUTHORS_LEN);
    let citations = parse_int(&fields[4], "citations", line_no)?;
    let update_timestamp = parse_text(&fields[5], TIMESTAMP_LEN);
    let snippet = parse_text(&fields[6], SNIPPET_LEN);

    Ok(Entry {
        valid: true,
        id,
        title,
        year,
        authors,
        citations,
        update_timestamp,
        snippet,
    })
}

/// Splits one line into its raw, still-quoted field strings. A quoted
/// field may contain `;`; an unquoted field (the bare literal `NULL`)
/// ends at the next `;`.
fn split_fields(line: &str, line_no: usize) -> Result<Vec<String>, CsvError> {
    let mut fields = Vec::with_capacity(FIELD_COUNT);
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c == '"' {
            chars.next();
            let mut field = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => field.push(ch),
                    None => return Err(CsvError::UnterminatedQuote { line: line_no }),
                }
            }
            fields.push(format!("\"{field}\""));
        } else {
            let mut field = String::new();
            while let Some(&ch) = chars.peek() {
                if ch == ';' {
                    break;
                }
                field.push(ch);
                chars.next();
            }
            fields.push(field);
        }
        match chars.peek() {
            Some(&';') => {
                chars.next();
            }
            Some(_) => {}
            None => break,
        }
    }
    Ok(fields)
}

fn parse_text(raw: &str, max_len: usize) -> String {
    let body = if raw == "NULL" {
        ""
    } else {
        raw.strip_prefix('"').unwrap_or(raw)
    };
    let body = body.strip_suffix('"').unwrap_or(body);

    let limit = max_len - 1;
    if body.len() <= limit {
        return body.to_string();
    }
    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}

fn parse_int(raw: &str, field: &'static str, line_no: usize) -> Result<i32, CsvError> {
    let raw = raw.strip_prefix('"').unwrap_or(raw);
    let raw = raw.strip_suffix('"').unwrap_or(raw);
    raw.trim().parse::<i32>().map_err(|_| CsvError::InvalidInteger {
        line: line_no,
        field,
        value: raw.to_string(),
    })
}
