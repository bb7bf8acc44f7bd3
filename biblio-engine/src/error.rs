//! Error types for the engine.
//!
//! Each module that can misuse its own invariants gets a `thiserror` enum;
//! callers crossing a crate boundary see `anyhow::Result` so they are never
//! forced to match on our internal variants.

use thiserror::Error;

/// Failures raised by the on-disk B-tree.
#[derive(Debug, Error)]
pub enum BTreeError {
    /// `seek` was called before the tree had been created or loaded.
    #[error("tree has not been created or loaded yet")]
    NotOpen,

    /// `insert` or `finish_insertions` was called on a tree that is not
    /// open for writing (it was opened with `load`, or already finalized).
    #[error("tree is not open for writing")]
    ReadOnly,

    /// The computed node order leaves no room for a single key.
    #[error("block size {block_size} is too small to hold a single key of encoded size {key_size}")]
    BlockTooSmall {
        /// Configured block size in bytes.
        block_size: usize,
        /// Encoded size of one key in bytes.
        key_size: usize,
    },

    /// A node read back from disk failed to decode.
    #[error("corrupt node at offset {offset}: {source}")]
    Decode {
        /// Byte offset of the offending block.
        offset: i64,
        /// Underlying decode failure.
        #[source]
        source: bincode::Error,
    },
}

/// Failures raised by the fixed-record hash file.
#[derive(Debug, Error)]
pub enum RecordError {
    /// `write_entry` was called with an id smaller than or equal to one
    /// already written.
    #[error("record id {got} is not greater than the last id written ({last})")]
    OutOfOrder {
        /// Id that was rejected.
        got: i64,
        /// Last id successfully written.
        last: i64,
    },

    /// `write_entry` was called with an id already present in the file.
    #[error("duplicate record id {0}")]
    Duplicate(i64),
}

/// Failures raised while parsing the semicolon-delimited ingest format.
#[derive(Debug, Error)]
pub enum CsvError {
    /// A line ended before the expected number of fields were read.
    #[error("line {line}: expected {expected} fields, found {found}")]
    TooFewFields {
        /// 1-based line number.
        line: usize,
        /// Number of fields the record format requires.
        expected: usize,
        /// Number of fields actually present.
        found: usize,
    },

    /// A quoted field was never closed before the line ended.
    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote {
        /// 1-based line number.
        line: usize,
    },

    /// A numeric field did not parse as an integer.
    #[error("line {line}: field `{field}` is not a valid integer: `{value}`")]
    InvalidInteger {
        /// 1-based line number.
        line: usize,
        /// Name of the offending field.
        field: &'static str,
        /// Raw text that failed to parse.
        value: String,
    },
}
