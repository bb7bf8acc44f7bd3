//! Index façades (C5): two concrete `BTree` instantiations with distinct
//! key shapes, each ordered on a single searchable field while carrying
//! a record-file offset as payload.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::btree::NodeKey;
use crate::record::entry::TITLE_LEN;

/// `(id, offset)`, ordered by `id` only (§3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdIndex {
    /// Article identifier; the searchable part of this key.
    pub id: i32,
    /// Byte offset of the article's entry in the record file.
    pub offset: i64,
}

impl IdIndex {
    /// Builds a new id-index key.
    pub fn new(id: i32, offset: i64) -> Self {
        IdIndex { id, offset }
    }
}

impl NodeKey for IdIndex {
    const ENCODED_SIZE: usize = 4 + 8;
}

impl PartialEq for IdIndex {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl PartialOrd for IdIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.id.partial_cmp(&other.id)
    }
}

impl PartialEq<i32> for IdIndex {
    fn eq(&self, other: &i32) -> bool {
        self.id == *other
    }
}

impl PartialOrd<i32> for IdIndex {
    fn partial_cmp(&self, other: &i32) -> Option<Ordering> {
        self.id.partial_cmp(other)
    }
}

/// `(title, offset)`, ordered lexicographically by `title` only (§3, §4.5).
///
/// `title` is stored as a plain `String`, truncated to fit the record
/// file's fixed 300-byte title buffer, since the ordering only needs the
/// text and never the raw padded bytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleIndex {
    /// Article title; the searchable part of this key.
    pub title: String,
    /// Byte offset of the article's entry in the record file.
    pub offset: i64,
}

impl TitleIndex {
    /// Builds a new title-index key, truncating `title` to the record
    /// file's title buffer capacity (minus its NUL terminator), matching
    /// how the title will actually be stored in the record.
    pub fn new(title: &str, offset: i64) -> Self {
        let limit = TITLE_LEN - 1;
        let truncated = if title.len() > limit {
            let mut end = limit;
            while !title.is_char_boundary(end) {
                end -= 1;
            }
            &title[..end]
        } else {
            title
        };
        TitleIndex {
            title: truncated.to_string(),
            offset,
        }
    }
}

impl NodeKey for TitleIndex {
    const ENCODED_SIZE: usize = TITLE_LEN + 8;
}

impl PartialEq for TitleIndex {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
    }
}

impl PartialOrd for TitleIndex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.title.partial_cmp(&other.title)
    }
}

impl PartialEq<str> for TitleIndex {
    fn eq(&self, other: &str) -> bool {
        self.title == other
    }
}

impl PartialOrd<str> for TitleIndex {
    fn partial_cmp(&self, other: &str) -> Option<Ordering> {
        self.title.as_str().partial_cmp(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_index_compares_only_on_id() {
        let a = IdIndex::new(1, 100);
        let b = IdIndex::new(1, 999);
        assert_eq!(a, b);
        assert_eq!(a.partial_cmp(&b), Some(Ordering::Equal));
    }

    #[test]
    fn id_index_compares_asymmetrically_against_a_bare_id() {
        let key = IdIndex::new(9, 4096);
        assert_eq!(key, 9i32);
        assert!(key > 8i32);
        assert!(key < 10i32);
    }

    #[test]
    fn title_index_truncates_overlong_titles() {
        let long_title = "x".repeat(TITLE_LEN + 10);
        let key = TitleIndex::new(&long_title, 0);
        assert_eq!(key.title.len(), TITLE_LEN - 1);
    }

    #[test]
    fn title_index_compares_asymmetrically_against_a_bare_str() {
        let key = TitleIndex::new("Moby Dick", 4096);
        assert_eq!(key, *"Moby Dick");
        assert!(key < *"Zzz");
    }
}
