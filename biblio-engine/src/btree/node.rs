//! The in-block layout of a B-tree node and the file header (C2).
//!
//! A node is written as a raw fixed-layout record through [`crate::BINCODER`],
//! the same `bincode` configuration (fixed-width integers, trailing bytes
//! allowed) the rest of the engine uses for disk structures. Only the
//! `size` valid keys/children are ever serialized; the remainder of the
//! block is left as zero padding and ignored on read.

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::block::BLOCK_SIZE;
use crate::error::BTreeError;
use crate::BINCODER;

/// Sentinel value of [`BNode::offset`] for a node that has not yet been
/// written to disk.
pub const UNWRITTEN: i64 = -1;

/// A key type usable in a disk-resident B-tree.
///
/// `ENCODED_SIZE` is the worst-case serialized size of one key, used only
/// to pick the tree's order at construction time (§4.2); actual encoding
/// goes through `serde`/`bincode` like every other disk structure here.
pub trait NodeKey:
    Serialize + DeserializeOwned + Clone + std::fmt::Debug + PartialOrd + Send + Sync + 'static
{
    /// Upper bound on this key's serialized size, in bytes.
    const ENCODED_SIZE: usize;
}

/// The first block of a tree file: the current root offset and the total
/// number of blocks allocated so far (header counted as one).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeHeader {
    /// Byte offset of the current root node.
    pub root_address: i64,
    /// Total blocks allocated, including this header.
    pub block_count: u32,
}

/// A single B-tree node: a header plus a key array and a child-offset
/// array, sharing one fixed block size with every other node in the
/// file (§3, §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BNode<K> {
    /// This node's own byte position in the file, or [`UNWRITTEN`].
    pub offset: i64,
    /// Whether this node is a leaf (no children).
    pub is_leaf: bool,
    /// Number of valid keys currently stored.
    pub size: usize,
    /// `keys[0..size)` in increasing order; never padded to capacity.
    pub keys: Vec<K>,
    /// `children[0..size+1)` when `is_leaf` is false; empty otherwise.
    pub children: Vec<i64>,
}

impl<K: NodeKey> BNode<K> {
    /// Builds an empty leaf, as created by `BTree::create`.
    pub fn empty_leaf() -> Self {
        BNode {
            offset: UNWRITTEN,
            is_leaf: true,
            size: 0,
            keys: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builds a non-leaf node from a single promoted key and its two
    /// children, as done when a new root is allocated after a split.
    pub fn new_root(middle: K, left: i64, right: i64) -> Self {
        BNode {
            offset: UNWRITTEN,
            is_leaf: false,
            size: 1,
            keys: vec![middle],
            children: vec![left, right],
        }
    }

    /// True once this node holds the transient `2M+1` overflow state.
    pub fn is_overflowing(&self, order: usize) -> bool {
        self.size > 2 * order
    }

    /// Serializes this node into a zero-padded, exactly-`BLOCK_SIZE` byte
    /// buffer.
    pub fn to_block(&self) -> Result<[u8; BLOCK_SIZE], BTreeError> {
        let bytes = BINCODER
            .serialize(self)
            .map_err(|source| BTreeError::Decode {
                offset: self.offset,
                source,
            })?;
        if bytes.len() > BLOCK_SIZE {
            return Err(BTreeError::BlockTooSmall {
                block_size: BLOCK_SIZE,
                key_size: K::ENCODED_SIZE,
            });
        }
        let mut block = [0u8; BLOCK_SIZE];
        block[..bytes.len()].copy_from_slice(&bytes);
        Ok(block)
    }

    /// Deserializes a node from a block previously produced by
    /// [`BNode::to_block`]. Trailing zero padding is ignored.
    pub fn from_block(offset: i64, block: &[u8; BLOCK_SIZE]) -> Result<Self, BTreeError> {
        BINCODER
            .deserialize(block)
            .map_err(|source| BTreeError::Decode { offset, source })
    }
}

/// Picks the largest order `M ≥ 1` such that a node's worst-case
/// transient layout — `2M+1` keys and `2M+2` children — still fits in one
/// block (§4.2). Panics if even `M = 1` does not fit; this is the
/// "panic at init" escape hatch the design allows in place of a
/// compile-time check.
pub fn order_for<K: NodeKey>(block_size: usize) -> usize {
    // offset: i64, is_leaf: bool, size: u64, plus the two 8-byte Vec
    // length prefixes bincode's FixintEncoding writes ahead of `keys` and
    // `children` themselves.
    const FIXED_HEADER: usize = 8 + 1 + 8 + 8 + 8;
    const CHILD_SIZE: usize = 8; // i64 offset

    let mut m = 1usize;
    let fits = |m: usize| FIXED_HEADER + (2 * m + 1) * K::ENCODED_SIZE + (2 * m + 2) * CHILD_SIZE <= block_size;

    if !fits(m) {
        panic!(
            "block size {block_size} is too small to hold even a single key of encoded size {}",
            K::ENCODED_SIZE
        );
    }
    while fits(m + 1) {
        m += 1;
    }
    m
}

impl NodeKey for i64 {
    const ENCODED_SIZE: usize = 8;
}
