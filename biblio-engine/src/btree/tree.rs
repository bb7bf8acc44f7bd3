//! The B-tree engine itself (C3) — creation, loading, insertion, seeking,
//! and the statistics the orchestrator reports back to the user.

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::Context;
use bincode::Options;
use tracing::{debug, info};

use crate::block::{read_block, write_block, BLOCK_SIZE};
use crate::btree::node::{order_for, BNode, NodeKey, TreeHeader, UNWRITTEN};
use crate::error::BTreeError;
use crate::BINCODER;

/// Read/write counters maintained over the lifetime of a tree instance
/// (§4.3, §8 property 5).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Blocks read from disk since the last reset.
    pub blocks_read: u64,
    /// New blocks written to disk since the last reset.
    pub blocks_created: u64,
    /// Total blocks currently allocated in the file, per the header.
    pub blocks_in_disk: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TreeState {
    Writable,
    Readable,
    Finalized,
}

/// A disk-resident B-tree over keys of type `K` (§4.3).
///
/// Only the root node is held in memory between calls; every other node
/// is read from or written to disk as the recursive insert/seek walks
/// the tree.
pub struct BTree<K: NodeKey> {
    file: std::fs::File,
    path: PathBuf,
    order: usize,
    state: TreeState,
    header: TreeHeader,
    root: BNode<K>,
    stats: Statistics,
}

impl<K: NodeKey> BTree<K> {
    /// Creates a fresh tree file at `path`, overwriting anything already
    /// there. The root starts as a single empty leaf (§4.3).
    pub fn create(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let order = order_for::<K>(BLOCK_SIZE);
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("creating tree file {}", path.display()))?;

        let placeholder = TreeHeader {
            root_address: UNWRITTEN,
            block_count: 0,
        };
        write_header_block(&mut file, &placeholder)?;

        let mut root = BNode::<K>::empty_leaf();
        let root_offset = file.seek(SeekFrom::End(0))?;
        root.offset = root_offset as i64;
        let block = root.to_block()?;
        write_block(&mut file, root_offset, &block)?;

        let header = TreeHeader {
            root_address: root.offset,
            block_count: 2,
        };
        write_header_block(&mut file, &header)?;

        info!(path = %path.display(), order, "created tree file");

        Ok(BTree {
            file,
            path,
            order,
            state: TreeState::Writable,
            header,
            root,
            stats: Statistics::default(),
        })
    }

    /// Opens an existing tree file read-only, caching its root (§4.3).
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let order = order_for::<K>(BLOCK_SIZE);
        let path = path.as_ref().to_path_buf();

        let mut file = OpenOptions::new()
            .read(true)
            .open(&path)
            .with_context(|| format!("opening tree file {}", path.display()))?;

        let mut stats = Statistics::default();
        let header = read_header_block(&mut file, &mut stats)?;

        let mut buf = [0u8; BLOCK_SIZE];
        read_block(&mut file, header.root_address as u64, &mut buf)
            .with_context(|| format!("reading root node of {}", path.display()))?;
        stats.blocks_read += 1;
        let root = BNode::from_block(header.root_address, &buf)?;

        info!(path = %path.display(), order, "loaded tree file");

        Ok(BTree {
            file,
            path,
            order,
            state: TreeState::Readable,
            header,
            root,
            stats,
        })
    }

    /// Inserts `key`. Only permitted while the tree is writable (§4.3.4).
    pub fn insert(&mut self, key: K) -> anyhow::Result<()> {
        if self.state != TreeState::Writable {
            return Err(BTreeError::ReadOnly.into());
        }

        let mut root = self.root.clone();
        match self.insert_into(&mut root, key)? {
            None => {
                self.root = root;
            }
            Some((middle, right_offset)) => {
                let mut new_root = BNode::new_root(middle, root.offset, right_offset);
                self.write_node(&mut new_root)?;
                self.header.root_address = new_root.offset;
                write_header_block(&mut self.file, &self.header)?;
                debug!(new_root = new_root.offset, "root split, tree grew a level");
                self.root = new_root;
            }
        }
        Ok(())
    }

    /// Returns the first key `k'` such that neither `k' < q` nor `q < k'`
    /// (§4.3.1). The query type `q` need not match the stored key type;
    /// only `K: PartialOrd<Q>` is required.
    pub fn seek<Q: ?Sized>(&mut self, query: &Q) -> anyhow::Result<Option<K>>
    where
        K: PartialOrd<Q>,
    {
        if self.state == TreeState::Writable && self.root.offset == UNWRITTEN {
            return Err(BTreeError::NotOpen.into());
        }
        let root = self.root.clone();
        self.seek_in(&root, query)
    }

    fn seek_in<Q: ?Sized>(&mut self, node: &BNode<K>, query: &Q) -> anyhow::Result<Option<K>>
    where
        K: PartialOrd<Q>,
    {
        let i = lower_bound(&node.keys, query);
        if i < node.size && node.keys[i].partial_cmp(query) == Some(std::cmp::Ordering::Equal) {
            return Ok(Some(node.keys[i].clone()));
        }
        if node.is_leaf {
            return Ok(None);
        }
        let child = self.read_node(node.children[i])?;
        self.seek_in(&child, query)
    }

    /// Writes the accumulated `blocks_created` count into the file
    /// header and closes the tree to further insertion (§4.3).
    pub fn finish_insertions(&mut self) -> anyhow::Result<()> {
        if self.state != TreeState::Writable {
            return Err(BTreeError::ReadOnly.into());
        }
        self.header.block_count = 2 + self.stats.blocks_created as u32;
        write_header_block(&mut self.file, &self.header)?;
        self.file.sync_all().ok();
        self.state = TreeState::Finalized;
        info!(path = %self.path.display(), block_count = self.header.block_count, "finalized tree file");
        Ok(())
    }

    /// Returns a snapshot of the counters, optionally refreshing
    /// `blocks_in_disk` from the header (§4.3).
    pub fn get_statistics(&mut self, include_file_block_count: bool) -> anyhow::Result<Statistics> {
        if include_file_block_count {
            let header = read_header_block(&mut self.file, &mut self.stats)?;
            self.stats.blocks_in_disk = header.block_count as u64;
        }
        Ok(self.stats)
    }

    /// Zeros all three counters.
    pub fn reset_statistics(&mut self) {
        self.stats = Statistics::default();
    }

    /// The order `M` this tree was constructed with.
    pub fn order(&self) -> usize {
        self.order
    }

    fn read_node(&mut self, offset: i64) -> anyhow::Result<BNode<K>> {
        let mut buf = [0u8; BLOCK_SIZE];
        read_block(&mut self.file, offset as u64, &mut buf)
            .with_context(|| format!("reading node at offset {offset}"))?;
        self.stats.blocks_read += 1;
        Ok(BNode::from_block(offset, &buf)?)
    }

    fn write_node(&mut self, node: &mut BNode<K>) -> anyhow::Result<()> {
        if node.offset == UNWRITTEN {
            let offset = self.file.seek(SeekFrom::End(0))?;
            node.offset = offset as i64;
            self.stats.blocks_created += 1;
        }
        let block = node.to_block()?;
        write_block(&mut self.file, node.offset as u64, &block)
            .with_context(|| format!("writing node at offset {}", node.offset))?;
        Ok(())
    }

    /// Recursive insert core (§4.3.2). Returns `Some((middle, right))`
    /// when `node` overflowed and split, for the caller to absorb.
    fn insert_into(&mut self, node: &mut BNode<K>, key: K) -> anyhow::Result<Option<(K, i64)>> {
        if node.is_leaf {
            return self.absorb(node, key, None);
        }

        let i = lower_bound(&node.keys, &key);
        let mut child = self.read_node(node.children[i])?;
        match self.insert_into(&mut child, key)? {
            None => Ok(None),
            Some((middle, right_offset)) => self.absorb(node, middle, Some(right_offset)),
        }
    }

    /// Inserts `key` (and, for a non-leaf absorbing a promoted key, the
    /// new right child) into `node`, splitting it if that pushes it past
    /// `2M` keys (§4.3.2).
    fn absorb(
        &mut self,
        node: &mut BNode<K>,
        key: K,
        right_offset: Option<i64>,
    ) -> anyhow::Result<Option<(K, i64)>> {
        let i = lower_bound(&node.keys, &key);
        node.keys.insert(i, key);
        if let Some(offset) = right_offset {
            node.children.insert(i + 1, offset);
        }
        node.size = node.keys.len();

        if node.size <= 2 * self.order {
            self.write_node(node)?;
            return Ok(None);
        }

        let order = self.order;
        let middle = node.keys[order].clone();
        // `node.keys` currently holds `2M+1` entries; `split_off(order + 1)`
        // leaves `keys[0..=order]` behind (the promoted middle still at
        // the end) and returns `keys[order+1..]` as the right sibling's.
        let right_keys = node.keys.split_off(order + 1);
        node.keys.pop();

        let right_children = if node.is_leaf {
            Vec::new()
        } else {
            node.children.split_off(order + 1)
        };

        node.size = node.keys.len();

        let mut right = BNode {
            offset: UNWRITTEN,
            is_leaf: node.is_leaf,
            size: right_keys.len(),
            keys: right_keys,
            children: right_children,
        };
        self.write_node(&mut right)?;
        self.write_node(node)?;

        debug!(
            left = node.offset,
            right = right.offset,
            "node split at order {order}"
        );

        Ok(Some((middle, right.offset)))
    }
}

fn write_header_block(file: &mut std::fs::File, header: &TreeHeader) -> anyhow::Result<()> {
    let bytes = BINCODER.serialize(header)?;
    write_block(file, 0, &bytes)?;
    Ok(())
}

fn read_header_block(file: &mut std::fs::File, stats: &mut Statistics) -> anyhow::Result<TreeHeader> {
    let mut buf = [0u8; BLOCK_SIZE];
    read_block(file, 0, &mut buf)?;
    stats.blocks_read += 1;
    Ok(BINCODER.deserialize(&buf)?)
}

/// First index `i` such that `keys[j] < query` for all `j < i` and
/// `!(keys[i] < query)`.
fn lower_bound<K, Q: ?Sized>(keys: &[K], query: &Q) -> usize
where
    K: PartialOrd<Q>,
{
    keys.partition_point(|k| k < query)
}

#[cfg(test)]
mod tests;
