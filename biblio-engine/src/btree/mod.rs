//! Disk-resident, generic B-tree index engine (C2, C3).

pub mod node;
pub mod tree;

pub use node::{NodeKey, UNWRITTEN};
pub use tree::{BTree, Statistics};
