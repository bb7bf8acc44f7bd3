//! # biblio-engine
//!
//! A block-oriented B-tree index engine and a perfect-hash record file,
//! together implementing a small disk-indexed store for bibliographic
//! article entries.
//!
//! The B-tree ([`btree`]) is generic over its key type and knows nothing
//! about bibliographic data; [`index`] instantiates it twice, once keyed
//! by article id and once by title, and [`record`] stores the entries
//! themselves at identifier-addressed offsets so the tree only ever has
//! to carry a byte offset as its payload. [`ingest`] wires the three
//! together for the four operations the store exposes: building the
//! store from a CSV dump, and the three ways of finding an entry again.

use std::sync::LazyLock;

use bincode::config::{AllowTrailing, FixintEncoding, WithOtherIntEncoding, WithOtherTrailing};
use bincode::{DefaultOptions, Options};

pub mod block;
pub mod btree;
pub mod error;
pub mod index;
pub mod ingest;
pub mod record;

/// The `bincode` configuration used for every on-disk structure in this
/// crate: fixed-width integers (so a node's encoded size does not depend
/// on the magnitude of the values it holds) and trailing bytes allowed
/// (so a struct can be deserialized out of a zero-padded block without
/// first trimming the padding).
pub static BINCODER: LazyLock<
    WithOtherIntEncoding<WithOtherTrailing<DefaultOptions, AllowTrailing>, FixintEncoding>,
> = LazyLock::new(|| {
    DefaultOptions::new()
        .allow_trailing_bytes()
        .with_fixint_encoding()
});
