//! Object identifiers for rewritten objects
//!
//! Every object the rewriter emits carries both its integer id and a
//! 40-character content hash. The hash names the object independently of
//! the final id layout, so a consuming generator can renumber everything
//! after the fact.

use sha1::{Digest, Sha1};

/// Identifier of one emitted object: the allocated integer id and the
/// content hash derived from it and the source document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub id: i64,
    pub hash: String,
}

impl ObjectId {
    pub(crate) fn new(id: i64, source_id: &str) -> Self {
        ObjectId {
            id,
            hash: hash_of_id(id, source_id),
        }
    }
}

/// Lowercase hex SHA-1 of `"<id>-<source>"`
pub(crate) fn hash_of_id(id: i64, source_id: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{id}-{source_id}").as_bytes());
    hasher
        .finalize()
        .as_slice()
        .iter()
        .fold(String::with_capacity(40), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
            s
        })
}
