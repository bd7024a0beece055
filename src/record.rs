//! Module `record` implements the unit of storage every `KeyStore`
//! operation reads and writes: `key`, `meta`, `body`, `sequence`,
//! `deleted` and `exists`.

use crate::slice::Slice;

/// A single stored record. `exists == false` is the sentinel a `get()`
/// miss returns instead of raising `NotFound` (see `error.rs`'s module
/// doc: this is the one hot-path exception to "errors propagate").
#[derive(Clone, Debug, Default)]
pub struct Record {
    pub key: Slice,
    pub meta: Slice,
    pub body: Slice,
    pub sequence: u64,
    pub deleted: bool,
    pub exists: bool,
    /// Populated instead of `body` when a read used the "meta only"
    /// content option.
    pub body_size: u64,
}

impl Record {
    /// The canonical "not found" record: every field default, `exists`
    /// false. `KeyStore::get` returns this rather than `Err(NotFound)`.
    pub fn not_found(key: &[u8]) -> Record {
        Record {
            key: Slice::alloc_slice(key),
            exists: false,
            ..Default::default()
        }
    }

    pub fn found(key: Slice, meta: Slice, body: Slice, sequence: u64, deleted: bool) -> Record {
        let body_size = body.len() as u64;
        Record {
            key,
            meta,
            body,
            sequence,
            deleted,
            exists: true,
            body_size,
        }
    }

    /// Same as `found`, but without the body payload (the "meta only"
    /// read path): `body` stays empty and `body_size` records its true
    /// length.
    pub fn found_meta_only(key: Slice, meta: Slice, sequence: u64, deleted: bool, body_size: u64) -> Record {
        Record {
            key,
            meta,
            body: Slice::empty(),
            sequence,
            deleted,
            exists: true,
            body_size,
        }
    }
}

/// Options accepted by content-fetching reads, controlling whether the
/// body is actually loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentOptions {
    pub meta_only: bool,
}
