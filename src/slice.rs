//! Module `slice` implements the crate's byte-range discipline: a
//! contiguous range of bytes that is either *borrowed* (zero-copy, tied
//! to a caller-owned buffer) or *owned* (a refcounted allocation).
//!
//! Read APIs (`KeyStore::get`, `DocEnumerator::doc`) return borrowed
//! slices whose lifetime is tied to the `Record` that owns the
//! underlying bytes; setters copy their input into owned storage. This
//! mirrors the "owned vs borrowed" split the teacher's `vlog::Value`
//! draws between `Native`, `Reference` and `Backup` variants, except
//! here it's expressed directly as a lifetime rather than deferred
//! loading.

use std::ops::Deref;
use std::sync::Arc;

/// An owned, reference-counted byte buffer. Cloning is O(1) (bumps the
/// `Arc` refcount); the bytes themselves are never copied once
/// constructed via `alloc_slice`.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slice(Arc<[u8]>);

impl Slice {
    /// Construct an empty slice.
    pub fn empty() -> Slice {
        Slice(Arc::from(Vec::new().into_boxed_slice()))
    }

    /// Copy `bytes` into a new owned allocation. This is the crate's one
    /// sanctioned "setter copies into owned storage" entry point: pass
    /// any borrowed `&[u8]` in, always get owned storage out.
    pub fn alloc_slice(bytes: &[u8]) -> Slice {
        Slice(Arc::from(bytes.to_vec().into_boxed_slice()))
    }

    /// Adopt an already-owned buffer without copying.
    pub fn adopt(bytes: Vec<u8>) -> Slice {
        Slice(Arc::from(bytes.into_boxed_slice()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for Slice {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Slice {
    fn from(bytes: &[u8]) -> Slice {
        Slice::alloc_slice(bytes)
    }
}

impl From<Vec<u8>> for Slice {
    fn from(bytes: Vec<u8>) -> Slice {
        Slice::adopt(bytes)
    }
}

impl From<&str> for Slice {
    fn from(s: &str) -> Slice {
        Slice::alloc_slice(s.as_bytes())
    }
}

impl AsRef<[u8]> for Slice {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Copy `bytes` into a new owned [`Slice`]. Free-function form, matching
/// the teacher's preference for a plain helper (`util::read_buffer`)
/// alongside the type it serves.
pub fn alloc_slice(bytes: &[u8]) -> Slice {
    Slice::alloc_slice(bytes)
}
