//! Module `index` implements the general emitted-row index every
//! specialized index (map/reduce, full-text, geospatial) is built on:
//! a handle on a `KeyStore` holding rows keyed by a collatable-encoded
//! composite of `(emittedKey, sourceID[, emitIndex])`, plus a live-user
//! count writers and enumerators register against.
//!
//! Grounded on `examples/original_source`'s row key/metadata/body
//! scheme (per-doc hash-diffed key lists, reserved self-document
//! sentinel body) and the teacher's `scans.rs` windowed-iterator shape
//! for the enumeration layer built on top in `enumerator.rs`.

pub mod enumerator;
pub mod fulltext;
pub mod geo;
pub mod indexer;
pub mod mapreduce;
pub mod writer;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::collatable::{encode_bytes, CollatableBuilder, CollatableReader, Tag};
use crate::error::Error;
use crate::keystore::KeyStore;
use crate::log::log_warn;
use crate::varint::{decode_uvarint, encode_uvarint};
use crate::Result;

/// Body written for a row whose value is "the source document itself".
/// Forces `IndexWriter::update` to treat the value as always-changed so
/// the row re-emits on every update.
pub const SPECIAL_BODY_SENTINEL: &[u8] = b"\0\0index-special-self-doc\0\0";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmittedValue {
    Body(Vec<u8>),
    SourceDocument,
}

impl EmittedValue {
    fn bytes(&self) -> &[u8] {
        match self {
            EmittedValue::Body(b) => b,
            EmittedValue::SourceDocument => SPECIAL_BODY_SENTINEL,
        }
    }

    fn is_special(&self) -> bool {
        matches!(self, EmittedValue::SourceDocument)
    }
}

struct IndexShared {
    store: KeyStore,
    users: AtomicUsize,
}

impl Drop for IndexShared {
    fn drop(&mut self) {
        let n = *self.users.get_mut();
        if n != 0 {
            if cfg!(debug_assertions) {
                panic!("Index destroyed with {} live users", n);
            }
            log_warn!("index", "destroyed with {} live users", n);
        }
    }
}

/// A handle on one index's backing `KeyStore`. Cheap to clone (an
/// `Arc` underneath); the live-user count is shared across clones, so
/// `IndexWriter`/`IndexEnumerator` registering against any clone keeps
/// the whole index alive and visible to `user_count()`.
#[derive(Clone)]
pub struct Index {
    shared: Arc<IndexShared>,
}

impl Index {
    pub fn new(store: KeyStore) -> Index {
        Index { shared: Arc::new(IndexShared { store, users: AtomicUsize::new(0) }) }
    }

    pub fn store(&self) -> &KeyStore {
        &self.shared.store
    }

    pub fn user_count(&self) -> usize {
        self.shared.users.load(Ordering::SeqCst)
    }

    pub(crate) fn acquire_user(&self) -> IndexUserGuard {
        self.shared.users.fetch_add(1, Ordering::SeqCst);
        IndexUserGuard { shared: self.shared.clone() }
    }

    /// Explicit, checked teardown: errors if a writer or enumerator is
    /// still registered. `Drop` performs the same check as a backstop,
    /// but can only warn/assert since it can't fail a no-return
    /// function; prefer calling this when the caller can act on the
    /// error.
    pub fn close(self) -> Result<()> {
        if self.user_count() != 0 {
            return Err(Error::Busy);
        }
        Ok(())
    }
}

pub(crate) struct IndexUserGuard {
    shared: Arc<IndexShared>,
}

impl Drop for IndexUserGuard {
    fn drop(&mut self) {
        self.shared.users.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Key for the per-doc "keys emitted last time" bookkeeping record:
/// `collatable(docID)`. Always a bare `String` tag, which sorts before
/// every row key (those start with `Array`), so both can share one
/// `KeyStore` without collision.
pub(crate) fn doc_keys_record_key(doc_id: &str) -> Vec<u8> {
    encode_bytes(doc_id.as_bytes())
}

/// `collatable[ [emittedKey, collatable(sourceID)] (, emitIndex if >0) ]`
pub fn make_row_key(emitted_key: &[u8], source_id: &str, emit_index: usize) -> Vec<u8> {
    let mut b = CollatableBuilder::new();
    b.begin_array();
    b.begin_array();
    b.add_raw(emitted_key);
    b.add_string(source_id);
    b.end_array();
    if emit_index > 0 {
        b.add_number(emit_index as f64);
    }
    b.end_array();
    b.finish()
}

/// Byte range `[min, max)` covering every row key whose `emittedKey`
/// equals (is collatable-equal to) `emitted_key`, for any sourceID or
/// emitIndex.
pub fn range_for_emitted_key(emitted_key: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut b = CollatableBuilder::new();
    b.begin_array();
    b.begin_array();
    b.add_raw(emitted_key);
    let min = b.finish();
    let mut max = min.clone();
    max.push(0xFF);
    (min, max)
}

pub fn decode_row_key(key: &[u8]) -> Result<(Vec<u8>, String, usize)> {
    let mut r = CollatableReader::new(key);
    r.begin_array()?;
    r.begin_array()?;
    let emitted_key = r.read_raw()?.to_vec();
    let source_id = r.read_string()?;
    r.end_array()?;
    let emit_index = if r.peek_tag() != Tag::EndSequence { r.read_int()? as usize } else { 0 };
    r.end_array()?;
    Ok((emitted_key, source_id, emit_index))
}

pub fn encode_row_meta(sequence: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_uvarint(sequence, &mut buf);
    buf
}

pub fn decode_row_meta(meta: &[u8]) -> Result<u64> {
    let (seq, _) = decode_uvarint(meta)?;
    Ok(seq)
}

/// The per-doc "keys emitted last time" record: `(hash, keys)`.
#[derive(Clone, Debug, Default)]
pub(crate) struct DocKeysRecord {
    pub hash: u32,
    pub keys: Vec<Vec<u8>>,
}

impl DocKeysRecord {
    fn encode(&self) -> Vec<u8> {
        let mut b = CollatableBuilder::new();
        b.begin_array();
        b.add_number(self.hash as f64);
        b.begin_array();
        for k in &self.keys {
            b.add_raw(k);
        }
        b.end_array();
        b.end_array();
        b.finish()
    }

    fn decode(data: &[u8]) -> Result<DocKeysRecord> {
        let mut r = CollatableReader::new(data);
        r.begin_array()?;
        let hash = r.read_int()? as u32;
        r.begin_array()?;
        let mut keys = Vec::new();
        while r.peek_tag() != Tag::EndSequence {
            keys.push(r.read_raw()?.to_vec());
        }
        r.end_array()?;
        r.end_array()?;
        Ok(DocKeysRecord { hash, keys })
    }
}

pub(crate) fn load_doc_keys(store: &KeyStore, doc_id: &str) -> Result<DocKeysRecord> {
    let rec = store.get(&doc_keys_record_key(doc_id))?;
    if !rec.exists {
        return Ok(DocKeysRecord::default());
    }
    DocKeysRecord::decode(rec.body.as_bytes())
}

pub(crate) fn save_doc_keys(store: &KeyStore, doc_id: &str, record: &DocKeysRecord) -> Result<()> {
    store.set(&doc_keys_record_key(doc_id), b"", &record.encode())?;
    Ok(())
}

/// djb2, folded over each value's bytes in emission order.
pub(crate) fn djb2_fold(values: &[&[u8]]) -> u32 {
    let mut h: u32 = 5381;
    for v in values {
        for &b in *v {
            h = h.wrapping_mul(33).wrapping_add(b as u32);
        }
    }
    h
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
