//! `IndexWriter::update` implements the hash-diffing update algorithm
//! from the index engine's row-maintenance rules: compare this update's
//! emitted `(key, value)` pairs against the last update's, touching only
//! rows that actually changed.

use super::{
    djb2_fold, encode_row_meta, load_doc_keys, make_row_key, save_doc_keys, DocKeysRecord,
    EmittedValue, Index, IndexUserGuard,
};
use crate::Result;

pub struct IndexWriter {
    index: Index,
    _user: IndexUserGuard,
}

impl IndexWriter {
    pub fn new(index: &Index) -> IndexWriter {
        let guard = index.acquire_user();
        IndexWriter { index: index.clone(), _user: guard }
    }

    /// Returns whether any row actually changed; adjusts `*row_count` by
    /// `added - removed` when it does.
    pub fn update(
        &self,
        doc_id: &str,
        sequence: u64,
        keys: &[Vec<u8>],
        values: &[EmittedValue],
        row_count: &mut i64,
    ) -> Result<bool> {
        assert_eq!(keys.len(), values.len(), "IndexWriter::update: keys/values length mismatch");
        let store = self.index.store();
        let prev = load_doc_keys(store, doc_id)?;

        let value_bytes: Vec<&[u8]> = values.iter().map(|v| v.bytes()).collect();
        let mut new_hash = djb2_fold(&value_bytes);
        if values.iter().any(|v| v.is_special()) {
            while new_hash == prev.hash {
                new_hash = new_hash.wrapping_add(1);
            }
        }

        let meta = encode_row_meta(sequence);
        let mut added: i64 = 0;
        let mut removed: i64 = 0;
        let mut keys_changed = false;
        let mut first_changed = keys.len().min(prev.keys.len());

        for (i, (key, value)) in keys.iter().zip(values.iter()).enumerate() {
            let position_matches = !keys_changed && i < prev.keys.len() && prev.keys[i] == *key;

            let row_key = make_row_key(key, doc_id, i);
            if position_matches {
                if new_hash == prev.hash {
                    let existing = store.get(&row_key)?;
                    if existing.exists && existing.body.as_bytes() == value.bytes() {
                        continue;
                    }
                }
                store.set(&row_key, &meta, value.bytes())?;
                added += 1;
                removed += 1;
            } else {
                if !keys_changed {
                    keys_changed = true;
                    first_changed = i;
                }
                store.set(&row_key, &meta, value.bytes())?;
                added += 1;
            }
        }

        for (j, old_key) in prev.keys.iter().enumerate().skip(first_changed) {
            let row_key = make_row_key(old_key, doc_id, j);
            if store.del(&row_key)? {
                removed += 1;
            }
        }

        if keys_changed || keys.len() != prev.keys.len() {
            save_doc_keys(
                store,
                doc_id,
                &DocKeysRecord { hash: new_hash, keys: keys.to_vec() },
            )?;
        }

        if added == 0 && removed == 0 {
            return Ok(false);
        }
        *row_count += added - removed;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
