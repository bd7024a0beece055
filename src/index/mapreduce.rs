//! `MapReduceIndex`: a `MapReduceIndex` pairs an `Index` with a map
//! function and tracks how far it has consumed its source `KeyStore`,
//! persisted as a state record at `collatable(null)` in the index's own
//! `KeyStore`.

use std::sync::Arc;

use crate::collatable::{CollatableBuilder, CollatableReader};
use crate::record::Record;
use crate::Result;

use super::{EmittedValue, Index};

pub const CURRENT_FORMAT_VERSION: u32 = 1;
pub const MINIMUM_FORMAT_VERSION: u32 = 1;

/// `collatable(null)`: a single `Null` tag byte. Sorts before every
/// per-doc-keys record (`String`) and every row key (`Array`), so it
/// shares the index's `KeyStore` without collision.
fn state_record_key() -> Vec<u8> {
    let mut b = CollatableBuilder::new();
    b.add_null();
    b.finish()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexState {
    pub last_seq_indexed: u64,
    pub last_seq_changed_at: u64,
    pub map_version: String,
    pub index_type: String,
    pub row_count: i64,
    pub format_version: u32,
    pub last_purge_count: u64,
}

impl Default for IndexState {
    fn default() -> IndexState {
        IndexState {
            last_seq_indexed: 0,
            last_seq_changed_at: 0,
            map_version: String::new(),
            index_type: String::new(),
            row_count: 0,
            format_version: 0,
            last_purge_count: 0,
        }
    }
}

impl IndexState {
    fn encode(&self) -> Vec<u8> {
        let mut b = CollatableBuilder::new();
        b.begin_array();
        b.add_number(self.last_seq_indexed as f64);
        b.add_number(self.last_seq_changed_at as f64);
        b.add_string(&self.map_version);
        b.add_string(&self.index_type);
        b.add_number(self.row_count as f64);
        b.add_number(self.format_version as f64);
        b.add_number(self.last_purge_count as f64);
        b.end_array();
        b.finish()
    }

    fn decode(data: &[u8]) -> Result<IndexState> {
        let mut r = CollatableReader::new(data);
        r.begin_array()?;
        let last_seq_indexed = r.read_int()? as u64;
        let last_seq_changed_at = r.read_int()? as u64;
        let map_version = r.read_string()?;
        let index_type = r.read_string()?;
        let row_count = r.read_int()?;
        let format_version = r.read_int()? as u32;
        let last_purge_count = r.read_int()? as u64;
        r.end_array()?;
        Ok(IndexState {
            last_seq_indexed,
            last_seq_changed_at,
            map_version,
            index_type,
            row_count,
            format_version,
            last_purge_count,
        })
    }
}

pub type DocTypeMatcher = dyn Fn(&Record) -> bool + Send + Sync;
pub type MapFn = dyn Fn(&Record, &mut dyn FnMut(Vec<u8>, EmittedValue)) + Send + Sync;

/// A map-function-backed index. `doc_type_matcher`, when set, decides
/// whether a given source record is relevant (e.g. by decoding its
/// revision metadata's `docType`); records it rejects are recorded as
/// "seen but skipped" rather than mapped.
pub struct MapReduceIndex {
    index: Index,
    index_type: String,
    map_version: String,
    doc_type_matcher: Option<Arc<DocTypeMatcher>>,
    map_fn: Arc<MapFn>,
}

impl MapReduceIndex {
    pub fn new(
        index: Index,
        index_type: &str,
        map_version: &str,
        doc_type_matcher: Option<Arc<DocTypeMatcher>>,
        map_fn: Arc<MapFn>,
    ) -> MapReduceIndex {
        MapReduceIndex {
            index,
            index_type: index_type.to_string(),
            map_version: map_version.to_string(),
            doc_type_matcher,
            map_fn,
        }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn matches(&self, record: &Record) -> bool {
        match &self.doc_type_matcher {
            Some(m) => m(record),
            None => true,
        }
    }

    pub fn invoke_map(&self, record: &Record, emit: &mut dyn FnMut(Vec<u8>, EmittedValue)) {
        (self.map_fn)(record, emit)
    }

    pub fn state(&self) -> Result<IndexState> {
        let rec = self.index.store().get(&state_record_key())?;
        if !rec.exists {
            return Ok(IndexState::default());
        }
        let mut state = IndexState::decode(rec.body.as_bytes())?;
        if state.format_version < MINIMUM_FORMAT_VERSION {
            state = IndexState::default();
        }
        Ok(state)
    }

    pub fn save_state(&self, state: &IndexState) -> Result<()> {
        self.index.store().set(&state_record_key(), b"", &state.encode())?;
        Ok(())
    }

    fn invalidate(&self) -> Result<()> {
        self.index.store().erase()
    }

    /// Compares persisted `indexType`/`mapVersion` against this index's
    /// own; a mismatch erases rows and resets sequences. Returns the
    /// (possibly freshly reset) state to index against.
    pub fn setup(&self) -> Result<IndexState> {
        let state = self.state()?;
        if state.index_type == self.index_type && state.map_version == self.map_version && state.format_version >= MINIMUM_FORMAT_VERSION {
            return Ok(state);
        }
        self.invalidate()?;
        let fresh = IndexState {
            index_type: self.index_type.clone(),
            map_version: self.map_version.clone(),
            format_version: CURRENT_FORMAT_VERSION,
            ..IndexState::default()
        };
        self.save_state(&fresh)?;
        Ok(fresh)
    }

    /// Invalidates (full rebuild) if `source_purge_count` has moved on
    /// from what's persisted.
    pub fn check_purge(&self, source_purge_count: u64) -> Result<IndexState> {
        let mut state = self.state()?;
        if state.last_purge_count == source_purge_count {
            return Ok(state);
        }
        self.invalidate()?;
        state = IndexState {
            index_type: self.index_type.clone(),
            map_version: self.map_version.clone(),
            format_version: CURRENT_FORMAT_VERSION,
            last_purge_count: source_purge_count,
            ..IndexState::default()
        };
        self.save_state(&state)?;
        Ok(state)
    }
}

#[cfg(test)]
#[path = "mapreduce_test.rs"]
mod mapreduce_test;
