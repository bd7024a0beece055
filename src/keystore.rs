//! Module `keystore` implements `KeyStore`, the public handle on one
//! named table inside a `DataFile`, and `HistoricBodyStore`, the narrow
//! trait the rev-tree layer uses to reload a non-current revision's body
//! on demand without depending on the whole backend trait.

use std::sync::Arc;

use crate::backend::{Capabilities, KeyOrSeq, KeyStoreBackend, RangeOptions};
use crate::datafile::DataFile;
use crate::enumerator::DocEnumerator;
use crate::error::Error;
use crate::record::{ContentOptions, Record};
use crate::Result;

/// One named key/value table within a `DataFile`.
#[derive(Clone)]
pub struct KeyStore {
    name: String,
    backend: Arc<dyn KeyStoreBackend>,
    datafile: DataFile,
}

impl KeyStore {
    pub(crate) fn new(name: String, backend: Arc<dyn KeyStoreBackend>, datafile: DataFile) -> KeyStore {
        KeyStore { name, backend, datafile }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.backend.capabilities()
    }

    pub fn last_sequence(&self) -> u64 {
        self.backend.last_sequence()
    }

    pub fn data_file(&self) -> &DataFile {
        &self.datafile
    }

    pub fn get(&self, key: &[u8]) -> Result<Record> {
        self.backend.get(key, ContentOptions::default())
    }

    pub fn get_with_options(&self, key: &[u8], opts: ContentOptions) -> Result<Record> {
        self.backend.get(key, opts)
    }

    pub fn get_by_sequence(&self, sequence: u64) -> Result<Record> {
        self.backend.get_by_sequence(sequence, ContentOptions::default())
    }

    pub fn get_by_offset(&self, offset: u64, sequence: u64) -> Result<Record> {
        self.backend.get_by_offset(offset, sequence)
    }

    /// Write `key`, returning the assigned sequence (0 if this store has
    /// no `sequences` capability). Must be called with an open
    /// `Transaction` against the owning `DataFile`.
    pub fn set(&self, key: &[u8], meta: &[u8], body: &[u8]) -> Result<u64> {
        self.backend.set(key, meta, body)
    }

    pub fn del(&self, key: &[u8]) -> Result<bool> {
        self.backend.del(&KeyOrSeq::Key(key.to_vec()))
    }

    pub fn del_by_sequence(&self, sequence: u64) -> Result<bool> {
        self.backend.del(&KeyOrSeq::Seq(sequence))
    }

    pub fn erase(&self) -> Result<()> {
        self.backend.erase()
    }

    pub(crate) fn scan_range(&self, min: Option<&[u8]>, max: Option<&[u8]>) -> Result<Vec<Record>> {
        self.backend.scan_range(min, max)
    }

    pub(crate) fn scan_seq_range(&self, min_seq: u64, max_seq: u64) -> Result<Vec<Record>> {
        self.backend.scan_seq_range(min_seq, max_seq)
    }

    pub(crate) fn scan_ids(&self, ids: &[Vec<u8>]) -> Result<Vec<Record>> {
        self.backend.scan_ids(ids)
    }

    /// Enumerate `[min, max]` per `opts`'s inclusivity flags.
    pub fn enumerate_range(&self, min: Option<&[u8]>, max: Option<&[u8]>, opts: &RangeOptions, descending: bool, skip: usize, limit: Option<usize>) -> Result<DocEnumerator> {
        let e = DocEnumerator::from_key_range(self, min, max, opts)?;
        Ok(e.apply_window(descending, skip, limit))
    }

    /// Enumerate `[min_seq, max_seq]`; requires the `sequences` capability.
    pub fn enumerate_seq_range(&self, min_seq: u64, max_seq: u64, opts: &RangeOptions, descending: bool, skip: usize, limit: Option<usize>) -> Result<DocEnumerator> {
        if !self.capabilities().sequences {
            return Err(Error::NoSequences);
        }
        let e = DocEnumerator::from_seq_range(self, min_seq, max_seq, opts)?;
        Ok(e.apply_window(descending, skip, limit))
    }

    /// Enumerate an explicit id list, preserving the order of `ids`.
    pub fn enumerate_ids(&self, ids: &[Vec<u8>], opts: &RangeOptions) -> Result<DocEnumerator> {
        DocEnumerator::from_ids(self, ids, opts)
    }
}

/// The narrow surface the rev-tree layer needs to reload a historical
/// (non-leaf, non-current) revision's body. `KeyStore` implements this
/// directly; callers that only need history reload shouldn't have to
/// depend on the full `KeyStore` API.
pub trait HistoricBodyStore {
    fn load_body(&self, offset: u64, sequence: u64) -> Result<Vec<u8>>;
}

impl HistoricBodyStore for KeyStore {
    fn load_body(&self, offset: u64, sequence: u64) -> Result<Vec<u8>> {
        if !self.capabilities().get_by_offset {
            return Err(Error::InvalidParameter(
                "this keystore was not opened with getByOffset support".into(),
            ));
        }
        let rec = self.get_by_offset(offset, sequence)?;
        if !rec.exists {
            return Err(Error::NotFound);
        }
        Ok(rec.body.as_bytes().to_vec())
    }
}

#[cfg(test)]
#[path = "keystore_test.rs"]
mod keystore_test;
