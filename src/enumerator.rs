//! Module `enumerator` implements `DocEnumerator`, the one iteration
//! type every range/sequence/id-list read in the crate funnels through.
//! Backends only need to produce ascending, fully-inclusive scans (see
//! `backend::KeyStoreBackend::scan_range`); this module is where
//! `skip`/`limit`/`descending`/`includeDeleted`/content options get
//! applied uniformly on top.

use crate::backend::RangeOptions;
use crate::keystore::KeyStore;
use crate::record::Record;
use crate::Result;

/// What a `DocEnumerator` was constructed over; kept only for
/// diagnostics (`describe`), since all three shapes funnel into the same
/// in-memory row buffer once `scan_range`/`scan_seq_range`/`scan_ids`
/// has run.
enum Source {
    KeyRange,
    SeqRange,
    Ids,
}

/// Ordered iteration over a fixed row set, already filtered and bounded
/// per `RangeOptions`. `next()` mutates internal position; calling it
/// again after exhaustion is a no-op that returns `false`.
pub struct DocEnumerator {
    rows: Vec<Record>,
    position: Option<usize>,
    source: Source,
}

impl DocEnumerator {
    pub(crate) fn from_key_range(store: &KeyStore, min: Option<&[u8]>, max: Option<&[u8]>, opts: &RangeOptions) -> Result<DocEnumerator> {
        let mut rows = store.scan_range(min, max)?;
        if !opts.inclusive_start {
            if let Some(min) = min {
                rows.retain(|r| r.key.as_bytes() != min);
            }
        }
        if !opts.inclusive_end {
            if let Some(max) = max {
                rows.retain(|r| r.key.as_bytes() != max);
            }
        }
        Ok(DocEnumerator::finish(rows, opts, Source::KeyRange))
    }

    pub(crate) fn from_seq_range(store: &KeyStore, min_seq: u64, max_seq: u64, opts: &RangeOptions) -> Result<DocEnumerator> {
        let rows = store.scan_seq_range(min_seq, max_seq)?;
        Ok(DocEnumerator::finish(rows, opts, Source::SeqRange))
    }

    pub(crate) fn from_ids(store: &KeyStore, ids: &[Vec<u8>], opts: &RangeOptions) -> Result<DocEnumerator> {
        let rows = store.scan_ids(ids)?;
        Ok(DocEnumerator::finish(rows, opts, Source::Ids))
    }

    /// Build directly from an already-produced row set; used by the
    /// index-layer enumerators, which assemble rows from multiple
    /// `KeyRange`s themselves.
    pub(crate) fn from_rows(rows: Vec<Record>, opts: &RangeOptions) -> DocEnumerator {
        DocEnumerator::finish(rows, opts, Source::KeyRange)
    }

    fn finish(mut rows: Vec<Record>, opts: &RangeOptions, source: Source) -> DocEnumerator {
        if !opts.include_deleted {
            rows.retain(|r| !r.deleted);
        }
        if opts.content.meta_only {
            for r in rows.iter_mut() {
                if r.exists {
                    r.body_size = r.body.len() as u64;
                    r.body = crate::slice::Slice::empty();
                }
            }
        }
        DocEnumerator {
            rows,
            position: None,
            source,
        }
    }

    /// Apply `skip`/`limit`/`descending` (done separately from `finish`
    /// so index-layer enumerators can filter rows with `approve` first).
    pub(crate) fn apply_window(mut self, descending: bool, skip: usize, limit: Option<usize>) -> DocEnumerator {
        if descending {
            self.rows.reverse();
        }
        let skipped: Vec<Record> = self.rows.into_iter().skip(skip).collect();
        self.rows = match limit {
            Some(n) => skipped.into_iter().take(n).collect(),
            None => skipped,
        };
        self
    }

    /// Advance to the next row. Returns `false` once exhausted; further
    /// calls remain `false` and never panic.
    pub fn next(&mut self) -> bool {
        let next_pos = match self.position {
            None => 0,
            Some(p) => p + 1,
        };
        if next_pos >= self.rows.len() {
            self.position = Some(self.rows.len());
            return false;
        }
        self.position = Some(next_pos);
        true
    }

    /// The row at the current position. Panics if `next()` has not been
    /// called or returned `false`, the same "programming error" contract
    /// the rest of the crate uses for cursor misuse.
    pub fn doc(&self) -> &Record {
        let pos = self.position.expect("DocEnumerator::doc called before next()");
        &self.rows[pos]
    }

    pub fn remaining(&self) -> usize {
        match self.position {
            None => self.rows.len(),
            Some(p) => self.rows.len().saturating_sub(p + 1),
        }
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self.source {
            Source::KeyRange => "key-range",
            Source::SeqRange => "seq-range",
            Source::Ids => "ids",
        }
    }

    pub(crate) fn into_rows(self) -> Vec<Record> {
        self.rows
    }
}

#[cfg(test)]
#[path = "enumerator_test.rs"]
mod enumerator_test;
