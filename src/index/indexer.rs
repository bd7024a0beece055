//! `Indexer`: coordinates one or more `MapReduceIndex`es over a common
//! source `KeyStore`. Does not manage `Transaction`s itself — like
//! every other write path in this crate (`RevisionStore`,
//! `CasRevisionStore`), the caller opens and commits/aborts the
//! `Transaction`(s) around the call.

use crate::backend::RangeOptions;
use crate::keystore::KeyStore;
use crate::record::Record;
use crate::Result;

use super::mapreduce::{IndexState, MapReduceIndex};
use super::writer::IndexWriter;

pub struct Indexer<'a> {
    source: &'a KeyStore,
    indexes: Vec<&'a MapReduceIndex>,
}

impl<'a> Indexer<'a> {
    pub fn new(source: &'a KeyStore, indexes: Vec<&'a MapReduceIndex>) -> Indexer<'a> {
        Indexer { source, indexes }
    }

    /// `None` if every index is already current with the source.
    pub fn starting_sequence(&self) -> Result<Option<u64>> {
        if self.indexes.is_empty() {
            return Ok(None);
        }
        let mut min_start = u64::MAX;
        for idx in &self.indexes {
            let state = idx.state()?;
            min_start = min_start.min(state.last_seq_indexed + 1);
        }
        let cap = self.source.last_sequence() + 1;
        let start = min_start.min(cap);
        if start > self.source.last_sequence() {
            Ok(None)
        } else {
            Ok(Some(start))
        }
    }

    /// Indexes every source record with sequence in
    /// `[starting_sequence(), source.last_sequence()]`, including
    /// tombstones, then persists each index's updated state.
    pub fn run_once(&self) -> Result<()> {
        let start = match self.starting_sequence()? {
            Some(s) => s,
            None => return Ok(()),
        };
        let end = self.source.last_sequence();

        let opts = RangeOptions { inclusive_start: true, inclusive_end: true, include_deleted: true, content: Default::default() };
        let mut e = self.source.enumerate_seq_range(start, end, &opts, false, 0, None)?;

        struct PerIndex {
            writer: IndexWriter,
            state: IndexState,
        }
        let mut per_index: Vec<PerIndex> = Vec::with_capacity(self.indexes.len());
        for idx in &self.indexes {
            per_index.push(PerIndex { writer: IndexWriter::new(idx.index()), state: idx.state()? });
        }

        while e.next() {
            let rec: Record = e.doc().clone();
            let doc_id = String::from_utf8_lossy(rec.key.as_bytes()).to_string();

            for (idx, pi) in self.indexes.iter().zip(per_index.iter_mut()) {
                if rec.sequence <= pi.state.last_seq_indexed {
                    continue;
                }
                let mut keys = Vec::new();
                let mut values = Vec::new();
                if !rec.deleted && idx.matches(&rec) {
                    idx.invoke_map(&rec, &mut |k, v| {
                        keys.push(k);
                        values.push(v);
                    });
                }
                let mut row_count = pi.state.row_count;
                let changed = pi.writer.update(&doc_id, rec.sequence, &keys, &values, &mut row_count)?;
                pi.state.row_count = row_count;
                pi.state.last_seq_indexed = rec.sequence;
                if changed {
                    pi.state.last_seq_changed_at = rec.sequence;
                }
            }
        }

        for (idx, pi) in self.indexes.iter().zip(per_index.into_iter()) {
            idx.save_state(&pi.state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "indexer_test.rs"]
mod indexer_test;
