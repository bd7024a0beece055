//! `IndexEnumerator`: ordered iteration over one or more `KeyRange`s of
//! an `Index`'s row store, with an `approve` hook for subclass-style
//! row filtering (full-text/geo enumerators reject candidates here).

use super::{Index, IndexUserGuard};
use crate::backend::RangeOptions;
use crate::record::Record;
use crate::Result;

/// One inclusive-start, optionally-inclusive-end byte range.
#[derive(Clone, Debug)]
pub struct KeyRange {
    pub min: Vec<u8>,
    pub max: Vec<u8>,
    pub inclusive_end: bool,
}

impl KeyRange {
    pub fn new(min: Vec<u8>, max: Vec<u8>, inclusive_end: bool) -> KeyRange {
        KeyRange { min, max, inclusive_end }
    }
}

/// Filter applied to each candidate row's raw key before skip/limit.
pub trait RowApprover {
    fn approve(&self, key: &[u8]) -> bool;
}

impl<F: Fn(&[u8]) -> bool> RowApprover for F {
    fn approve(&self, key: &[u8]) -> bool {
        self(key)
    }
}

pub struct IndexEnumerator {
    rows: Vec<Record>,
    position: Option<usize>,
    _user: IndexUserGuard,
}

impl IndexEnumerator {
    /// Visits `ranges` in order; each is collected in full before moving
    /// to the next (equivalent to recreating the underlying enumerator
    /// at each range boundary). `approve` runs before `skip`/`limit`.
    pub fn new(
        index: &Index,
        ranges: &[KeyRange],
        approve: Option<&dyn RowApprover>,
        opts: &RangeOptions,
        descending: bool,
        skip: usize,
        limit: Option<usize>,
    ) -> Result<IndexEnumerator> {
        let guard = index.acquire_user();
        let store = index.store();

        let mut rows = Vec::new();
        for range in ranges {
            let range_opts = RangeOptions {
                inclusive_start: true,
                inclusive_end: range.inclusive_end,
                include_deleted: opts.include_deleted,
                content: opts.content,
            };
            let mut e = store.enumerate_range(Some(&range.min), Some(&range.max), &range_opts, false, 0, None)?;
            while e.next() {
                rows.push(e.doc().clone());
            }
        }

        if let Some(approve) = approve {
            rows.retain(|r| approve.approve(r.key.as_bytes()));
        }

        if descending {
            rows.reverse();
        }
        let rows: Vec<Record> = rows.into_iter().skip(skip).collect();
        let rows = match limit {
            Some(n) => rows.into_iter().take(n).collect(),
            None => rows,
        };

        Ok(IndexEnumerator { rows, position: None, _user: guard })
    }

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

    pub fn doc(&self) -> &Record {
        let pos = self.position.expect("IndexEnumerator::doc called before next()");
        &self.rows[pos]
    }

    pub fn remaining(&self) -> usize {
        match self.position {
            None => self.rows.len(),
            Some(p) => self.rows.len().saturating_sub(p + 1),
        }
    }
}

#[cfg(test)]
#[path = "enumerator_test.rs"]
mod enumerator_test;
