//! Module `backend` defines the capability-based trait that every
//! storage backend must satisfy, per the design note in spec.md §9:
//! backend polymorphism (`DataFile`, `KeyStore`) is modeled as a trait
//! plus a small constructor registry, not an inheritance hierarchy.
//!
//! Two backends are shipped: [`logfile`], an append-only log-structured
//! store with native multi-KeyStore support, `getByOffset`, and
//! background compaction; and [`sql`], a `rusqlite`-backed relational
//! store using one table per `KeyStore`. Both satisfy [`KeyStoreBackend`]
//! and [`DataFileBackend`] identically from the caller's point of view.

pub mod logfile;
pub mod sql;

use crate::record::{ContentOptions, Record};
use crate::Result;

/// Capabilities a `KeyStore` may declare at creation; a subset of what
/// the owning `DataFile`'s backend supports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub sequences: bool,
    pub soft_deletes: bool,
    pub get_by_offset: bool,
}

/// Options controlling `DataFile::open`.
#[derive(Clone, Debug)]
pub struct DataFileOptions {
    pub create: bool,
    pub writeable: bool,
    pub key_stores: Capabilities,
    pub encryption_algorithm: Option<EncryptionAlgorithm>,
    pub encryption_key: Option<[u8; 32]>,
}

impl Default for DataFileOptions {
    fn default() -> DataFileOptions {
        DataFileOptions {
            create: true,
            writeable: true,
            key_stores: Capabilities {
                sequences: true,
                soft_deletes: true,
                get_by_offset: false,
            },
            encryption_algorithm: None,
            encryption_key: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncryptionAlgorithm {
    Aes256Essiv,
}

/// Half-open/closed range plus iteration controls for
/// `KeyStoreBackend::iter_*`. Mirrors the `DocEnumerator` options in
/// spec.md §4.1 one-to-one; `enumerator.rs` is the layer that actually
/// applies `skip`/`limit`/`descending` so every backend need only
/// produce ascending, fully-inclusive iteration.
#[derive(Clone, Debug, Default)]
pub struct RangeOptions {
    pub inclusive_start: bool,
    pub inclusive_end: bool,
    pub include_deleted: bool,
    pub content: ContentOptions,
}

/// What `KeyStore::del` addresses.
#[derive(Clone, Debug)]
pub enum KeyOrSeq {
    Key(Vec<u8>),
    Seq(u64),
}

/// A single `KeyStore`'s worth of backend operations. Reads never fail
/// with `NotFound` on a missing key (see `record.rs`); writes assume the
/// caller already holds the owning `DataFile`'s transaction lock.
pub trait KeyStoreBackend: Send + Sync {
    fn name(&self) -> &str;
    fn capabilities(&self) -> Capabilities;
    fn last_sequence(&self) -> u64;

    fn get(&self, key: &[u8], opts: ContentOptions) -> Result<Record>;
    fn get_by_sequence(&self, seq: u64, opts: ContentOptions) -> Result<Record>;
    fn get_by_offset(&self, offset: u64, sequence: u64) -> Result<Record>;

    /// Write `key`, returning the newly assigned sequence (0 if the
    /// store has no `sequences` capability).
    fn set(&self, key: &[u8], meta: &[u8], body: &[u8]) -> Result<u64>;

    /// Delete by key or by sequence. Returns whether a record was
    /// removed. Soft-deletes become tombstones with a fresh sequence;
    /// hard deletes remove the record immediately.
    fn del(&self, target: &KeyOrSeq) -> Result<bool>;

    fn erase(&self) -> Result<()>;

    /// Ascending, inclusive-of-both-ends scan over `[min, max]` (`None`
    /// means unbounded on that side). Includes tombstones; the caller
    /// filters per `RangeOptions::include_deleted`.
    fn scan_range(&self, min: Option<&[u8]>, max: Option<&[u8]>) -> Result<Vec<Record>>;

    /// Ascending scan over `[min_seq, max_seq]` inclusive.
    fn scan_seq_range(&self, min_seq: u64, max_seq: u64) -> Result<Vec<Record>>;

    fn scan_ids(&self, ids: &[Vec<u8>]) -> Result<Vec<Record>>;
}

/// File-level backend operations: creating/enumerating `KeyStore`s,
/// transaction begin/commit/rollback, compaction, rekeying.
pub trait DataFileBackend: Send + Sync {
    fn path(&self) -> &str;

    fn open_keystore(&self, name: &str, caps: Capabilities) -> Result<std::sync::Arc<dyn KeyStoreBackend>>;
    fn all_keystore_names(&self) -> Vec<String>;

    fn begin(&self) -> Result<()>;
    fn commit(&self, durable: bool) -> Result<()>;
    fn rollback(&self);

    /// Rewrite storage, dropping soft-deleted records; increments
    /// `purge_count()`. `observer(true)` fires before, `observer(false)`
    /// after.
    fn compact(&self, observer: Option<&dyn Fn(bool)>) -> Result<()>;

    fn rekey(&self, algorithm: EncryptionAlgorithm, new_key: [u8; 32]) -> Result<()>;

    fn purge_count(&self) -> u64;

    /// Every sibling file this backend may have created (the base file
    /// plus e.g. `.0`, `.wal`, `.shm`, `.meta`); used by
    /// `DataFile::delete_data_file`.
    fn sibling_paths(&self) -> Vec<String>;
}
