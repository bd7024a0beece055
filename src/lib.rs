//! This crate implements an embedded, sync-capable document storage
//! core: a log-structured key/value store with sequence numbers and
//! transactions, revision trees and version vectors for multi-writer
//! history, and a collatable-encoded secondary index engine (plain
//! map/reduce, full-text, and geospatial).
//!
//! Every fallible operation returns `crate::Result<T>`; `crate::Error`
//! is the one error taxonomy shared across the whole crate. Logging
//! goes through a single process-wide callback installed with
//! `log::set_log_callback`, never directly to stdout/stderr.

pub mod backend;
pub mod cas_bridge;
pub mod collatable;
pub mod crypto;
pub mod datafile;
pub mod enumerator;
pub mod error;
pub mod geohash;
pub mod index;
pub mod keystore;
pub mod log;
pub mod record;
pub mod revid;
pub mod revisionstore;
pub mod revtree;
pub mod slice;
pub mod tokenizer;
pub mod varint;
pub mod versionvector;

pub use crate::error::Error;

/// Alias used throughout the crate for any fallible operation.
pub type Result<T> = std::result::Result<T, Error>;

pub use crate::cas_bridge::{CasRevisionStore, ServerInsertOutcome};
pub use crate::collatable::{encode_bytes, CollatableBuilder, CollatableReader, Tag};
pub use crate::datafile::{BackendKind, DataFile, Transaction};
pub use crate::enumerator::DocEnumerator;
pub use crate::keystore::KeyStore;
pub use crate::record::{ContentOptions, Record};
pub use crate::revid::RevID;
pub use crate::revisionstore::RevisionStore;
pub use crate::revtree::{InsertOutcome, RevTree, Revision as RevTreeRevision};
pub use crate::slice::Slice;
pub use crate::versionvector::{Comparison, Version, VersionVector};

pub use crate::backend::{Capabilities, DataFileOptions, EncryptionAlgorithm, RangeOptions};
