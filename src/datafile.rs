//! Module `datafile` implements `DataFile`, the crate's top-level handle
//! on one on-disk file (or SQLite database) and the `Transaction` type
//! that serializes writers against it.
//!
//! Per spec, at most one `Transaction` may be open against a given file
//! path at a time, crate-wide — not just per-handle. We get that for
//! free by routing every `DataFile::open` for the same canonical path to
//! the same backend instance: a process-wide registry (the same
//! `path -> state` pattern `crypto::KeyRegistry` uses) hands back the
//! existing `Arc<DataFileInner>` if one is still alive, so two callers
//! opening the same path end up sharing the one `begin`/`commit` mutex
//! inside the backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use lazy_static::lazy_static;

use crate::backend::{logfile::LogFileBackend, sql::SqlBackend, Capabilities, DataFileBackend, DataFileOptions, EncryptionAlgorithm};
use crate::error::Error;
use crate::keystore::KeyStore;
use crate::log::{log_info, log_warn};
use crate::Result;

/// Which concrete backend a `DataFile::open` call should use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Append-only log-structured store: `getByOffset`, page encryption.
    LogFile,
    /// `rusqlite`-backed relational store.
    Sql,
}

struct DataFileInner {
    backend: Box<dyn DataFileBackend>,
    options: DataFileOptions,
    kind: BackendKind,
}

lazy_static! {
    static ref REGISTRY: Mutex<HashMap<String, Weak<DataFileInner>>> = Mutex::new(HashMap::new());
}

/// A handle on one open database file. Cheap to clone: internally an
/// `Arc`, shared with every other handle on the same path.
#[derive(Clone)]
pub struct DataFile {
    path: String,
    inner: Arc<DataFileInner>,
}

impl DataFile {
    pub fn open(path: &str, kind: BackendKind, options: DataFileOptions) -> Result<DataFile> {
        let mut registry = REGISTRY.lock().unwrap();
        if let Some(weak) = registry.get(path) {
            if let Some(inner) = weak.upgrade() {
                log_info!("datafile", "reusing open handle for {}", path);
                return Ok(DataFile {
                    path: path.to_string(),
                    inner,
                });
            }
        }

        let backend: Box<dyn DataFileBackend> = match kind {
            BackendKind::LogFile => Box::new(LogFileBackend::open(path, options.create, options.encryption_key)?),
            BackendKind::Sql => {
                if options.encryption_key.is_some() {
                    return Err(Error::UnsupportedEncryption(
                        "the sql backend does not support encryption_key".into(),
                    ));
                }
                Box::new(SqlBackend::open(path, options.create)?)
            }
        };

        let inner = Arc::new(DataFileInner {
            backend,
            options,
            kind,
        });
        registry.insert(path.to_string(), Arc::downgrade(&inner));
        Ok(DataFile {
            path: path.to_string(),
            inner,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> BackendKind {
        self.inner.kind
    }

    pub fn open_key_store(&self, name: &str, caps: Capabilities) -> Result<KeyStore> {
        if !self.inner.options.writeable && caps.sequences {
            log_warn!("datafile", "opening sequenced keystore {} on a read-only file", name);
        }
        let backend = self.inner.backend.open_keystore(name, caps)?;
        Ok(KeyStore::new(name.to_string(), backend, self.clone()))
    }

    pub fn all_key_store_names(&self) -> Vec<String> {
        self.inner.backend.all_keystore_names()
    }

    pub fn begin(&self) -> Result<Transaction<'_>> {
        if !self.inner.options.writeable {
            return Err(Error::NotWriteable);
        }
        self.inner.backend.begin()?;
        Ok(Transaction {
            datafile: self,
            state: TransactionState::NoOp,
        })
    }

    pub fn compact(&self) -> Result<()> {
        self.inner.backend.compact(None)
    }

    pub fn compact_with_observer(&self, observer: &dyn Fn(bool)) -> Result<()> {
        self.inner.backend.compact(Some(observer))
    }

    pub fn rekey(&self, algorithm: EncryptionAlgorithm, new_key: [u8; 32]) -> Result<()> {
        self.inner.backend.rekey(algorithm, new_key)
    }

    pub fn purge_count(&self) -> u64 {
        self.inner.backend.purge_count()
    }

    /// Delete a data file and every sibling it may have created. The
    /// file must not currently be open in this process.
    pub fn delete_data_file(path: &str, kind: BackendKind) -> Result<()> {
        {
            let registry = REGISTRY.lock().unwrap();
            if let Some(weak) = registry.get(path) {
                if weak.upgrade().is_some() {
                    return Err(Error::Busy);
                }
            }
        }
        let siblings = match kind {
            BackendKind::LogFile => {
                if std::path::Path::new(path).exists() {
                    let backend = LogFileBackend::open(path, false, None)?;
                    backend.sibling_paths()
                } else {
                    vec![path.to_string()]
                }
            }
            BackendKind::Sql => {
                if std::path::Path::new(path).exists() {
                    let backend = SqlBackend::open(path, false)?;
                    backend.sibling_paths()
                } else {
                    vec![path.to_string()]
                }
            }
        };
        for sibling in siblings {
            match std::fs::remove_file(&sibling) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        REGISTRY.lock().unwrap().remove(path);
        Ok(())
    }
}

/// Transaction state at drop time, mirroring the spec's explicit state
/// enum rather than relying on a bare bool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TransactionState {
    NoOp,
    Commit,
    CommitWithDurableFlush,
    Abort,
}

/// An open write transaction against one `DataFile`. Only one may be
/// open system-wide for a given path at a time; `DataFile::begin` blocks
/// until any prior transaction commits or aborts.
pub struct Transaction<'a> {
    datafile: &'a DataFile,
    state: TransactionState,
}

impl<'a> Transaction<'a> {
    pub fn commit(mut self) -> Result<()> {
        self.datafile.inner.backend.commit(false)?;
        self.state = TransactionState::Commit;
        Ok(())
    }

    /// Commit, and block until the write is durable on disk.
    pub fn commit_durable(mut self) -> Result<()> {
        self.datafile.inner.backend.commit(true)?;
        self.state = TransactionState::CommitWithDurableFlush;
        Ok(())
    }

    pub fn abort(mut self) {
        self.datafile.inner.backend.rollback();
        self.state = TransactionState::Abort;
    }
}

impl<'a> Drop for Transaction<'a> {
    fn drop(&mut self) {
        if self.state == TransactionState::NoOp {
            self.datafile.inner.backend.rollback();
        }
    }
}

#[cfg(test)]
#[path = "datafile_test.rs"]
mod datafile_test;
