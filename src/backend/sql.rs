//! Module `sql` implements the relational storage backend: one
//! `rusqlite` connection per `DataFile`, WAL journal mode, one table per
//! `KeyStore` plus a shared `kvmeta` table for sequence counters and
//! directory bookkeeping.
//!
//! Unlike [`super::logfile`], this backend never supports
//! `get_by_offset` (there is no stable byte offset to hand back — SQLite
//! owns the page layout) and compaction is simply `VACUUM`.

use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use super::{Capabilities, DataFileBackend, KeyOrSeq, KeyStoreBackend};
use crate::error::Error;
use crate::record::{ContentOptions, Record};
use crate::slice::Slice;
use crate::Result;

/// A `DataFileBackend` over a single SQLite file.
pub struct SqlBackend {
    path: String,
    conn: Arc<Mutex<Connection>>,
    txn_lock: Mutex<bool>,
    txn_cv: std::sync::Condvar,
}

fn table_name(keystore: &str) -> String {
    format!("kv_{}", sanitize(keystore))
}

/// SQLite table names can't contain arbitrary bytes; keystore names in
/// this crate are short ASCII identifiers in practice, but defensively
/// escape anything else to an underscore so a hostile name can't inject
/// SQL via the table name (which can't be parameterized).
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

impl SqlBackend {
    pub fn open(path: &str, create: bool) -> Result<SqlBackend> {
        let exists = std::path::Path::new(path).exists();
        if !exists && !create {
            return Err(Error::CantOpenFile(format!("{} does not exist", path)));
        }
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kvmeta (
                keystore TEXT PRIMARY KEY,
                sequences INTEGER NOT NULL,
                soft_deletes INTEGER NOT NULL,
                last_sequence INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        Ok(SqlBackend {
            path: path.to_string(),
            conn: Arc::new(Mutex::new(conn)),
            txn_lock: Mutex::new(false),
            txn_cv: std::sync::Condvar::new(),
        })
    }
}

impl DataFileBackend for SqlBackend {
    fn path(&self) -> &str {
        &self.path
    }

    fn open_keystore(&self, name: &str, caps: Capabilities) -> Result<Arc<dyn KeyStoreBackend>> {
        let table = table_name(name);
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    key BLOB PRIMARY KEY,
                    meta BLOB NOT NULL,
                    body BLOB NOT NULL,
                    sequence INTEGER NOT NULL,
                    deleted INTEGER NOT NULL DEFAULT 0
                )",
                table
            ),
            [],
        )?;
        conn.execute(
            &format!("CREATE INDEX IF NOT EXISTS {}_seq ON {} (sequence)", table, table),
            [],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO kvmeta (keystore, sequences, soft_deletes, last_sequence)
             VALUES (?1, ?2, ?3, 0)",
            params![name, caps.sequences as i64, caps.soft_deletes as i64],
        )?;
        let last_sequence: u64 = conn
            .query_row(
                "SELECT last_sequence FROM kvmeta WHERE keystore = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .unwrap_or(0) as u64;
        drop(conn);

        Ok(Arc::new(SqlKeyStore {
            name: name.to_string(),
            table,
            caps,
            conn: self.conn.clone(),
            last_sequence: std::sync::atomic::AtomicU64::new(last_sequence),
        }) as Arc<dyn KeyStoreBackend>)
    }

    fn all_keystore_names(&self) -> Vec<String> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT keystore FROM kvmeta").unwrap();
        stmt.query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    fn begin(&self) -> Result<()> {
        let mut guard = self.txn_lock.lock().unwrap();
        while *guard {
            guard = self.txn_cv.wait(guard).unwrap();
        }
        *guard = true;
        self.conn.lock().unwrap().execute("BEGIN IMMEDIATE", [])?;
        Ok(())
    }

    fn commit(&self, durable: bool) -> Result<()> {
        {
            let conn = self.conn.lock().unwrap();
            conn.execute("COMMIT", [])?;
            if durable {
                conn.pragma_update(None, "synchronous", "FULL")?;
            }
        }
        let mut guard = self.txn_lock.lock().unwrap();
        *guard = false;
        self.txn_cv.notify_one();
        Ok(())
    }

    fn rollback(&self) {
        let _ = self.conn.lock().unwrap().execute("ROLLBACK", []);
        let mut guard = self.txn_lock.lock().unwrap();
        *guard = false;
        self.txn_cv.notify_one();
    }

    fn compact(&self, observer: Option<&dyn Fn(bool)>) -> Result<()> {
        if let Some(cb) = observer {
            cb(true);
        }
        let conn = self.conn.lock().unwrap();
        let names: Vec<String> = {
            let mut stmt = conn.prepare("SELECT keystore FROM kvmeta")?;
            stmt.query_map([], |row| row.get::<_, String>(0))?
                .filter_map(|r| r.ok())
                .collect()
        };
        for name in &names {
            let table = table_name(name);
            conn.execute(&format!("DELETE FROM {} WHERE deleted = 1", table), [])?;
        }
        conn.execute("VACUUM", [])?;
        if let Some(cb) = observer {
            cb(false);
        }
        Ok(())
    }

    fn rekey(&self, algorithm: super::EncryptionAlgorithm, _new_key: [u8; 32]) -> Result<()> {
        let _ = algorithm;
        Err(Error::UnsupportedEncryption(
            "the sql backend does not support page-level encryption".into(),
        ))
    }

    fn purge_count(&self) -> u64 {
        0
    }

    fn sibling_paths(&self) -> Vec<String> {
        vec![
            self.path.clone(),
            format!("{}-wal", self.path),
            format!("{}-shm", self.path),
            format!("{}-journal", self.path),
        ]
    }
}

/// A single `KeyStore`'s view over one `kv_<name>` table.
pub struct SqlKeyStore {
    name: String,
    table: String,
    caps: Capabilities,
    conn: Arc<Mutex<Connection>>,
    last_sequence: std::sync::atomic::AtomicU64,
}

impl SqlKeyStore {
    fn row_to_record(key: Vec<u8>, meta: Vec<u8>, body: Vec<u8>, sequence: i64, deleted: i64, opts: ContentOptions) -> Record {
        let deleted = deleted != 0;
        if opts.meta_only {
            Record::found_meta_only(Slice::alloc_slice(&key), Slice::alloc_slice(&meta), sequence as u64, deleted, body.len() as u64)
        } else {
            Record::found(Slice::alloc_slice(&key), Slice::alloc_slice(&meta), Slice::alloc_slice(&body), sequence as u64, deleted)
        }
    }
}

impl KeyStoreBackend for SqlKeyStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn last_sequence(&self) -> u64 {
        self.last_sequence.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn get(&self, key: &[u8], opts: ContentOptions) -> Result<Record> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!("SELECT key, meta, body, sequence, deleted FROM {} WHERE key = ?1", self.table),
                params![key],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;
        match row {
            Some((k, m, b, s, d)) => Ok(Self::row_to_record(k, m, b, s, d, opts)),
            None => Ok(Record::not_found(key)),
        }
    }

    fn get_by_sequence(&self, seq: u64, opts: ContentOptions) -> Result<Record> {
        if !self.caps.sequences {
            return Err(Error::NoSequences);
        }
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!("SELECT key, meta, body, sequence, deleted FROM {} WHERE sequence = ?1", self.table),
                params![seq as i64],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                },
            )
            .optional()?;
        match row {
            Some((k, m, b, s, d)) => Ok(Self::row_to_record(k, m, b, s, d, opts)),
            None => Err(Error::NotFound),
        }
    }

    fn get_by_offset(&self, _offset: u64, _sequence: u64) -> Result<Record> {
        Err(Error::InvalidParameter(
            "getByOffset is not supported by the sql backend".into(),
        ))
    }

    fn set(&self, key: &[u8], meta: &[u8], body: &[u8]) -> Result<u64> {
        let seq = if self.caps.sequences {
            self.last_sequence.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1
        } else {
            0
        };
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (key, meta, body, sequence, deleted) VALUES (?1, ?2, ?3, ?4, 0)
                 ON CONFLICT(key) DO UPDATE SET meta = excluded.meta, body = excluded.body,
                 sequence = excluded.sequence, deleted = 0",
                self.table
            ),
            params![key, meta, body, seq as i64],
        )?;
        conn.execute(
            "UPDATE kvmeta SET last_sequence = ?1 WHERE keystore = ?2",
            params![seq as i64, self.name],
        )?;
        Ok(seq)
    }

    fn del(&self, target: &KeyOrSeq) -> Result<bool> {
        let key = match target {
            KeyOrSeq::Key(k) => k.clone(),
            KeyOrSeq::Seq(seq) => {
                let rec = self.get_by_sequence(*seq, ContentOptions::default())?;
                rec.key.as_bytes().to_vec()
            }
        };
        let conn = self.conn.lock().unwrap();
        if self.caps.soft_deletes {
            let seq = if self.caps.sequences {
                self.last_sequence.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1
            } else {
                0
            };
            let changed = conn.execute(
                &format!(
                    "UPDATE {} SET meta = x'', body = x'', sequence = ?1, deleted = 1 WHERE key = ?2",
                    self.table
                ),
                params![seq as i64, key],
            )?;
            Ok(changed > 0)
        } else {
            let changed = conn.execute(&format!("DELETE FROM {} WHERE key = ?1", self.table), params![key])?;
            Ok(changed > 0)
        }
    }

    fn erase(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(&format!("DELETE FROM {}", self.table), [])?;
        self.last_sequence.store(0, std::sync::atomic::Ordering::SeqCst);
        conn.execute(
            "UPDATE kvmeta SET last_sequence = 0 WHERE keystore = ?1",
            params![self.name],
        )?;
        Ok(())
    }

    fn scan_range(&self, min: Option<&[u8]>, max: Option<&[u8]>) -> Result<Vec<Record>> {
        let conn = self.conn.lock().unwrap();
        let sql = match (min, max) {
            (Some(_), Some(_)) => format!(
                "SELECT key, meta, body, sequence, deleted FROM {} WHERE key >= ?1 AND key <= ?2 ORDER BY key ASC",
                self.table
            ),
            (Some(_), None) => format!(
                "SELECT key, meta, body, sequence, deleted FROM {} WHERE key >= ?1 ORDER BY key ASC",
                self.table
            ),
            (None, Some(_)) => format!(
                "SELECT key, meta, body, sequence, deleted FROM {} WHERE key <= ?1 ORDER BY key ASC",
                self.table
            ),
            (None, None) => format!("SELECT key, meta, body, sequence, deleted FROM {} ORDER BY key ASC", self.table),
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = match (min, max) {
            (Some(lo), Some(hi)) => stmt.query_map(params![lo, hi], Self::map_row)?,
            (Some(lo), None) => stmt.query_map(params![lo], Self::map_row)?,
            (None, Some(hi)) => stmt.query_map(params![hi], Self::map_row)?,
            (None, None) => stmt.query_map([], Self::map_row)?,
        };
        let mut out = Vec::new();
        for row in rows {
            let (k, m, b, s, d) = row?;
            out.push(Self::row_to_record(k, m, b, s, d, ContentOptions::default()));
        }
        Ok(out)
    }

    fn scan_seq_range(&self, min_seq: u64, max_seq: u64) -> Result<Vec<Record>> {
        if !self.caps.sequences {
            return Err(Error::NoSequences);
        }
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT key, meta, body, sequence, deleted FROM {} WHERE sequence >= ?1 AND sequence <= ?2 ORDER BY sequence ASC",
            self.table
        ))?;
        let rows = stmt.query_map(params![min_seq as i64, max_seq as i64], Self::map_row)?;
        let mut out = Vec::new();
        for row in rows {
            let (k, m, b, s, d) = row?;
            out.push(Self::row_to_record(k, m, b, s, d, ContentOptions::default()));
        }
        Ok(out)
    }

    fn scan_ids(&self, ids: &[Vec<u8>]) -> Result<Vec<Record>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(self.get(id, ContentOptions::default())?);
        }
        Ok(out)
    }
}

impl SqlKeyStore {
    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<(Vec<u8>, Vec<u8>, Vec<u8>, i64, i64)> {
        Ok((
            row.get::<_, Vec<u8>>(0)?,
            row.get::<_, Vec<u8>>(1)?,
            row.get::<_, Vec<u8>>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, i64>(4)?,
        ))
    }
}

#[cfg(test)]
#[path = "sql_test.rs"]
mod sql_test;
