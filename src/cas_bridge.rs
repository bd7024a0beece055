//! Module `cas_bridge` implements `CasRevisionStore`, a specialization
//! of `RevisionStore` (composition, not inheritance: it wraps and
//! delegates rather than overriding a base class) that interoperates
//! with a remote system tagging documents with an opaque monotonic
//! integer version tag (`CAS`).

use cbordata::{Cbor, Cborize, FromCbor, IntoCbor};

use crate::error::Error;
use crate::keystore::KeyStore;
use crate::revisionstore::{Revision, RevisionStore};
use crate::versionvector::{VersionVector, CAS_PEER_ID};
use crate::Result;

const SERVER_STATE_VER: u32 = 0x00560004;

#[derive(Clone, Debug, PartialEq, Eq, Cborize)]
struct ServerStateWire {
    base_version: VersionVector,
    base_cas: u64,
    latest_version: VersionVector,
    latest_cas: u64,
}

impl ServerStateWire {
    const ID: u32 = SERVER_STATE_VER;

    fn into_bytes(self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let cbor = self.into_cbor().map_err(|e| Error::BadVersionVector(format!("cbor encode: {}", e)))?;
        cbor.encode(&mut data).map_err(|e| Error::BadVersionVector(format!("cbor encode: {}", e)))?;
        Ok(data)
    }

    fn from_bytes(mut data: &[u8]) -> Result<ServerStateWire> {
        let (val, _) = Cbor::decode(&mut data).map_err(|e| Error::BadVersionVector(format!("cbor decode: {}", e)))?;
        ServerStateWire::from_cbor(val).map_err(|e| Error::BadVersionVector(format!("cbor decode: {}", e)))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ServerEntry {
    version: VersionVector,
    cas: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ServerState {
    base: ServerEntry,
    latest: ServerEntry,
}

impl From<ServerState> for ServerStateWire {
    fn from(s: ServerState) -> ServerStateWire {
        ServerStateWire {
            base_version: s.base.version,
            base_cas: s.base.cas,
            latest_version: s.latest.version,
            latest_cas: s.latest.cas,
        }
    }
}

impl From<ServerStateWire> for ServerState {
    fn from(w: ServerStateWire) -> ServerState {
        ServerState {
            base: ServerEntry { version: w.base_version, cas: w.base_cas },
            latest: ServerEntry { version: w.latest_version, cas: w.latest_cas },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerInsertOutcome {
    /// `cas` was not newer than what we already have; nothing written.
    Stale,
    /// Local had not diverged from the server: the new revision became
    /// current.
    WroteCurrent,
    /// Local had diverged: the new revision was stored as a visible
    /// conflict.
    WroteConflict,
}

pub struct CasRevisionStore {
    store: RevisionStore,
    cas: KeyStore,
}

impl CasRevisionStore {
    pub fn new(store: RevisionStore, cas: KeyStore) -> CasRevisionStore {
        CasRevisionStore { store, cas }
    }

    pub fn revisions(&self) -> &RevisionStore {
        &self.store
    }

    fn load_state(&self, doc_id: &str) -> Result<Option<ServerState>> {
        let rec = self.cas.get(doc_id.as_bytes())?;
        if !rec.exists {
            return Ok(None);
        }
        Ok(Some(ServerStateWire::from_bytes(rec.body.as_bytes())?.into()))
    }

    fn save_state(&self, doc_id: &str, state: ServerState) -> Result<()> {
        let wire: ServerStateWire = state.into();
        let bytes = wire.into_bytes()?;
        self.cas.set(doc_id.as_bytes(), b"", &bytes)?;
        Ok(())
    }

    pub fn insert_from_server(
        &self,
        doc_id: &str,
        cas: u64,
        body: Vec<u8>,
        doc_type: &str,
        has_attachments: bool,
    ) -> Result<ServerInsertOutcome> {
        let state = self.load_state(doc_id)?;
        if let Some(state) = &state {
            if cas <= state.latest.cas {
                return Ok(ServerInsertOutcome::Stale);
            }
        }

        let current = self.store.get(doc_id)?;
        let not_diverged = match (&current, &state) {
            (None, _) => true,
            (Some(cur), Some(state)) => cur.version == state.latest.version,
            (Some(_), None) => true,
        };

        let mut next_version = state.as_ref().map(|s| s.latest.version.clone()).unwrap_or_default();
        next_version.increment_gen(CAS_PEER_ID);

        let revision = Revision {
            doc_id: doc_id.to_string(),
            version: next_version.clone(),
            deleted: false,
            conflicted: !not_diverged,
            has_attachments,
            cas,
            doc_type: doc_type.to_string(),
            body,
            sequence: 0,
        };

        let outcome = if not_diverged {
            self.store.put_current(&revision)?;
            ServerInsertOutcome::WroteCurrent
        } else {
            self.store.put_non_current(&revision)?;
            if let Some(prev_latest) = &state {
                if prev_latest.latest.version != prev_latest.base.version {
                    let stale = Revision { version: prev_latest.latest.version.clone(), ..revision.clone() };
                    self.store.remove_non_current(&stale)?;
                }
            }
            if let Some(mut cur) = current {
                cur.conflicted = true;
                self.store.put_current(&cur)?;
            }
            ServerInsertOutcome::WroteConflict
        };

        let base = state.as_ref().map(|s| s.base.clone()).unwrap_or(ServerEntry { version: next_version.clone(), cas });
        let base = if not_diverged { ServerEntry { version: next_version.clone(), cas } } else { base };
        self.save_state(doc_id, ServerState { base, latest: ServerEntry { version: next_version, cas } })?;

        Ok(outcome)
    }

    /// After the local peer pushes a revision and the server accepts it
    /// with a new CAS: both `base` and `latest` become the pushed
    /// revision.
    pub fn assign_cas(&self, doc_id: &str, version: VersionVector, cas: u64) -> Result<()> {
        if let Some(prev) = self.load_state(doc_id)? {
            let stub = Revision {
                doc_id: doc_id.to_string(),
                version: prev.latest.version.clone(),
                deleted: false,
                conflicted: false,
                has_attachments: false,
                cas: prev.latest.cas,
                doc_type: String::new(),
                body: Vec::new(),
                sequence: 0,
            };
            self.store.remove_non_current(&stub)?;
            if prev.base.version != prev.latest.version {
                self.store.remove_non_current(&Revision { version: prev.base.version, ..stub })?;
            }
        }

        let entry = ServerEntry { version, cas };
        self.save_state(doc_id, ServerState { base: entry.clone(), latest: entry })?;
        Ok(())
    }

    /// Like `RevisionStore::resolve_conflict`, but preserves the
    /// current latest-server revision as the retained ancestor (by
    /// ordering it first — the general resolver keeps `revs[0]`) and
    /// advances `base` to `latest` afterward.
    pub fn resolve_conflict(&self, doc_id: &str, revs: &[Revision], body: Vec<u8>) -> Result<Revision> {
        let state = self.load_state(doc_id)?;
        let ordered: Vec<Revision> = match &state {
            Some(state) => {
                let mut ordered = Vec::with_capacity(revs.len());
                if let Some(pos) = revs.iter().position(|r| r.version == state.latest.version) {
                    ordered.push(revs[pos].clone());
                    ordered.extend(revs.iter().enumerate().filter(|(i, _)| *i != pos).map(|(_, r)| r.clone()));
                } else {
                    ordered.extend(revs.iter().cloned());
                }
                ordered
            }
            None => revs.to_vec(),
        };

        let resolved = self.store.resolve_conflict(doc_id, &ordered, body)?;

        if let Some(state) = state {
            self.save_state(doc_id, ServerState { base: state.latest.clone(), latest: state.latest })?;
        }
        Ok(resolved)
    }
}

#[cfg(test)]
#[path = "cas_bridge_test.rs"]
mod cas_bridge_test;
