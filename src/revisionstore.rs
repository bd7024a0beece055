//! Module `revisionstore` implements `RevisionStore`, the version-vector
//! analogue of `RevTree`: a document's current revision lives at key
//! `docID` in one `KeyStore`, every non-current (conflicting or
//! superseded) revision lives at a composite key in a second "revs"
//! `KeyStore`.

use cbordata::{Cbor, Cborize, FromCbor, IntoCbor};

use crate::backend::RangeOptions;
use crate::enumerator::DocEnumerator;
use crate::error::Error;
use crate::keystore::KeyStore;
use crate::varint::encode_uvarint;
use crate::versionvector::{Comparison, Version, VersionVector, ME_PEER_ID};
use crate::Result;

const REVISION_META_VER: u32 = 0x00560003;

#[derive(Clone, Debug, PartialEq, Eq, Cborize)]
struct RevisionMeta {
    flags: u8,
    version: VersionVector,
    cas: u64,
    doc_type: String,
}

impl RevisionMeta {
    const ID: u32 = REVISION_META_VER;
}

const FLAG_DELETED: u8 = 0x01;
const FLAG_CONFLICTED: u8 = 0x02;
const FLAG_HAS_ATTACHMENTS: u8 = 0x04;

/// One document revision, vector-clock form.
#[derive(Clone, Debug, PartialEq)]
pub struct Revision {
    pub doc_id: String,
    pub version: VersionVector,
    pub deleted: bool,
    pub conflicted: bool,
    pub has_attachments: bool,
    pub cas: u64,
    pub doc_type: String,
    pub body: Vec<u8>,
    pub sequence: u64,
}

impl Revision {
    fn anchor(&self) -> Version {
        self.version
            .versions()
            .first()
            .cloned()
            .unwrap_or(Version { generation: 0, author: String::new() })
    }
}

pub struct RevisionStore {
    current: KeyStore,
    non_current: KeyStore,
}

impl RevisionStore {
    pub fn new(current: KeyStore, non_current: KeyStore) -> RevisionStore {
        RevisionStore { current, non_current }
    }

    pub fn get(&self, doc_id: &str) -> Result<Option<Revision>> {
        let rec = self.current.get(doc_id.as_bytes())?;
        if !rec.exists {
            return Ok(None);
        }
        Ok(Some(decode_revision(doc_id, &rec)?))
    }

    /// Searches the current revision first, then the non-current store,
    /// for the revision matching `(generation, author)`.
    pub fn get_version(&self, doc_id: &str, generation: u64, author: &str) -> Result<Option<Revision>> {
        if let Some(cur) = self.get(doc_id)? {
            if cur.version.generation_of(author) == generation {
                return Ok(Some(cur));
            }
        }
        let key = key_for_non_current(doc_id, &Version { generation, author: author.to_string() });
        let rec = self.non_current.get(&key)?;
        if !rec.exists {
            return Ok(None);
        }
        Ok(Some(decode_revision(doc_id, &rec)?))
    }

    /// If `parent_vector` doesn't match the current version, returns
    /// `None` (conflict). Otherwise increments the local peer's
    /// generation and writes the new current revision.
    pub fn create(
        &self,
        doc_id: &str,
        parent_vector: &VersionVector,
        body: Vec<u8>,
        deleted: bool,
        has_attachments: bool,
        doc_type: &str,
    ) -> Result<Option<Revision>> {
        let current = self.get(doc_id)?;
        let current_version = current.as_ref().map(|r| r.version.clone()).unwrap_or_default();
        if &current_version != parent_vector {
            return Ok(None);
        }

        let mut new_version = parent_vector.clone();
        new_version.increment_gen(ME_PEER_ID);
        let was_conflicted = current.as_ref().map(|r| r.conflicted).unwrap_or(false);

        let revision = Revision {
            doc_id: doc_id.to_string(),
            version: new_version.clone(),
            deleted,
            conflicted: false,
            has_attachments,
            cas: 0,
            doc_type: doc_type.to_string(),
            body,
            sequence: 0,
        };
        self.put_current(&revision)?;

        if was_conflicted {
            self.delete_ancestors_older_than(doc_id, &new_version)?;
        }
        Ok(Some(revision))
    }

    /// Inserts an externally-sourced revision (e.g. from a replicator).
    pub fn insert(&self, revision: Revision) -> Result<Comparison> {
        let current = self.get(&revision.doc_id)?;
        let cmp = match &current {
            Some(cur) => cur.version.compare_to(&revision.version),
            None => Comparison::Newer,
        };
        match cmp {
            Comparison::Older | Comparison::Same => Ok(cmp),
            Comparison::Newer => {
                self.put_current(&revision)?;
                Ok(cmp)
            }
            Comparison::Conflicting => {
                self.put_non_current(&revision)?;
                if let Some(mut cur) = current {
                    cur.conflicted = true;
                    self.put_current(&cur)?;
                }
                Ok(cmp)
            }
        }
    }

    /// Merges the given revisions' vectors, writes the merged revision
    /// as current, and deletes every revision in `revs` except the
    /// first (the retained base).
    pub fn resolve_conflict(&self, doc_id: &str, revs: &[Revision], body: Vec<u8>) -> Result<Revision> {
        if revs.is_empty() {
            return Err(Error::InvalidParameter("resolveConflict needs at least one revision".into()));
        }
        let merged_version = revs[1..].iter().fold(revs[0].version.clone(), |acc, r| acc.merged_with(&r.version));
        let has_attachments = revs.iter().any(|r| r.has_attachments);
        let merged = Revision {
            doc_id: doc_id.to_string(),
            version: merged_version,
            deleted: false,
            conflicted: false,
            has_attachments,
            cas: 0,
            doc_type: revs[0].doc_type.clone(),
            body,
            sequence: 0,
        };
        self.put_current(&merged)?;
        for rev in &revs[1..] {
            self.remove_non_current(rev)?;
        }
        Ok(merged)
    }

    /// Fast lookup against the stored current vector: `Older` if the
    /// document already has a newer generation for `author`, `Newer` if
    /// the document doesn't have `author` at all or has an older
    /// generation, `Same` on an exact match.
    pub fn check_revision(&self, doc_id: &str, generation: u64, author: &str) -> Result<Comparison> {
        let doc_gen = self.get(doc_id)?.map(|r| r.version.generation_of(author)).unwrap_or(0);
        Ok(match doc_gen.cmp(&generation) {
            std::cmp::Ordering::Greater => Comparison::Older,
            std::cmp::Ordering::Equal => Comparison::Same,
            std::cmp::Ordering::Less => Comparison::Newer,
        })
    }

    /// Iterates the non-current store over `docID\t[author,…]`. `None`
    /// iterates every author for the document.
    pub fn enumerate_revisions(&self, doc_id: &str, authors: Option<&[String]>) -> Result<DocEnumerator> {
        let opts = RangeOptions {
            inclusive_start: true,
            inclusive_end: false,
            include_deleted: true,
            content: Default::default(),
        };
        let rows = match authors {
            None => {
                let min = format!("{}\t", doc_id).into_bytes();
                let mut max = min.clone();
                max.push(0xFF);
                self.non_current.scan_range(Some(&min), Some(&max))?
            }
            Some(authors) => {
                let mut rows = Vec::new();
                for author in authors {
                    let min = start_key_for(doc_id, author);
                    let max = end_key_for(doc_id, author);
                    rows.extend(self.non_current.scan_range(Some(&min), Some(&max))?);
                }
                rows.sort_by(|a, b| a.key.as_bytes().cmp(b.key.as_bytes()));
                rows
            }
        };
        Ok(DocEnumerator::from_rows(rows, &opts))
    }

    /// Write `revision` as the document's current revision, with no
    /// comparison against what's already there. The CAS bridge uses this
    /// directly when it has already decided the write is unconditional.
    pub(crate) fn put_current(&self, revision: &Revision) -> Result<()> {
        let meta = encode_meta(revision)?;
        self.current.set(revision.doc_id.as_bytes(), &meta, &revision.body)?;
        Ok(())
    }

    pub(crate) fn put_non_current(&self, revision: &Revision) -> Result<()> {
        let key = key_for_non_current(&revision.doc_id, &revision.anchor());
        let meta = encode_meta(revision)?;
        self.non_current.set(&key, &meta, &revision.body)?;
        Ok(())
    }

    pub(crate) fn remove_non_current(&self, revision: &Revision) -> Result<()> {
        let key = key_for_non_current(&revision.doc_id, &revision.anchor());
        self.non_current.del(&key)?;
        Ok(())
    }

    fn delete_ancestors_older_than(&self, doc_id: &str, new_version: &VersionVector) -> Result<()> {
        let mut e = self.enumerate_revisions(doc_id, None)?;
        let mut stale_keys = Vec::new();
        while e.next() {
            let rec = e.doc();
            let meta = RevisionMeta::from_cbor_bytes(rec.meta.as_bytes())?;
            if new_version.compare_to(&meta.version) == Comparison::Newer {
                stale_keys.push(rec.key.as_bytes().to_vec());
            }
        }
        for key in stale_keys {
            self.non_current.del(&key)?;
        }
        Ok(())
    }
}

fn decode_revision(doc_id: &str, rec: &crate::record::Record) -> Result<Revision> {
    let meta = RevisionMeta::from_cbor_bytes(rec.meta.as_bytes())?;
    Ok(Revision {
        doc_id: doc_id.to_string(),
        version: meta.version,
        deleted: meta.flags & FLAG_DELETED != 0,
        conflicted: meta.flags & FLAG_CONFLICTED != 0,
        has_attachments: meta.flags & FLAG_HAS_ATTACHMENTS != 0,
        cas: meta.cas,
        doc_type: meta.doc_type,
        body: rec.body.as_bytes().to_vec(),
        sequence: rec.sequence,
    })
}

fn encode_meta(revision: &Revision) -> Result<Vec<u8>> {
    let mut flags = 0u8;
    if revision.deleted {
        flags |= FLAG_DELETED;
    }
    if revision.conflicted {
        flags |= FLAG_CONFLICTED;
    }
    if revision.has_attachments {
        flags |= FLAG_HAS_ATTACHMENTS;
    }
    let meta = RevisionMeta {
        flags,
        version: revision.version.clone(),
        cas: revision.cas,
        doc_type: revision.doc_type.clone(),
    };
    meta.into_cbor_bytes()
}

impl RevisionMeta {
    fn into_cbor_bytes(self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let cbor = self.into_cbor().map_err(|e| Error::CorruptRevisionData(format!("cbor encode: {}", e)))?;
        cbor.encode(&mut data).map_err(|e| Error::CorruptRevisionData(format!("cbor encode: {}", e)))?;
        Ok(data)
    }

    fn from_cbor_bytes(mut data: &[u8]) -> Result<RevisionMeta> {
        let (val, _) = Cbor::decode(&mut data).map_err(|e| Error::CorruptRevisionData(format!("cbor decode: {}", e)))?;
        RevisionMeta::from_cbor(val).map_err(|e| Error::CorruptRevisionData(format!("cbor decode: {}", e)))
    }
}

pub fn doc_id_from_key(key: &[u8]) -> &[u8] {
    match key.iter().position(|&b| b == b'\t') {
        Some(idx) => &key[..idx],
        None => key,
    }
}

pub fn start_key_for(doc_id: &str, author: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(doc_id.len() + author.len() + 2);
    key.extend_from_slice(doc_id.as_bytes());
    key.push(b'\t');
    key.extend_from_slice(author.as_bytes());
    key.push(b',');
    key
}

pub fn end_key_for(doc_id: &str, author: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(doc_id.len() + author.len() + 2);
    key.extend_from_slice(doc_id.as_bytes());
    key.push(b'\t');
    key.extend_from_slice(author.as_bytes());
    key.push(b'-');
    key
}

pub fn key_for_non_current(doc_id: &str, version: &Version) -> Vec<u8> {
    let mut key = start_key_for(doc_id, &version.author);
    encode_uvarint(version.generation, &mut key);
    key
}

#[cfg(test)]
#[path = "revisionstore_test.rs"]
mod revisionstore_test;
