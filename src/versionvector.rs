//! Module `versionvector` implements `Version` and `VersionVector`, the
//! peer-clock analogue of `RevID`/`RevTree`: an ordered list of
//! per-author generations used to detect and merge concurrent edits.

use cbordata::{Cbor, Cborize, FromCbor, IntoCbor};

use crate::error::Error;
use crate::Result;

/// The local peer's own author is always persisted under this literal.
pub const ME_PEER_ID: &str = "*";
/// The CAS-server bridge's author for server-originated revisions.
pub const CAS_PEER_ID: &str = "$";

const MAX_GENERATION: u64 = 400_000_000;
const MAX_AUTHOR_LEN: usize = 64;

const VERSION_VER: u32 = 0x00560001;

#[derive(Clone, Debug, PartialEq, Eq, Cborize)]
pub struct Version {
    pub generation: u64,
    pub author: String,
}

impl Version {
    const ID: u32 = VERSION_VER;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Comparison {
    Same,
    Older,
    Newer,
    Conflicting,
}

const VECTOR_VER: u32 = 0x00560002;

#[derive(Clone, Debug, Default, PartialEq, Eq, Cborize)]
pub struct VersionVector {
    versions: Vec<Version>,
    content_hash: Option<u64>,
}

impl VersionVector {
    const ID: u32 = VECTOR_VER;

    pub fn new() -> VersionVector {
        VersionVector::default()
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn content_hash(&self) -> Option<u64> {
        self.content_hash
    }

    pub fn generation_of(&self, author: &str) -> u64 {
        self.versions.iter().find(|v| v.author == author).map(|v| v.generation).unwrap_or(0)
    }

    /// `"gen@author,gen@author,…"`, current first.
    pub fn parse(s: &str) -> Result<VersionVector> {
        let mut versions = Vec::new();
        let mut seen = std::collections::HashSet::new();
        if s.is_empty() {
            return Ok(VersionVector::new());
        }
        for part in s.split(',') {
            let at = part
                .find('@')
                .ok_or_else(|| Error::BadVersionVector(format!("missing '@' in {:?}", part)))?;
            let (gen_str, author) = (&part[..at], &part[at + 1..]);
            if gen_str.is_empty() {
                return Err(Error::BadVersionVector("empty generation".into()));
            }
            let generation: u64 = gen_str
                .parse()
                .map_err(|_| Error::BadVersionVector(format!("bad generation in {:?}", part)))?;
            if generation > MAX_GENERATION {
                return Err(Error::BadVersionVector(format!("generation {} exceeds maximum", generation)));
            }
            if author.len() > MAX_AUTHOR_LEN {
                return Err(Error::BadVersionVector(format!("author {:?} exceeds max length", author)));
            }
            if !seen.insert(author.to_string()) {
                return Err(Error::BadVersionVector(format!("duplicate author {:?}", author)));
            }
            versions.push(Version { generation, author: author.to_string() });
        }
        Ok(VersionVector { versions, content_hash: None })
    }

    pub fn format(&self) -> String {
        self.versions
            .iter()
            .map(|v| format!("{}@{}", v.generation, v.author))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Compare against another vector: for every author in either
    /// vector, compare generations (missing == 0); `Older` if any
    /// self-generation is smaller, `Newer` if any is larger.
    pub fn compare_to(&self, other: &VersionVector) -> Comparison {
        let mut authors: Vec<&str> = self.versions.iter().map(|v| v.author.as_str()).collect();
        for v in &other.versions {
            if !authors.contains(&v.author.as_str()) {
                authors.push(v.author.as_str());
            }
        }
        let mut older = false;
        let mut newer = false;
        for author in authors {
            let mine = self.generation_of(author);
            let theirs = other.generation_of(author);
            if mine < theirs {
                older = true;
            }
            if mine > theirs {
                newer = true;
            }
        }
        combine(older, newer)
    }

    /// Same rules, treating `(generation, author)` as a one-element
    /// vector. `Older` means the receiver already has a newer version
    /// for that author.
    pub fn compare_single(&self, generation: u64, author: &str) -> Comparison {
        let mine = self.generation_of(author);
        combine(mine < generation, mine > generation)
    }

    /// Move `author` to position 0 with `generation + 1` (or 1 if new).
    pub fn increment_gen(&mut self, author: &str) {
        let next_gen = self.generation_of(author) + 1;
        self.versions.retain(|v| v.author != author);
        self.versions.insert(0, Version { generation: next_gen, author: author.to_string() });
    }

    /// For each author present in either vector, the maximum
    /// generation; ordering interleaves inputs but is not canonical.
    pub fn merged_with(&self, other: &VersionVector) -> VersionVector {
        let mut versions = self.versions.clone();
        for ov in &other.versions {
            match versions.iter_mut().find(|v| v.author == ov.author) {
                Some(v) => v.generation = v.generation.max(ov.generation),
                None => versions.push(ov.clone()),
            }
        }
        VersionVector { versions, content_hash: None }
    }

    pub fn with_content_hash(mut self, hash: u64) -> VersionVector {
        self.content_hash = Some(hash);
        self
    }

    /// Replace `ME_PEER_ID` with the real local identifier for export.
    pub fn export(&self, local_peer_id: &str) -> VersionVector {
        self.substitute(ME_PEER_ID, local_peer_id)
    }

    /// Replace the real local identifier back with `ME_PEER_ID` on import.
    pub fn import(&self, local_peer_id: &str) -> VersionVector {
        self.substitute(local_peer_id, ME_PEER_ID)
    }

    fn substitute(&self, from: &str, to: &str) -> VersionVector {
        let versions = self
            .versions
            .iter()
            .map(|v| {
                if v.author == from {
                    Version { generation: v.generation, author: to.to_string() }
                } else {
                    v.clone()
                }
            })
            .collect();
        VersionVector { versions, content_hash: self.content_hash }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        into_cbor_bytes(self.clone())
    }

    pub fn decode(data: &[u8]) -> Result<VersionVector> {
        Ok(from_cbor_bytes(data)?.0)
    }
}

fn combine(older: bool, newer: bool) -> Comparison {
    match (older, newer) {
        (false, false) => Comparison::Same,
        (true, false) => Comparison::Older,
        (false, true) => Comparison::Newer,
        (true, true) => Comparison::Conflicting,
    }
}

fn into_cbor_bytes<T: IntoCbor>(val: T) -> Result<Vec<u8>> {
    let mut data: Vec<u8> = Vec::new();
    let cbor = val.into_cbor().map_err(|e| Error::BadVersionVector(format!("cbor encode: {}", e)))?;
    cbor.encode(&mut data).map_err(|e| Error::BadVersionVector(format!("cbor encode: {}", e)))?;
    Ok(data)
}

fn from_cbor_bytes<T: FromCbor>(mut data: &[u8]) -> Result<(T, usize)> {
    let (val, n) = Cbor::decode(&mut data).map_err(|e| Error::BadVersionVector(format!("cbor decode: {}", e)))?;
    let val = T::from_cbor(val).map_err(|e| Error::BadVersionVector(format!("cbor decode: {}", e)))?;
    Ok((val, n))
}

#[cfg(test)]
#[path = "versionvector_test.rs"]
mod versionvector_test;
