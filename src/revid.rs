//! Module `revid` implements `RevID`, the compact revision identifier
//! used by the rev-tree history model: a digest form (hash-chained,
//! CouchDB-style) and a clock form (peer-clock, used when a document's
//! history is actually driven by a `VersionVector` but needs a RevID-
//! shaped key for rev-tree style APIs).

use crate::error::Error;
use crate::varint::{decode_uvarint, encode_uvarint};
use crate::Result;

const MAX_GENERATION: u64 = 400_000_000;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RevID {
    /// `<generation> <digest>`, human form `"<gen>-<hex>"`.
    Digest { generation: u64, digest: Vec<u8> },
    /// `<0x00><generation> <author>`, human form `"<gen>@<author>"`.
    Clock { generation: u64, author: String },
}

impl RevID {
    pub fn generation(&self) -> u64 {
        match self {
            RevID::Digest { generation, .. } => *generation,
            RevID::Clock { generation, .. } => *generation,
        }
    }

    pub fn digest(generation: u64, digest: Vec<u8>) -> Result<RevID> {
        validate_generation(generation)?;
        if digest.is_empty() {
            return Err(Error::BadRevisionID("empty digest".into()));
        }
        Ok(RevID::Digest { generation, digest })
    }

    pub fn clock(generation: u64, author: String) -> Result<RevID> {
        validate_generation(generation)?;
        if author.is_empty() {
            return Err(Error::BadRevisionID("empty author".into()));
        }
        Ok(RevID::Clock { generation, author })
    }

    /// Parse `"<gen>-<hex>"` or `"<gen>@<author>"`.
    pub fn parse(s: &str) -> Result<RevID> {
        if let Some(at) = s.find('@') {
            let (gen_str, author) = (&s[..at], &s[at + 1..]);
            let generation: u64 = gen_str
                .parse()
                .map_err(|_| Error::BadRevisionID(format!("bad generation in {:?}", s)))?;
            return RevID::clock(generation, author.to_string());
        }
        if let Some(dash) = s.find('-') {
            let (gen_str, hex) = (&s[..dash], &s[dash + 1..]);
            let generation: u64 = gen_str
                .parse()
                .map_err(|_| Error::BadRevisionID(format!("bad generation in {:?}", s)))?;
            let digest = decode_hex(hex).ok_or_else(|| Error::BadRevisionID(format!("bad digest hex in {:?}", s)))?;
            return RevID::digest(generation, digest);
        }
        Err(Error::BadRevisionID(format!("no '-' or '@' in {:?}", s)))
    }

    pub fn format(&self) -> String {
        match self {
            RevID::Digest { generation, digest } => format!("{}-{}", generation, encode_hex(digest)),
            RevID::Clock { generation, author } => format!("{}@{}", generation, author),
        }
    }

    /// Binary compact form used inside an encoded `RevTree` record.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        match self {
            RevID::Digest { generation, digest } => {
                encode_uvarint(*generation, buf);
                buf.extend_from_slice(digest);
            }
            RevID::Clock { generation, author } => {
                buf.push(0x00);
                encode_uvarint(*generation, buf);
                buf.extend_from_slice(author.as_bytes());
            }
        }
    }

    pub fn decode(buf: &[u8]) -> Result<RevID> {
        if buf.is_empty() {
            return Err(Error::BadRevisionID("empty revid bytes".into()));
        }
        if buf[0] == 0x00 {
            let (generation, n) = decode_uvarint(&buf[1..])
                .map_err(|_| Error::BadRevisionID("truncated clock revid".into()))?;
            let author = String::from_utf8(buf[1 + n..].to_vec())
                .map_err(|_| Error::BadRevisionID("non-utf8 author".into()))?;
            RevID::clock(generation, author)
        } else {
            let (generation, n) = decode_uvarint(buf).map_err(|_| Error::BadRevisionID("truncated digest revid".into()))?;
            RevID::digest(generation, buf[n..].to_vec())
        }
    }
}

fn validate_generation(generation: u64) -> Result<()> {
    if generation == 0 {
        return Err(Error::BadRevisionID("generation must be >= 1".into()));
    }
    if generation > MAX_GENERATION {
        return Err(Error::BadRevisionID(format!("generation {} exceeds maximum", generation)));
    }
    Ok(())
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.is_empty() || s.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for chunk in bytes.chunks(2) {
        let hi = (chunk[0] as char).to_digit(16)?;
        let lo = (chunk[1] as char).to_digit(16)?;
        out.push((hi * 16 + lo) as u8);
    }
    Some(out)
}

#[cfg(test)]
#[path = "revid_test.rs"]
mod revid_test;
