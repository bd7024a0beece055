//! Module `revtree` implements `RevTree`, the generation-numbered,
//! digest-revID history model: an arena of `Revision`s addressed by
//! `u16` parent indices (per the "cyclic references" design note: no
//! back-pointers, everything is array+index).

use crate::error::Error;
use crate::keystore::HistoricBodyStore;
use crate::revid::RevID;
use crate::varint::{decode_uvarint, encode_uvarint};
use crate::Result;

const FLAG_DELETED: u8 = 0x01;
const FLAG_LEAF: u8 = 0x02;
const FLAG_NEW: u8 = 0x04;
const FLAG_HAS_ATTACHMENTS: u8 = 0x08;
const FLAG_HAS_INLINE_BODY: u8 = 0x10;
const NO_PARENT: u16 = 0xFFFF;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Revision {
    pub rev_id: RevID,
    pub parent_index: Option<u16>,
    pub sequence: u64,
    pub deleted: bool,
    pub leaf: bool,
    pub new: bool,
    pub has_attachments: bool,
    pub inline_body: Option<Vec<u8>>,
    pub old_body_offset: u64,
    pub body_len_hint: u64,
}

/// Outcome of `RevTree::insert`, mirroring an HTTP-status-flavored
/// result rather than a Rust error: most of these outcomes are ordinary
/// control flow for a replicator, not exceptional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertOutcome {
    pub rev: Option<RevID>,
    pub http_status: u16,
}

#[derive(Clone, Debug, Default)]
pub struct RevTree {
    revisions: Vec<Revision>,
}

impl RevTree {
    pub fn new() -> RevTree {
        RevTree { revisions: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }

    pub fn get(&self, rev_id: &RevID) -> Option<&Revision> {
        self.revisions.iter().find(|r| &r.rev_id == rev_id)
    }

    fn index_of(&self, rev_id: &RevID) -> Option<usize> {
        self.revisions.iter().position(|r| &r.rev_id == rev_id)
    }

    /// The winning leaf: after sorting, index 0 if it is a leaf.
    pub fn current_revision(&self) -> Option<&Revision> {
        self.revisions.first().filter(|r| r.leaf)
    }

    pub fn leaf_count(&self) -> usize {
        self.revisions.iter().filter(|r| r.leaf).count()
    }

    pub fn insert(
        &mut self,
        rev_id: RevID,
        body: Vec<u8>,
        deleted: bool,
        has_attachments: bool,
        parent_rev_id: Option<&RevID>,
        allow_conflict: bool,
    ) -> Result<InsertOutcome> {
        if rev_id.generation() == 0 {
            return Ok(InsertOutcome { rev: None, http_status: 400 });
        }
        if self.get(&rev_id).is_some() {
            return Ok(InsertOutcome { rev: None, http_status: 200 });
        }

        let parent_index = match parent_rev_id {
            Some(p) => match self.index_of(p) {
                Some(idx) => Some(idx),
                None => return Ok(InsertOutcome { rev: None, http_status: 404 }),
            },
            None => None,
        };

        if !allow_conflict {
            let conflicts = match parent_index {
                Some(idx) => !self.revisions[idx].leaf,
                None => !self.revisions.is_empty(),
            };
            if conflicts {
                return Ok(InsertOutcome { rev: None, http_status: 409 });
            }
        }

        let expected_generation = match parent_index {
            Some(idx) => self.revisions[idx].generation_of() + 1,
            None => 1,
        };
        if rev_id.generation() != expected_generation {
            return Ok(InsertOutcome { rev: None, http_status: 400 });
        }

        if let Some(idx) = parent_index {
            self.revisions[idx].leaf = false;
        }

        let rev = Revision {
            rev_id: rev_id.clone(),
            parent_index: parent_index.map(|i| i as u16),
            sequence: 0,
            deleted,
            leaf: true,
            new: true,
            has_attachments,
            body_len_hint: body.len() as u64,
            inline_body: Some(body),
            old_body_offset: 0,
        };
        self.revisions.push(rev);
        self.resort();

        let status = if deleted { 200 } else { 201 };
        Ok(InsertOutcome {
            rev: Some(rev_id),
            http_status: status,
        })
    }

    /// Inserts one revision without the public `insert`'s "no parent
    /// implies generation 1" rule — used for replaying a history chain,
    /// whose generation sequence was already validated by the caller
    /// against its *own* parent link, not against what happens to be in
    /// the (possibly pruned) local tree.
    fn insert_raw(
        &mut self,
        rev_id: RevID,
        body: Vec<u8>,
        deleted: bool,
        has_attachments: bool,
        parent_rev_id: Option<&RevID>,
    ) -> Result<InsertOutcome> {
        if rev_id.generation() == 0 {
            return Ok(InsertOutcome { rev: None, http_status: 400 });
        }
        if self.get(&rev_id).is_some() {
            return Ok(InsertOutcome { rev: None, http_status: 200 });
        }

        let parent_index = match parent_rev_id {
            Some(p) => match self.index_of(p) {
                Some(idx) => Some(idx),
                None => return Ok(InsertOutcome { rev: None, http_status: 404 }),
            },
            None => None,
        };

        if let Some(idx) = parent_index {
            self.revisions[idx].leaf = false;
        }

        let rev = Revision {
            rev_id: rev_id.clone(),
            parent_index: parent_index.map(|i| i as u16),
            sequence: 0,
            deleted,
            leaf: true,
            new: true,
            has_attachments,
            body_len_hint: body.len() as u64,
            inline_body: Some(body),
            old_body_offset: 0,
        };
        self.revisions.push(rev);
        self.resort();

        let status = if deleted { 200 } else { 201 };
        Ok(InsertOutcome { rev: Some(rev_id), http_status: status })
    }

    /// `history` is newest-to-oldest. Returns the index (within
    /// `history`) of the first ancestor already present in the tree, or
    /// `history.len()` if none was found (a wholly new branch), or `-1`
    /// on a generation-sequence error.
    pub fn insert_history(
        &mut self,
        history: &[RevID],
        body: Vec<u8>,
        deleted: bool,
        has_attachments: bool,
    ) -> Result<i64> {
        if history.is_empty() {
            return Ok(-1);
        }
        for i in 0..history.len() - 1 {
            if history[i].generation() != history[i + 1].generation() + 1 {
                return Ok(-1);
            }
        }

        let common = history.iter().position(|r| self.get(r).is_some());
        if common == Some(0) {
            return Ok(0);
        }
        let start = common.unwrap_or(history.len());

        let mut parent: Option<RevID> = if start < history.len() {
            Some(history[start].clone())
        } else {
            None
        };
        for i in (0..start).rev() {
            let newest = i == 0;
            let (b, d, ha) = if newest {
                (body.clone(), deleted, has_attachments)
            } else {
                (Vec::new(), false, false)
            };
            let outcome = self.insert_raw(history[i].clone(), b, d, ha, parent.as_ref())?;
            if outcome.http_status >= 400 {
                return Ok(-1);
            }
            parent = Some(history[i].clone());
        }
        Ok(common.map(|c| c as i64).unwrap_or(history.len() as i64))
    }

    /// Trace each leaf's parent chain and clear any revision beyond
    /// `max_depth` generations from its leaf, then compact the arena.
    pub fn prune(&mut self, max_depth: usize) {
        let mut keep = vec![true; self.revisions.len()];
        for (leaf_idx, rev) in self.revisions.iter().enumerate() {
            if !rev.leaf {
                continue;
            }
            let mut depth = 0usize;
            let mut cur = Some(leaf_idx);
            while let Some(idx) = cur {
                if depth >= max_depth {
                    keep[idx] = false;
                }
                cur = self.revisions[idx].parent_index.map(|p| p as usize);
                depth += 1;
            }
        }
        self.compact(keep);
    }

    /// Remove `rev_id`'s leaf, then walk upward removing any ancestor
    /// left with no other kept child — i.e. the whole dead branch up to
    /// its nearest surviving fork.
    pub fn purge(&mut self, rev_id: &RevID) -> Result<()> {
        let idx = self.index_of(rev_id).ok_or(Error::NotFound)?;
        if !self.revisions[idx].leaf {
            return Err(Error::InvalidParameter("purge target is not a leaf".into()));
        }
        let mut keep = vec![true; self.revisions.len()];
        let mut cur = Some(idx);
        while let Some(i) = cur {
            keep[i] = false;
            let parent = self.revisions[i].parent_index.map(|p| p as usize);
            cur = parent.filter(|&p| {
                !self
                    .revisions
                    .iter()
                    .enumerate()
                    .any(|(j, r)| keep[j] && r.parent_index == Some(p as u16))
            });
        }
        self.compact(keep);
        Ok(())
    }

    fn compact(&mut self, keep: Vec<bool>) {
        let mut old_to_new = vec![None; self.revisions.len()];
        let mut next = 0u16;
        for (i, k) in keep.iter().enumerate() {
            if *k {
                old_to_new[i] = Some(next);
                next += 1;
            }
        }
        let mut new_revisions = Vec::with_capacity(next as usize);
        for (i, rev) in self.revisions.iter().enumerate() {
            if !keep[i] {
                continue;
            }
            let mut rev = rev.clone();
            rev.parent_index = rev.parent_index.and_then(|p| old_to_new[p as usize]);
            new_revisions.push(rev);
        }
        self.revisions = new_revisions;
        self.resort();
    }

    /// Sort siblings: leaves before non-leaves, non-deleted before
    /// deleted, ties broken by descending revID. Remaps `parent_index`
    /// through the old->new permutation so the tree stays consistent.
    fn resort(&mut self) {
        let mut order: Vec<usize> = (0..self.revisions.len()).collect();
        order.sort_by(|&a, &b| sort_key(&self.revisions[a]).cmp(&sort_key(&self.revisions[b])));

        let mut old_to_new = vec![0u16; self.revisions.len()];
        for (new_idx, &old_idx) in order.iter().enumerate() {
            old_to_new[old_idx] = new_idx as u16;
        }
        let mut new_revisions: Vec<Revision> = order.into_iter().map(|i| self.revisions[i].clone()).collect();
        for rev in new_revisions.iter_mut() {
            rev.parent_index = rev.parent_index.map(|p| old_to_new[p as usize]);
        }
        self.revisions = new_revisions;
    }

    pub fn load_body(&self, rev_id: &RevID, store: &dyn HistoricBodyStore) -> Result<Vec<u8>> {
        let rev = self.get(rev_id).ok_or(Error::NotFound)?;
        if let Some(body) = &rev.inline_body {
            return Ok(body.clone());
        }
        store.load_body(rev.old_body_offset, rev.sequence)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for rev in &self.revisions {
            let mut frame = Vec::new();
            let parent = rev.parent_index.unwrap_or(NO_PARENT);
            frame.extend_from_slice(&parent.to_be_bytes());

            let mut flags = 0u8;
            if rev.deleted {
                flags |= FLAG_DELETED;
            }
            if rev.leaf {
                flags |= FLAG_LEAF;
            }
            if rev.new {
                flags |= FLAG_NEW;
            }
            if rev.has_attachments {
                flags |= FLAG_HAS_ATTACHMENTS;
            }
            if rev.inline_body.is_some() {
                flags |= FLAG_HAS_INLINE_BODY;
            }
            frame.push(flags);

            let mut rev_id_bytes = Vec::new();
            rev.rev_id.encode(&mut rev_id_bytes);
            frame.push(rev_id_bytes.len() as u8);
            frame.extend_from_slice(&rev_id_bytes);

            encode_uvarint(rev.sequence, &mut frame);

            match &rev.inline_body {
                Some(body) => frame.extend_from_slice(body),
                None => {
                    encode_uvarint(rev.old_body_offset, &mut frame);
                    encode_uvarint(rev.body_len_hint, &mut frame);
                }
            }

            out.extend_from_slice(&(frame.len() as u32).to_be_bytes());
            out.extend_from_slice(&frame);
        }
        out.extend_from_slice(&0u32.to_be_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<RevTree> {
        let mut pos = 0usize;
        let mut revisions = Vec::new();
        loop {
            if pos + 4 > buf.len() {
                return Err(Error::CorruptRevisionData("truncated rev tree size field".into()));
            }
            let size = u32::from_be_bytes(buf[pos..pos + 4].try_into().unwrap()) as usize;
            pos += 4;
            if size == 0 {
                break;
            }
            if pos + size > buf.len() {
                return Err(Error::CorruptRevisionData("rev tree frame overruns buffer".into()));
            }
            let frame = &buf[pos..pos + size];
            pos += size;

            if frame.len() < 2 + 1 + 1 {
                return Err(Error::CorruptRevisionData("rev tree frame too short".into()));
            }
            let parent_index = u16::from_be_bytes(frame[0..2].try_into().unwrap());
            let flags = frame[2];
            let rev_id_len = frame[3] as usize;
            let mut cur = 4usize;
            if cur + rev_id_len > frame.len() {
                return Err(Error::CorruptRevisionData("rev tree revID overruns frame".into()));
            }
            let rev_id = RevID::decode(&frame[cur..cur + rev_id_len])?;
            cur += rev_id_len;

            let (sequence, n) = decode_uvarint(&frame[cur..])
                .map_err(|_| Error::CorruptRevisionData("rev tree sequence field".into()))?;
            cur += n;

            let (inline_body, old_body_offset, body_len_hint) = if flags & FLAG_HAS_INLINE_BODY != 0 {
                (Some(frame[cur..].to_vec()), 0u64, (frame.len() - cur) as u64)
            } else {
                let (offset, n1) = decode_uvarint(&frame[cur..])
                    .map_err(|_| Error::CorruptRevisionData("rev tree body offset field".into()))?;
                let (len, _n2) = decode_uvarint(&frame[cur + n1..])
                    .map_err(|_| Error::CorruptRevisionData("rev tree body length field".into()))?;
                (None, offset, len)
            };

            revisions.push(Revision {
                rev_id,
                parent_index: if parent_index == NO_PARENT { None } else { Some(parent_index) },
                sequence,
                deleted: flags & FLAG_DELETED != 0,
                leaf: flags & FLAG_LEAF != 0,
                new: flags & FLAG_NEW != 0,
                has_attachments: flags & FLAG_HAS_ATTACHMENTS != 0,
                inline_body,
                old_body_offset,
                body_len_hint,
            });
        }
        Ok(RevTree { revisions })
    }
}

impl Revision {
    fn generation_of(&self) -> u64 {
        self.rev_id.generation()
    }
}

/// Sort key: leaves (false sorts before true, so negate), non-deleted
/// first, then descending revID — encoded as a tuple that `Ord`s the
/// way §4.4 specifies.
fn sort_key(rev: &Revision) -> (bool, bool, std::cmp::Reverse<RevIdKey>) {
    (!rev.leaf, rev.deleted, std::cmp::Reverse(RevIdKey(rev.rev_id.clone())))
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct RevIdKey(RevID);

#[cfg(test)]
#[path = "revtree_test.rs"]
mod revtree_test;
