use super::*;
use crate::backend::{Capabilities, DataFileOptions};
use crate::datafile::{BackendKind, DataFile};
use tempfile::tempdir;

fn caps() -> Capabilities {
    Capabilities { sequences: true, soft_deletes: true, get_by_offset: false }
}

fn store() -> (tempfile::TempDir, DataFile, RevisionStore) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("revs.db");
    let df = DataFile::open(path.to_str().unwrap(), BackendKind::LogFile, DataFileOptions::default()).unwrap();
    let current = df.open_key_store("docs", caps()).unwrap();
    let non_current = df.open_key_store("docs_revs", caps()).unwrap();
    let rs = RevisionStore::new(current, non_current);
    (dir, df, rs)
}

#[test]
fn test_create_first_revision_against_empty_parent() {
    let (_dir, df, rs) = store();
    let txn = df.begin().unwrap();
    let parent = VersionVector::new();
    let rev = rs.create("doc1", &parent, b"hello".to_vec(), false, false, "note").unwrap().unwrap();
    txn.commit().unwrap();

    assert_eq!(rev.version.generation_of(ME_PEER_ID), 1);
    let fetched = rs.get("doc1").unwrap().unwrap();
    assert_eq!(fetched.body, b"hello");
    assert_eq!(fetched.doc_type, "note");
}

#[test]
fn test_create_rejects_stale_parent_vector() {
    let (_dir, df, rs) = store();
    let txn = df.begin().unwrap();
    let parent = VersionVector::new();
    rs.create("doc1", &parent, b"v1".to_vec(), false, false, "note").unwrap();
    let outcome = rs.create("doc1", &parent, b"v2".to_vec(), false, false, "note").unwrap();
    txn.commit().unwrap();
    assert!(outcome.is_none());
}

#[test]
fn test_create_chains_on_current_parent() {
    let (_dir, df, rs) = store();
    let txn = df.begin().unwrap();
    let v0 = VersionVector::new();
    let r1 = rs.create("doc1", &v0, b"v1".to_vec(), false, false, "note").unwrap().unwrap();
    let r2 = rs.create("doc1", &r1.version, b"v2".to_vec(), false, false, "note").unwrap().unwrap();
    txn.commit().unwrap();
    assert_eq!(r2.version.generation_of(ME_PEER_ID), 2);
    assert_eq!(rs.get("doc1").unwrap().unwrap().body, b"v2");
}

#[test]
fn test_insert_newer_replaces_current() {
    let (_dir, df, rs) = store();
    let txn = df.begin().unwrap();
    let v0 = VersionVector::new();
    rs.create("doc1", &v0, b"v1".to_vec(), false, false, "note").unwrap();

    let incoming_version = VersionVector::parse("5@bob").unwrap();
    let incoming = Revision {
        doc_id: "doc1".to_string(),
        version: incoming_version,
        deleted: false,
        conflicted: false,
        has_attachments: false,
        cas: 0,
        doc_type: "note".to_string(),
        body: b"from-bob".to_vec(),
        sequence: 0,
    };
    let cmp = rs.insert(incoming).unwrap();
    txn.commit().unwrap();
    assert_eq!(cmp, Comparison::Newer);
    assert_eq!(rs.get("doc1").unwrap().unwrap().body, b"from-bob");
}

#[test]
fn test_insert_conflicting_marks_current_conflicted_and_stores_non_current() {
    let (_dir, df, rs) = store();
    let txn = df.begin().unwrap();
    let v0 = VersionVector::new();
    let r1 = rs.create("doc1", &v0, b"v1".to_vec(), false, false, "note").unwrap().unwrap();
    assert_eq!(r1.version.format(), format!("1@{}", ME_PEER_ID));

    let incoming_version = VersionVector::parse("1@bob").unwrap();
    let incoming = Revision {
        doc_id: "doc1".to_string(),
        version: incoming_version.clone(),
        deleted: false,
        conflicted: false,
        has_attachments: false,
        cas: 0,
        doc_type: "note".to_string(),
        body: b"from-bob".to_vec(),
        sequence: 0,
    };
    let cmp = rs.insert(incoming).unwrap();
    txn.commit().unwrap();
    assert_eq!(cmp, Comparison::Conflicting);

    let current = rs.get("doc1").unwrap().unwrap();
    assert!(current.conflicted);
    assert_eq!(current.body, b"v1");

    let non_current = rs.get_version("doc1", 1, "bob").unwrap().unwrap();
    assert_eq!(non_current.body, b"from-bob");
}

#[test]
fn test_resolve_conflict_merges_and_clears_conflicted() {
    let (_dir, df, rs) = store();
    let txn = df.begin().unwrap();
    let v0 = VersionVector::new();
    let r1 = rs.create("doc1", &v0, b"v1".to_vec(), false, false, "note").unwrap().unwrap();

    let incoming_version = VersionVector::parse("1@bob").unwrap();
    let incoming = Revision {
        doc_id: "doc1".to_string(),
        version: incoming_version,
        deleted: false,
        conflicted: false,
        has_attachments: false,
        cas: 0,
        doc_type: "note".to_string(),
        body: b"from-bob".to_vec(),
        sequence: 0,
    };
    rs.insert(incoming.clone()).unwrap();

    let current = rs.get("doc1").unwrap().unwrap();
    let resolved = rs.resolve_conflict("doc1", &[current, incoming], b"merged".to_vec()).unwrap();
    txn.commit().unwrap();

    assert!(!resolved.conflicted);
    assert_eq!(resolved.version.generation_of(ME_PEER_ID), 1);
    assert_eq!(resolved.version.generation_of("bob"), 1);
    let fetched = rs.get("doc1").unwrap().unwrap();
    assert_eq!(fetched.body, b"merged");
    assert!(rs.get_version("doc1", 1, "bob").unwrap().is_none());
    let _ = r1;
}

#[test]
fn test_check_revision() {
    let (_dir, df, rs) = store();
    let txn = df.begin().unwrap();
    let v0 = VersionVector::new();
    rs.create("doc1", &v0, b"v1".to_vec(), false, false, "note").unwrap();
    txn.commit().unwrap();

    assert_eq!(rs.check_revision("doc1", 1, ME_PEER_ID).unwrap(), Comparison::Same);
    assert_eq!(rs.check_revision("doc1", 2, ME_PEER_ID).unwrap(), Comparison::Newer);
    assert_eq!(rs.check_revision("doc1", 0, ME_PEER_ID).unwrap(), Comparison::Older);
    assert_eq!(rs.check_revision("doc1", 1, "nobody").unwrap(), Comparison::Newer);
}

#[test]
fn test_key_helpers() {
    let version = Version { generation: 7, author: "bob".to_string() };
    let key = key_for_non_current("doc1", &version);
    assert!(key.starts_with(b"doc1\tbob,"));
    assert_eq!(doc_id_from_key(&key), b"doc1");

    let start = start_key_for("doc1", "bob");
    let end = end_key_for("doc1", "bob");
    assert!(start < key);
    assert!(key < end);
}

#[test]
fn test_enumerate_revisions_for_all_authors() {
    let (_dir, df, rs) = store();
    let txn = df.begin().unwrap();
    let v0 = VersionVector::new();
    rs.create("doc1", &v0, b"v1".to_vec(), false, false, "note").unwrap();
    for author in ["bob", "carl"] {
        let incoming = Revision {
            doc_id: "doc1".to_string(),
            version: VersionVector::parse(&format!("1@{}", author)).unwrap(),
            deleted: false,
            conflicted: false,
            has_attachments: false,
            cas: 0,
            doc_type: "note".to_string(),
            body: format!("from-{}", author).into_bytes(),
            sequence: 0,
        };
        rs.insert(incoming).unwrap();
    }
    txn.commit().unwrap();

    let mut e = rs.enumerate_revisions("doc1", None).unwrap();
    let mut count = 0;
    while e.next() {
        count += 1;
    }
    assert_eq!(count, 2);
}
