use super::*;
use crate::backend::{Capabilities, DataFileOptions};
use crate::datafile::{BackendKind, DataFile};
use tempfile::tempdir;

fn caps() -> Capabilities {
    Capabilities { sequences: true, soft_deletes: true, get_by_offset: false }
}

fn index() -> (tempfile::TempDir, DataFile, Index) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("idx.db");
    let df = DataFile::open(path.to_str().unwrap(), BackendKind::LogFile, DataFileOptions::default()).unwrap();
    let store = df.open_key_store("by_city", caps()).unwrap();
    (dir, df, Index::new(store))
}

fn key_str(s: &str) -> Vec<u8> {
    let mut b = CollatableBuilder::new();
    b.add_string(s);
    b.finish()
}

#[test]
fn test_first_update_adds_all_rows() {
    let (_dir, df, idx) = index();
    let txn = df.begin().unwrap();
    let w = IndexWriter::new(&idx);
    let mut row_count: i64 = 0;
    let changed = w
        .update("doc1", 1, &[key_str("nyc")], &[EmittedValue::Body(b"v1".to_vec())], &mut row_count)
        .unwrap();
    txn.commit().unwrap();
    assert!(changed);
    assert_eq!(row_count, 1);

    let store = idx.store();
    let row_key = make_row_key(&key_str("nyc"), "doc1", 0);
    let rec = store.get(&row_key).unwrap();
    assert!(rec.exists);
    assert_eq!(rec.body.as_bytes(), b"v1");
}

#[test]
fn test_unchanged_update_is_noop() {
    let (_dir, df, idx) = index();
    let txn = df.begin().unwrap();
    let w = IndexWriter::new(&idx);
    let mut row_count: i64 = 0;
    w.update("doc1", 1, &[key_str("nyc")], &[EmittedValue::Body(b"v1".to_vec())], &mut row_count).unwrap();
    let changed = w
        .update("doc1", 2, &[key_str("nyc")], &[EmittedValue::Body(b"v1".to_vec())], &mut row_count)
        .unwrap();
    txn.commit().unwrap();
    assert!(!changed);
    assert_eq!(row_count, 1);
}

#[test]
fn test_changed_body_same_key_overwrites() {
    let (_dir, df, idx) = index();
    let txn = df.begin().unwrap();
    let w = IndexWriter::new(&idx);
    let mut row_count: i64 = 0;
    w.update("doc1", 1, &[key_str("nyc")], &[EmittedValue::Body(b"v1".to_vec())], &mut row_count).unwrap();
    let changed = w
        .update("doc1", 2, &[key_str("nyc")], &[EmittedValue::Body(b"v2".to_vec())], &mut row_count)
        .unwrap();
    txn.commit().unwrap();
    assert!(changed);
    assert_eq!(row_count, 1);

    let row_key = make_row_key(&key_str("nyc"), "doc1", 0);
    let rec = idx.store().get(&row_key).unwrap();
    assert_eq!(rec.body.as_bytes(), b"v2");
}

#[test]
fn test_changed_keys_removes_old_row_adds_new() {
    let (_dir, df, idx) = index();
    let txn = df.begin().unwrap();
    let w = IndexWriter::new(&idx);
    let mut row_count: i64 = 0;
    w.update("doc1", 1, &[key_str("nyc")], &[EmittedValue::Body(b"v1".to_vec())], &mut row_count).unwrap();
    let changed = w
        .update("doc1", 2, &[key_str("sfo")], &[EmittedValue::Body(b"v1".to_vec())], &mut row_count)
        .unwrap();
    txn.commit().unwrap();
    assert!(changed);
    assert_eq!(row_count, 1);

    let old_key = make_row_key(&key_str("nyc"), "doc1", 0);
    assert!(!idx.store().get(&old_key).unwrap().exists);
    let new_key = make_row_key(&key_str("sfo"), "doc1", 0);
    assert!(idx.store().get(&new_key).unwrap().exists);
}

#[test]
fn test_deletion_removes_all_previously_emitted_rows() {
    let (_dir, df, idx) = index();
    let txn = df.begin().unwrap();
    let w = IndexWriter::new(&idx);
    let mut row_count: i64 = 0;
    w.update(
        "doc1",
        1,
        &[key_str("nyc"), key_str("usa")],
        &[EmittedValue::Body(b"a".to_vec()), EmittedValue::Body(b"b".to_vec())],
        &mut row_count,
    )
    .unwrap();
    assert_eq!(row_count, 2);

    let changed = w.update("doc1", 2, &[], &[], &mut row_count).unwrap();
    txn.commit().unwrap();
    assert!(changed);
    assert_eq!(row_count, 0);

    assert!(!idx.store().get(&make_row_key(&key_str("nyc"), "doc1", 0)).unwrap().exists);
    assert!(!idx.store().get(&make_row_key(&key_str("usa"), "doc1", 1)).unwrap().exists);
}

#[test]
fn test_special_sentinel_forces_reemission() {
    let (_dir, df, idx) = index();
    let txn = df.begin().unwrap();
    let w = IndexWriter::new(&idx);
    let mut row_count: i64 = 0;
    w.update("doc1", 1, &[key_str("self")], &[EmittedValue::SourceDocument], &mut row_count).unwrap();
    let changed = w
        .update("doc1", 2, &[key_str("self")], &[EmittedValue::SourceDocument], &mut row_count)
        .unwrap();
    txn.commit().unwrap();
    assert!(changed, "special-valued rows must re-emit every update");
}

#[test]
fn test_user_guard_tracks_index_user_count() {
    let (_dir, _df, idx) = index();
    assert_eq!(idx.user_count(), 0);
    {
        let w = IndexWriter::new(&idx);
        assert_eq!(idx.user_count(), 1);
        let _ = w;
    }
    assert_eq!(idx.user_count(), 0);
}
