use crate::backend::{Capabilities, DataFileOptions, RangeOptions};
use crate::datafile::{BackendKind, DataFile};
use tempfile::tempdir;

fn caps() -> Capabilities {
    Capabilities {
        sequences: true,
        soft_deletes: true,
        get_by_offset: false,
    }
}

fn populate(n: usize) -> (tempfile::TempDir, DataFile) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.db");
    let df = DataFile::open(path.to_str().unwrap(), BackendKind::LogFile, DataFileOptions::default()).unwrap();
    let ks = df.open_key_store("docs", caps()).unwrap();
    let txn = df.begin().unwrap();
    for i in 1..=n {
        let key = format!("doc-{:03}", i);
        ks.set(key.as_bytes(), b"", b"").unwrap();
    }
    txn.commit().unwrap();
    (dir, df)
}

#[test]
fn test_inclusive_range_scenario_from_spec() {
    let (_dir, df) = populate(100);
    let ks = df.open_key_store("docs", caps()).unwrap();
    let opts = RangeOptions {
        inclusive_start: true,
        inclusive_end: true,
        include_deleted: true,
        content: Default::default(),
    };
    let mut e = ks.enumerate_range(Some(b"doc-024"), Some(b"doc-029"), &opts, false, 0, None).unwrap();
    let mut keys = Vec::new();
    while e.next() {
        keys.push(String::from_utf8(e.doc().key.as_bytes().to_vec()).unwrap());
    }
    let expected: Vec<String> = (24..=29).map(|i| format!("doc-{:03}", i)).collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_exclusive_range_scenario_from_spec() {
    let (_dir, df) = populate(100);
    let ks = df.open_key_store("docs", caps()).unwrap();
    let opts = RangeOptions {
        inclusive_start: false,
        inclusive_end: false,
        include_deleted: true,
        content: Default::default(),
    };
    let mut e = ks.enumerate_range(Some(b"doc-024"), Some(b"doc-029"), &opts, false, 0, None).unwrap();
    let mut keys = Vec::new();
    while e.next() {
        keys.push(String::from_utf8(e.doc().key.as_bytes().to_vec()).unwrap());
    }
    let expected: Vec<String> = (25..=28).map(|i| format!("doc-{:03}", i)).collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_next_returns_false_after_exhaustion_and_stays_false() {
    let (_dir, df) = populate(2);
    let ks = df.open_key_store("docs", caps()).unwrap();
    let opts = RangeOptions {
        inclusive_start: true,
        inclusive_end: true,
        include_deleted: true,
        content: Default::default(),
    };
    let mut e = ks.enumerate_range(None, None, &opts, false, 0, None).unwrap();
    assert!(e.next());
    assert!(e.next());
    assert!(!e.next());
    assert!(!e.next());
}

#[test]
fn test_skip_and_limit() {
    let (_dir, df) = populate(10);
    let ks = df.open_key_store("docs", caps()).unwrap();
    let opts = RangeOptions {
        inclusive_start: true,
        inclusive_end: true,
        include_deleted: true,
        content: Default::default(),
    };
    let mut e = ks.enumerate_range(None, None, &opts, false, 2, Some(3)).unwrap();
    let mut keys = Vec::new();
    while e.next() {
        keys.push(String::from_utf8(e.doc().key.as_bytes().to_vec()).unwrap());
    }
    let expected: Vec<String> = (3..=5).map(|i| format!("doc-{:03}", i)).collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_descending() {
    let (_dir, df) = populate(3);
    let ks = df.open_key_store("docs", caps()).unwrap();
    let opts = RangeOptions {
        inclusive_start: true,
        inclusive_end: true,
        include_deleted: true,
        content: Default::default(),
    };
    let mut e = ks.enumerate_range(None, None, &opts, true, 0, None).unwrap();
    let mut keys = Vec::new();
    while e.next() {
        keys.push(String::from_utf8(e.doc().key.as_bytes().to_vec()).unwrap());
    }
    assert_eq!(keys, vec!["doc-003", "doc-002", "doc-001"]);
}

#[test]
fn test_include_deleted_false_filters_tombstones() {
    let (_dir, df) = populate(3);
    let ks = df.open_key_store("docs", caps()).unwrap();
    ks.del(b"doc-002").unwrap();
    let opts = RangeOptions {
        inclusive_start: true,
        inclusive_end: true,
        include_deleted: false,
        content: Default::default(),
    };
    let mut e = ks.enumerate_range(None, None, &opts, false, 0, None).unwrap();
    let mut keys = Vec::new();
    while e.next() {
        keys.push(String::from_utf8(e.doc().key.as_bytes().to_vec()).unwrap());
    }
    assert_eq!(keys, vec!["doc-001", "doc-003"]);
}
