use super::*;
use crate::backend::{Capabilities, DataFileOptions};
use crate::datafile::{BackendKind, DataFile};
use tempfile::tempdir;

fn caps() -> Capabilities {
    Capabilities { sequences: true, soft_deletes: true, get_by_offset: false }
}

fn bridge() -> (tempfile::TempDir, DataFile, CasRevisionStore) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cas.db");
    let df = DataFile::open(path.to_str().unwrap(), BackendKind::LogFile, DataFileOptions::default()).unwrap();
    let current = df.open_key_store("docs", caps()).unwrap();
    let non_current = df.open_key_store("docs_revs", caps()).unwrap();
    let cas_store = df.open_key_store("docs_cas", caps()).unwrap();
    let rs = RevisionStore::new(current, non_current);
    (dir, df, CasRevisionStore::new(rs, cas_store))
}

#[test]
fn test_scenario_from_spec_cas_bridge() {
    let (_dir, df, bridge) = bridge();

    let txn = df.begin().unwrap();
    let outcome1 = bridge.insert_from_server("doc", 17, b"body1".to_vec(), "note", false).unwrap();
    assert_eq!(outcome1, ServerInsertOutcome::WroteCurrent);
    let cur1 = bridge.revisions().get("doc").unwrap().unwrap();
    assert_eq!(cur1.version.format(), "1@$");

    let v1 = cur1.version.clone();
    let r2 = bridge.revisions().create("doc", &v1, b"body2".to_vec(), false, false, "note").unwrap().unwrap();
    assert_eq!(r2.version.format(), "1@*,1@$");

    let outcome3 = bridge.insert_from_server("doc", 77, b"body3".to_vec(), "note", false).unwrap();
    assert_eq!(outcome3, ServerInsertOutcome::WroteConflict);

    let cur3 = bridge.revisions().get("doc").unwrap().unwrap();
    assert!(cur3.conflicted);

    let non_current = bridge.revisions().get_version("doc", 2, "$").unwrap().unwrap();
    assert_eq!(non_current.body, b"body3");

    let resolved = bridge.resolve_conflict("doc", &[cur3.clone(), non_current.clone()], b"merged".to_vec()).unwrap();
    txn.commit().unwrap();

    assert!(!resolved.conflicted);
    assert_eq!(resolved.version.generation_of("$"), 2);
    assert_eq!(resolved.version.generation_of("*"), 1);

    let fetched = bridge.revisions().get("doc").unwrap().unwrap();
    assert!(!fetched.conflicted);
    assert_eq!(fetched.body, b"merged");
}

#[test]
fn test_insert_from_server_stale_cas_is_noop() {
    let (_dir, df, bridge) = bridge();
    let txn = df.begin().unwrap();
    bridge.insert_from_server("doc", 17, b"body1".to_vec(), "note", false).unwrap();
    let outcome = bridge.insert_from_server("doc", 10, b"ignored".to_vec(), "note", false).unwrap();
    txn.commit().unwrap();
    assert_eq!(outcome, ServerInsertOutcome::Stale);
    assert_eq!(bridge.revisions().get("doc").unwrap().unwrap().body, b"body1");
}

#[test]
fn test_assign_cas_sets_base_and_latest() {
    let (_dir, df, bridge) = bridge();
    let txn = df.begin().unwrap();
    let version = crate::versionvector::VersionVector::parse("3@me").unwrap();
    bridge.assign_cas("doc", version.clone(), 42).unwrap();
    txn.commit().unwrap();

    let state = bridge.load_state("doc").unwrap().unwrap();
    assert_eq!(state.base.version, version);
    assert_eq!(state.base.cas, 42);
    assert_eq!(state.latest.version, version);
    assert_eq!(state.latest.cas, 42);
}
