use super::*;
use crate::backend::{Capabilities, DataFileOptions};
use crate::datafile::{BackendKind, DataFile};
use crate::index::writer::IndexWriter;
use tempfile::tempdir;

fn caps() -> Capabilities {
    Capabilities { sequences: true, soft_deletes: true, get_by_offset: false }
}

fn opts() -> TokenizerOptions {
    TokenizerOptions { stemmer: Some("english".to_string()), remove_diacritics: false, unique: false }
}

fn populated() -> (tempfile::TempDir, DataFile, Index) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fts.db");
    let df = DataFile::open(path.to_str().unwrap(), BackendKind::LogFile, DataFileOptions::default()).unwrap();
    let store = df.open_key_store("by_body_text", caps()).unwrap();
    let idx = Index::new(store);

    let docs = [
        ("doc1", "the quick brown fox jumps over the lazy dog"),
        ("doc2", "the lazy dog sleeps all day"),
        ("doc3", "foxes are quick and clever"),
    ];

    let txn = df.begin().unwrap();
    let w = IndexWriter::new(&idx);
    let mut row_count: i64 = 0;
    for (id, text) in docs {
        let mut keys = Vec::new();
        let mut values = Vec::new();
        emit_text_tokens(text, None, 1, &opts(), &mut |k, v| {
            keys.push(k);
            values.push(v);
        });
        w.update(id, 1, &keys, &values, &mut row_count).unwrap();
    }
    txn.commit().unwrap();
    (dir, df, idx)
}

#[test]
fn test_emit_text_tokens_produces_special_and_token_rows() {
    let mut emitted = Vec::new();
    emit_text_tokens("quick fox", None, 42, &opts(), &mut |k, v| emitted.push((k, v)));
    assert_eq!(emitted.len(), 3);
}

#[test]
fn test_single_term_query_matches_containing_docs() {
    let (_dir, _df, idx) = populated();
    let results = fulltext_query(&idx, "lazy", &opts(), false, &RangeOptions::default()).unwrap();
    let mut ids: Vec<String> = results.iter().map(|r| r.doc_id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec!["doc1".to_string(), "doc2".to_string()]);
}

#[test]
fn test_multi_term_query_is_an_intersection() {
    let (_dir, _df, idx) = populated();
    let results = fulltext_query(&idx, "quick fox", &opts(), false, &RangeOptions::default()).unwrap();
    let ids: Vec<String> = results.iter().map(|r| r.doc_id.clone()).collect();
    assert_eq!(ids, vec!["doc1".to_string()]);
}

#[test]
fn test_query_matching_no_docs_returns_empty() {
    let (_dir, _df, idx) = populated();
    let results = fulltext_query(&idx, "elephant", &opts(), false, &RangeOptions::default()).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_matches_are_sorted_by_start_offset() {
    let (_dir, _df, idx) = populated();
    let results = fulltext_query(&idx, "the", &opts(), false, &RangeOptions::default()).unwrap();
    let doc1 = results.iter().find(|r| r.doc_id == "doc1").unwrap();
    let starts: Vec<usize> = doc1.matches.iter().map(|m| m.start).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
}

#[test]
fn test_ranked_query_orders_by_descending_rank() {
    let (_dir, _df, idx) = populated();
    let results = fulltext_query(&idx, "quick", &opts(), true, &RangeOptions::default()).unwrap();
    assert!(results.len() >= 2);
    for pair in results.windows(2) {
        assert!(pair[0].rank >= pair[1].rank);
    }
}

#[test]
fn test_empty_query_returns_no_results() {
    let (_dir, _df, idx) = populated();
    let results = fulltext_query(&idx, "the a an", &opts(), false, &RangeOptions::default()).unwrap();
    assert!(results.is_empty());
}
