use super::*;

#[test]
fn test_row_key_round_trips_without_emit_index() {
    let mut b = CollatableBuilder::new();
    b.add_string("city");
    let emitted = b.finish();
    let key = make_row_key(&emitted, "doc1", 0);
    let (k, id, idx) = decode_row_key(&key).unwrap();
    assert_eq!(k, emitted);
    assert_eq!(id, "doc1");
    assert_eq!(idx, 0);
}

#[test]
fn test_row_key_round_trips_with_emit_index() {
    let mut b = CollatableBuilder::new();
    b.add_number(42.0);
    let emitted = b.finish();
    let key = make_row_key(&emitted, "doc2", 3);
    let (k, id, idx) = decode_row_key(&key).unwrap();
    assert_eq!(k, emitted);
    assert_eq!(id, "doc2");
    assert_eq!(idx, 3);
}

#[test]
fn test_row_keys_sort_by_emitted_key_then_source_id() {
    let mut b1 = CollatableBuilder::new();
    b1.add_string("a");
    let mut b2 = CollatableBuilder::new();
    b2.add_string("b");
    let k1 = make_row_key(&b1.finish(), "doc2", 0);
    let k2 = make_row_key(&b2.finish(), "doc1", 0);
    assert!(k1 < k2);
}

#[test]
fn test_range_for_emitted_key_covers_all_source_ids() {
    let mut b = CollatableBuilder::new();
    b.add_string("city");
    let emitted = b.finish();
    let (min, max) = range_for_emitted_key(&emitted);
    let k_a = make_row_key(&emitted, "alice", 0);
    let k_z = make_row_key(&emitted, "zeta", 5);
    assert!(min <= k_a && k_a < max);
    assert!(min <= k_z && k_z < max);

    let mut other = CollatableBuilder::new();
    other.add_string("country");
    let k_other = make_row_key(&other.finish(), "bob", 0);
    assert!(!(min <= k_other && k_other < max));
}

#[test]
fn test_doc_keys_record_round_trip() {
    let rec = DocKeysRecord { hash: 0xdeadbeef, keys: vec![b"abc".to_vec(), b"de".to_vec()] };
    let encoded = rec.encode();
    let decoded = DocKeysRecord::decode(&encoded).unwrap();
    assert_eq!(decoded.hash, rec.hash);
    assert_eq!(decoded.keys, rec.keys);
}

#[test]
fn test_row_meta_round_trip() {
    let meta = encode_row_meta(123456);
    assert_eq!(decode_row_meta(&meta).unwrap(), 123456);
}

#[test]
fn test_djb2_fold_changes_with_content() {
    let h1 = djb2_fold(&[b"hello"]);
    let h2 = djb2_fold(&[b"world"]);
    assert_ne!(h1, h2);
    assert_eq!(djb2_fold(&[b"hello"]), h1);
}
