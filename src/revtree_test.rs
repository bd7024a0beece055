use super::*;

fn digest(gen: u64, tag: u8) -> RevID {
    RevID::digest(gen, vec![tag]).unwrap()
}

#[test]
fn test_insert_root_revision() {
    let mut tree = RevTree::new();
    let rev = digest(1, 0xaa);
    let outcome = tree.insert(rev.clone(), b"body".to_vec(), false, false, None, false).unwrap();
    assert_eq!(outcome.http_status, 201);
    assert_eq!(outcome.rev, Some(rev.clone()));
    assert_eq!(tree.current_revision().unwrap().rev_id, rev);
}

#[test]
fn test_insert_child_demotes_parent_leaf() {
    let mut tree = RevTree::new();
    let r1 = digest(1, 1);
    tree.insert(r1.clone(), b"a".to_vec(), false, false, None, false).unwrap();
    let r2 = digest(2, 2);
    let outcome = tree.insert(r2.clone(), b"b".to_vec(), false, false, Some(&r1), false).unwrap();
    assert_eq!(outcome.http_status, 201);
    assert!(!tree.get(&r1).unwrap().leaf);
    assert!(tree.get(&r2).unwrap().leaf);
    assert_eq!(tree.current_revision().unwrap().rev_id, r2);
}

#[test]
fn test_insert_duplicate_is_noop_200() {
    let mut tree = RevTree::new();
    let r1 = digest(1, 1);
    tree.insert(r1.clone(), b"a".to_vec(), false, false, None, false).unwrap();
    let outcome = tree.insert(r1.clone(), b"a".to_vec(), false, false, None, false).unwrap();
    assert_eq!(outcome.http_status, 200);
    assert_eq!(outcome.rev, None);
}

#[test]
fn test_insert_on_nonleaf_parent_without_allow_conflict_is_409() {
    let mut tree = RevTree::new();
    let r1 = digest(1, 1);
    tree.insert(r1.clone(), b"a".to_vec(), false, false, None, false).unwrap();
    let r2 = digest(2, 2);
    tree.insert(r2, b"b".to_vec(), false, false, Some(&r1), false).unwrap();

    let r2b = digest(2, 3);
    let outcome = tree.insert(r2b, b"c".to_vec(), false, false, Some(&r1), false).unwrap();
    assert_eq!(outcome.http_status, 409);
}

#[test]
fn test_insert_conflict_allowed_creates_second_leaf() {
    let mut tree = RevTree::new();
    let r1 = digest(1, 1);
    tree.insert(r1.clone(), b"a".to_vec(), false, false, None, false).unwrap();
    let r2a = digest(2, 2);
    tree.insert(r2a.clone(), b"b".to_vec(), false, false, Some(&r1), false).unwrap();
    let r2b = digest(2, 3);
    let outcome = tree.insert(r2b.clone(), b"c".to_vec(), false, false, Some(&r1), true).unwrap();
    assert_eq!(outcome.http_status, 201);
    assert_eq!(tree.leaf_count(), 2);
}

#[test]
fn test_insert_missing_parent_is_404() {
    let mut tree = RevTree::new();
    let ghost = digest(1, 9);
    let r2 = digest(2, 2);
    let outcome = tree.insert(r2, b"b".to_vec(), false, false, Some(&ghost), true).unwrap();
    assert_eq!(outcome.http_status, 404);
}

#[test]
fn test_insert_wrong_generation_is_400() {
    let mut tree = RevTree::new();
    let r1 = digest(1, 1);
    tree.insert(r1.clone(), b"a".to_vec(), false, false, None, false).unwrap();
    let bad = digest(5, 2);
    let outcome = tree.insert(bad, b"b".to_vec(), false, false, Some(&r1), true).unwrap();
    assert_eq!(outcome.http_status, 400);
}

#[test]
fn test_insert_history_new_branch_returns_len_as_common_ancestor() {
    let mut tree = RevTree::new();
    let history = vec![digest(3, 3), digest(2, 2), digest(1, 1)];
    let common = tree.insert_history(&history, b"body".to_vec(), false, false).unwrap();
    assert_eq!(common, 3);
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.current_revision().unwrap().rev_id, history[0]);
}

#[test]
fn test_insert_history_with_known_ancestor() {
    let mut tree = RevTree::new();
    let r1 = digest(1, 1);
    tree.insert(r1.clone(), b"a".to_vec(), false, false, None, false).unwrap();

    let history = vec![digest(3, 3), digest(2, 2), r1.clone()];
    let common = tree.insert_history(&history, b"body".to_vec(), false, false).unwrap();
    assert_eq!(common, 2);
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.current_revision().unwrap().rev_id, history[0]);
}

#[test]
fn test_insert_history_bad_generation_sequence_returns_negative_one() {
    let mut tree = RevTree::new();
    let history = vec![digest(5, 3), digest(2, 2), digest(1, 1)];
    let common = tree.insert_history(&history, b"body".to_vec(), false, false).unwrap();
    assert_eq!(common, -1);
}

#[test]
fn test_prune_removes_revisions_beyond_max_depth() {
    let mut tree = RevTree::new();
    let mut parent = None;
    let mut revs = Vec::new();
    for gen in 1..=5u64 {
        let r = digest(gen, gen as u8);
        tree.insert(r.clone(), format!("b{}", gen).into_bytes(), false, false, parent.as_ref(), false)
            .unwrap();
        parent = Some(r.clone());
        revs.push(r);
    }
    tree.prune(2);
    assert_eq!(tree.len(), 2);
    assert_eq!(tree.current_revision().unwrap().rev_id, revs[4]);
}

#[test]
fn test_purge_leaf_removes_dead_branch_up_to_fork() {
    let mut tree = RevTree::new();
    let r1 = digest(1, 1);
    tree.insert(r1.clone(), b"a".to_vec(), false, false, None, false).unwrap();
    let r2a = digest(2, 2);
    tree.insert(r2a.clone(), b"b".to_vec(), false, false, Some(&r1), false).unwrap();
    let r2b = digest(2, 3);
    tree.insert(r2b.clone(), b"c".to_vec(), false, false, Some(&r1), true).unwrap();

    tree.purge(&r2b).unwrap();
    assert_eq!(tree.len(), 2);
    assert!(tree.get(&r2b).is_none());
    assert!(tree.get(&r1).is_some());
    assert!(tree.get(&r2a).is_some());
}

#[test]
fn test_purge_rejects_non_leaf() {
    let mut tree = RevTree::new();
    let r1 = digest(1, 1);
    tree.insert(r1.clone(), b"a".to_vec(), false, false, None, false).unwrap();
    let r2 = digest(2, 2);
    tree.insert(r2, b"b".to_vec(), false, false, Some(&r1), false).unwrap();
    assert!(tree.purge(&r1).is_err());
}

#[test]
fn test_encode_decode_round_trip() {
    let mut tree = RevTree::new();
    let r1 = digest(1, 1);
    tree.insert(r1.clone(), b"alpha".to_vec(), false, false, None, false).unwrap();
    let r2 = digest(2, 2);
    tree.insert(r2.clone(), b"beta".to_vec(), true, true, Some(&r1), false).unwrap();

    let encoded = tree.encode();
    let decoded = RevTree::decode(&encoded).unwrap();
    assert_eq!(decoded.len(), tree.len());
    let d2 = decoded.get(&r2).unwrap();
    assert!(d2.deleted);
    assert!(d2.has_attachments);
    assert_eq!(d2.inline_body.as_deref(), Some(&b"beta"[..]));
    let d1 = decoded.get(&r1).unwrap();
    assert!(!d1.leaf);
}

#[test]
fn test_decode_rejects_truncated_buffer() {
    let bytes = vec![0u8, 0, 0];
    assert!(RevTree::decode(&bytes).is_err());
}
