use super::*;

#[test]
fn test_parse_and_format_round_trip() {
    let v = VersionVector::parse("2@bob,1@alice").unwrap();
    assert_eq!(v.format(), "2@bob,1@alice");
}

#[test]
fn test_parse_rejects_missing_at() {
    assert!(VersionVector::parse("2bob").is_err());
}

#[test]
fn test_parse_rejects_duplicate_author() {
    assert!(VersionVector::parse("2@bob,3@bob").is_err());
}

#[test]
fn test_parse_rejects_oversize_generation() {
    assert!(VersionVector::parse("400000001@bob").is_err());
}

#[test]
fn test_parse_rejects_oversize_author() {
    let long_author = "a".repeat(65);
    assert!(VersionVector::parse(&format!("1@{}", long_author)).is_err());
}

#[test]
fn test_compare_same() {
    let v1 = VersionVector::parse("2@bob").unwrap();
    assert_eq!(v1.compare_to(&v1), Comparison::Same);
}

#[test]
fn test_compare_single_older_newer() {
    let v2 = VersionVector::parse("2@bob").unwrap();
    assert_eq!(v2.compare_single(3, "bob"), Comparison::Older);
    assert_eq!(v2.compare_single(1, "bob"), Comparison::Newer);
}

#[test]
fn test_compare_conflicting_when_both_diverge() {
    let a = VersionVector::parse("2@bob,1@alice").unwrap();
    let b = VersionVector::parse("1@bob,2@alice").unwrap();
    assert_eq!(a.compare_to(&b), Comparison::Conflicting);
}

#[test]
fn test_increment_gen_moves_author_to_front() {
    let mut v = VersionVector::parse("1@alice").unwrap();
    v.increment_gen("bob");
    assert_eq!(v.versions()[0].author, "bob");
    assert_eq!(v.versions()[0].generation, 1);
    v.increment_gen("bob");
    assert_eq!(v.versions()[0].generation, 2);
}

#[test]
fn test_merged_with_takes_max_generation_per_author() {
    let a = VersionVector::parse("2@bob,1@alice").unwrap();
    let b = VersionVector::parse("1@bob,5@alice,1@carl").unwrap();
    let merged = a.merged_with(&b);
    assert_eq!(merged.generation_of("bob"), 2);
    assert_eq!(merged.generation_of("alice"), 5);
    assert_eq!(merged.generation_of("carl"), 1);
}

#[test]
fn test_export_import_round_trips_local_peer_id() {
    let local = VersionVector::parse("1@*").unwrap();
    let exported = local.export("peer-42");
    assert_eq!(exported.format(), "1@peer-42");
    let imported = exported.import("peer-42");
    assert_eq!(imported.format(), "1@*");
}

#[test]
fn test_cbor_round_trip() {
    let v = VersionVector::parse("2@bob,1@alice").unwrap().with_content_hash(99);
    let bytes = v.encode().unwrap();
    let decoded = VersionVector::decode(&bytes).unwrap();
    assert_eq!(decoded, v);
}

#[test]
fn test_scenario_from_spec_older() {
    let v1 = VersionVector::parse("2@bob").unwrap();
    let v2 = VersionVector::parse("3@bob").unwrap();
    assert_eq!(v1.compare_to(&v1), Comparison::Same);
    assert_eq!(v1.compare_to(&v2), Comparison::Older);
}
