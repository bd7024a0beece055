use super::*;

#[test]
fn test_digest_form_round_trip() {
    let r = RevID::digest(1, vec![0xaa, 0xbb]).unwrap();
    let s = r.format();
    assert_eq!(s, "1-aabb");
    assert_eq!(RevID::parse(&s).unwrap(), r);
}

#[test]
fn test_clock_form_round_trip() {
    let r = RevID::clock(3, "bob".to_string()).unwrap();
    let s = r.format();
    assert_eq!(s, "3@bob");
    assert_eq!(RevID::parse(&s).unwrap(), r);
}

#[test]
fn test_binary_round_trip_digest() {
    let r = RevID::digest(42, vec![1, 2, 3, 4]).unwrap();
    let mut buf = Vec::new();
    r.encode(&mut buf);
    let decoded = RevID::decode(&buf).unwrap();
    assert_eq!(decoded, r);
}

#[test]
fn test_binary_round_trip_clock() {
    let r = RevID::clock(7, "alice".to_string()).unwrap();
    let mut buf = Vec::new();
    r.encode(&mut buf);
    assert_eq!(buf[0], 0x00);
    let decoded = RevID::decode(&buf).unwrap();
    assert_eq!(decoded, r);
}

#[test]
fn test_generation_zero_is_rejected() {
    assert!(RevID::digest(0, vec![1]).is_err());
}

#[test]
fn test_generation_over_max_is_rejected() {
    assert!(RevID::digest(400_000_001, vec![1]).is_err());
}

#[test]
fn test_empty_digest_is_rejected() {
    assert!(RevID::digest(1, vec![]).is_err());
}

#[test]
fn test_parse_rejects_garbage() {
    assert!(RevID::parse("garbage").is_err());
    assert!(RevID::parse("not-hex").is_err());
}
