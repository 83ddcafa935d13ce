use pretty_assertions::assert_eq;

use super::*;

#[test]
fn equal_texts_hash_equal() {
    assert_eq!(hash_str("class A {}"), hash_str("class A {}"));
    assert_ne!(hash_str("class A {}"), hash_str("class A { }"));
}

#[test]
fn hex_round_trips() {
    let hash = hash_str("plume");
    assert_eq!(hash.to_hex().len(), 16);
    assert_eq!(ContentHash::from_hex(&hash.to_hex()), Some(hash));
    assert_eq!(hash.to_string(), hash.to_hex());
    assert_eq!(ContentHash::from_hex("not hex"), None);
}

#[test]
fn combination_depends_on_order() {
    let a = hash_str("a");
    let b = hash_str("b");
    assert_eq!(combine_hashes(&[a, b]), combine_hashes(&[a, b]));
    assert_ne!(combine_hashes(&[a, b]), combine_hashes(&[b, a]));
    assert_ne!(combine_hashes(&[a]), combine_hashes(&[a, a]));
}
