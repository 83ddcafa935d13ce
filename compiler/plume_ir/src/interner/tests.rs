use super::*;

#[test]
fn test_intern_and_lookup() {
    let interner = StringInterner::new();

    let hello = interner.intern("hello");
    let world = interner.intern("world");
    let hello2 = interner.intern("hello");

    assert_eq!(hello, hello2);
    assert_ne!(hello, world);
    assert_eq!(interner.lookup(hello), "hello");
    assert_eq!(interner.lookup(world), "world");
}

#[test]
fn test_empty_string() {
    let interner = StringInterner::new();
    assert_eq!(interner.intern(""), Name::EMPTY);
    assert_eq!(interner.lookup(Name::EMPTY), "");
}

#[test]
fn test_well_known_pre_interned() {
    let interner = StringInterner::new();
    let before = interner.len();
    let _ = interner.intern("Deconstruct");
    let _ = interner.intern("GetHashCode");
    assert_eq!(interner.len(), before);
}

#[test]
fn test_shared_interner_across_threads() {
    let interner = SharedInterner::new();
    let clone = interner.clone();

    let handle = std::thread::spawn(move || clone.intern("shared"));
    let from_thread = handle.join().unwrap();

    assert_eq!(interner.intern("shared"), from_thread);
}
