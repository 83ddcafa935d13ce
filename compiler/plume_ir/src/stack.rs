//! Stack growth for deep recursion.
//!
//! Tree walks, lowering and printing recurse once per nesting level. Long
//! `else if` chains produced by switch lowering nest deeply, so recursive
//! entry points wrap their bodies in [`ensure_sufficient_stack`].

/// Remaining stack below which we grow (100KB).
const RED_ZONE: usize = 100 * 1024;

/// Stack allocated per growth (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first growing the stack if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
