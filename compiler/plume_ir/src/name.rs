//! Interned string identifier.
//!
//! Every identifier, member name, type name and string literal in a
//! [`SyntaxTree`](crate::SyntaxTree) is stored as a `Name`. Names compare in
//! O(1) and are `Copy`, which keeps node kinds `Copy` as well.

use std::fmt;

/// Handle to a string in a [`StringInterner`](crate::StringInterner).
///
/// The top [`Name::SHARD_BITS`] bits select the interner shard; the rest
/// index into that shard. `Name(0)` is the empty string in shard 0.
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    pub const EMPTY: Name = Name(0);

    pub const SHARD_BITS: u32 = 4;
    pub const NUM_SHARDS: usize = 1 << Self::SHARD_BITS;
    const LOCAL_BITS: u32 = u32::BITS - Self::SHARD_BITS;
    /// Largest index a shard can hand out.
    pub const MAX_LOCAL: u32 = (1 << Self::LOCAL_BITS) - 1;

    #[inline]
    pub const fn new(shard: u32, local: u32) -> Self {
        debug_assert!((shard as usize) < Self::NUM_SHARDS);
        debug_assert!(local <= Self::MAX_LOCAL);
        Name((shard << Self::LOCAL_BITS) | local)
    }

    #[inline]
    pub const fn shard(self) -> usize {
        (self.0 >> Self::LOCAL_BITS) as usize
    }

    #[inline]
    pub const fn local(self) -> usize {
        (self.0 & Self::MAX_LOCAL) as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == Self::EMPTY.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("Name(<empty>)");
        }
        write!(f, "Name({}:{})", self.shard(), self.local())
    }
}
