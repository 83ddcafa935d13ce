//! Node IDs and list ranges for the arena syntax tree.
//!
//! Nodes never own their children. They hold 4-byte IDs into the arenas of
//! a [`SyntaxTree`](crate::SyntaxTree), and lists are `(start, len)` ranges
//! into flattened side tables. Replacing a subtree only rewrites one slot.

/// Define a `u32` node ID with an `INVALID` sentinel for absent children.
macro_rules! define_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => { $(
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Sentinel for an absent child.
            pub const INVALID: $name = $name(u32::MAX);

            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            /// Index into the owning arena.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn is_valid(self) -> bool {
                self.0 != u32::MAX
            }

            /// `Some(self)` when valid.
            #[inline]
            pub const fn valid(self) -> Option<Self> {
                if self.is_valid() {
                    Some(self)
                } else {
                    None
                }
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                if self.is_valid() {
                    write!(f, "{}({})", stringify!($name), self.0)
                } else {
                    write!(f, "{}::INVALID", stringify!($name))
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }
    )* };
}

/// Define a range type over a flattened side table.
///
/// Each generated type has `start: u32` and `len: u16` fields, an `EMPTY`
/// constant, and `new()`, `is_empty()`, `len()`, `indices()` methods.
macro_rules! define_range {
    ($($name:ident),* $(,)?) => { $(
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
        #[repr(C)]
        pub struct $name {
            pub start: u32,
            pub len: u16,
        }

        impl $name {
            pub const EMPTY: Self = Self { start: 0, len: 0 };

            #[inline]
            pub const fn new(start: u32, len: u16) -> Self {
                Self { start, len }
            }

            #[inline]
            pub const fn is_empty(&self) -> bool {
                self.len == 0
            }

            #[inline]
            pub const fn len(&self) -> usize {
                self.len as usize
            }

            /// Side-table indices covered by this range.
            #[inline]
            pub fn indices(&self) -> ::std::ops::Range<usize> {
                let start = self.start as usize;
                start..start + self.len as usize
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({}..{})", stringify!($name), self.start, self.start + u32::from(self.len))
            }
        }
    )* };
}

define_id!(
    /// Index into the expression arena.
    ExprId,
    /// Index into the statement arena.
    StmtId,
    /// Index into the pattern arena.
    PatternId,
    /// Index into the type-syntax arena.
    TypeExprId,
    /// Index into the lambda table.
    LambdaId,
    /// Index into the local-function table.
    LocalFnId,
);

define_range!(
    ExprRange,
    StmtRange,
    PatternRange,
    TypeRange,
    ParamRange,
    ArmRange,
    SectionRange,
    LabelRange,
    PropPatRange,
    FieldInitRange,
    InterpPartRange,
);
