//! Integer identities for arena-stored diff entities.
//!
//! Tokens live in one arena per text version and are addressed by
//! [`TokenId`]. Groups of blocks and move groups are numbered per diff.
//! All ids are plain indices: they are only meaningful for the diff that
//! produced them.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! index_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(index: usize) -> Self {
                Self(index as u32)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

index_id!(
    /// Index of a token in a text's token arena.
    TokenId,
    "t"
);

index_id!(
    /// Index of a block group (run of blocks consecutive in both versions).
    GroupId,
    "g"
);

index_id!(
    /// Identity of one detected relocation.
    ///
    /// Numbered from zero in new-text order of the moved groups, so the same
    /// pair of texts always yields the same ids.
    MoveGroupId,
    "m"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip_index() {
        assert_eq!(TokenId::new(42).index(), 42);
        assert_eq!(GroupId::new(3).to_string(), "g3");
        assert_eq!(MoveGroupId::new(0).to_string(), "m0");
    }

    #[test]
    fn test_id_ordering() {
        assert!(MoveGroupId::new(1) < MoveGroupId::new(2));
    }
}
