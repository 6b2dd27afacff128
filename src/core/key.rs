//! Variable identifiers.

use std::fmt;

/// Opaque identifier of one optimization variable.
///
/// Keys are totally ordered and hashable so they can index ordered and hashed maps.
/// Factors only reference keys; values are owned by [`Values`](crate::core::values::Values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Key(u64);

impl Key {
    pub const fn new(index: u64) -> Self {
        Key(index)
    }

    pub const fn index(self) -> u64 {
        self.0
    }
}

impl From<u64> for Key {
    fn from(index: u64) -> Self {
        Key(index)
    }
}

impl From<Key> for u64 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.0)
    }
}
