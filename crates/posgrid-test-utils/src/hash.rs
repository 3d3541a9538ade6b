//! FNV-1a hashing of trajectories for determinism checks.
//!
//! Values are hashed through their `Debug` output, so anything a test can
//! print can be compared across runs without extra trait bounds. Not
//! cryptographically secure.

use std::fmt::{self, Write as _};

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Incremental FNV-1a hash over a sequence of `Debug` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrajectoryHasher {
    hash: u64,
}

impl TrajectoryHasher {
    pub fn new() -> Self {
        Self { hash: FNV_OFFSET }
    }

    /// Fold `value` into the hash. A separator byte keeps `("ab", "c")`
    /// and `("a", "bc")` apart.
    pub fn feed<T: fmt::Debug + ?Sized>(&mut self, value: &T) {
        let mut text = String::new();
        let _ = write!(text, "{value:?}");
        for b in text.bytes().chain(std::iter::once(0xff)) {
            self.hash = (self.hash ^ u64::from(b)).wrapping_mul(FNV_PRIME);
        }
    }

    pub fn finish(&self) -> u64 {
        self.hash
    }
}

impl Default for TrajectoryHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// FNV-1a hash of a single value's `Debug` output.
pub fn debug_hash<T: fmt::Debug + ?Sized>(value: &T) -> u64 {
    let mut h = TrajectoryHasher::new();
    h.feed(value);
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hasher_is_offset_basis() {
        assert_eq!(TrajectoryHasher::new().finish(), FNV_OFFSET);
    }

    #[test]
    fn order_and_boundaries_matter() {
        let mut a = TrajectoryHasher::new();
        a.feed("ab");
        a.feed("c");
        let mut b = TrajectoryHasher::new();
        b.feed("a");
        b.feed("bc");
        assert_ne!(a.finish(), b.finish());
        assert_eq!(debug_hash(&[1, 2]), debug_hash(&vec![1, 2]));
    }
}
