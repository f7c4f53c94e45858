//! Deterministic hashing of diff results
//!
//! Provides cross-process deterministic fingerprints using blake3.

use crate::fragment::Fragment;
use crate::span::Span;

// =============================================================================
// StableHasher - Builder Pattern
// =============================================================================

/// A deterministic hasher using blake3
///
/// Unlike `std::hash::Hasher`, this produces the same output across
/// process restarts and platforms for the same input.
pub struct StableHasher {
    inner: blake3::Hasher,
}

impl StableHasher {
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// Update with raw bytes
    #[inline]
    pub fn update(mut self, data: &[u8]) -> Self {
        self.inner.update(data);
        self
    }

    /// Update with a length-prefixed string
    #[inline]
    pub fn update_str(self, s: &str) -> Self {
        self.update_usize(s.len()).update(s.as_bytes())
    }

    /// Update with a u64 value (little-endian)
    #[inline]
    pub fn update_u64(self, v: u64) -> Self {
        self.update(&v.to_le_bytes())
    }

    /// Update with a usize value, widened to u64
    #[inline]
    pub fn update_usize(self, v: usize) -> Self {
        self.update_u64(v as u64)
    }

    /// Update with an optional span; absent spans hash as a marker byte
    #[inline]
    pub fn update_span(self, span: Option<Span>) -> Self {
        match span {
            Some(span) => self.update(&[1]).update_usize(span.start).update_usize(span.end),
            None => self.update(&[0]),
        }
    }

    /// Finish and return the hash as u64
    ///
    /// Takes the first 8 bytes of blake3 output as little-endian u64.
    #[inline]
    pub fn finish(self) -> u64 {
        let hash = self.inner.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl Default for StableHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Fingerprint of a fragment list: kinds, texts, spans and move groups.
pub fn fingerprint(fragments: &[Fragment]) -> u64 {
    fragments
        .iter()
        .fold(StableHasher::new().update_usize(fragments.len()), |hasher, fragment| {
            let group = fragment.group().map_or(u64::MAX, |g| g.index() as u64);
            hasher
                .update_str(fragment.kind().as_str())
                .update_str(fragment.text())
                .update_span(fragment.old())
                .update_span(fragment.new())
                .update_u64(group)
        })
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hasher_deterministic() {
        let a = StableHasher::new().update_str("abc").update_u64(7).finish();
        let b = StableHasher::new().update_str("abc").update_u64(7).finish();
        assert_eq!(a, b);
    }

    #[test]
    fn test_length_prefix_separates_strings() {
        let a = StableHasher::new().update_str("ab").update_str("c").finish();
        let b = StableHasher::new().update_str("a").update_str("bc").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_sensitive_to_kind() {
        let span = Span::new(0, 1);
        let copy = Fragment::Copy {
            text: "a".into(),
            old: span,
            new: span,
        };
        let insert = Fragment::Insert {
            text: "a".into(),
            new: span,
            group: None,
        };
        assert_ne!(fingerprint(&[copy.clone()]), fingerprint(&[insert]));
        assert_eq!(fingerprint(&[copy.clone()]), fingerprint(&[copy]));
        assert_ne!(fingerprint(&[]), 0);
    }
}
