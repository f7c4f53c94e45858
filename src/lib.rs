//! tola-textdiff - Multi-granularity text diff with moved block detection
//!
//! ## Core Concepts
//!
//! **Hierarchical matching**: both texts are split into paragraphs, lines,
//! sentences, chunks, words and characters. Each level links tokens that are
//! unique in both versions and extends the links to their identical
//! neighbours, so only the unmatched remainder is refined further.
//!
//! **Move detection**: unchanged text is grouped into blocks. The longest
//! in-order chain of groups stays in place and every other group is reported
//! as a relocation with a marker at its original position.
//!
//! ## Modules
//! - `config`: options, presets and JSON loading
//! - `split`: boundary patterns and levels
//! - `algo`: matching, alignment, blocks and move detection
//! - `fragment`: the ordered output consumed by renderers
//! - `diff`: the `TextDiffer` engine and entry points
//!
//! ## Usage
//!
//! ```
//! use tola_textdiff::{diff, FragmentKind};
//!
//! let result = diff("hello world", "hello there world").unwrap();
//! let kinds: Vec<_> = result.fragments().iter().map(|f| f.kind()).collect();
//! assert_eq!(kinds, [FragmentKind::Copy, FragmentKind::Insert, FragmentKind::Copy]);
//! assert_eq!(result.fragments()[1].text(), "there ");
//! ```

// =============================================================================
// Core modules
// =============================================================================

/// Algorithms: matching, gap alignment, blocks, move detection
pub mod algo;

/// Diff options
pub mod config;

/// Diff engine and entry points
pub mod diff;

/// Error types
pub mod error;

/// Output fragments
pub mod fragment;

/// Deterministic hashing
pub mod hash;

/// Integer identities
pub mod id;

/// Prelude for common imports
pub mod prelude;

/// Byte spans
pub mod span;

/// Split levels and boundary patterns
pub mod split;

mod clip;
mod text;

// =============================================================================
// Re-exports
// =============================================================================

// Engine
pub use diff::{DiffStats, TextDiff, TextDiffer, diff, diff_bytes, diff_with_config};

// Output
pub use algo::{Block, BlockKind, MoveDirection, MoveGroup};
pub use fragment::{Fragment, FragmentKind};

// Configuration
pub use config::{ClipConfig, DiffConfig, DiffConfigBuilder, SplitPatterns};
pub use split::{Level, SplitRules};

// Identity and spans
pub use id::{GroupId, MoveGroupId};
pub use span::Span;

// Hashing
pub use hash::StableHasher;

// Error types
pub use error::{ConfigError, DiffError, DiffResult, InputError, Side};

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use static_assertions::assert_impl_all;

    assert_impl_all!(TextDiff: Send, Sync, Clone);
    assert_impl_all!(TextDiffer: Send, Sync, Clone);
    assert_impl_all!(Fragment: Send, Sync, serde::Serialize);
    assert_impl_all!(DiffConfig: Send, Sync, Default);

    #[test]
    fn test_reexports_cover_output() {
        let result = diff("a", "b").unwrap();
        let kinds: Vec<FragmentKind> = result.fragments().iter().map(Fragment::kind).collect();
        assert!(kinds.contains(&FragmentKind::Insert));
        assert!(kinds.contains(&FragmentKind::Delete));
        assert_eq!(result.stats().changed_bytes(), 2);
    }
}
