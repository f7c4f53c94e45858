//! Prelude module for common imports.
//!
//! ```
//! use tola_textdiff::prelude::*;
//!
//! let differ = TextDiffer::new(DiffConfig::coarse()).unwrap();
//! let result = differ.diff("one two", "two one");
//! assert_eq!(result.new_text(), "two one");
//! ```

// Engine
pub use crate::diff::{DiffStats, TextDiff, TextDiffer, diff, diff_bytes, diff_with_config};

// Output
pub use crate::algo::{Block, BlockKind, MoveDirection, MoveGroup};
pub use crate::fragment::{Fragment, FragmentKind};

// Configuration
pub use crate::config::{ClipConfig, DiffConfig, DiffConfigBuilder, SplitPatterns};
pub use crate::split::Level;

// Identity and spans
pub use crate::id::MoveGroupId;
pub use crate::span::Span;

// Error
pub use crate::error::{ConfigError, DiffError, DiffResult};
