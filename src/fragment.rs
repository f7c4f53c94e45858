//! Diff fragments: the ordered output consumed by renderers.
//!
//! Fragments follow the new text. Moved text appears twice: as
//! [`Fragment::MoveStart`] where it now stands and as [`Fragment::MoveEnd`]
//! where it was taken from. Concatenating the new-side fragments gives the
//! new text back:
//!
//! ```
//! use tola_textdiff::diff;
//!
//! let result = diff("hello world", "hello there world").unwrap();
//! assert_eq!(result.new_text(), "hello there world");
//! assert_eq!(result.old_text(), "hello world");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::algo::{Block, BlockKind, MoveDirection, MoveGroup};
use crate::id::MoveGroupId;
use crate::span::Span;

// =============================================================================
// Fragment
// =============================================================================

/// One piece of the diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    /// Unchanged text that stayed in place (text of the new version)
    Copy { text: String, old: Span, new: Span },

    /// Inserted text, inside a moved group when `group` is set
    Insert {
        text: String,
        new: Span,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<MoveGroupId>,
    },

    /// Deleted text, inside a moved group when `group` is set
    Delete {
        text: String,
        old: Span,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<MoveGroupId>,
    },

    /// Moved unchanged text at its new position
    MoveStart {
        text: String,
        old: Span,
        new: Span,
        group: MoveGroupId,
        direction: MoveDirection,
    },

    /// Original position of a moved group, carrying its old text
    MoveEnd {
        text: String,
        old: Span,
        group: MoveGroupId,
        direction: MoveDirection,
    },

    /// Unchanged text elided by clipping
    Omission { text: String, old: Span, new: Span },
}

/// Fragment variant without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    Copy,
    Insert,
    Delete,
    MoveStart,
    MoveEnd,
    Omission,
}

impl FragmentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            FragmentKind::Copy => "copy",
            FragmentKind::Insert => "insert",
            FragmentKind::Delete => "delete",
            FragmentKind::MoveStart => "move_start",
            FragmentKind::MoveEnd => "move_end",
            FragmentKind::Omission => "omission",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Fragment {
    #[inline]
    pub fn kind(&self) -> FragmentKind {
        match self {
            Fragment::Copy { .. } => FragmentKind::Copy,
            Fragment::Insert { .. } => FragmentKind::Insert,
            Fragment::Delete { .. } => FragmentKind::Delete,
            Fragment::MoveStart { .. } => FragmentKind::MoveStart,
            Fragment::MoveEnd { .. } => FragmentKind::MoveEnd,
            Fragment::Omission { .. } => FragmentKind::Omission,
        }
    }

    #[inline]
    pub fn text(&self) -> &str {
        match self {
            Fragment::Copy { text, .. }
            | Fragment::Insert { text, .. }
            | Fragment::Delete { text, .. }
            | Fragment::MoveStart { text, .. }
            | Fragment::MoveEnd { text, .. }
            | Fragment::Omission { text, .. } => text,
        }
    }

    /// Move group the fragment belongs to.
    #[inline]
    pub fn group(&self) -> Option<MoveGroupId> {
        match self {
            Fragment::Insert { group, .. } | Fragment::Delete { group, .. } => *group,
            Fragment::MoveStart { group, .. } | Fragment::MoveEnd { group, .. } => Some(*group),
            Fragment::Copy { .. } | Fragment::Omission { .. } => None,
        }
    }

    /// Span in the old text, if the fragment has one.
    #[inline]
    pub fn old(&self) -> Option<Span> {
        match self {
            Fragment::Copy { old, .. }
            | Fragment::Delete { old, .. }
            | Fragment::MoveStart { old, .. }
            | Fragment::MoveEnd { old, .. }
            | Fragment::Omission { old, .. } => Some(*old),
            Fragment::Insert { .. } => None,
        }
    }

    /// Span in the new text, if the fragment has one.
    #[inline]
    pub fn new(&self) -> Option<Span> {
        match self {
            Fragment::Copy { new, .. }
            | Fragment::Insert { new, .. }
            | Fragment::MoveStart { new, .. }
            | Fragment::Omission { new, .. } => Some(*new),
            Fragment::Delete { .. } | Fragment::MoveEnd { .. } => None,
        }
    }

    /// Text belongs to the new version at this position.
    #[inline]
    pub fn is_new_content(&self) -> bool {
        matches!(
            self,
            Fragment::Copy { .. }
                | Fragment::Insert { .. }
                | Fragment::MoveStart { .. }
                | Fragment::Omission { .. }
        )
    }

    /// Text belongs to the old version at this position.
    ///
    /// Deletions inside a moved group are part of its [`Fragment::MoveEnd`].
    #[inline]
    pub fn is_old_content(&self) -> bool {
        matches!(
            self,
            Fragment::Copy { .. }
                | Fragment::Delete { group: None, .. }
                | Fragment::MoveEnd { .. }
                | Fragment::Omission { .. }
        )
    }

    /// Whether `other` directly continues this fragment.
    fn joins(&self, other: &Fragment) -> bool {
        self.kind() == other.kind()
            && self.group() == other.group()
            && !self.text().is_empty()
            && !other.text().is_empty()
            && !matches!(self, Fragment::MoveEnd { .. } | Fragment::Omission { .. })
    }

    /// Append `other`, which must satisfy [`Fragment::joins`].
    fn absorb(&mut self, other: Fragment) {
        let extra = other.text().to_owned();
        let (other_old, other_new) = (other.old(), other.new());
        match self {
            Fragment::Copy { text, old, new }
            | Fragment::MoveStart { text, old, new, .. } => {
                text.push_str(&extra);
                *old = cover(*old, other_old);
                *new = cover(*new, other_new);
            }
            Fragment::Insert { text, new, .. } => {
                text.push_str(&extra);
                *new = cover(*new, other_new);
            }
            Fragment::Delete { text, old, .. } => {
                text.push_str(&extra);
                *old = cover(*old, other_old);
            }
            Fragment::MoveEnd { text, .. } | Fragment::Omission { text, .. } => text.push_str(&extra),
        }
    }
}

#[inline]
fn cover(span: Span, other: Option<Span>) -> Span {
    other.map_or(span, |o| span.cover(o))
}

// =============================================================================
// Assembly
// =============================================================================

/// Turn the final block list into fragments, joining consecutive fragments
/// of the same kind and group.
pub(crate) fn assemble(blocks: &[Block], move_groups: &[MoveGroup], old: &str, new: &str) -> Vec<Fragment> {
    let mut fragments: Vec<Fragment> = Vec::with_capacity(blocks.len());

    for block in blocks {
        let fragment = match block.kind() {
            BlockKind::Unchanged => {
                let text = block.text(old, new).to_owned();
                let (old_span, new_span) = (block.old().unwrap_or_default(), block.new().unwrap_or_default());
                match (block.move_group(), block.direction()) {
                    (Some(group), Some(direction)) => Fragment::MoveStart {
                        text,
                        old: old_span,
                        new: new_span,
                        group,
                        direction,
                    },
                    _ => Fragment::Copy {
                        text,
                        old: old_span,
                        new: new_span,
                    },
                }
            }
            BlockKind::Inserted => Fragment::Insert {
                text: block.text(old, new).to_owned(),
                new: block.new().unwrap_or_default(),
                group: block.move_group(),
            },
            BlockKind::Deleted => Fragment::Delete {
                text: block.text(old, new).to_owned(),
                old: block.old().unwrap_or_default(),
                group: block.move_group(),
            },
            BlockKind::MoveMark => {
                let (Some(group), Some(direction)) = (block.move_group(), block.direction()) else {
                    continue;
                };
                let Some(moved) = move_groups.get(group.index()) else {
                    continue;
                };
                Fragment::MoveEnd {
                    text: moved_old_text(&blocks[moved.blocks()], old),
                    old: moved.old(),
                    group,
                    direction,
                }
            }
        };

        match fragments.last_mut() {
            Some(last) if last.joins(&fragment) => last.absorb(fragment),
            _ => fragments.push(fragment),
        }
    }
    fragments
}

/// Old text of a moved group: its unchanged and deleted blocks in order.
fn moved_old_text(blocks: &[Block], old: &str) -> String {
    blocks
        .iter()
        .filter(|b| matches!(b.kind(), BlockKind::Unchanged | BlockKind::Deleted))
        .filter_map(|b| b.old())
        .map(|span| span.slice(old))
        .collect()
}

/// Concatenate the new-side fragments.
pub(crate) fn new_text(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .filter(|f| f.is_new_content())
        .map(Fragment::text)
        .collect()
}

/// Concatenate the old-side fragments.
pub(crate) fn old_text(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .filter(|f| f.is_old_content())
        .map(Fragment::text)
        .collect()
}
