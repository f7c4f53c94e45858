//! Text Diff Engine
//!
//! Computes the fragment sequence between two versions of a text.
//! This is a pure algorithm module with no I/O dependencies.
//!
//! # Algorithm
//!
//! 1. Split both texts into paragraphs and link unique paragraphs
//! 2. Refine unlinked regions level by level (line, sentence, chunk, word)
//!    and link again, extending matches from every unique anchor
//! 3. Optionally split similar unlinked words into characters
//! 4. Slide gaps toward line breaks and word borders
//! 5. Build blocks, fix the longest in-order chain and report the rest as moves
//! 6. Assemble fragments, optionally clipping long unchanged text
//!
//! # Complexity
//!
//! - Time: O(n) per level for unique anchors, plus the unlinked regions
//!   revisited by recursion (bounded by `recursion_max`)
//! - Space: O(n) tokens per text, freed with the diff context

use serde::{Deserialize, Serialize};

use crate::algo::{self, Block, BlockKind, Matcher, MoveGroup};
use crate::clip;
use crate::config::DiffConfig;
use crate::error::{ConfigError, DiffResult, InputError, Side};
use crate::fragment::{self, Fragment};
use crate::hash;
use crate::id::GroupId;
use crate::span::Span;
use crate::split::{Level, SplitRules};
use crate::text::{DiffText, Normalize};

/// Levels refined after the initial paragraph split.
const REFINE_LEVELS: [Level; 4] = [Level::Line, Level::Sentence, Level::Chunk, Level::Word];

// =============================================================================
// Public Types
// =============================================================================

/// Statistics from a diff operation (byte counts of the block texts)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct DiffStats {
    /// Unchanged text that stayed in place
    pub copied: usize,
    /// Text only in the new version
    pub inserted: usize,
    /// Text only in the old version
    pub deleted: usize,
    /// Unchanged text that was relocated
    pub moved: usize,
    /// Number of move groups
    pub move_groups: usize,
    /// Number of blocks, move marks included
    pub blocks: usize,
    /// Rounds of short-block unlinking
    pub unlink_rounds: usize,
}

impl DiffStats {
    /// No insertions, deletions or moves.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changed_bytes() == 0
    }

    /// Inserted, deleted and moved bytes.
    #[inline]
    pub fn changed_bytes(&self) -> usize {
        self.inserted + self.deleted + self.moved
    }

    fn from_blocks(blocks: &[Block], move_groups: usize, unlink_rounds: usize) -> Self {
        let mut stats = Self {
            move_groups,
            blocks: blocks.len(),
            unlink_rounds,
            ..Self::default()
        };
        for block in blocks {
            let new_len = block.new().map_or(0, |s| s.len());
            match block.kind() {
                BlockKind::Unchanged if block.is_moved() => stats.moved += new_len,
                BlockKind::Unchanged => stats.copied += new_len,
                BlockKind::Inserted => stats.inserted += new_len,
                BlockKind::Deleted => stats.deleted += block.old().map_or(0, |s| s.len()),
                BlockKind::MoveMark => {}
            }
        }
        stats
    }
}

/// Result of one diff.
#[derive(Debug, Clone)]
#[must_use]
pub struct TextDiff {
    fragments: Vec<Fragment>,
    blocks: Vec<Block>,
    move_groups: Vec<MoveGroup>,
    stats: DiffStats,
}

impl TextDiff {
    /// Ordered fragments, following the new text.
    #[inline]
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Final blocks in new-text order (before clipping).
    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn move_groups(&self) -> &[MoveGroup] {
        &self.move_groups
    }

    #[inline]
    pub fn stats(&self) -> DiffStats {
        self.stats
    }

    /// Check if any changes were detected
    #[inline]
    pub fn has_changes(&self) -> bool {
        !self.stats.is_empty()
    }

    /// The new text rebuilt from the fragments.
    pub fn new_text(&self) -> String {
        fragment::new_text(&self.fragments)
    }

    /// The old text rebuilt from the fragments.
    ///
    /// Exact when matching is case and whitespace sensitive; otherwise
    /// unchanged text is reported in its new-version spelling.
    pub fn old_text(&self) -> String {
        fragment::old_text(&self.fragments)
    }

    /// Deterministic hash of the fragment sequence.
    pub fn fingerprint(&self) -> u64 {
        hash::fingerprint(&self.fragments)
    }

    pub fn into_fragments(self) -> Vec<Fragment> {
        self.fragments
    }
}

// =============================================================================
// TextDiffer
// =============================================================================

/// Validated configuration with compiled split rules, reusable across diffs.
#[derive(Debug, Clone)]
pub struct TextDiffer {
    config: DiffConfig,
    rules: SplitRules,
}

impl TextDiffer {
    /// Validate `config` and compile its patterns.
    pub fn new(config: DiffConfig) -> Result<Self, ConfigError> {
        config.validate_limits()?;
        let rules = SplitRules::compile(&config.patterns)?;
        Ok(Self { config, rules })
    }

    #[inline]
    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    #[inline]
    pub fn rules(&self) -> &SplitRules {
        &self.rules
    }

    /// Diff `old` against `new`.
    pub fn diff(&self, old: &str, new: &str) -> TextDiff {
        DiffContext::new(&self.config, &self.rules, old, new).run()
    }

    /// Diff raw bytes, rejecting input that is not UTF-8.
    pub fn diff_bytes(&self, old: &[u8], new: &[u8]) -> DiffResult<TextDiff> {
        let old = decode(old, Side::Old)?;
        let new = decode(new, Side::New)?;
        Ok(self.diff(old, new))
    }

    /// Diff independent `(old, new)` pairs, in parallel with the `parallel`
    /// feature. Results keep the input order.
    pub fn diff_batch<S: AsRef<str> + Sync>(&self, pairs: &[(S, S)]) -> Vec<TextDiff> {
        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            pairs
                .par_iter()
                .map(|(old, new)| self.diff(old.as_ref(), new.as_ref()))
                .collect()
        }
        #[cfg(not(feature = "parallel"))]
        {
            pairs
                .iter()
                .map(|(old, new)| self.diff(old.as_ref(), new.as_ref()))
                .collect()
        }
    }
}

fn decode(bytes: &[u8], side: Side) -> Result<&str, InputError> {
    std::str::from_utf8(bytes).map_err(|err| InputError::InvalidUtf8 {
        side,
        valid_up_to: err.valid_up_to(),
    })
}

// =============================================================================
// Entry points
// =============================================================================

/// Diff two texts with the default configuration.
///
/// ```
/// use tola_textdiff::{diff, FragmentKind};
///
/// let result = diff("A B C D", "D A B C").unwrap();
/// assert_eq!(result.move_groups().len(), 1);
/// assert_eq!(result.fragments()[0].kind(), FragmentKind::MoveStart);
/// ```
pub fn diff(old: &str, new: &str) -> DiffResult<TextDiff> {
    diff_with_config(old, new, &DiffConfig::default())
}

/// Diff two texts with `config`.
///
/// Validates the configuration first; use [`TextDiffer`] to reuse it.
pub fn diff_with_config(old: &str, new: &str, config: &DiffConfig) -> DiffResult<TextDiff> {
    Ok(TextDiffer::new(config.clone())?.diff(old, new))
}

/// Diff raw bytes with `config`.
pub fn diff_bytes(old: &[u8], new: &[u8], config: &DiffConfig) -> DiffResult<TextDiff> {
    TextDiffer::new(config.clone())?.diff_bytes(old, new)
}

// =============================================================================
// Internal Context
// =============================================================================

/// Internal diff context
struct DiffContext<'c, 'a> {
    config: &'c DiffConfig,
    rules: &'c SplitRules,
    old: &'a str,
    new: &'a str,
}

impl<'c, 'a> DiffContext<'c, 'a> {
    fn new(config: &'c DiffConfig, rules: &'c SplitRules, old: &'a str, new: &'a str) -> Self {
        Self {
            config,
            rules,
            old,
            new,
        }
    }

    fn run(self) -> TextDiff {
        if let Some(result) = self.quick_path() {
            return result;
        }

        let normalize = Normalize::from_config(self.config);
        let mut new = DiffText::new(self.new, self.rules, normalize);
        let mut old = DiffText::new(self.old, self.rules, normalize);
        self.link_tokens(&mut new, &mut old);

        new.enumerate();
        old.enumerate();
        let detection = algo::detect(&mut new, &mut old, self.config, self.rules);
        self.finish(detection.blocks, detection.move_groups, detection.unlink_rounds)
    }

    /// Identical and one-sided inputs need no token matching.
    fn quick_path(&self) -> Option<TextDiff> {
        let (old, new) = (self.old, self.new);
        if old == new {
            let blocks = if new.is_empty() {
                Vec::new()
            } else {
                let mut block = self.whole_block(BlockKind::Unchanged, new);
                block.old = Some(Span::new(0, old.len()));
                block.new = Some(Span::new(0, new.len()));
                block.old_number = Some(0);
                block.new_number = Some(0);
                block.count = 1;
                block.group = Some(GroupId::new(0));
                block.fixed = true;
                vec![block]
            };
            return Some(self.finish(blocks, Vec::new(), 0));
        }
        if old.is_empty() {
            let mut block = self.whole_block(BlockKind::Inserted, new);
            block.new = Some(Span::new(0, new.len()));
            return Some(self.finish(vec![block], Vec::new(), 0));
        }
        if new.is_empty() {
            let mut block = self.whole_block(BlockKind::Deleted, old);
            block.old = Some(Span::new(0, old.len()));
            return Some(self.finish(vec![block], Vec::new(), 0));
        }
        None
    }

    fn whole_block(&self, kind: BlockKind, text: &str) -> Block {
        let mut block = Block::with_kind(kind);
        block.words = self.rules.count_words(text);
        block.chars = text.chars().count();
        block
    }

    /// Link tokens level by level, then refine and align the gaps.
    fn link_tokens(&self, new: &mut DiffText<'a>, old: &mut DiffText<'a>) {
        let mut matcher = Matcher::new(self.config, self.rules);

        new.split_all(self.rules, Level::Paragraph);
        old.split_all(self.rules, Level::Paragraph);
        matcher.match_level(new, old, Level::Paragraph);

        for level in REFINE_LEVELS {
            new.split_refine(self.rules, level);
            old.split_refine(self.rules, level);
            matcher.match_level(new, old, level);
        }

        algo::slide_gaps(new, old);
        algo::slide_gaps(old, new);

        if self.config.char_diff {
            algo::refine_chars(new, old, self.rules);
            matcher.match_level(new, old, Level::Character);
        }
        matcher.pair_gaps(new, old);
        algo::slide_gaps(new, old);
        algo::slide_gaps(old, new);

        tracing::debug!(links = matcher.links(), "linked tokens");
    }

    fn finish(&self, blocks: Vec<Block>, move_groups: Vec<MoveGroup>, unlink_rounds: usize) -> TextDiff {
        let mut fragments = fragment::assemble(&blocks, &move_groups, self.old, self.new);
        clip::clip_fragments(&mut fragments, &self.config.clip);
        let stats = DiffStats::from_blocks(&blocks, move_groups.len(), unlink_rounds);

        tracing::debug!(
            fragments = fragments.len(),
            inserted = stats.inserted,
            deleted = stats.deleted,
            moved = stats.moved,
            "assembled diff"
        );

        TextDiff {
            fragments,
            blocks,
            move_groups,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::FragmentKind;
    use pretty_assertions::assert_eq;

    fn summary(result: &TextDiff) -> Vec<(FragmentKind, &str)> {
        result.fragments().iter().map(|f| (f.kind(), f.text())).collect()
    }

    #[test]
    fn test_insert_word() {
        let result = diff("hello world", "hello there world").unwrap();
        assert_eq!(
            summary(&result),
            [
                (FragmentKind::Copy, "hello "),
                (FragmentKind::Insert, "there "),
                (FragmentKind::Copy, "world"),
            ]
        );
        assert!(result.has_changes());
        assert_eq!(result.stats().inserted, 6);
        assert_eq!(result.stats().copied, 11);
        assert!(result.move_groups().is_empty());
    }

    #[test]
    fn test_single_word_move() {
        let result = diff("A B C D", "D A B C").unwrap();
        assert_eq!(
            summary(&result),
            [
                (FragmentKind::MoveStart, "D"),
                (FragmentKind::Insert, " "),
                (FragmentKind::Copy, "A B C"),
                (FragmentKind::Delete, " "),
                (FragmentKind::MoveEnd, "D"),
            ]
        );
        let groups = result.move_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].direction(), crate::algo::MoveDirection::Up);
        assert_eq!(groups[0].old(), Span::new(6, 7));
        assert_eq!(result.old_text(), "A B C D");
        assert_eq!(result.new_text(), "D A B C");
    }

    #[test]
    fn test_empty_old_is_single_insert() {
        let result = diff("", "hello").unwrap();
        assert_eq!(summary(&result), [(FragmentKind::Insert, "hello")]);
        assert_eq!(result.blocks().len(), 1);
        assert_eq!(result.stats().inserted, 5);
    }

    #[test]
    fn test_empty_new_is_single_delete() {
        let result = diff("gone", "").unwrap();
        assert_eq!(summary(&result), [(FragmentKind::Delete, "gone")]);
        assert_eq!(result.old_text(), "gone");
        assert_eq!(result.new_text(), "");
    }

    #[test]
    fn test_identical_texts() {
        let text = "Same paragraph.\n\nAnd another one.";
        let result = diff(text, text).unwrap();
        assert_eq!(summary(&result), [(FragmentKind::Copy, text)]);
        assert_eq!(result.blocks().len(), 1);
        assert_eq!(result.blocks()[0].kind(), BlockKind::Unchanged);
        assert!(!result.has_changes());

        let empty = diff("", "").unwrap();
        assert!(empty.fragments().is_empty());
        assert!(empty.blocks().is_empty());
    }

    #[test]
    fn test_character_refinement() {
        let result = diff("the colour red", "the color red").unwrap();
        assert_eq!(result.new_text(), "the color red");
        assert_eq!(result.old_text(), "the colour red");
        assert!(
            result
                .fragments()
                .iter()
                .any(|f| f.kind() == FragmentKind::Delete && f.text() == "u")
        );
    }

    #[test]
    fn test_coarse_replaces_whole_word() {
        let result = diff_with_config("the colour red", "the color red", &DiffConfig::coarse()).unwrap();
        assert!(
            result
                .fragments()
                .iter()
                .any(|f| f.kind() == FragmentKind::Delete && f.text() == "colour")
        );
    }

    #[test]
    fn test_case_insensitive_matching() {
        let config = DiffConfig {
            case_sensitive: false,
            ..DiffConfig::default()
        };
        let result = diff_with_config("Hello World", "hello world", &config).unwrap();
        assert!(!result.has_changes());
        assert_eq!(result.new_text(), "hello world");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = DiffConfig::default();
        config.patterns.word = "(".into();
        assert!(matches!(
            TextDiffer::new(config),
            Err(ConfigError::InvalidPattern { level: Level::Word, .. })
        ));
    }

    #[test]
    fn test_diff_bytes_reports_side() {
        let err = diff_bytes(b"ok", b"bad \xff", &DiffConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::DiffError::Input(InputError::InvalidUtf8 {
                side: Side::New,
                valid_up_to: 4
            })
        ));
        assert!(diff_bytes(b"a b", b"a c", &DiffConfig::default()).is_ok());
    }

    #[test]
    fn test_batch_keeps_order() {
        let differ = TextDiffer::new(DiffConfig::default()).unwrap();
        let pairs = [("a", "a b"), ("x y", "y"), ("same", "same")];
        let results = differ.diff_batch(&pairs);
        assert_eq!(results.len(), 3);
        for ((old, new), result) in pairs.iter().zip(&results) {
            assert_eq!(result.new_text(), *new);
            assert_eq!(result.old_text(), *old);
        }
        assert!(!results[2].has_changes());
    }

    #[test]
    fn test_clipping_keeps_text() {
        let lines: String = (0..200).map(|n| format!("unchanged line {n} with some filler words\n")).collect();
        let old = format!("first\n{lines}last\n");
        let new = format!("FIRST\n{lines}LAST\n");
        let result = diff_with_config(&old, &new, &DiffConfig::clipped()).unwrap();
        assert!(
            result
                .fragments()
                .iter()
                .any(|f| f.kind() == FragmentKind::Omission)
        );
        assert_eq!(result.new_text(), new);
        assert_eq!(result.old_text(), old);
    }
}
