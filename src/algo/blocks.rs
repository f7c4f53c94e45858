//! Block tables built from the final token links.
//!
//! For old `A B C D` and new `D A B C` (word tokens):
//!
//! ```text
//! new order:  D      " "       A B C      " "       |
//! kind:       =      +         =          -         mark
//! group:      g0     g2        g1         g1        g1
//! fixed:      no               yes        yes       yes
//! ```
//!
//! Unchanged blocks are collected in old order and sorted into new order.
//! Sections are block ranges whose old order crosses over; groups are block
//! runs consecutive in both versions. Deleted, inserted and mark blocks are
//! then sorted in around them.

use crate::id::{GroupId, MoveGroupId, TokenId};
use crate::span::Span;
use crate::split::SplitRules;
use crate::text::DiffText;

use super::moves::MoveDirection;

// =============================================================================
// Block
// =============================================================================

/// Classification of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Text present in both versions (moved when its group is not fixed)
    Unchanged,
    /// Text only in the new version
    Inserted,
    /// Text only in the old version
    Deleted,
    /// Original position of a moved group
    MoveMark,
}

/// One block of the final diff, in new-text order.
#[derive(Debug, Clone)]
pub struct Block {
    pub(crate) kind: BlockKind,
    pub(crate) old: Option<Span>,
    pub(crate) new: Option<Span>,
    pub(crate) old_number: Option<usize>,
    /// Sort position in the new text; `-1` sorts before the first token
    pub(crate) new_number: Option<i64>,
    pub(crate) old_start: Option<TokenId>,
    /// Index of an unchanged block in old order
    pub(crate) old_block: Option<usize>,
    pub(crate) count: usize,
    pub(crate) unique: bool,
    pub(crate) words: usize,
    pub(crate) chars: usize,
    pub(crate) section: Option<usize>,
    pub(crate) group: Option<GroupId>,
    pub(crate) fixed: bool,
    /// For mark blocks: the moved group
    pub(crate) moved: Option<GroupId>,
    pub(crate) move_group: Option<MoveGroupId>,
    pub(crate) direction: Option<MoveDirection>,
}

impl Block {
    pub(crate) fn with_kind(kind: BlockKind) -> Self {
        Self {
            kind,
            old: None,
            new: None,
            old_number: None,
            new_number: None,
            old_start: None,
            old_block: None,
            count: 0,
            unique: false,
            words: 0,
            chars: 0,
            section: None,
            group: None,
            fixed: false,
            moved: None,
            move_group: None,
            direction: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Byte span in the old text (unchanged and deleted blocks).
    #[inline]
    pub fn old(&self) -> Option<Span> {
        self.old
    }

    /// Byte span in the new text (unchanged and inserted blocks).
    #[inline]
    pub fn new(&self) -> Option<Span> {
        self.new
    }

    /// Number of words in the block text.
    #[inline]
    pub fn words(&self) -> usize {
        self.words
    }

    /// Number of characters in the block text.
    #[inline]
    pub fn chars(&self) -> usize {
        self.chars
    }

    /// Contains an anchor with a word unique to both versions.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Part of a group that stays in place.
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Unchanged block that was relocated.
    #[inline]
    pub fn is_moved(&self) -> bool {
        self.kind == BlockKind::Unchanged && self.move_group.is_some()
    }

    #[inline]
    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    /// Move group this block belongs to (or marks, for [`BlockKind::MoveMark`]).
    #[inline]
    pub fn move_group(&self) -> Option<MoveGroupId> {
        self.move_group
    }

    #[inline]
    pub fn direction(&self) -> Option<MoveDirection> {
        self.direction
    }

    /// Block text, taken from the new version where the block has a new span.
    pub fn text<'t>(&self, old: &'t str, new: &'t str) -> &'t str {
        match (self.new, self.old) {
            (Some(span), _) => span.slice(new),
            (None, Some(span)) if self.kind == BlockKind::Deleted => span.slice(old),
            _ => "",
        }
    }

    #[inline]
    fn sort_key(&self) -> (i64, i64) {
        (
            self.new_number.unwrap_or(0),
            self.old_number.map_or(0, |n| n as i64),
        )
    }
}

// =============================================================================
// Groups and sections
// =============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub old_number: Option<usize>,
    pub block_start: usize,
    pub block_end: usize,
    pub unique: bool,
    pub max_words: usize,
    pub chars: usize,
    pub fixed: bool,
    /// Group holding the mark of this moved group
    pub moved_from: Option<GroupId>,
    pub move_group: Option<MoveGroupId>,
}

impl Group {
    fn single(block: &Block, index: usize) -> Self {
        Self {
            old_number: block.old_number,
            block_start: index,
            block_end: index,
            unique: block.unique,
            max_words: block.words,
            chars: block.chars,
            fixed: block.fixed,
            moved_from: None,
            move_group: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Section {
    pub block_start: usize,
    pub block_end: usize,
}

// =============================================================================
// BlockTable
// =============================================================================

#[derive(Debug, Default)]
pub(crate) struct BlockTable {
    pub blocks: Vec<Block>,
    pub groups: Vec<Group>,
    pub sections: Vec<Section>,
    /// Word count of the longest unchanged block
    pub max_words: usize,
}

impl BlockTable {
    /// Rebuild unchanged blocks, sections and groups from the links.
    pub fn rebuild(&mut self, new: &DiffText<'_>, old: &DiffText<'_>, rules: &SplitRules) {
        self.max_words = 0;
        self.same_blocks(new, old, rules);
        self.find_sections();
        self.find_groups();
    }

    /// Collect runs of old tokens linked to consecutive new tokens, sorted
    /// into new order.
    fn same_blocks(&mut self, new: &DiffText<'_>, old: &DiffText<'_>, rules: &SplitRules) {
        self.blocks.clear();
        let mut j = old.first();

        while j.is_some() {
            while let Some(id) = j {
                if old.is_linked(id) {
                    break;
                }
                j = old.next(id);
            }
            let Some(old_start) = j else {
                break;
            };
            let Some(new_start) = old.link(old_start) else {
                break;
            };

            let mut i = Some(new_start);
            let mut count = 0;
            let mut unique = false;
            let mut old_span = old.span(old_start);
            let mut new_span = new.span(new_start);
            while let (Some(ii), Some(jj)) = (i, j) {
                if old.link(jj) != Some(ii) {
                    break;
                }
                count += 1;
                unique |= new.token(ii).unique;
                old_span = old_span.cover(old.span(jj));
                new_span = new_span.cover(new.span(ii));
                i = new.next(ii);
                j = old.next(jj);
            }

            let text = new_span.slice(new.text());
            let mut block = Block::with_kind(BlockKind::Unchanged);
            block.old = Some(old_span);
            block.new = Some(new_span);
            block.old_block = Some(self.blocks.len());
            block.old_number = Some(old.number(old_start));
            block.new_number = Some(new.number(new_start) as i64);
            block.old_start = Some(old_start);
            block.count = count;
            block.unique = unique;
            block.words = rules.count_words(text);
            block.chars = text.chars().count();
            self.blocks.push(block);
        }

        self.blocks.sort_by_key(|block| block.new_number);
    }

    /// Find block ranges whose old order crosses over.
    fn find_sections(&mut self) {
        self.sections.clear();
        let blocks = &mut self.blocks;
        let old_number = |block: &Block| block.old_number.unwrap_or(0);

        let mut block = 0;
        while block < blocks.len() {
            let start = block;
            let mut end = block;
            let mut old_max = old_number(&blocks[start]);
            let mut section_old_max = old_max;

            for j in start + 1..blocks.len() {
                let number = old_number(&blocks[j]);
                if number > old_max {
                    old_max = number;
                } else if number < section_old_max {
                    end = j;
                    section_old_max = old_max;
                }
            }

            if end > start {
                for b in &mut blocks[start..=end] {
                    b.section = Some(self.sections.len());
                }
                self.sections.push(Section {
                    block_start: start,
                    block_end: end,
                });
            }
            block = end + 1;
        }
    }

    /// Find runs of blocks consecutive in old order. Groups outside any
    /// section are fixed.
    fn find_groups(&mut self) {
        self.groups.clear();
        let mut block = 0;
        while block < self.blocks.len() {
            let start = block;
            let mut end = block;
            let first = &self.blocks[start];
            let mut old_block = first.old_block;
            let mut max_words = first.words;
            let mut chars = first.chars;
            let mut unique = first.unique;

            for (i, next) in self.blocks.iter().enumerate().skip(start + 1) {
                if next.old_block != old_block.map(|b| b + 1) {
                    break;
                }
                old_block = next.old_block;
                max_words = max_words.max(next.words);
                unique |= next.unique;
                chars += next.chars;
                end = i;
            }

            let fixed = self.blocks[start].section.is_none();
            let id = GroupId::new(self.groups.len());
            for b in &mut self.blocks[start..=end] {
                b.group = Some(id);
                b.fixed = fixed;
            }
            self.groups.push(Group {
                old_number: self.blocks[start].old_number,
                block_start: start,
                block_end: end,
                unique,
                max_words,
                chars,
                fixed,
                moved_from: None,
                move_group: None,
            });
            self.max_words = self.max_words.max(max_words);
            block = end + 1;
        }
    }

    /// Append one deleted block per run of unlinked old tokens.
    pub fn deleted_blocks(&mut self, old: &DiffText<'_>) {
        let mut j = old.first();
        while let Some(start) = j {
            let mut span = old.span(start);
            let mut count = 0;
            while let Some(id) = j {
                if old.is_linked(id) {
                    break;
                }
                span = span.cover(old.span(id));
                count += 1;
                j = old.next(id);
            }
            if count > 0 {
                let text = span.slice(old.text());
                let mut block = Block::with_kind(BlockKind::Deleted);
                block.old = Some(span);
                block.old_number = Some(old.number(start));
                block.old_start = Some(start);
                block.count = count;
                block.chars = text.chars().count();
                self.blocks.push(block);
            }
            // Skip the linked run
            while let Some(id) = j {
                if !old.is_linked(id) {
                    break;
                }
                j = old.next(id);
            }
        }
    }

    /// Append one inserted block per run of unlinked new tokens and sort.
    pub fn inserted_blocks(&mut self, new: &DiffText<'_>) {
        let mut i = new.first();
        while i.is_some() {
            while let Some(id) = i {
                if !new.is_linked(id) {
                    break;
                }
                i = new.next(id);
            }
            let Some(start) = i else {
                break;
            };
            let mut span = new.span(start);
            let mut count = 0;
            while let Some(id) = i {
                if new.is_linked(id) {
                    break;
                }
                span = span.cover(new.span(id));
                count += 1;
                i = new.next(id);
            }
            let text = span.slice(new.text());
            let mut block = Block::with_kind(BlockKind::Inserted);
            block.new = Some(span);
            block.new_number = Some(new.number(start) as i64);
            block.count = count;
            block.chars = text.chars().count();
            self.blocks.push(block);
        }
        self.sort_blocks();
    }

    /// Sort blocks by new position, then old position, and recompute the
    /// block ranges of all groups.
    pub fn sort_blocks(&mut self) {
        self.blocks.sort_by_key(Block::sort_key);

        let mut seen = vec![false; self.groups.len()];
        for (index, block) in self.blocks.iter().enumerate() {
            let Some(id) = block.group else {
                continue;
            };
            let Some(group) = self.groups.get_mut(id.index()) else {
                continue;
            };
            if !seen[id.index()] {
                seen[id.index()] = true;
                group.block_start = index;
                group.old_number = block.old_number;
            }
            group.block_end = index;
        }
    }

    /// Put inserted blocks that fall inside a group into that group and
    /// give every remaining block a group of its own.
    pub fn set_inserted_groups(&mut self) {
        for (index, group) in self.groups.iter().enumerate() {
            for block in &mut self.blocks[group.block_start..=group.block_end] {
                if block.group.is_none() {
                    block.group = Some(GroupId::new(index));
                    block.fixed = group.fixed;
                }
            }
        }

        for index in 0..self.blocks.len() {
            if self.blocks[index].group.is_some() {
                continue;
            }
            let id = GroupId::new(self.groups.len());
            self.blocks[index].group = Some(id);
            self.groups.push(Group::single(&self.blocks[index], index));
        }
    }

    /// Unlink all tokens of an unchanged block.
    pub fn unlink_block(block: &Block, new: &mut DiffText<'_>, old: &mut DiffText<'_>) {
        let mut j = block.old_start;
        for _ in 0..block.count {
            let Some(id) = j else {
                break;
            };
            if let Some(i) = old.link(id) {
                new.set_link(i, None);
            }
            old.set_link(id, None);
            j = old.next(id);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitPatterns;
    use crate::split::Level;
    use crate::text::{Normalize, link};

    fn rules() -> SplitRules {
        SplitRules::compile(&SplitPatterns::default()).unwrap()
    }

    /// Word-split texts, link the given token positions and number tokens.
    fn linked<'a>(
        rules: &SplitRules,
        old: &'a str,
        new: &'a str,
        pairs: &[(usize, usize)],
    ) -> (DiffText<'a>, DiffText<'a>) {
        let mut old_text = DiffText::new(old, rules, Normalize::default());
        let mut new_text = DiffText::new(new, rules, Normalize::default());
        old_text.split_all(rules, Level::Word);
        new_text.split_all(rules, Level::Word);
        let new_ids: Vec<_> = new_text.iter().collect();
        let old_ids: Vec<_> = old_text.iter().collect();
        for &(i, j) in pairs {
            link(&mut new_text, &mut old_text, new_ids[i], old_ids[j]);
        }
        old_text.enumerate();
        new_text.enumerate();
        (old_text, new_text)
    }

    #[test]
    fn test_same_blocks_sorted_in_new_order() {
        let rules = rules();
        // "A B" -> "B A": tokens A(0) " "(1) B(2) / B(0) " "(1) A(2)
        let (old, new) = linked(&rules, "A B", "B A", &[(0, 2), (2, 0)]);
        let mut table = BlockTable::default();
        table.rebuild(&new, &old, &rules);

        let texts: Vec<_> = table
            .blocks
            .iter()
            .map(|b| b.text(old.text(), new.text()))
            .collect();
        assert_eq!(texts, ["B", "A"]);
        assert_eq!(table.blocks[0].old_block, Some(1));
        assert_eq!(table.sections.len(), 1);
        assert_eq!(table.groups.len(), 2);
        assert!(table.groups.iter().all(|g| !g.fixed));
    }

    #[test]
    fn test_groups_outside_sections_fixed() {
        let rules = rules();
        let (old, new) = linked(&rules, "a b c", "a x c", &[(0, 0), (1, 1), (3, 3), (4, 4)]);
        let mut table = BlockTable::default();
        table.rebuild(&new, &old, &rules);

        assert_eq!(table.blocks.len(), 2);
        assert!(table.sections.is_empty());
        // Two unchanged blocks consecutive in old order form one group
        assert_eq!(table.groups.len(), 1);
        assert!(table.groups[0].fixed);
        assert_eq!(table.max_words, 1);
    }

    #[test]
    fn test_deleted_and_inserted_blocks() {
        let rules = rules();
        let (old, new) = linked(&rules, "a b c", "a x c", &[(0, 0), (1, 1), (3, 3), (4, 4)]);
        let mut table = BlockTable::default();
        table.rebuild(&new, &old, &rules);
        table.deleted_blocks(&old);
        table.inserted_blocks(&new);

        let kinds: Vec<_> = table.blocks.iter().map(Block::kind).collect();
        assert_eq!(
            kinds,
            [
                BlockKind::Unchanged,
                BlockKind::Deleted,
                BlockKind::Inserted,
                BlockKind::Unchanged
            ]
        );
        let deleted = &table.blocks[1];
        assert_eq!(deleted.text(old.text(), new.text()), "b");
        // Deleted block is not yet positioned, so it sorts at number 0
        assert_eq!(deleted.new_number, None);
    }

    #[test]
    fn test_unlink_block() {
        let rules = rules();
        let (mut old, mut new) = linked(&rules, "a b", "a b", &[(0, 0), (1, 1), (2, 2)]);
        let mut table = BlockTable::default();
        table.rebuild(&new, &old, &rules);
        let block = table.blocks[0].clone();
        BlockTable::unlink_block(&block, &mut new, &mut old);
        assert!(new.iter().all(|id| !new.is_linked(id)));
        assert!(old.iter().all(|id| !old.is_linked(id)));
    }
}
