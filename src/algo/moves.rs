//! Move detection.
//!
//! Inside every section the chain of groups increasing in old order that
//! keeps the most groups in place (then the most characters) is fixed; every
//! other group with unchanged text is a move. Short and common groups are
//! unlinked into deletions and insertions first, so coincidental repeats of
//! single words never show up as moves.
//!
//! Deleted blocks and move marks are positioned next to a fixed block in old
//! order, which puts them at their original place in the new-order block
//! list.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::config::DiffConfig;
use crate::id::{GroupId, MoveGroupId};
use crate::span::Span;
use crate::split::SplitRules;
use crate::text::DiffText;

use super::align::slide_gaps;
use super::blocks::{Block, BlockKind, BlockTable, Group};

// =============================================================================
// Public types
// =============================================================================

/// Direction of a relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveDirection {
    /// Text now stands earlier than its original position
    Up,
    /// Text now stands later than its original position
    Down,
}

impl MoveDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            MoveDirection::Up => "up",
            MoveDirection::Down => "down",
        }
    }
}

/// One relocated group of blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveGroup {
    pub(crate) id: MoveGroupId,
    pub(crate) direction: MoveDirection,
    pub(crate) blocks: Range<usize>,
    pub(crate) old: Span,
    pub(crate) new: Span,
    pub(crate) mark: usize,
}

impl MoveGroup {
    #[inline]
    pub fn id(&self) -> MoveGroupId {
        self.id
    }

    #[inline]
    pub fn direction(&self) -> MoveDirection {
        self.direction
    }

    /// Indices of the moved blocks in the block list.
    #[inline]
    pub fn blocks(&self) -> Range<usize> {
        self.blocks.clone()
    }

    /// Old-text span the group was moved away from.
    #[inline]
    pub fn old(&self) -> Span {
        self.old
    }

    /// New-text span the group was moved to.
    #[inline]
    pub fn new(&self) -> Span {
        self.new
    }

    /// Index of the [`BlockKind::MoveMark`] block at the original position.
    #[inline]
    pub fn mark(&self) -> usize {
        self.mark
    }
}

/// Final block structure of one diff.
#[derive(Debug, Default)]
pub(crate) struct Detection {
    pub blocks: Vec<Block>,
    pub move_groups: Vec<MoveGroup>,
    pub unlink_rounds: usize,
}

// =============================================================================
// Orchestration
// =============================================================================

/// Build blocks from the token links, unlink weak matches and detect moves.
///
/// Both texts must be enumerated.
pub(crate) fn detect(
    new: &mut DiffText<'_>,
    old: &mut DiffText<'_>,
    config: &DiffConfig,
    rules: &SplitRules,
) -> Detection {
    let mut table = BlockTable::default();
    table.rebuild(new, old, rules);
    set_fixed(&mut table);

    let mut rounds = 0;
    let min_length = config.block_min_length;
    if config.unlink_blocks && min_length > 0 && table.max_words >= min_length {
        while rounds < config.unlink_max && unlink_blocks(&table, new, old, min_length) {
            rounds += 1;
            slide_gaps(new, old);
            slide_gaps(old, new);
            table.rebuild(new, old, rules);
            set_fixed(&mut table);
            tracing::debug!(round = rounds, blocks = table.blocks.len(), "unlinked short blocks");
        }
    }

    table.deleted_blocks(old);
    position_deleted(&mut table);
    table.inserted_blocks(new);
    table.set_inserted_groups();
    insert_marks(&mut table);
    let move_groups = assign_move_groups(&mut table);

    tracing::debug!(
        blocks = table.blocks.len(),
        groups = table.groups.len(),
        moves = move_groups.len(),
        "detected blocks"
    );

    Detection {
        blocks: table.blocks,
        move_groups,
        unlink_rounds: rounds,
    }
}

// =============================================================================
// Fixed groups
// =============================================================================

/// Best chain starting at a group: `(groups, chars, next group)`.
#[derive(Debug, Clone, Copy, Default)]
struct Chain {
    count: usize,
    chars: usize,
    next: Option<usize>,
}

/// Mark the best increasing chain of groups in every section as fixed.
///
/// Chains compare by group count, then characters; ties go to the chain
/// whose old positions come first.
pub(crate) fn set_fixed(table: &mut BlockTable) {
    let sections = table.sections.clone();
    for section in sections {
        let bounds = (
            table.blocks[section.block_start].group,
            table.blocks[section.block_end].group,
        );
        let (Some(first), Some(last)) = bounds else {
            continue;
        };
        let (first, last) = (first.index(), last.index());
        let groups = &table.groups;
        let old_number = |g: usize| groups[g].old_number.unwrap_or(0);

        let mut chains = vec![Chain::default(); last - first + 1];
        let better = |chains: &[Chain], candidate: usize, current: Option<usize>| match current {
            None => true,
            Some(current) => {
                let a = chains[candidate - first];
                let b = chains[current - first];
                (a.count, a.chars) > (b.count, b.chars)
                    || ((a.count, a.chars) == (b.count, b.chars) && old_number(candidate) < old_number(current))
            }
        };

        for g in (first..=last).rev() {
            let mut next = None;
            for h in g + 1..=last {
                if old_number(h) >= old_number(g) && better(chains.as_slice(), h, next) {
                    next = Some(h);
                }
            }
            let tail = next.map(|h| chains[h - first]).unwrap_or_default();
            chains[g - first] = Chain {
                count: tail.count + 1,
                chars: tail.chars + groups[g].chars,
                next,
            };
        }

        let mut start = None;
        for g in first..=last {
            if better(chains.as_slice(), g, start) {
                start = Some(g);
            }
        }

        let mut cursor = start;
        while let Some(g) = cursor {
            let group = &mut table.groups[g];
            group.fixed = true;
            for block in &mut table.blocks[group.block_start..=group.block_end] {
                block.fixed = true;
            }
            cursor = chains[g - first].next;
        }
    }
}

// =============================================================================
// Unlinking
// =============================================================================

/// Unlink groups without a long or unique block, and single-word flanks
/// of the others. Returns whether anything was unlinked.
fn unlink_blocks(table: &BlockTable, new: &mut DiffText<'_>, old: &mut DiffText<'_>, min_length: usize) -> bool {
    let mut unlinked = false;
    for group in &table.groups {
        let blocks = &table.blocks[group.block_start..=group.block_end];

        if group.max_words < min_length && !group.unique {
            for block in blocks.iter().filter(|b| b.kind == BlockKind::Unchanged) {
                BlockTable::unlink_block(block, new, old);
                unlinked = true;
            }
            continue;
        }

        let mut head = 0;
        for (offset, block) in blocks.iter().enumerate() {
            if block.kind != BlockKind::Unchanged {
                continue;
            }
            if block.words > 1 || block.unique {
                break;
            }
            BlockTable::unlink_block(block, new, old);
            unlinked = true;
            head = offset;
        }
        for block in blocks.iter().skip(head + 1).rev() {
            if block.kind != BlockKind::Unchanged {
                continue;
            }
            if block.words > 1 || (block.words == 1 && block.unique) {
                break;
            }
            BlockTable::unlink_block(block, new, old);
            unlinked = true;
        }
    }
    unlinked
}

// =============================================================================
// Positioning
// =============================================================================

fn is_fixed_same(block: &Block) -> bool {
    block.kind == BlockKind::Unchanged && block.fixed
}

/// Block indices sorted by old position, then new position.
fn old_order(blocks: &[Block]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..blocks.len()).collect();
    order.sort_by_key(|&b| {
        let block = &blocks[b];
        (block.old_number.unwrap_or(0), block.new_number.unwrap_or(0))
    });
    order
}

/// Give each deleted block the new position of a reference block next to
/// it in old order.
fn position_deleted(table: &mut BlockTable) {
    let order = old_order(&table.blocks);

    for (k, &deleted) in order.iter().enumerate() {
        if table.blocks[deleted].kind != BlockKind::Deleted {
            continue;
        }
        let blocks = &table.blocks;
        let groups = &table.groups;
        let prev = k.checked_sub(1).map(|p| order[p]);
        let next = order.get(k + 1).copied();
        let same = |b: usize| blocks[b].kind == BlockKind::Unchanged;
        let group_of = |b: usize| blocks[b].group.map(|g| &groups[g.index()]);

        let reference = match (prev, next) {
            (Some(p), _) if is_fixed_same(&blocks[p]) => Some(p),
            (_, Some(n)) if is_fixed_same(&blocks[n]) => Some(n),
            (Some(p), _) if same(p) && group_of(p).is_some_and(|g| g.block_end != p) => Some(p),
            (_, Some(n)) if same(n) && group_of(n).is_some_and(|g| g.block_start != n) => Some(n),
            _ => order[..=k].iter().rev().copied().find(|&b| is_fixed_same(&blocks[b])),
        };

        match reference {
            None => table.blocks[deleted].new_number = Some(-1),
            Some(r) => {
                let (new_number, section, group, fixed) = {
                    let r = &table.blocks[r];
                    (r.new_number, r.section, r.group, r.fixed)
                };
                let block = &mut table.blocks[deleted];
                block.new_number = new_number;
                block.section = section;
                block.group = group;
                block.fixed = fixed;
            }
        }
    }
    table.sort_blocks();
}

/// Add a mark block at the original position of every moved group.
fn insert_marks(table: &mut BlockTable) {
    let order = old_order(&table.blocks);
    let mut position = vec![0; order.len()];
    for (k, &b) in order.iter().enumerate() {
        position[b] = k;
    }

    for g in 0..table.groups.len() {
        let group = &table.groups[g];
        if group.fixed || group.old_number.is_none() {
            continue;
        }
        let range = group.block_start..=group.block_end;
        if !table.blocks[range].iter().any(|b| b.kind == BlockKind::Unchanged) {
            continue;
        }

        let blocks = &table.blocks;
        let first = position[group.block_start];
        let last = position[group.block_end];
        let prev = first.checked_sub(1).map(|k| order[k]);
        let next = order.get(last + 1).copied();
        let reference = match (prev, next) {
            (Some(p), _) if is_fixed_same(&blocks[p]) => Some(p),
            (_, Some(n)) if is_fixed_same(&blocks[n]) => Some(n),
            _ => order[..first].iter().rev().copied().find(|&b| is_fixed_same(&blocks[b])),
        };

        let old_number = group.old_number;
        let (new_number, mark_group) = match reference {
            Some(r) => (blocks[r].new_number, blocks[r].group),
            None => {
                let id = GroupId::new(table.groups.len());
                table.groups.push(Group {
                    old_number: None,
                    block_start: table.blocks.len(),
                    block_end: table.blocks.len(),
                    unique: false,
                    max_words: 0,
                    chars: 0,
                    fixed: false,
                    moved_from: None,
                    move_group: None,
                });
                (Some(-1), Some(id))
            }
        };

        let mut mark = Block::with_kind(BlockKind::MoveMark);
        mark.old_number = old_number;
        mark.new_number = new_number;
        mark.group = mark_group;
        mark.fixed = true;
        mark.moved = Some(GroupId::new(g));
        table.blocks.push(mark);
        table.groups[g].moved_from = mark_group;
    }
    table.sort_blocks();
}

/// Number moved groups in new order and tag their blocks and marks.
fn assign_move_groups(table: &mut BlockTable) -> Vec<MoveGroup> {
    let mut moved: Vec<usize> = (0..table.groups.len())
        .filter(|&g| table.groups[g].moved_from.is_some())
        .collect();
    moved.sort_by_key(|&g| table.groups[g].block_start);

    let mut marks = vec![None; table.groups.len()];
    for (index, block) in table.blocks.iter().enumerate() {
        if let Some(g) = block.moved {
            marks[g.index()] = Some(index);
        }
    }

    let mut move_groups = Vec::with_capacity(moved.len());
    for (n, g) in moved.into_iter().enumerate() {
        let Some(mark) = marks[g] else {
            continue;
        };
        let id = MoveGroupId::new(n);
        let group = &mut table.groups[g];
        group.move_group = Some(id);
        let blocks = group.block_start..group.block_end + 1;
        let direction = if group.block_start < mark {
            MoveDirection::Up
        } else {
            MoveDirection::Down
        };

        let mut old: Option<Span> = None;
        let mut new: Option<Span> = None;
        for block in &mut table.blocks[blocks.clone()] {
            block.move_group = Some(id);
            block.direction = Some(direction);
            if let Some(span) = block.old {
                old = Some(old.map_or(span, |o| o.cover(span)));
            }
            if let Some(span) = block.new {
                new = Some(new.map_or(span, |s| s.cover(span)));
            }
        }
        let old = old.unwrap_or_default();
        let new = new.unwrap_or_default();

        let mark_block = &mut table.blocks[mark];
        mark_block.move_group = Some(id);
        mark_block.direction = Some(direction);
        mark_block.old = Some(old);

        move_groups.push(MoveGroup {
            id,
            direction,
            blocks,
            old,
            new,
            mark,
        });
    }
    move_groups
}

// =============================================================================
// Tests
// =============================================================================
