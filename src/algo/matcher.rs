//! Unique-anchor token matching (Heckel-style) with refinement.
//!
//! # Algorithm
//!
//! For one split level, a matching pass over a region of both texts:
//!
//! 1. Collects the unlinked new tokens into a fresh [`SymbolTable`].
//! 2. Collects the unlinked old tokens into the same table.
//! 3. Links tokens whose key occurs exactly once in each version. Blank-only
//!    tokens never anchor.
//! 4. Extends every anchor (and every border kept from coarser levels)
//!    downwards while neighbouring unlinked tokens have equal keys.
//! 5. Extends upwards the same way.
//!
//! Where extension stops on a mismatch the linked pair is kept as a border,
//! so the next finer level continues from it. A full-text pass also links
//! identical tokens from the start and the end of both texts.
//!
//! Each pass is followed by one repeat with an empty table, which catches
//! tokens that only became unique after the first links (crossed-over
//! duplicates). At word and character level every gap next to a border is
//! then matched again on its own, up to `recursion_max` deep.
//!
//! # Worklist
//!
//! Repeats and gap descents are processed from an explicit LIFO stack in the
//! same depth-first order a recursive implementation would use, so
//! pathological inputs cannot exhaust the call stack.

use smallvec::SmallVec;

use crate::config::DiffConfig;
use crate::id::TokenId;
use crate::split::{Level, SplitRules, patterns};
use crate::text::{DiffText, link};

use super::symbol::SymbolTable;

/// Linked `(new, old)` token pair next to an unresolved gap.
type Border = (TokenId, TokenId);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy)]
struct Task {
    new_start: TokenId,
    old_start: TokenId,
    direction: Direction,
    depth: usize,
    repeating: bool,
}

impl Task {
    /// Full-text pass at the top of a level.
    #[inline]
    fn is_top(&self) -> bool {
        self.depth == 0 && !self.repeating
    }
}

#[derive(Debug, Clone, Copy)]
enum Work {
    Run(Task),
    /// Match the gap next to `border` if it is still unresolved when popped
    Descend {
        border: Border,
        direction: Direction,
        depth: usize,
    },
}

#[inline]
fn step(text: &DiffText<'_>, id: TokenId, direction: Direction) -> Option<TokenId> {
    match direction {
        Direction::Down => text.next(id),
        Direction::Up => text.prev(id),
    }
}

// =============================================================================
// Matcher
// =============================================================================

/// Token matcher carrying borders across split levels.
pub(crate) struct Matcher<'c> {
    config: &'c DiffConfig,
    rules: &'c SplitRules,
    borders_down: Vec<Border>,
    borders_up: Vec<Border>,
    /// Any full-text pass has linked tokens
    linked: bool,
    links: usize,
}

impl<'c> Matcher<'c> {
    pub fn new(config: &'c DiffConfig, rules: &'c SplitRules) -> Self {
        Self {
            config,
            rules,
            borders_down: Vec::new(),
            borders_up: Vec::new(),
            linked: false,
            links: 0,
        }
    }

    /// Number of token pairs linked so far.
    #[inline]
    pub fn links(&self) -> usize {
        self.links
    }

    /// Match the current token lists of both texts at `level`.
    pub fn match_level(&mut self, new: &mut DiffText<'_>, old: &mut DiffText<'_>, level: Level) {
        let (Some(new_start), Some(old_start)) = (new.first(), old.first()) else {
            return;
        };
        let before = self.links;
        let mut stack = vec![Work::Run(Task {
            new_start,
            old_start,
            direction: Direction::Down,
            depth: 0,
            repeating: false,
        })];

        while let Some(work) = stack.pop() {
            match work {
                Work::Run(task) => self.run(new, old, level, task, &mut stack),
                Work::Descend {
                    border: (i, j),
                    direction,
                    depth,
                } => {
                    let start = (step(new, i, direction), step(old, j, direction));
                    if let (Some(i), Some(j)) = start {
                        if !new.is_linked(i) && !old.is_linked(j) {
                            let task = Task {
                                new_start: i,
                                old_start: j,
                                direction,
                                depth,
                                repeating: false,
                            };
                            self.run(new, old, level, task, &mut stack);
                        }
                    }
                }
            }
        }

        tracing::debug!(
            %level,
            links = self.links - before,
            borders = self.borders_down.len() + self.borders_up.len(),
            "matched level"
        );
    }

    fn run(
        &mut self,
        new: &mut DiffText<'_>,
        old: &mut DiffText<'_>,
        level: Level,
        task: Task,
        stack: &mut Vec<Work>,
    ) {
        let top = task.is_top();
        let anchors = collect_anchors(new, old, &task);

        let (mut borders_down, mut borders_up) = if top {
            (
                std::mem::take(&mut self.borders_down),
                std::mem::take(&mut self.borders_up),
            )
        } else {
            (Vec::new(), Vec::new())
        };
        let mut linked = top && self.linked;

        // Pass 3: unique anchors
        for (i, j) in anchors {
            if new.is_linked(i) || old.is_linked(j) || patterns::is_blank_only(new.str(i)) {
                continue;
            }
            link(new, old, i, j);
            self.links += 1;
            linked = true;
            borders_down.push((i, j));
            borders_up.push((i, j));

            if task.depth == 0 && self.is_unique_anchor(new, old, level, i) {
                new.set_unique(i);
                old.set_unique(j);
            }
        }

        if top {
            self.linked = linked;
        }
        if !linked {
            if top {
                self.borders_down = borders_down;
                self.borders_up = borders_up;
            }
            return;
        }

        // Passes 4 and 5: extend from anchors and borders
        let mut next_down = Vec::new();
        let mut next_up = Vec::new();
        for &border in &borders_down {
            self.extend(new, old, border, Direction::Down, &mut next_down);
        }
        for &border in &borders_up {
            self.extend(new, old, border, Direction::Up, &mut next_up);
        }

        if top {
            self.link_edges(new, old, &mut next_down, &mut next_up);
        }

        let recurse = level.recurses()
            && self.config.recursive_diff
            && task.depth < self.config.recursion_max;
        if recurse {
            for &border in next_up.iter().rev() {
                stack.push(Work::Descend {
                    border,
                    direction: Direction::Up,
                    depth: task.depth + 1,
                });
            }
            for &border in next_down.iter().rev() {
                stack.push(Work::Descend {
                    border,
                    direction: Direction::Down,
                    depth: task.depth + 1,
                });
            }
        }
        if !task.repeating && self.config.repeated_diff {
            stack.push(Work::Run(Task {
                repeating: true,
                ..task
            }));
        }

        if top {
            self.borders_down = next_down;
            self.borders_up = next_up;
        } else {
            self.borders_down.extend(next_down);
            self.borders_up.extend(next_up);
        }
    }

    /// Anchored token counts as unique for move detection.
    fn is_unique_anchor(&self, new: &DiffText<'_>, old: &DiffText<'_>, level: Level, i: TokenId) -> bool {
        if level == Level::Character {
            return true;
        }
        let words: SmallVec<[&str; 8]> = self.rules.words_and_chunks(new.str(i)).collect();
        words.len() >= self.config.block_min_length
            || words
                .iter()
                .any(|word| old.word_count(word) == 1 && new.word_count(word) == 1)
    }

    /// Link equal neighbours of `border` in `direction`; record the last
    /// linked pair as a border when a mismatch stops the run.
    fn extend(
        &mut self,
        new: &mut DiffText<'_>,
        old: &mut DiffText<'_>,
        border: Border,
        direction: Direction,
        next_borders: &mut Vec<Border>,
    ) {
        let (mut last_i, mut last_j) = border;
        let mut i = step(new, last_i, direction);
        let mut j = step(old, last_j, direction);
        while let (Some(ii), Some(jj)) = (i, j) {
            if new.is_linked(ii) || old.is_linked(jj) {
                break;
            }
            if new.key(ii) != old.key(jj) {
                next_borders.push((last_i, last_j));
                break;
            }
            link(new, old, ii, jj);
            self.links += 1;
            last_i = ii;
            last_j = jj;
            i = step(new, ii, direction);
            j = step(old, jj, direction);
        }
    }

    /// Link identical tokens from the start and from the end of both texts.
    fn link_edges(
        &mut self,
        new: &mut DiffText<'_>,
        old: &mut DiffText<'_>,
        next_down: &mut Vec<Border>,
        next_up: &mut Vec<Border>,
    ) {
        let edges = [
            (new.first(), old.first(), Direction::Down),
            (new.last(), old.last(), Direction::Up),
        ];
        for (mut i, mut j, direction) in edges {
            let mut last = None;
            while let (Some(ii), Some(jj)) = (i, j) {
                if new.is_linked(ii) || old.is_linked(jj) || new.key(ii) != old.key(jj) {
                    break;
                }
                link(new, old, ii, jj);
                self.links += 1;
                last = Some((ii, jj));
                i = step(new, ii, direction);
                j = step(old, jj, direction);
            }
            if let Some(border) = last {
                match direction {
                    Direction::Down => next_down.push(border),
                    Direction::Up => next_up.push(border),
                }
            }
        }
    }

    /// Pair the remaining gaps by position: from each gap's left edge while
    /// keys are equal, then from its right edge.
    pub fn pair_gaps(&mut self, new: &mut DiffText<'_>, old: &mut DiffText<'_>) {
        let before = self.links;
        for direction in [Direction::Down, Direction::Up] {
            let (mut cursor, mut anchor) = match direction {
                Direction::Down => (new.first(), old.first()),
                Direction::Up => (new.last(), old.last()),
            };
            while let Some(i) = cursor {
                if let Some(j) = new.link(i) {
                    anchor = step(old, j, direction);
                    cursor = step(new, i, direction);
                    continue;
                }
                // Gap starts at i; pair it with the old gap after the anchor
                let (mut ii, mut jj) = (Some(i), anchor);
                while let (Some(a), Some(b)) = (ii, jj) {
                    if new.is_linked(a) || old.is_linked(b) || new.key(a) != old.key(b) {
                        break;
                    }
                    link(new, old, a, b);
                    self.links += 1;
                    ii = step(new, a, direction);
                    jj = step(old, b, direction);
                }
                // Skip the rest of the gap
                let mut rest = ii;
                while let Some(a) = rest {
                    if new.is_linked(a) {
                        break;
                    }
                    rest = step(new, a, direction);
                }
                cursor = rest;
                anchor = None;
            }
        }
        tracing::trace!(links = self.links - before, "paired gaps");
    }
}

/// Passes 1 and 2: symbol table over the task's region, returning the
/// unique token pairs.
fn collect_anchors(new: &DiffText<'_>, old: &DiffText<'_>, task: &Task) -> Vec<(TokenId, TokenId)> {
    let mut table = SymbolTable::new();

    let mut cursor = Some(task.new_start);
    while let Some(i) = cursor {
        if !new.is_linked(i) {
            table.add_new(new.key(i), i);
        } else if task.depth > 0 {
            break;
        }
        cursor = step(new, i, task.direction);
    }

    let mut cursor = Some(task.old_start);
    while let Some(j) = cursor {
        if !old.is_linked(j) {
            table.add_old(old.key(j), j);
        } else if task.depth > 0 {
            break;
        }
        cursor = step(old, j, task.direction);
    }

    table.unique_pairs().collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitPatterns;
    use crate::text::Normalize;

    struct Fixture {
        config: DiffConfig,
        rules: SplitRules,
    }

    impl Fixture {
        fn new(config: DiffConfig) -> Self {
            let rules = SplitRules::compile(&SplitPatterns::default()).unwrap();
            Self { config, rules }
        }

        fn texts<'a>(&self, old: &'a str, new: &'a str, level: Level) -> (DiffText<'a>, DiffText<'a>) {
            let mut old_text = DiffText::new(old, &self.rules, Normalize::default());
            let mut new_text = DiffText::new(new, &self.rules, Normalize::default());
            old_text.split_all(&self.rules, level);
            new_text.split_all(&self.rules, level);
            (old_text, new_text)
        }
    }

    /// Token texts with a `*` suffix when linked.
    fn marked<'a>(text: &DiffText<'a>) -> Vec<String> {
        text.iter()
            .map(|id| {
                let mark = if text.is_linked(id) { "*" } else { "" };
                format!("{}{mark}", text.str(id))
            })
            .collect()
    }

    #[test]
    fn test_unique_anchor_and_extension() {
        let fx = Fixture::new(DiffConfig::default());
        let (mut old, mut new) = fx.texts("hello world", "hello there world", Level::Word);
        let mut matcher = Matcher::new(&fx.config, &fx.rules);
        matcher.match_level(&mut new, &mut old, Level::Word);

        assert_eq!(marked(&new), ["hello*", " *", "there", " ", "world*"]);
        assert_eq!(marked(&old), ["hello*", " *", "world*"]);
    }

    #[test]
    fn test_links_are_symmetric() {
        let fx = Fixture::new(DiffConfig::default());
        let (mut old, mut new) = fx.texts("a b c d e", "e a b x d", Level::Word);
        let mut matcher = Matcher::new(&fx.config, &fx.rules);
        matcher.match_level(&mut new, &mut old, Level::Word);

        for i in new.iter() {
            if let Some(j) = new.link(i) {
                assert_eq!(old.link(j), Some(i));
                assert_eq!(new.key(i), old.key(j));
            }
        }
        assert!(matcher.links() > 0);
    }

    #[test]
    fn test_blank_tokens_never_anchor() {
        let fx = Fixture::new(DiffConfig {
            repeated_diff: false,
            ..DiffConfig::default()
        });
        // The single blank is unique on both sides but must not be linked
        let (mut old, mut new) = fx.texts("x y", "p q", Level::Word);
        let mut matcher = Matcher::new(&fx.config, &fx.rules);
        matcher.match_level(&mut new, &mut old, Level::Word);
        assert_eq!(matcher.links(), 0);
        assert!(new.iter().all(|id| !new.is_linked(id)));
    }

    #[test]
    fn test_edges_link_common_prefix_and_suffix() {
        let fx = Fixture::new(DiffConfig::default());
        // "a" repeats, so nothing is unique except x / y, which differ
        let (mut old, mut new) = fx.texts("a a x a a", "a a y a a", Level::Word);
        let mut matcher = Matcher::new(&fx.config, &fx.rules);
        matcher.match_level(&mut new, &mut old, Level::Word);
        // No unique anchor at all: the full pass never links, edges included
        assert_eq!(matcher.links(), 0);

        let (mut old, mut new) = fx.texts("k a a x a a", "k a a y a a", Level::Word);
        let mut matcher = Matcher::new(&fx.config, &fx.rules);
        matcher.match_level(&mut new, &mut old, Level::Word);
        assert_eq!(
            marked(&new),
            ["k*", " *", "a*", " *", "a*", " *", "y", " *", "a*", " *", "a*"]
        );
    }

    #[test]
    fn test_repeated_words_linked_between_anchors() {
        let fx = Fixture::new(DiffConfig::default());
        let (mut old, mut new) = fx.texts("and this a and b that", "and this a and b that x", Level::Word);
        let mut matcher = Matcher::new(&fx.config, &fx.rules);
        matcher.match_level(&mut new, &mut old, Level::Word);
        let unlinked: Vec<_> = new.iter().filter(|&id| !new.is_linked(id)).map(|id| new.str(id)).collect();
        assert_eq!(unlinked, [" ", "x"]);
    }

    #[test]
    fn test_unique_flag_set_for_unique_words() {
        let fx = Fixture::new(DiffConfig::default());
        let (mut old, mut new) = fx.texts("alpha beta", "beta alpha", Level::Word);
        let mut matcher = Matcher::new(&fx.config, &fx.rules);
        matcher.match_level(&mut new, &mut old, Level::Word);
        let alpha = new.iter().find(|&id| new.str(id) == "alpha").unwrap();
        assert!(new.token(alpha).unique);
    }

    #[test]
    fn test_borders_carry_across_levels() {
        let fx = Fixture::new(DiffConfig::default());
        let old_src = "Same line.\nold words here\nTail.";
        let new_src = "Same line.\nnew words here\nTail.";
        let (mut old, mut new) = fx.texts(old_src, new_src, Level::Line);
        let mut matcher = Matcher::new(&fx.config, &fx.rules);
        matcher.match_level(&mut new, &mut old, Level::Line);

        new.split_refine(&fx.rules, Level::Word);
        old.split_refine(&fx.rules, Level::Word);
        matcher.match_level(&mut new, &mut old, Level::Word);

        let unlinked: Vec<_> = new.iter().filter(|&id| !new.is_linked(id)).map(|id| new.str(id)).collect();
        assert_eq!(unlinked, ["new"]);
    }

    #[test]
    fn test_pair_gaps_links_equal_edges() {
        let fx = Fixture::new(DiffConfig::default());
        let (mut old, mut new) = fx.texts("ab", "ab", Level::Character);
        let mut matcher = Matcher::new(&fx.config, &fx.rules);
        matcher.pair_gaps(&mut new, &mut old);
        assert_eq!(marked(&new), ["a*", "b*"]);

        let (mut old, mut new) = fx.texts("axb", "ayb", Level::Character);
        let mut matcher = Matcher::new(&fx.config, &fx.rules);
        matcher.pair_gaps(&mut new, &mut old);
        assert_eq!(marked(&new), ["a*", "y", "b*"]);
        assert_eq!(marked(&old), ["a*", "x", "b*"]);
    }

    #[test]
    fn test_long_identical_run_extends_from_anchor() {
        let fx = Fixture::new(DiffConfig::default());
        let old_src = format!("z {}", "x ".repeat(2_000));
        let new_src = format!("z {}y", "x ".repeat(2_000));
        let (mut old, mut new) = fx.texts(&old_src, &new_src, Level::Word);
        let mut matcher = Matcher::new(&fx.config, &fx.rules);
        matcher.match_level(&mut new, &mut old, Level::Word);

        assert!(old.iter().all(|id| old.is_linked(id)));
        let unlinked: Vec<_> = new.iter().filter(|&id| !new.is_linked(id)).map(|id| new.str(id)).collect();
        assert_eq!(unlinked, ["y"]);
    }
}
