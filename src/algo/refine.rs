//! Character-level refinement of similar word gaps.
//!
//! After word matching, a gap is split into characters only when its tokens
//! are similar enough that a character diff is readable:
//!
//! - same token count, and every pair either differs by one inserted or
//!   deleted inner string, or has the same length and is at least ~50 %
//!   identical by position;
//! - one token on one side versus three on the other, where the single token
//!   starts with the first and ends with the last of the three (a word that
//!   got split by a space or dash).
//!
//! Identical tokens (mostly blanks) inside an equal-count gap are linked
//! directly so the character diff stays within words.

use crate::id::TokenId;
use crate::split::{Level, SplitRules};
use crate::text::{DiffText, link};

/// Minimal positional identity for equal-length tokens.
const MIN_IDENTITY: f64 = 0.49;

#[derive(Debug, Clone, Copy)]
struct Gap {
    new_first: TokenId,
    new_last: TokenId,
    new_tokens: usize,
    old_first: Option<TokenId>,
    old_last: Option<TokenId>,
    old_tokens: usize,
}

/// Split selected word gaps of both texts into characters.
pub(crate) fn refine_chars(new: &mut DiffText<'_>, old: &mut DiffText<'_>, rules: &SplitRules) {
    let gaps = find_gaps(new, old);
    let mut refined = 0usize;
    for gap in gaps {
        if is_similar(new, old, &gap) {
            split_gap(new, old, rules, &gap);
            refined += 1;
        }
    }
    tracing::trace!(gaps = refined, "refined gaps into characters");
}

/// Corresponding unlinked runs, located by walking the new text and
/// following links into the old text.
fn find_gaps(new: &DiffText<'_>, old: &DiffText<'_>) -> Vec<Gap> {
    let mut gaps: Vec<Gap> = Vec::new();
    let mut open = false;
    let mut i = new.first();
    let mut j = old.first();

    while let Some(id) = i {
        let new_link = new.link(id);
        let old_link = j.and_then(|j| old.link(j));

        if !open && new_link.is_none() && old_link.is_none() {
            open = true;
            gaps.push(Gap {
                new_first: id,
                new_last: id,
                new_tokens: 1,
                old_first: j,
                old_last: j,
                old_tokens: 0,
            });
        } else if open && new_link.is_none() {
            if let Some(gap) = gaps.last_mut() {
                gap.new_last = id;
                gap.new_tokens += 1;
            }
        } else if open {
            open = false;
        }

        if let Some(link) = new_link {
            j = old.next(link);
        }
        i = new.next(id);
    }

    for gap in &mut gaps {
        let mut j = gap.old_first;
        while let Some(id) = j {
            if old.is_linked(id) {
                break;
            }
            gap.old_last = Some(id);
            gap.old_tokens += 1;
            j = old.next(id);
        }
    }
    gaps
}

fn is_similar(new: &DiffText<'_>, old: &DiffText<'_>, gap: &Gap) -> bool {
    let (Some(old_first), Some(old_last)) = (gap.old_first, gap.old_last) else {
        return false;
    };

    if gap.new_tokens != gap.old_tokens {
        return match (gap.new_tokens, gap.old_tokens) {
            (1, 3) => wraps(new.str(gap.new_first), old.str(old_first), old.str(old_last)),
            (3, 1) => wraps(old.str(old_first), new.str(gap.new_first), new.str(gap.new_last)),
            _ => false,
        };
    }

    let mut i = gap.new_first;
    let mut j = old_first;
    loop {
        if !is_similar_token(new.str(i), old.str(j)) {
            return false;
        }
        if i == gap.new_last {
            return true;
        }
        match (new.next(i), old.next(j)) {
            (Some(ni), Some(nj)) => {
                i = ni;
                j = nj;
            }
            _ => return true,
        }
    }
}

#[inline]
fn wraps(token: &str, first: &str, last: &str) -> bool {
    token.starts_with(first) && token.ends_with(last)
}

fn is_similar_token(new: &str, old: &str) -> bool {
    if new == old {
        return true;
    }
    let new_chars: Vec<char> = new.chars().collect();
    let old_chars: Vec<char> = old.chars().collect();
    let (shorter, longer, shorter_str, longer_str) = if new_chars.len() < old_chars.len() {
        (&new_chars, &old_chars, new, old)
    } else {
        (&old_chars, &new_chars, old, new)
    };
    let len = shorter.len();

    if new_chars.len() != old_chars.len() {
        let left = new_chars
            .iter()
            .zip(&old_chars)
            .take(len)
            .take_while(|(a, b)| a == b)
            .count();
        let right = new_chars
            .iter()
            .rev()
            .zip(old_chars.iter().rev())
            .take(len)
            .take_while(|(a, b)| a == b)
            .count();

        // Not a plain inner insertion or deletion
        if left + right != len && !longer_str.contains(shorter_str) {
            return 2 * left >= len || 2 * right >= len;
        }
        return true;
    }

    let ident = shorter.iter().zip(longer.iter()).filter(|(a, b)| a == b).count();
    len > 0 && ident as f64 / len as f64 >= MIN_IDENTITY
}

fn split_gap(new: &mut DiffText<'_>, old: &mut DiffText<'_>, rules: &SplitRules, gap: &Gap) {
    let same_count = gap.new_tokens == gap.old_tokens;
    let mut i = Some(gap.new_first);
    let mut j = gap.old_first;

    while i.is_some() || j.is_some() {
        match (i, j) {
            (Some(a), Some(b)) if same_count && new.str(a) == old.str(b) => {
                link(new, old, a, b);
            }
            _ => {
                if let Some(a) = i {
                    new.split_token(rules, Level::Character, a);
                }
                if let Some(b) = j {
                    old.split_token(rules, Level::Character, b);
                }
            }
        }

        if i == Some(gap.new_last) {
            i = None;
        }
        if j == gap.old_last {
            j = None;
        }
        i = i.and_then(|a| new.next(a));
        j = j.and_then(|b| old.next(b));
    }
}
