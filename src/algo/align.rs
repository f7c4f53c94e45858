//! Gap sliding.
//!
//! A gap whose content repeats the text next to it can be placed at several
//! equivalent positions. Gaps are moved down as far as possible, then back up
//! to the closest line break or word border, so that insertions and
//! deletions line up with words and lines.

use crate::id::TokenId;
use crate::split::patterns;
use crate::text::DiffText;

/// Slide every gap of `text`, keeping the links of `other` in sync.
pub(crate) fn slide_gaps(text: &mut DiffText<'_>, other: &mut DiffText<'_>) {
    let mut gap_start: Option<TokenId> = None;
    let mut cursor = text.first();

    while let Some(id) = cursor {
        let linked = text.is_linked(id);
        match gap_start {
            None if !linked => gap_start = Some(id),
            Some(start) if linked => {
                gap_start = None;
                if let Some(back) = text.prev(id) {
                    let (front, back) = slide_down(text, other, start, back);
                    let back = slide_up(text, other, front, back);
                    cursor = text.next(back);
                    continue;
                }
            }
            _ => {}
        }
        cursor = text.next(id);
    }
}

/// Move the link of `from` onto `to`.
fn move_link(text: &mut DiffText<'_>, other: &mut DiffText<'_>, from: TokenId, to: TokenId) {
    let link = text.link(from);
    text.set_link(to, link);
    if let Some(j) = link {
        other.set_link(j, Some(to));
    }
    text.set_link(from, None);
}

/// Shift the gap down while its first token equals the token after it.
fn slide_down(
    text: &mut DiffText<'_>,
    other: &mut DiffText<'_>,
    mut front: TokenId,
    mut back: TokenId,
) -> (TokenId, TokenId) {
    while let Some(after) = text.next(back) {
        if text.is_linked(front) || !text.is_linked(after) || text.key(front) != text.key(after) {
            break;
        }
        move_link(text, other, after, front);
        let (Some(next_front), Some(next_back)) = (text.next(front), text.next(back)) else {
            break;
        };
        front = next_front;
        back = next_back;
    }
    (front, back)
}

/// Shift the gap back up to the closest line break, or else to the last
/// word border. Returns the new gap end.
fn slide_up(text: &mut DiffText<'_>, other: &mut DiffText<'_>, front: TokenId, back: TokenId) -> TokenId {
    if text.is_linked(back) {
        return back;
    }

    let blank_front = patterns::ends_with_blank(text.str(front));
    let mut stop = text.prev(front);
    let mut above = text.prev(front);
    let mut below = Some(back);
    while let (Some(a), Some(b)) = (above, below) {
        if !text.is_linked(a) || text.key(a) != text.key(b) {
            break;
        }
        let token = text.str(a);
        if patterns::ends_with_line_break(token) {
            stop = Some(a);
            break;
        }
        if patterns::ends_with_blank(token) != blank_front {
            stop = Some(a);
        }
        above = text.prev(a);
        below = text.prev(b);
    }

    let mut end = back;
    let mut above = text.prev(front);
    let mut below = Some(back);
    while let (Some(a), Some(b)) = (above, below) {
        if above == stop || !text.is_linked(a) || text.is_linked(b) || text.key(a) != text.key(b) {
            break;
        }
        move_link(text, other, a, b);
        above = text.prev(a);
        below = text.prev(b);
        end = text.prev(b).unwrap_or(end);
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitPatterns;
    use crate::split::{Level, SplitRules};
    use crate::text::{Normalize, link};

    fn prepared<'a>(
        rules: &SplitRules,
        old: &'a str,
        new: &'a str,
        level: Level,
        pairs: &[(usize, usize)],
    ) -> (DiffText<'a>, DiffText<'a>) {
        let mut old_text = DiffText::new(old, rules, Normalize::default());
        let mut new_text = DiffText::new(new, rules, Normalize::default());
        old_text.split_all(rules, level);
        new_text.split_all(rules, level);
        let new_ids: Vec<_> = new_text.iter().collect();
        let old_ids: Vec<_> = old_text.iter().collect();
        for &(i, j) in pairs {
            link(&mut new_text, &mut old_text, new_ids[i], old_ids[j]);
        }
        (old_text, new_text)
    }

    fn linked(text: &DiffText<'_>) -> Vec<bool> {
        text.iter().map(|id| text.is_linked(id)).collect()
    }

    #[test]
    fn test_gap_slides_down_to_end() {
        let rules = SplitRules::compile(&SplitPatterns::default()).unwrap();
        // "aaa bbb" -> "aaa bbb bbb" with the old "bbb" linked to the last one
        let (mut old, mut new) = prepared(&rules, "aaa bbb", "aaa bbb bbb", Level::Word, &[(0, 0), (1, 1), (4, 2)]);
        slide_gaps(&mut new, &mut old);

        assert_eq!(linked(&new), [true, true, true, false, false]);
        let third = new.iter().nth(2).unwrap();
        let old_bbb = old.last().unwrap();
        assert_eq!(old.link(old_bbb), Some(third));
        assert_eq!(new.link(third), Some(old_bbb));
    }

    #[test]
    fn test_gap_stays_at_word_border() {
        let rules = SplitRules::compile(&SplitPatterns::default()).unwrap();
        let (mut old, mut new) = prepared(
            &rules,
            "hello world",
            "hello there world",
            Level::Word,
            &[(0, 0), (1, 1), (4, 2)],
        );
        slide_gaps(&mut new, &mut old);
        assert_eq!(linked(&new), [true, true, false, false, true]);
    }

    #[test]
    fn test_slide_up_stops_at_line_break() {
        let rules = SplitRules::compile(&SplitPatterns::default()).unwrap();
        // Gap "x\n" placed after the first line; it must not climb above "\n"
        let (mut old, mut new) = prepared(
            &rules,
            "a\nx\nb",
            "a\nx\nx\nb",
            Level::Line,
            &[(0, 0), (1, 1), (2, 2), (5, 3), (6, 4)],
        );
        slide_gaps(&mut new, &mut old);
        assert_eq!(new.iter().map(|id| new.str(id)).collect::<String>(), "a\nx\nx\nb");
        assert_eq!(linked(&new).iter().filter(|&&l| !l).count(), 2);
        assert!(linked(&old).iter().all(|&l| l));
    }
}
