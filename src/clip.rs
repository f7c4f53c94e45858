//! Elision of long unchanged text.
//!
//! An unmoved [`Fragment::Copy`] longer than the clip thresholds is cut into
//! a head, an [`Fragment::Omission`] and a tail. Cuts prefer a paragraph
//! break, then a line break, then a blank, then a fixed byte count. The first
//! fragment of a diff keeps only its tail and the last only its head, since
//! there is no change on the other side to give context for.
//!
//! The omission carries the elided text, so the fragment list still
//! reconstructs both versions.

use crate::config::ClipConfig;
use crate::fragment::Fragment;
use crate::span::Span;
use crate::split::patterns;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cut {
    Paragraph,
    Line,
    Blank,
    Chars,
    Fixed,
}

impl Cut {
    /// Cut falls inside running text, so blanks next to it are trimmed too.
    #[inline]
    fn trims_blanks(self) -> bool {
        matches!(self, Cut::Blank | Cut::Chars)
    }
}

/// Break positions inside one unchanged text.
struct Breaks {
    /// Starts of line break runs, plus `0` and the text length
    lines: Vec<usize>,
    /// Starts of paragraph break runs, plus `0` and the text length
    paragraphs: Vec<usize>,
    /// Starts of blank runs
    blanks: Vec<usize>,
}

impl Breaks {
    fn scan(text: &str) -> Self {
        let lines = runs(text, patterns::is_line_break);
        let paragraphs = paragraph_runs(text);
        let blanks = runs(text, patterns::is_blank);
        Self {
            lines: with_edges(lines, text.len()),
            paragraphs: with_edges(paragraphs, text.len()),
            blanks,
        }
    }
}

/// Start positions of runs of characters matching `class`.
fn runs(text: &str, class: fn(char) -> bool) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut inside = false;
    for (pos, c) in text.char_indices() {
        let matched = class(c);
        if matched && !inside {
            starts.push(pos);
        }
        inside = matched;
    }
    starts
}

/// Starts of paragraph breaks: two or more line breaks, or a form feed or
/// paragraph separator.
fn paragraph_runs(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut run: Option<(usize, usize, bool)> = None;
    let flush = |run: Option<(usize, usize, bool)>, starts: &mut Vec<usize>| {
        if let Some((start, newlines, separator)) = run {
            if newlines >= 2 || separator {
                starts.push(start);
            }
        }
    };
    let mut prev = '\0';
    for (pos, c) in text.char_indices() {
        if patterns::is_line_break(c) {
            let (start, mut newlines, mut separator) = run.unwrap_or((pos, 0, false));
            if matches!(c, '\x0C' | '\u{2029}') {
                separator = true;
            } else if !(c == '\n' && prev == '\r') {
                newlines += 1;
            }
            run = Some((start, newlines, separator));
        } else {
            flush(run.take(), &mut starts);
        }
        prev = c;
    }
    flush(run, &mut starts);
    starts
}

fn with_edges(mut positions: Vec<usize>, len: usize) -> Vec<usize> {
    if positions.first() != Some(&0) {
        positions.insert(0, 0);
    }
    if positions.last() != Some(&len) {
        positions.push(len);
    }
    positions
}

fn floor_char_boundary(text: &str, mut pos: usize) -> usize {
    pos = pos.min(text.len());
    while !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

// =============================================================================
// Cut search
// =============================================================================

/// End of the head kept from the start of `text`.
fn find_left(text: &str, breaks: &Breaks, config: &ClipConfig) -> (usize, Cut) {
    let len = text.len();
    let max = breaks.lines.get(config.lines_max).copied().unwrap_or(len);

    for &pos in &breaks.paragraphs {
        if pos > config.paragraph_max || pos > max {
            break;
        }
        if pos > config.paragraph_min {
            return (pos, Cut::Paragraph);
        }
    }
    for &pos in &breaks.lines {
        if pos > config.line_max || pos > max {
            break;
        }
        if pos > config.line_min {
            return (pos, Cut::Line);
        }
    }
    if let Some(&pos) = breaks.blanks.iter().find(|&&pos| pos >= config.blank_min) {
        if pos < config.blank_max && pos < max {
            return (pos, Cut::Blank);
        }
    }
    if config.chars < max {
        return (floor_char_boundary(text, config.chars), Cut::Chars);
    }
    (max, Cut::Fixed)
}

/// Start of the tail kept at the end of `text`.
fn find_right(text: &str, breaks: &Breaks, config: &ClipConfig) -> (usize, Cut) {
    let len = text.len();
    let lines = &breaks.lines;
    let min = if lines.len() >= config.lines_max {
        lines[lines.len() - config.lines_max]
    } else {
        0
    };

    for &pos in breaks.paragraphs.iter().rev() {
        if pos < len.saturating_sub(config.paragraph_max) || pos < min {
            break;
        }
        if pos < len.saturating_sub(config.paragraph_min) {
            return (pos, Cut::Paragraph);
        }
    }
    for &pos in lines.iter().rev() {
        if pos < len.saturating_sub(config.line_max) || pos < min {
            break;
        }
        if pos < len.saturating_sub(config.line_min) {
            return (pos, Cut::Line);
        }
    }

    let from = len.saturating_sub(config.blank_max).max(min);
    let mut last = None;
    for &pos in breaks.blanks.iter().filter(|&&pos| pos >= from) {
        if pos > len.saturating_sub(config.blank_min) {
            if let Some(last) = last {
                return (last, Cut::Blank);
            }
            break;
        }
        last = Some(pos);
    }

    let chars = len.saturating_sub(config.chars);
    if chars > min {
        return (floor_char_boundary(text, chars), Cut::Chars);
    }
    (min, Cut::Fixed)
}

// =============================================================================
// Clipping
// =============================================================================

/// Clip long unmoved copy fragments in place.
pub(crate) fn clip_fragments(fragments: &mut Vec<Fragment>, config: &ClipConfig) {
    if !config.enabled || fragments.len() < 2 {
        return;
    }
    let min_length = config.min_length();
    let last_index = fragments.len() - 1;
    let mut out = Vec::with_capacity(fragments.len() + 2);
    let mut clipped = 0usize;

    for (index, fragment) in std::mem::take(fragments).into_iter().enumerate() {
        let Fragment::Copy { text, old, new } = &fragment else {
            out.push(fragment);
            continue;
        };
        if text.len() < min_length {
            out.push(fragment);
            continue;
        }
        match clip_one(text, *old, *new, index != 0, index != last_index, config) {
            Some(pieces) => {
                out.extend(pieces);
                clipped += 1;
            }
            None => out.push(fragment),
        }
    }

    tracing::debug!(clipped, "clipped unchanged fragments");
    *fragments = out;
}

fn clip_one(
    text: &str,
    old: Span,
    new: Span,
    keep_head: bool,
    keep_tail: bool,
    config: &ClipConfig,
) -> Option<Vec<Fragment>> {
    let len = text.len();
    let breaks = Breaks::scan(text);
    let left = keep_head.then(|| find_left(text, &breaks, config));
    let right = keep_tail.then(|| find_right(text, &breaks, config));

    let head_end = left.map_or(0, |(pos, _)| pos);
    let tail_start = right.map_or(len, |(pos, _)| pos);
    if head_end > tail_start || tail_start - head_end < config.skip_chars {
        return None;
    }
    let omitted_lines = breaks
        .lines
        .iter()
        .filter(|&&pos| pos > head_end && pos <= tail_start)
        .take(config.skip_lines)
        .count();
    if omitted_lines < config.skip_lines {
        return None;
    }

    // Trailing breaks of the head and leading breaks of the tail are elided
    let head_end = match left {
        Some((pos, cut)) => trim_end(text, pos, cut),
        None => 0,
    };
    let tail_start = match right {
        Some((pos, cut)) => trim_start(text, pos, cut),
        None => len,
    };
    if head_end >= tail_start {
        return None;
    }

    let at = |offset: usize| (old.start + offset.min(old.len()), new.start + offset);
    let piece = |from: usize, to: usize| {
        let (old_from, new_from) = at(from);
        let (old_to, new_to) = at(to);
        (
            text[from..to].to_owned(),
            Span::new(old_from, old_to),
            Span::new(new_from, new_to),
        )
    };

    let mut pieces = Vec::with_capacity(3);
    if head_end > 0 {
        let (text, old, new) = piece(0, head_end);
        pieces.push(Fragment::Copy { text, old, new });
    }
    let (text_omitted, old_omitted, new_omitted) = piece(head_end, tail_start);
    pieces.push(Fragment::Omission {
        text: text_omitted,
        old: old_omitted,
        new: new_omitted,
    });
    if tail_start < len {
        let (text, old, new) = piece(tail_start, len);
        pieces.push(Fragment::Copy { text, old, new });
    }
    Some(pieces)
}

fn trim_end(text: &str, pos: usize, cut: Cut) -> usize {
    let head = &text[..pos];
    let trimmed = if cut.trims_blanks() {
        head.trim_end_matches(|c| patterns::is_blank(c) || patterns::is_line_break(c))
    } else {
        head.trim_end_matches(patterns::is_line_break)
    };
    trimmed.len()
}

fn trim_start(text: &str, pos: usize, cut: Cut) -> usize {
    let tail = &text[pos..];
    let trimmed = if cut.trims_blanks() {
        tail.trim_start_matches(|c| patterns::is_blank(c) || patterns::is_line_break(c))
    } else {
        tail.trim_start_matches(patterns::is_line_break)
    };
    text.len() - trimmed.len()
}
