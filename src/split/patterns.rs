//! Default boundary patterns and character classes.
//!
//! The defaults are tuned for prose mixed with lightweight markup (wikitext,
//! markdown, inline HTML): markup markers such as `[[`, `{{`, `'''` or `**`
//! stay whole at word level, and links/templates/tags stay whole at chunk
//! level.
//!
//! Blanks are `' '`, tab, vertical tab, U+2000..U+200B, U+202F, U+205F and
//! U+3000. Line breaks are `\n`, `\r`, U+0085 and U+2028; paragraph breaks
//! are form feed and U+2029.

/// Two or more line breaks, or a paragraph separator.
pub const PARAGRAPH: &str = r"(?:\r\n|\n|\r){2,}|[\x0C\x{2029}]";

/// A single line break.
pub const LINE: &str = r"\r\n|\n|\r|[\x{85}\x{2028}]";

/// Shortest run from a non-blank up to sentence terminators that are followed
/// by a blank or the end of a line. Only the `token` group becomes the token.
pub const SENTENCE: &str = concat!(
    r"(?m)(?P<token>[^ \t\x0B\x{2000}-\x{200B}\x{202F}\x{205F}\x{3000}].*?",
    r"[.!?:;",
    r"\x{589}\x{6D4}\x{701}\x{702}\x{964}\x{DF4}\x{1362}\x{166E}\x{1803}\x{1809}",
    r"\x{2CF9}\x{2CFE}\x{2E3C}\x{3002}\x{A4FF}\x{A60E}\x{A6F3}\x{FE52}\x{FF0E}\x{FF61}",
    r"\x{1C3}\x{55C}\x{7F9}\x{1944}\x{203C}\x{2048}\x{FE15}\x{FE57}\x{FF01}",
    r"\x{37E}\x{55E}\x{61F}\x{1367}\x{1945}\x{2047}\x{2049}\x{2CFA}\x{2CFB}\x{2E2E}",
    r"\x{A60F}\x{A6F7}\x{FE56}\x{FF1F}",
    r"]+)",
    r"(?:[ \t\x0B\x{2000}-\x{200B}\x{202F}\x{205F}\x{3000}]|$)",
);

/// Inline markup kept whole: wiki links, templates, markdown links,
/// external links, HTML tags, opening of piped templates, bare URLs.
pub const CHUNK: &str = concat!(
    r"\[\[[^\[\]\n]+\]\]",
    r"|\{\{[^\{\}\n]+\}\}",
    r"|\[[^\[\]\n]+\]\([^()\s]+\)",
    r"|\[[^\[\]\n]+\]",
    r"|</?[^<>\[\]\{\}\n]+>",
    r"|\{\{[^\{\}\|\n]+\|",
    r#"|\b(?:https?:)?//[^\x00-\x20\s"\[\]\x7F]+"#,
);

/// Unicode words with apostrophe continuations, multi-char markup markers,
/// else any single character except line breaks.
pub const WORD: &str = concat!(
    r"\w+(?:['’]\w+)*",
    r"|\[\[|\]\]|\{\{|\}\}|&\w+;|'''|''|==+|\{\||\|\}|\|-|\*\*|~~",
    r"|.",
);

/// Every character.
pub const CHARACTER: &str = r"(?s).";

/// Real words, used for word counts and the unique-word test.
pub const WORD_COUNT: &str = r"\w+(?:['’]\w+)*";

/// Breaking white space other than line and paragraph breaks.
#[inline]
pub fn is_blank(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\x0B' | '\u{2000}'..='\u{200B}' | '\u{202F}' | '\u{205F}' | '\u{3000}'
    )
}

/// Line and paragraph breaks.
#[inline]
pub fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{85}' | '\u{2028}' | '\x0C' | '\u{2029}'
    )
}

/// Token consists of blanks and line breaks only (never used as an anchor).
#[inline]
pub fn is_blank_only(token: &str) -> bool {
    token.chars().all(|c| is_blank(c) || is_line_break(c))
}

/// Token ends with a line break (gap sliding stops here).
#[inline]
pub fn ends_with_line_break(token: &str) -> bool {
    token.chars().next_back().is_some_and(is_line_break)
}

/// Token ends with a blank (word border for gap sliding).
#[inline]
pub fn ends_with_blank(token: &str) -> bool {
    token.chars().next_back().is_some_and(is_blank)
}
