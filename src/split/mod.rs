//! Hierarchical text splitting.
//!
//! A text is split into tokens at one of six [`Level`]s, from paragraphs down
//! to single characters. Each level has a boundary pattern: every match (or
//! its `token` capture group, where the pattern needs trailing context) is a
//! token, and every stretch of text between two matches is a token too. The
//! result is therefore always gap-free and length-preserving:
//!
//! ```
//! use tola_textdiff::split::{Level, SplitRules};
//! use tola_textdiff::DiffConfig;
//!
//! let rules = SplitRules::compile(&DiffConfig::default().patterns).unwrap();
//! let text = "One line.\nAnother line.";
//! let tokens: Vec<&str> = rules
//!     .split(text, Level::Line)
//!     .iter()
//!     .map(|span| span.slice(text))
//!     .collect();
//! assert_eq!(tokens, ["One line.", "\n", "Another line."]);
//! assert_eq!(tokens.concat(), text);
//! ```

pub mod patterns;

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::SplitPatterns;
use crate::error::ConfigError;
use crate::span::Span;

// =============================================================================
// Level
// =============================================================================

/// Granularity of tokenization, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Paragraph,
    Line,
    Sentence,
    Chunk,
    Word,
    Character,
}

impl Level {
    /// All levels, coarsest first.
    pub const ALL: [Level; 6] = [
        Level::Paragraph,
        Level::Line,
        Level::Sentence,
        Level::Chunk,
        Level::Word,
        Level::Character,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Paragraph => "paragraph",
            Level::Line => "line",
            Level::Sentence => "sentence",
            Level::Chunk => "chunk",
            Level::Word => "word",
            Level::Character => "character",
        }
    }

    /// Next finer level, `None` at character level.
    pub const fn finer(self) -> Option<Level> {
        match self {
            Level::Paragraph => Some(Level::Line),
            Level::Line => Some(Level::Sentence),
            Level::Sentence => Some(Level::Chunk),
            Level::Chunk => Some(Level::Word),
            Level::Word => Some(Level::Character),
            Level::Character => None,
        }
    }

    /// Unresolved gaps are re-matched recursively at these levels.
    #[inline]
    pub const fn recurses(self) -> bool {
        matches!(self, Level::Word | Level::Character)
    }

    #[inline]
    const fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Compiled rules
// =============================================================================

#[derive(Debug, Clone)]
struct Rule {
    regex: Regex,
    /// Pattern has a `token` group narrowing the match
    token_group: bool,
}

/// Compiled boundary patterns for all levels.
#[derive(Debug, Clone)]
pub struct SplitRules {
    rules: [Rule; 6],
    word_count: Regex,
}

impl SplitRules {
    /// Compile and check the per-level patterns.
    ///
    /// Fails with [`ConfigError::InvalidPattern`] for malformed patterns and
    /// [`ConfigError::EmptyPatternMatch`] for patterns matching `""`.
    pub fn compile(patterns: &SplitPatterns) -> Result<Self, ConfigError> {
        let rules = [
            compile_rule(Level::Paragraph, &patterns.paragraph)?,
            compile_rule(Level::Line, &patterns.line)?,
            compile_rule(Level::Sentence, &patterns.sentence)?,
            compile_rule(Level::Chunk, &patterns.chunk)?,
            compile_rule(Level::Word, &patterns.word)?,
            compile_rule(Level::Character, &patterns.character)?,
        ];
        let word_count =
            Regex::new(patterns::WORD_COUNT).map_err(|err| ConfigError::pattern(Level::Word, err))?;
        Ok(Self { rules, word_count })
    }

    /// Regex used for `level`.
    #[inline]
    pub fn regex(&self, level: Level) -> &Regex {
        &self.rules[level.slot()].regex
    }

    /// Split `text` at `level` into gap-free spans relative to `text`.
    pub fn split(&self, text: &str, level: Level) -> Vec<Span> {
        let rule = &self.rules[level.slot()];
        let mut spans = Vec::new();
        let mut last = 0;

        let mut push = |start: usize, end: usize, spans: &mut Vec<Span>| {
            if start >= end || start < last {
                return;
            }
            spans.push(Span::new(last, start));
            spans.push(Span::new(start, end));
            last = end;
        };

        if rule.token_group {
            for caps in rule.regex.captures_iter(text) {
                if let Some(m) = caps.name("token").or_else(|| caps.get(0)) {
                    push(m.start(), m.end(), &mut spans);
                }
            }
        } else {
            for m in rule.regex.find_iter(text) {
                push(m.start(), m.end(), &mut spans);
            }
        }
        if last < text.len() {
            spans.push(Span::new(last, text.len()));
        }
        spans.retain(|span| !span.is_empty());
        spans
    }

    /// Number of real words in `text`.
    pub fn count_words(&self, text: &str) -> usize {
        self.word_count.find_iter(text).count()
    }

    /// Words and inline chunks of `text`, for unique-word detection.
    pub fn words_and_chunks<'t>(&self, text: &'t str) -> impl Iterator<Item = &'t str> {
        self.word_count
            .find_iter(text)
            .chain(self.regex(Level::Chunk).find_iter(text))
            .map(|m| m.as_str())
    }
}

fn compile_rule(level: Level, pattern: &str) -> Result<Rule, ConfigError> {
    let regex = Regex::new(pattern).map_err(|err| ConfigError::pattern(level, err))?;
    if regex.is_match("") {
        return Err(ConfigError::EmptyPatternMatch { level });
    }
    let token_group = regex.capture_names().any(|name| name == Some("token"));
    Ok(Rule { regex, token_group })
}

// =============================================================================
// Tests
// =============================================================================
