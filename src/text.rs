//! Token arena for one text version.
//!
//! Tokens are stored in a `Vec` and threaded into a doubly-linked list in
//! text order. Refining a token at a finer level appends the pieces to the
//! arena and splices them into the list in place of the original token, so
//! ids handed out earlier stay valid and the list always concatenates to the
//! full text.

use std::borrow::Cow;

use compact_str::CompactString;
use rustc_hash::FxHashMap;

use crate::config::DiffConfig;
use crate::id::TokenId;
use crate::span::Span;
use crate::split::{Level, SplitRules};

// =============================================================================
// Token
// =============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Token {
    pub span: Span,
    /// Normalized symbol key, only set when it differs from the token text
    pub key: Option<CompactString>,
    pub prev: Option<TokenId>,
    pub next: Option<TokenId>,
    /// Corresponding token in the other version
    pub link: Option<TokenId>,
    /// Position in list order, set by [`DiffText::enumerate`]
    pub number: usize,
    /// Linked as an anchor that contains a unique word or is long enough
    pub unique: bool,
}

/// How token text is turned into a symbol key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Normalize {
    pub fold_case: bool,
    pub collapse_whitespace: bool,
}

impl Normalize {
    pub fn from_config(config: &DiffConfig) -> Self {
        Self {
            fold_case: !config.case_sensitive,
            collapse_whitespace: !config.whitespace_sensitive,
        }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        !self.fold_case && !self.collapse_whitespace
    }

    /// Normalized key, borrowed when normalization does not change `text`.
    pub fn key<'t>(&self, text: &'t str) -> Cow<'t, str> {
        let mut key = Cow::Borrowed(text);
        if self.collapse_whitespace && text.chars().any(char::is_whitespace) {
            let mut out = String::with_capacity(text.len());
            let mut in_space = false;
            for c in text.chars() {
                if c.is_whitespace() {
                    if !in_space {
                        out.push(' ');
                    }
                    in_space = true;
                } else {
                    out.push(c);
                    in_space = false;
                }
            }
            key = Cow::Owned(out);
        }
        if self.fold_case && key.chars().any(char::is_uppercase) {
            key = Cow::Owned(key.to_lowercase());
        }
        key
    }
}

// =============================================================================
// DiffText
// =============================================================================

/// One version of the compared text with its token list.
#[derive(Debug)]
pub(crate) struct DiffText<'a> {
    text: &'a str,
    tokens: Vec<Token>,
    first: Option<TokenId>,
    last: Option<TokenId>,
    /// Occurrences of every word and inline chunk in the whole text
    words: FxHashMap<&'a str, u32>,
    normalize: Normalize,
}

impl<'a> DiffText<'a> {
    pub fn new(text: &'a str, rules: &SplitRules, normalize: Normalize) -> Self {
        let mut words: FxHashMap<&'a str, u32> = FxHashMap::default();
        for word in rules.words_and_chunks(text) {
            *words.entry(word).or_default() += 1;
        }
        Self {
            text,
            tokens: Vec::new(),
            first: None,
            last: None,
            words,
            normalize,
        }
    }

    #[inline]
    pub fn text(&self) -> &'a str {
        self.text
    }

    #[inline]
    pub fn first(&self) -> Option<TokenId> {
        self.first
    }

    #[inline]
    pub fn last(&self) -> Option<TokenId> {
        self.last
    }

    #[inline]
    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id.index()]
    }

    #[inline]
    pub fn next(&self, id: TokenId) -> Option<TokenId> {
        self.tokens[id.index()].next
    }

    #[inline]
    pub fn prev(&self, id: TokenId) -> Option<TokenId> {
        self.tokens[id.index()].prev
    }

    #[inline]
    pub fn link(&self, id: TokenId) -> Option<TokenId> {
        self.tokens[id.index()].link
    }

    #[inline]
    pub fn is_linked(&self, id: TokenId) -> bool {
        self.tokens[id.index()].link.is_some()
    }

    #[inline]
    pub fn set_link(&mut self, id: TokenId, link: Option<TokenId>) {
        self.tokens[id.index()].link = link;
    }

    #[inline]
    pub fn set_unique(&mut self, id: TokenId) {
        self.tokens[id.index()].unique = true;
    }

    #[inline]
    pub fn span(&self, id: TokenId) -> Span {
        self.tokens[id.index()].span
    }

    #[inline]
    pub fn number(&self, id: TokenId) -> usize {
        self.tokens[id.index()].number
    }

    /// Raw token text.
    #[inline]
    pub fn str(&self, id: TokenId) -> &'a str {
        self.tokens[id.index()].span.slice(self.text)
    }

    /// Symbol key of a token.
    #[inline]
    pub fn key(&self, id: TokenId) -> &str {
        let token = &self.tokens[id.index()];
        match &token.key {
            Some(key) => key.as_str(),
            None => token.span.slice(self.text),
        }
    }

    /// Occurrences of `word` in the whole text.
    #[inline]
    pub fn word_count(&self, word: &str) -> u32 {
        self.words.get(word).copied().unwrap_or(0)
    }

    /// Iterate token ids in list order.
    #[cfg(test)]
    pub fn iter(&self) -> TokenIter<'_, 'a> {
        TokenIter {
            text: self,
            cursor: self.first,
        }
    }

    // =========================================================================
    // Splitting
    // =========================================================================

    /// Split the whole text at `level`, replacing any existing list.
    pub fn split_all(&mut self, rules: &SplitRules, level: Level) {
        self.tokens.clear();
        self.first = None;
        self.last = None;
        self.splice(rules, level, None);
    }

    /// Re-split every unlinked token at `level`.
    pub fn split_refine(&mut self, rules: &SplitRules, level: Level) {
        let mut cursor = self.first;
        while let Some(id) = cursor {
            cursor = self.next(id);
            if !self.is_linked(id) {
                self.splice(rules, level, Some(id));
            }
        }
    }

    /// Re-split a single token at `level`.
    #[inline]
    pub fn split_token(&mut self, rules: &SplitRules, level: Level, id: TokenId) {
        self.splice(rules, level, Some(id));
    }

    fn splice(&mut self, rules: &SplitRules, level: Level, target: Option<TokenId>) {
        let (span, prev, next) = match target {
            Some(id) => {
                let token = &self.tokens[id.index()];
                (token.span, token.prev, token.next)
            }
            None => (Span::new(0, self.text.len()), None, None),
        };

        let pieces = rules.split(span.slice(self.text), level);
        if pieces.is_empty() {
            return;
        }
        // Nothing to refine
        if target.is_some() && pieces.len() == 1 {
            return;
        }

        let first_new = TokenId::new(self.tokens.len());
        let mut prev_id = prev;
        for piece in pieces {
            let id = TokenId::new(self.tokens.len());
            let piece = piece.offset(span.start);
            let key = self.make_key(piece);
            self.tokens.push(Token {
                span: piece,
                key,
                prev: prev_id,
                next: None,
                link: None,
                number: 0,
                unique: false,
            });
            if let Some(p) = prev_id {
                self.tokens[p.index()].next = Some(id);
            }
            prev_id = Some(id);
        }
        let last_new = prev_id;

        if let Some(last_id) = last_new {
            self.tokens[last_id.index()].next = next;
        }
        if let Some(n) = next {
            self.tokens[n.index()].prev = last_new;
        }
        match target {
            None => {
                self.first = Some(first_new);
                self.last = last_new;
            }
            Some(id) => {
                if self.first == Some(id) {
                    self.first = Some(first_new);
                }
                if self.last == Some(id) {
                    self.last = last_new;
                }
            }
        }
    }

    fn make_key(&self, span: Span) -> Option<CompactString> {
        if self.normalize.is_identity() {
            return None;
        }
        match self.normalize.key(span.slice(self.text)) {
            Cow::Borrowed(_) => None,
            Cow::Owned(key) => Some(CompactString::from(key)),
        }
    }

    /// Number tokens in list order.
    pub fn enumerate(&mut self) {
        let mut number = 0;
        let mut cursor = self.first;
        while let Some(id) = cursor {
            let token = &mut self.tokens[id.index()];
            token.number = number;
            number += 1;
            cursor = token.next;
        }
    }
}

/// Link token `i` of the new text with token `j` of the old text.
#[inline]
pub(crate) fn link(new: &mut DiffText<'_>, old: &mut DiffText<'_>, i: TokenId, j: TokenId) {
    new.set_link(i, Some(j));
    old.set_link(j, Some(i));
}

/// Iterator over token ids in list order.
#[cfg(test)]
pub(crate) struct TokenIter<'t, 'a> {
    text: &'t DiffText<'a>,
    cursor: Option<TokenId>,
}

#[cfg(test)]
impl Iterator for TokenIter<'_, '_> {
    type Item = TokenId;

    fn next(&mut self) -> Option<TokenId> {
        let id = self.cursor?;
        self.cursor = self.text.next(id);
        Some(id)
    }
}

// =============================================================================
// Tests
// =============================================================================
