//! Symbol table for one matching pass.
//!
//! Maps a token's symbol key to its occurrence counts and positions in both
//! versions.
//! Symbols are kept in first-seen order so that anchors are always linked in
//! the same order for the same input.
//!
//! # Complexity
//!
//! One hash lookup per token: O(n + m) per pass.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::id::TokenId;

#[derive(Debug, Clone, Default)]
pub(crate) struct Symbol {
    pub new_count: u32,
    pub old_count: u32,
    /// New tokens with this key, in list order
    pub new_positions: SmallVec<[TokenId; 2]>,
    /// Old tokens with this key, in list order
    pub old_positions: SmallVec<[TokenId; 2]>,
}

impl Symbol {
    /// Occurs exactly once in each version.
    #[inline]
    pub fn is_unique(&self) -> bool {
        self.new_count == 1 && self.old_count == 1
    }

    /// The token pair of a unique symbol.
    fn unique_pair(&self) -> Option<(TokenId, TokenId)> {
        match (self.new_positions.as_slice(), self.old_positions.as_slice()) {
            ([new], [old]) if self.is_unique() => Some((*new, *old)),
            _ => None,
        }
    }
}

/// Key → symbol index, borrowing keys from the token arenas.
#[derive(Debug, Default)]
pub(crate) struct SymbolTable<'k> {
    index: FxHashMap<&'k str, usize>,
    symbols: Vec<Symbol>,
}

impl<'k> SymbolTable<'k> {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, key: &'k str) -> &mut Symbol {
        let next = self.symbols.len();
        let slot = *self.index.entry(key).or_insert(next);
        if slot == next {
            self.symbols.push(Symbol::default());
        }
        &mut self.symbols[slot]
    }

    /// Record an unlinked token of the new text.
    pub fn add_new(&mut self, key: &'k str, id: TokenId) {
        let symbol = self.entry(key);
        symbol.new_count += 1;
        symbol.new_positions.push(id);
    }

    /// Record an unlinked token of the old text.
    pub fn add_old(&mut self, key: &'k str, id: TokenId) {
        let symbol = self.entry(key);
        symbol.old_count += 1;
        symbol.old_positions.push(id);
    }

    /// Token pairs of symbols occurring once in each version, in
    /// first-seen order.
    pub fn unique_pairs(&self) -> impl Iterator<Item = (TokenId, TokenId)> + '_ {
        self.symbols.iter().filter_map(Symbol::unique_pair)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
