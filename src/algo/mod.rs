//! Diff algorithm stages.
//!
//! - `symbol`: token symbol table for unique-pair detection
//! - `matcher`: level matching with recursion and repetition
//! - `refine`: character-level refinement of similar tokens
//! - `align`: gap sliding toward line breaks and word borders
//! - `blocks`: unchanged, inserted and deleted block construction
//! - `moves`: fixed-chain selection, unlinking and move groups

mod align;
mod blocks;
mod matcher;
mod moves;
mod refine;
mod symbol;

pub use blocks::{Block, BlockKind};
pub use moves::{MoveDirection, MoveGroup};

pub(crate) use align::slide_gaps;
pub(crate) use matcher::Matcher;
pub(crate) use moves::detect;
pub(crate) use refine::refine_chars;
