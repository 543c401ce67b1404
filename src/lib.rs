//! Fill a crossword grid from a word list by treating it as a constraint-satisfaction problem:
//! every slot needs a word of the right length, crossing slots must agree on their shared letter,
//! and no word may be used twice. We prune with node and arc consistency before running a
//! backtracking search that maintains arc consistency as it goes.

pub mod consistency;
pub mod domains;
pub mod grid;
pub mod image;
pub mod search;
pub mod word_list;

/// The expected maximum number of distinct characters/rebuses/whatever appearing in a word list.
pub const MAX_GLYPH_COUNT: usize = 256;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

pub use consistency::{ac3, enforce_node_consistency, revise, ArcConsistencyFailure, ArcConsistencySuccess};
pub use domains::Domains;
pub use grid::{letter_grid, render_grid, Choice, Crossword, Direction, GridError, Slot, SlotId};
pub use image::{render_image, render_svg, save_image, ImageError, ImageFormat};
pub use search::{backtrack, solve, Assignment, FillFailure, FillOptions, FillSuccess, SlotOrder, Statistics, ValueOrder};
pub use word_list::{WordId, WordList, WordListError};
