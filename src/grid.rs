use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::Path;

use smallvec::SmallVec;

use crate::word_list::{WordId, WordList};
use crate::MAX_SLOT_LENGTH;

/// An identifier for a given slot, based on its index in the Crossword's `slots` field.
pub type SlotId = usize;

/// Zero-indexed (row, column) coords for a cell in the grid, where row = 0 is the top row.
pub type GridCoord = (usize, usize);

/// The character indices, within the first and second slot respectively, of the cell two slots
/// share.
pub type Overlap = (usize, usize);

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Across,
    Down,
}

/// A run of fillable cells that needs one word. Two slots with the same position, length and
/// direction are the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub row: usize,
    pub col: usize,
    pub length: usize,
    pub direction: Direction,
}

impl Slot {
    pub fn new(row: usize, col: usize, length: usize, direction: Direction) -> Slot {
        Slot { row, col, length, direction }
    }

    /// The coords of the cell at `cell_idx` within this slot.
    pub fn cell(&self, cell_idx: usize) -> GridCoord {
        match self.direction {
            Direction::Across => (self.row, self.col + cell_idx),
            Direction::Down => (self.row + cell_idx, self.col),
        }
    }

    /// Generate the coords for each cell of this slot.
    pub fn cell_coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.length).map(move |cell_idx| self.cell(cell_idx))
    }
}

/// A crossing between one slot and another, referencing the other slot's id and the location of
/// the intersection within each slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub cell: usize,
    pub other_slot_cell: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("grid template has no rows")]
    Empty,

    #[error("unexpected character {found:?} at row {row}, column {col} (expected '#', ' ', '_' or '.')")]
    InvalidCell { row: usize, col: usize, found: char },

    #[error("failed to read grid template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The static shape of the puzzle: which cells are fillable, the slots they form, and how those
/// slots cross.
pub struct Crossword {
    pub width: usize,
    pub height: usize,
    structure: Vec<Vec<bool>>,
    slots: Vec<Slot>,
    slot_ids_by_slot: HashMap<Slot, SlotId>,

    /// Keyed by ordered pair; both orders of every crossing pair are present.
    overlaps: HashMap<(SlotId, SlotId), Overlap>,

    /// For each slot, its crossings sorted by `other_slot_id`.
    crossings: Vec<SmallVec<[Crossing; MAX_SLOT_LENGTH]>>,
}

impl Debug for Crossword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crossword")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("slots", &self.slots)
            .field("crossings", &self.crossings)
            .finish()
    }
}

impl Crossword {
    /// Build a crossword from explicit slots. Cells covered by any slot are treated as fillable;
    /// every other cell is a block.
    pub fn new(width: usize, height: usize, slots: Vec<Slot>) -> Crossword {
        let mut structure = vec![vec![false; width]; height];
        for slot in &slots {
            for (row, col) in slot.cell_coords() {
                if row < height && col < width {
                    structure[row][col] = true;
                }
            }
        }

        Crossword::build(width, height, structure, slots)
    }

    fn build(width: usize, height: usize, structure: Vec<Vec<bool>>, slots: Vec<Slot>) -> Crossword {
        let slot_ids_by_slot: HashMap<Slot, SlotId> =
            slots.iter().enumerate().map(|(slot_id, &slot)| (slot, slot_id)).collect();

        // Build a map from cell location to the slots involved, which we can then use to calculate
        // crossings.
        let mut entries_by_loc: HashMap<GridCoord, Vec<(SlotId, usize)>> = HashMap::new();
        for (slot_id, slot) in slots.iter().enumerate() {
            for (cell_idx, loc) in slot.cell_coords().enumerate() {
                entries_by_loc.entry(loc).or_default().push((slot_id, cell_idx));
            }
        }

        let mut overlaps: HashMap<(SlotId, SlotId), Overlap> = HashMap::new();
        let mut crossings: Vec<SmallVec<[Crossing; MAX_SLOT_LENGTH]>> =
            slots.iter().map(|_| SmallVec::new()).collect();

        for entries in entries_by_loc.values() {
            for &(slot_id, cell) in entries {
                for &(other_slot_id, other_slot_cell) in entries {
                    if slots[slot_id].direction == slots[other_slot_id].direction {
                        continue;
                    }
                    overlaps.insert((slot_id, other_slot_id), (cell, other_slot_cell));
                    crossings[slot_id].push(Crossing { other_slot_id, cell, other_slot_cell });
                }
            }
        }

        for slot_crossings in &mut crossings {
            slot_crossings.sort_by_key(|crossing| (crossing.other_slot_id, crossing.cell));
        }

        Crossword { width, height, structure, slots, slot_ids_by_slot, overlaps, crossings }
    }

    /// Parse a grid template, with `#` or a space representing blocks and `_` or `.` representing
    /// fillable cells. Blank lines, trailing whitespace, and indentation shared by every row are
    /// ignored; short rows are padded with blocks.
    pub fn from_template(template: &str) -> Result<Crossword, GridError> {
        let lines: Vec<&str> = template
            .lines()
            .map(|line| line.trim_end())
            .filter(|line| !line.is_empty())
            .collect();

        if lines.is_empty() {
            return Err(GridError::Empty);
        }

        let indent = lines
            .iter()
            .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
            .min()
            .unwrap_or(0);
        let rows: Vec<String> = lines.iter().map(|line| line.chars().skip(indent).collect()).collect();

        let height = rows.len();
        let width = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0);
        let mut structure = vec![vec![false; width]; height];

        for (row, line) in rows.iter().enumerate() {
            for (col, found) in line.chars().enumerate() {
                structure[row][col] = match found {
                    '#' | ' ' => false,
                    '_' | '.' => true,
                    _ => return Err(GridError::InvalidCell { row, col, found }),
                };
            }
        }

        let mut slots: Vec<Slot> = vec![];

        for (row, cells) in structure.iter().enumerate() {
            for (col, length) in fillable_runs(cells.iter().cloned()) {
                slots.push(Slot::new(row, col, length, Direction::Across));
            }
        }
        for col in 0..width {
            let cells = structure.iter().map(|cells| cells[col]);
            for (row, length) in fillable_runs(cells) {
                slots.push(Slot::new(row, col, length, Direction::Down));
            }
        }

        log::debug!("Parsed {}x{} template into {} slots", width, height, slots.len());

        Ok(Crossword::build(width, height, structure, slots))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Crossword, GridError> {
        let path = path.as_ref();
        let template = fs::read_to_string(path).map_err(|source| GridError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Crossword::from_template(&template)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, slot_id: SlotId) -> &Slot {
        &self.slots[slot_id]
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_id(&self, slot: &Slot) -> Option<SlotId> {
        self.slot_ids_by_slot.get(slot).cloned()
    }

    pub fn is_fillable(&self, row: usize, col: usize) -> bool {
        self.structure.get(row).and_then(|cells| cells.get(col)).cloned().unwrap_or(false)
    }

    /// The shared-cell constraint between two slots, if they cross.
    pub fn overlap(&self, slot_id: SlotId, other_slot_id: SlotId) -> Option<Overlap> {
        self.overlaps.get(&(slot_id, other_slot_id)).cloned()
    }

    /// Like `overlap`, but addressed by slot value.
    pub fn overlap_between(&self, slot: &Slot, other_slot: &Slot) -> Option<Overlap> {
        self.overlap(self.slot_id(slot)?, self.slot_id(other_slot)?)
    }

    pub fn crossings(&self, slot_id: SlotId) -> &[Crossing] {
        &self.crossings[slot_id]
    }

    /// Ids of every slot that crosses the given one, in ascending order.
    pub fn neighbor_ids(&self, slot_id: SlotId) -> impl Iterator<Item = SlotId> + '_ {
        self.crossings[slot_id].iter().map(|crossing| crossing.other_slot_id)
    }

    /// Every other slot with a defined overlap against the given one.
    pub fn neighbors(&self, slot: &Slot) -> HashSet<Slot> {
        match self.slot_id(slot) {
            Some(slot_id) => self.neighbor_ids(slot_id).map(|id| self.slots[id]).collect(),
            None => HashSet::new(),
        }
    }

    pub fn degree(&self, slot_id: SlotId) -> usize {
        self.crossings[slot_id].len()
    }
}

/// Find each maximal run of `true` cells of length 2 or more, returned as (start, length).
fn fillable_runs<I: IntoIterator<Item = bool>>(cells: I) -> Vec<(usize, usize)> {
    let mut runs = vec![];
    let mut run_start: Option<usize> = None;
    let mut len = 0;

    for (idx, fillable) in cells.into_iter().enumerate() {
        len = idx + 1;
        match (fillable, run_start) {
            (true, None) => run_start = Some(idx),
            (false, Some(start)) => {
                if idx - start > 1 {
                    runs.push((start, idx - start));
                }
                run_start = None;
            }
            _ => {}
        }
    }

    if let Some(start) = run_start {
        if len - start > 1 {
            runs.push((start, len - start));
        }
    }

    runs
}

/// A struct recording a slot assignment made during the filling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// Lay the given choices out on a `height` x `width` matrix of letters. Blocks and unfilled cells
/// are `None`.
pub fn letter_grid(crossword: &Crossword, words: &WordList, choices: &[Choice]) -> Vec<Vec<Option<char>>> {
    let mut letters = vec![vec![None; crossword.width]; crossword.height];

    for &Choice { slot_id, word_id } in choices {
        let slot = crossword.slot(slot_id);
        let word = words.word(word_id);

        for (cell_idx, &glyph) in word.glyphs.iter().enumerate().take(slot.length) {
            let (row, col) = slot.cell(cell_idx);
            letters[row][col] = Some(words.glyphs[glyph]);
        }
    }

    letters
}

/// Turn the given crossword and fill choices into a rendered string.
pub fn render_grid(crossword: &Crossword, words: &WordList, choices: &[Choice]) -> String {
    let letters = letter_grid(crossword, words, choices);

    letters
        .iter()
        .enumerate()
        .map(|(row, line)| {
            line.iter()
                .enumerate()
                .map(|(col, letter)| {
                    if !crossword.is_fillable(row, col) {
                        '█'
                    } else {
                        letter.unwrap_or(' ')
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
