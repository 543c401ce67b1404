use bit_set::BitSet;
use smallvec::SmallVec;
use std::fmt::{Debug, Formatter};

use crate::grid::{Crossword, SlotId};
use crate::word_list::{GlyphId, WordId, WordList};
use crate::MAX_GLYPH_COUNT;

/// For each cell of a slot, how many of the slot's remaining words place each glyph there.
pub type GlyphCountsByCell = Vec<SmallVec<[u32; MAX_GLYPH_COUNT]>>;

/// A position in the undo log, returned by `Domains::checkpoint`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// The live candidate set for a single slot.
struct SlotDomain {
    length: usize,

    /// Words this slot could ever hold, in dictionary order. Removal only flags entries in
    /// `eliminated`, so restoring a word puts it back in its original position.
    candidates: Vec<WordId>,

    /// Membership for `candidates`, indexed by WordId.
    candidate_set: BitSet,

    /// Indexed by WordId.
    eliminated: BitSet,

    remaining_count: usize,

    glyph_counts_by_cell: GlyphCountsByCell,
}

impl SlotDomain {
    fn new(words: &WordList, length: usize, candidates: Vec<WordId>) -> SlotDomain {
        let mut glyph_counts_by_cell: GlyphCountsByCell =
            (0..length).map(|_| (0..words.glyph_count()).map(|_| 0).collect()).collect();

        for &word_id in &candidates {
            adjust_glyph_counts(&mut glyph_counts_by_cell, words, word_id, true);
        }

        SlotDomain {
            length,
            remaining_count: candidates.len(),
            candidate_set: candidates.iter().cloned().collect(),
            eliminated: BitSet::with_capacity(words.len()),
            candidates,
            glyph_counts_by_cell,
        }
    }
}

/// Add or remove a word's contribution to a slot's glyph counts. Cells beyond the end of the word
/// (or the slot) are untouched.
fn adjust_glyph_counts(
    glyph_counts_by_cell: &mut GlyphCountsByCell,
    words: &WordList,
    word_id: WordId,
    add: bool,
) {
    for (glyph_counts, &glyph) in glyph_counts_by_cell.iter_mut().zip(&words.word(word_id).glyphs) {
        if add {
            glyph_counts[glyph] += 1;
        } else {
            glyph_counts[glyph] -= 1;
        }
    }
}

/// The mutable per-slot candidate sets. Every removal is written to an undo log, so any sequence
/// of removals made after a `checkpoint` can be rolled back exactly with `restore`.
pub struct Domains<'a> {
    words: &'a WordList,
    slots: Vec<SlotDomain>,
    trail: Vec<(SlotId, WordId)>,
}

impl<'a> Debug for Domains<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Domains")
            .field("remaining", &self.slots.iter().map(|slot| slot.remaining_count).collect::<Vec<_>>())
            .field("trail_len", &self.trail.len())
            .finish()
    }
}

impl<'a> Domains<'a> {
    /// Give every slot the full dictionary as its initial domain.
    pub fn new(crossword: &Crossword, words: &'a WordList) -> Domains<'a> {
        Domains::from_candidates(
            crossword,
            words,
            crossword.slots().iter().map(|_| (0..words.len()).collect()).collect(),
        )
    }

    /// Start each slot from an explicit list of candidates. Duplicate ids are dropped.
    pub fn from_candidates(
        crossword: &Crossword,
        words: &'a WordList,
        candidates_by_slot: Vec<Vec<WordId>>,
    ) -> Domains<'a> {
        assert_eq!(candidates_by_slot.len(), crossword.slot_count(), "one candidate list per slot");

        let slots = crossword.slots().iter().zip(candidates_by_slot).map(|(slot, candidates)| {
            let mut seen = BitSet::with_capacity(words.len());
            let candidates = candidates.into_iter().filter(|&word_id| seen.insert(word_id)).collect();
            SlotDomain::new(words, slot.length, candidates)
        }).collect();

        Domains { words, slots, trail: vec![] }
    }

    pub fn words(&self) -> &'a WordList {
        self.words
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// How many candidates remain for this slot.
    pub fn len(&self, slot_id: SlotId) -> usize {
        self.slots[slot_id].remaining_count
    }

    /// How many candidates are stored for this slot, including eliminated ones that `iter` still
    /// has to skip until the next `compact`.
    pub fn stored_len(&self, slot_id: SlotId) -> usize {
        self.slots[slot_id].candidates.len()
    }

    pub fn is_empty(&self, slot_id: SlotId) -> bool {
        self.slots[slot_id].remaining_count == 0
    }

    pub fn any_empty(&self) -> Option<SlotId> {
        self.slots.iter().position(|slot| slot.remaining_count == 0)
    }

    pub fn contains(&self, slot_id: SlotId, word_id: WordId) -> bool {
        let slot = &self.slots[slot_id];
        slot.candidate_set.contains(word_id) && !slot.eliminated.contains(word_id)
    }

    /// The remaining candidates for a slot, in domain order.
    pub fn iter(&self, slot_id: SlotId) -> impl Iterator<Item = WordId> + '_ {
        let slot = &self.slots[slot_id];
        slot.candidates.iter().cloned().filter(move |&word_id| !slot.eliminated.contains(word_id))
    }

    /// The remaining candidates for a slot as strings, mostly useful for tests and logging.
    pub fn strings(&self, slot_id: SlotId) -> Vec<&'a str> {
        let words = self.words;
        self.iter(slot_id).map(|word_id| words.word(word_id).string.as_str()).collect()
    }

    /// How many remaining candidates for this slot have `glyph` at `cell_idx`.
    pub fn glyph_count(&self, slot_id: SlotId, cell_idx: usize, glyph: GlyphId) -> u32 {
        self.slots[slot_id].glyph_counts_by_cell[cell_idx][glyph]
    }

    /// Eliminate a word from a slot, returning whether it was actually present.
    pub fn remove(&mut self, slot_id: SlotId, word_id: WordId) -> bool {
        if !self.contains(slot_id, word_id) {
            return false;
        }

        let slot = &mut self.slots[slot_id];
        slot.eliminated.insert(word_id);
        slot.remaining_count -= 1;
        adjust_glyph_counts(&mut slot.glyph_counts_by_cell, self.words, word_id, false);
        self.trail.push((slot_id, word_id));

        true
    }

    /// Mark the current state so that later removals can be undone.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.trail.len())
    }

    /// Undo every removal made since `checkpoint`, most recent first.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        while self.trail.len() > checkpoint.0 {
            let Some((slot_id, word_id)) = self.trail.pop() else {
                break;
            };

            let slot = &mut self.slots[slot_id];
            slot.eliminated.remove(word_id);
            slot.remaining_count += 1;
            adjust_glyph_counts(&mut slot.glyph_counts_by_cell, self.words, word_id, true);
        }
    }

    /// Permanently drop eliminated words and clear the undo log. Any outstanding checkpoint is
    /// invalidated.
    pub fn compact(&mut self) {
        for slot in &mut self.slots {
            let eliminated = &slot.eliminated;
            slot.candidates.retain(|&word_id| !eliminated.contains(word_id));
            slot.candidate_set = slot.candidates.iter().cloned().collect();
            slot.eliminated.clear();
        }
        self.trail.clear();
    }

    pub fn slot_length(&self, slot_id: SlotId) -> usize {
        self.slots[slot_id].length
    }
}
