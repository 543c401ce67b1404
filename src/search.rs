//! Chronological backtracking over slot assignments, maintaining arc consistency after each trial
//! choice. Variables are ordered by minimum remaining values (ties broken by degree, then by slot
//! id) and values by least-constraining value (ties broken by domain order). Every change made to
//! the domains while trying a value goes through the `Domains` undo log, so each failed trial is
//! rolled back to exactly the state it started from.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc as SharedFlag;

use bit_set::BitSet;
use instant::{Duration, Instant};

use crate::consistency::{ac3, enforce_node_consistency, Arc};
use crate::domains::Domains;
use crate::grid::{Choice, Crossword, SlotId};
use crate::word_list::{WordId, WordList};

/// How to pick the next slot to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotOrder {
    /// Fewest remaining candidates first, then most crossings, then lowest slot id.
    #[default]
    MinimumRemainingValues,

    /// The first unassigned slot by slot id.
    FirstUnassigned,
}

/// How to order the candidates for the chosen slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueOrder {
    /// Candidates ruling out the fewest words in unassigned crossing slots first.
    #[default]
    LeastConstraining,

    /// Candidates in domain order.
    DomainOrder,
}

/// Settings for a fill attempt.
#[derive(Debug, Clone)]
pub struct FillOptions {
    pub slot_order: SlotOrder,
    pub value_order: ValueOrder,

    /// Propagate each trial choice with arc consistency before recursing.
    pub inference: bool,

    /// Give up with `FillFailure::Timeout` once this much time has passed.
    pub timeout: Option<Duration>,

    /// Give up with `FillFailure::Aborted` once this flag is set.
    pub abort: Option<SharedFlag<AtomicBool>>,
}

impl Default for FillOptions {
    fn default() -> FillOptions {
        FillOptions {
            slot_order: SlotOrder::default(),
            value_order: ValueOrder::default(),
            inference: true,
            timeout: None,
            abort: None,
        }
    }
}

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub states: u64,
    pub backtracks: u64,
    pub node_eliminations: usize,
    pub arc_eliminations: usize,
    pub duration: Duration,
}

/// A struct representing the results of a fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub statistics: Statistics,

    /// One choice per slot, in slot id order.
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FillFailure {
    #[error("no fill satisfies the grid")]
    NoSolution,

    #[error("search timed out")]
    Timeout,

    #[error("search aborted")]
    Aborted,
}

/// A partial mapping from slot to word.
#[derive(Debug, Clone)]
pub struct Assignment {
    words: Vec<Option<WordId>>,
    assigned: BitSet,
}

impl Assignment {
    pub fn new(slot_count: usize) -> Assignment {
        Assignment {
            words: vec![None; slot_count],
            assigned: BitSet::with_capacity(slot_count),
        }
    }

    pub fn get(&self, slot_id: SlotId) -> Option<WordId> {
        self.words[slot_id]
    }

    pub fn is_assigned(&self, slot_id: SlotId) -> bool {
        self.assigned.contains(slot_id)
    }

    pub fn assign(&mut self, slot_id: SlotId, word_id: WordId) {
        self.words[slot_id] = Some(word_id);
        self.assigned.insert(slot_id);
    }

    pub fn unassign(&mut self, slot_id: SlotId) {
        self.words[slot_id] = None;
        self.assigned.remove(slot_id);
    }

    /// How many slots have a word.
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }

    /// The assigned slots and their words, in slot id order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, WordId)> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word_id)| word_id.map(|word_id| (slot_id, word_id)))
    }

    pub fn choices(&self) -> Vec<Choice> {
        self.iter().map(|(slot_id, word_id)| Choice { slot_id, word_id }).collect()
    }
}

/// Does every slot have a word?
pub fn is_complete(crossword: &Crossword, assignment: &Assignment) -> bool {
    assignment.len() == crossword.slot_count()
}

/// Check the assigned slots against every constraint: each word fits its slot, no word is used
/// twice, and crossing words agree on their shared letter.
pub fn is_consistent(crossword: &Crossword, words: &WordList, assignment: &Assignment) -> bool {
    let mut used: HashSet<WordId> = HashSet::with_capacity(assignment.len());

    for (slot_id, word_id) in assignment.iter() {
        let word = words.word(word_id);

        if word.len() != crossword.slot(slot_id).length || !used.insert(word_id) {
            return false;
        }

        for crossing in crossword.crossings(slot_id) {
            // Each crossing pair only needs checking once.
            if crossing.other_slot_id < slot_id {
                continue;
            }

            if let Some(other_word_id) = assignment.get(crossing.other_slot_id) {
                let other_word = words.word(other_word_id);
                if word.glyphs.get(crossing.cell) != other_word.glyphs.get(crossing.other_slot_cell) {
                    return false;
                }
            }
        }
    }

    true
}

/// Choose the next slot to fill, or `None` if every slot is assigned.
pub fn select_unassigned_slot(
    crossword: &Crossword,
    domains: &Domains,
    assignment: &Assignment,
    slot_order: SlotOrder,
) -> Option<SlotId> {
    let mut unassigned = (0..crossword.slot_count()).filter(|&slot_id| !assignment.is_assigned(slot_id));

    match slot_order {
        SlotOrder::FirstUnassigned => unassigned.next(),
        SlotOrder::MinimumRemainingValues => unassigned.min_by_key(|&slot_id| {
            (domains.len(slot_id), usize::MAX - crossword.degree(slot_id), slot_id)
        }),
    }
}

/// Count how many words choosing `word_id` for `slot_id` would rule out of the domains of the
/// unassigned slots crossing it, either by disagreeing at the crossing or by being the same word.
fn count_ruled_out(
    crossword: &Crossword,
    domains: &Domains,
    assignment: &Assignment,
    slot_id: SlotId,
    word_id: WordId,
) -> usize {
    let word = domains.words().word(word_id);

    crossword
        .crossings(slot_id)
        .iter()
        .filter(|crossing| !assignment.is_assigned(crossing.other_slot_id))
        .map(|crossing| {
            let other_slot_id = crossing.other_slot_id;
            let remaining = domains.len(other_slot_id);

            let compatible = match word.glyphs.get(crossing.cell) {
                Some(&glyph) => {
                    let mut matching =
                        domains.glyph_count(other_slot_id, crossing.other_slot_cell, glyph) as usize;
                    // The word itself can't be reused in the crossing slot.
                    if matching > 0
                        && domains.contains(other_slot_id, word_id)
                        && word.glyphs.get(crossing.other_slot_cell) == Some(&glyph)
                    {
                        matching -= 1;
                    }
                    matching
                }
                None => 0,
            };

            remaining - compatible
        })
        .sum()
}

/// Return the candidates for `slot_id` in the order they should be tried. The sort is stable, so
/// ties keep their domain order.
pub fn order_domain_values(
    crossword: &Crossword,
    domains: &Domains,
    slot_id: SlotId,
    assignment: &Assignment,
    value_order: ValueOrder,
) -> Vec<WordId> {
    match value_order {
        ValueOrder::DomainOrder => domains.iter(slot_id).collect(),
        ValueOrder::LeastConstraining => {
            let mut ordered: Vec<(usize, WordId)> = domains
                .iter(slot_id)
                .map(|word_id| (count_ruled_out(crossword, domains, assignment, slot_id, word_id), word_id))
                .collect();
            ordered.sort_by_key(|&(ruled_out, _)| ruled_out);
            ordered.into_iter().map(|(_, word_id)| word_id).collect()
        }
    }
}

/// The recursive search, with the state that's shared across every frame.
struct Search<'a> {
    crossword: &'a Crossword,
    options: &'a FillOptions,
    deadline: Option<Instant>,
    statistics: Statistics,
}

impl<'a> Search<'a> {
    fn check_interrupt(&self) -> Result<(), FillFailure> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(FillFailure::Timeout);
            }
        }
        if let Some(abort) = &self.options.abort {
            if abort.load(Ordering::Relaxed) {
                return Err(FillFailure::Aborted);
            }
        }
        Ok(())
    }

    /// Propagate the consequences of `slot_id` holding `word_id`: shrink its domain to that one
    /// word, remove the word from every other unassigned slot, and then re-establish arc
    /// consistency starting from the slots that changed. Returns false if any domain is wiped out.
    fn infer(
        &mut self,
        domains: &mut Domains,
        assignment: &Assignment,
        slot_id: SlotId,
        word_id: WordId,
    ) -> bool {
        let crossword = self.crossword;

        let others: Vec<WordId> = domains.iter(slot_id).filter(|&other| other != word_id).collect();
        for other in others {
            domains.remove(slot_id, other);
        }

        let mut arcs: Vec<Arc> = crossword.neighbor_ids(slot_id).map(|z| (z, slot_id)).collect();

        for other_slot_id in 0..crossword.slot_count() {
            if other_slot_id == slot_id || assignment.is_assigned(other_slot_id) {
                continue;
            }
            if domains.remove(other_slot_id, word_id) {
                if domains.is_empty(other_slot_id) {
                    return false;
                }
                arcs.extend(crossword.neighbor_ids(other_slot_id).map(|z| (z, other_slot_id)));
            }
        }

        match ac3(crossword, domains, Some(&arcs)) {
            Ok(success) => {
                self.statistics.arc_eliminations += success.eliminations;
                true
            }
            Err(_) => false,
        }
    }

    /// Extend `assignment` to a complete, consistent one. On `Ok` the assignment is complete; on
    /// `Err` both the assignment and the domains are exactly as they were on entry.
    fn backtrack(&mut self, domains: &mut Domains, assignment: &mut Assignment) -> Result<(), FillFailure> {
        self.statistics.states += 1;
        self.check_interrupt()?;

        let crossword = self.crossword;
        let words = domains.words();

        if is_complete(crossword, assignment) {
            return Ok(());
        }

        let Some(slot_id) = select_unassigned_slot(crossword, domains, assignment, self.options.slot_order) else {
            return Ok(());
        };

        let values = order_domain_values(crossword, domains, slot_id, assignment, self.options.value_order);

        for word_id in values {
            let checkpoint = domains.checkpoint();
            assignment.assign(slot_id, word_id);

            log::trace!(
                "Trying {} for slot {} ({} assigned)",
                words.word(word_id).string,
                slot_id,
                assignment.len(),
            );

            if is_consistent(crossword, words, assignment)
                && (!self.options.inference || self.infer(domains, assignment, slot_id, word_id))
            {
                match self.backtrack(domains, assignment) {
                    Ok(()) => return Ok(()),
                    Err(FillFailure::NoSolution) => {}
                    Err(failure) => {
                        domains.restore(checkpoint);
                        assignment.unassign(slot_id);
                        return Err(failure);
                    }
                }
            }

            domains.restore(checkpoint);
            assignment.unassign(slot_id);
            self.statistics.backtracks += 1;
        }

        Err(FillFailure::NoSolution)
    }
}

/// Search for a complete, consistent extension of `assignment` using the current domains. On
/// success the assignment is filled in; on failure it and the domains are left untouched.
pub fn backtrack(
    crossword: &Crossword,
    domains: &mut Domains,
    assignment: &mut Assignment,
    options: &FillOptions,
) -> Result<Statistics, FillFailure> {
    let start = Instant::now();

    let mut search = Search {
        crossword,
        options,
        deadline: options.timeout.map(|timeout| start + timeout),
        statistics: Statistics::default(),
    };

    let result = search.backtrack(domains, assignment);
    search.statistics.duration = start.elapsed();

    log::debug!("{:?}", search.statistics);

    result.map(|()| search.statistics)
}

/// Domains holding only the words of each slot's length, along with how many were removed. The
/// wrong-length words are dropped from storage so arc consistency never iterates them.
fn node_consistent_domains<'a>(crossword: &Crossword, words: &'a WordList) -> (Domains<'a>, usize) {
    let mut domains = Domains::new(crossword, words);
    let removed = enforce_node_consistency(crossword, &mut domains);
    domains.compact();
    (domains, removed)
}

/// Search for a valid fill for the given crossword: enforce node consistency, then arc
/// consistency, then backtrack.
pub fn solve(crossword: &Crossword, words: &WordList, options: &FillOptions) -> Result<FillSuccess, FillFailure> {
    let start = Instant::now();

    log::info!(
        "Filling {} slots from {} candidate words",
        crossword.slot_count(),
        words.len(),
    );

    let (mut domains, node_eliminations) = node_consistent_domains(crossword, words);

    let arc_consistency = match ac3(crossword, &mut domains, None) {
        Ok(success) => success,
        Err(failure) => {
            log::info!("No fill: slot {} has no viable candidates", failure.slot_id);
            return Err(FillFailure::NoSolution);
        }
    };
    log::debug!(
        "Initial arc consistency made {} revisions, eliminating {} candidates",
        arc_consistency.revisions,
        arc_consistency.eliminations,
    );

    // Nothing before this point ever needs to be undone.
    domains.compact();

    let mut assignment = Assignment::new(crossword.slot_count());

    let mut statistics = match backtrack(crossword, &mut domains, &mut assignment, options) {
        Ok(statistics) => statistics,
        Err(failure) => {
            log::info!("Fill failed after {:?}: {}", start.elapsed(), failure);
            return Err(failure);
        }
    };

    statistics.node_eliminations = node_eliminations;
    statistics.arc_eliminations += arc_consistency.eliminations;
    statistics.duration = start.elapsed();

    log::info!(
        "Found a fill in {:?} ({} states, {} backtracks)",
        statistics.duration,
        statistics.states,
        statistics.backtracks,
    );

    Ok(FillSuccess {
        statistics,
        choices: assignment.choices(),
    })
}
