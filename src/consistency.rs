use std::collections::VecDeque;

use bit_set::BitSet;

use crate::domains::Domains;
use crate::grid::{Crossword, SlotId};
use crate::word_list::WordId;

/// An ordered pair of crossing slots `(x, y)`: revising it makes `x` consistent with `y`.
pub type Arc = (SlotId, SlotId);

/// Remove every word whose length differs from its slot's length. Returns the number of words
/// removed. A slot may end up with an empty domain, which is left for the caller to notice.
pub fn enforce_node_consistency(crossword: &Crossword, domains: &mut Domains) -> usize {
    let words = domains.words();
    let mut removed = 0;

    for (slot_id, slot) in crossword.slots().iter().enumerate() {
        let wrong_length: Vec<WordId> = domains
            .iter(slot_id)
            .filter(|&word_id| words.word(word_id).len() != slot.length)
            .collect();

        for word_id in wrong_length {
            if domains.remove(slot_id, word_id) {
                removed += 1;
            }
        }
    }

    log::debug!("Node consistency removed {} candidates", removed);

    removed
}

/// Does `y` have some word other than `x_word_id` whose glyph at `y_cell` matches the glyph
/// `x_word_id` has at `x_cell`? A word too short to reach its cell can't take part in a match.
fn has_support(domains: &Domains, x_word_id: WordId, x_cell: usize, y: SlotId, y_cell: usize) -> bool {
    let x_word = domains.words().word(x_word_id);

    let Some(&glyph) = x_word.glyphs.get(x_cell) else {
        return false;
    };

    let mut matching = domains.glyph_count(y, y_cell, glyph);

    // The same word can't sit in both slots, so it can't support itself.
    if matching > 0 && domains.contains(y, x_word_id) && x_word.glyphs.get(y_cell) == Some(&glyph) {
        matching -= 1;
    }

    matching > 0
}

/// Make `x` arc consistent with `y` by removing every candidate for `x` that no remaining
/// candidate for `y` agrees with. Returns whether anything was removed. Slots that don't cross
/// never constrain each other.
pub fn revise(crossword: &Crossword, domains: &mut Domains, x: SlotId, y: SlotId) -> bool {
    let Some((x_cell, y_cell)) = crossword.overlap(x, y) else {
        return false;
    };

    let unsupported: Vec<WordId> = {
        let view: &Domains = domains;
        view.iter(x)
            .filter(|&word_id| !has_support(view, word_id, x_cell, y, y_cell))
            .collect()
    };

    for &word_id in &unsupported {
        domains.remove(x, word_id);
    }

    !unsupported.is_empty()
}

/// Every ordered pair of crossing slots, by ascending `x` and then ascending `y`.
pub fn all_arcs(crossword: &Crossword) -> Vec<Arc> {
    (0..crossword.slot_count())
        .flat_map(|x| crossword.neighbor_ids(x).map(move |y| (x, y)))
        .collect()
}

/// Results from a call to `ac3`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArcConsistencySuccess {
    pub revisions: usize,
    pub eliminations: usize,
}

/// The slot whose domain was found empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub slot_id: SlotId,
}

pub type ArcConsistencyResult = Result<ArcConsistencySuccess, ArcConsistencyFailure>;

/// Work queue of arcs for `ac3`. Arcs are processed first-in first-out, and an arc that's already
/// waiting isn't added a second time.
struct ArcQueue {
    queue: VecDeque<Arc>,
    queued: BitSet,
    slot_count: usize,
}

impl ArcQueue {
    fn new(slot_count: usize) -> ArcQueue {
        ArcQueue {
            queue: VecDeque::new(),
            queued: BitSet::with_capacity(slot_count * slot_count),
            slot_count,
        }
    }

    fn enqueue(&mut self, arc: Arc) {
        if self.queued.insert(arc.0 * self.slot_count + arc.1) {
            self.queue.push_back(arc);
        }
    }

    fn pop_front(&mut self) -> Option<Arc> {
        let arc = self.queue.pop_front()?;
        self.queued.remove(arc.0 * self.slot_count + arc.1);
        Some(arc)
    }
}

/// Run AC-3 over the given arcs, or over every arc in the grid if `initial_arcs` is `None`.
///
/// Whenever revising `(x, y)` shrinks `x`, every other neighbor `z` of `x` gets `(z, x)`
/// re-enqueued, since the words `z` relied on in `x` may be gone. We fail as soon as any domain is
/// wiped out; otherwise, once the queue drains, we succeed only if every domain in the grid is
/// non-empty.
pub fn ac3(
    crossword: &Crossword,
    domains: &mut Domains,
    initial_arcs: Option<&[Arc]>,
) -> ArcConsistencyResult {
    let mut queue = ArcQueue::new(crossword.slot_count());
    match initial_arcs {
        Some(arcs) => arcs.iter().for_each(|&arc| queue.enqueue(arc)),
        None => all_arcs(crossword).into_iter().for_each(|arc| queue.enqueue(arc)),
    }

    let mut success = ArcConsistencySuccess::default();

    while let Some((x, y)) = queue.pop_front() {
        let before = domains.len(x);

        if !revise(crossword, domains, x, y) {
            continue;
        }

        success.revisions += 1;
        success.eliminations += before - domains.len(x);

        if domains.is_empty(x) {
            log::debug!("Arc consistency wiped out slot {} while revising against {}", x, y);
            return Err(ArcConsistencyFailure { slot_id: x });
        }

        for z in crossword.neighbor_ids(x) {
            if z != y {
                queue.enqueue((z, x));
            }
        }
    }

    if let Some(slot_id) = domains.any_empty() {
        return Err(ArcConsistencyFailure { slot_id });
    }

    Ok(success)
}

#[cfg(test)]
mod tests {
    use crate::consistency::{ac3, all_arcs, enforce_node_consistency, revise, ArcConsistencyFailure};
    use crate::domains::Domains;
    use crate::grid::{Crossword, Direction, Slot};
    use crate::word_list::WordList;

    /// Two 3-letter slots where the last letter of the across entry is the first letter of the
    /// down entry.
    fn corner_crossword() -> Crossword {
        Crossword::new(3, 3, vec![
            Slot::new(0, 0, 3, Direction::Across),
            Slot::new(0, 2, 3, Direction::Down),
        ])
    }

    /// ____
    /// _#_#
    /// ____
    fn ladder_crossword() -> Crossword {
        Crossword::from_template(
            "
            ____
            _#_#
            ____
            ",
        ).expect("valid template")
    }

    fn all_domains(crossword: &Crossword, domains: &Domains) -> Vec<Vec<String>> {
        (0..crossword.slot_count())
            .map(|slot_id| domains.strings(slot_id).into_iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_node_consistency_enforces_lengths() {
        let crossword = ladder_crossword();
        let words = WordList::new(["CAT", "TREE", "AT", "TREES", "ANT", "BOAT"]);
        let mut domains = Domains::new(&crossword, &words);

        let removed = enforce_node_consistency(&crossword, &mut domains);

        for (slot_id, slot) in crossword.slots().iter().enumerate() {
            for word_id in domains.iter(slot_id) {
                assert_eq!(words.word(word_id).len(), slot.length);
            }
        }
        assert_eq!(domains.strings(0), vec!["TREE", "BOAT"]);
        assert_eq!(domains.strings(2), vec!["CAT", "ANT"]);
        assert_eq!(removed, 16);
    }

    #[test]
    fn test_node_consistency_can_empty_a_domain() {
        let crossword = corner_crossword();
        let words = WordList::new(["TREE"]);
        let mut domains = Domains::new(&crossword, &words);

        enforce_node_consistency(&crossword, &mut domains);

        assert!(domains.is_empty(0));
        assert!(domains.is_empty(1));
    }

    #[test]
    fn test_revise_removes_unsupported_words() {
        let crossword = corner_crossword();
        let words = WordList::new(["CAT", "DOG", "TIP"]);
        let mut domains = Domains::new(&crossword, &words);
        enforce_node_consistency(&crossword, &mut domains);

        assert!(revise(&crossword, &mut domains, 0, 1));
        assert_eq!(domains.strings(0), vec!["CAT"]);
        assert!(!revise(&crossword, &mut domains, 0, 1));
    }

    #[test]
    fn test_revise_ignores_slots_that_do_not_cross() {
        let crossword = Crossword::new(3, 3, vec![
            Slot::new(0, 0, 3, Direction::Across),
            Slot::new(2, 0, 3, Direction::Across),
        ]);
        let words = WordList::new(["CAT", "DOG"]);
        let mut domains = Domains::new(&crossword, &words);

        assert!(!revise(&crossword, &mut domains, 0, 1));
        assert_eq!(domains.len(0), 2);
    }

    #[test]
    fn test_revise_does_not_let_a_word_support_itself() {
        // "TOT" would agree with itself at the crossing, but one word can't fill both slots.
        let crossword = corner_crossword();
        let words = WordList::new(["TOT"]);
        let mut domains = Domains::new(&crossword, &words);

        assert!(revise(&crossword, &mut domains, 0, 1));
        assert!(domains.is_empty(0));
    }

    #[test]
    fn test_all_arcs_are_ordered_pairs_of_neighbors() {
        let crossword = corner_crossword();

        assert_eq!(all_arcs(&crossword), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_ac3_prunes_to_a_consistent_state() {
        let crossword = corner_crossword();
        let words = WordList::new(["CAT", "DOG", "TIP"]);
        let mut domains = Domains::new(&crossword, &words);
        enforce_node_consistency(&crossword, &mut domains);

        let success = ac3(&crossword, &mut domains, None).expect("consistent");

        assert_eq!(domains.strings(0), vec!["CAT"]);
        assert_eq!(domains.strings(1), vec!["TIP"]);
        assert_eq!(success.eliminations, 4);
    }

    #[test]
    fn test_ac3_reports_failure_with_an_empty_domain() {
        let crossword = corner_crossword();
        let words = WordList::new(["CAT", "DOG"]);
        let mut domains = Domains::new(&crossword, &words);
        enforce_node_consistency(&crossword, &mut domains);

        let failure = ac3(&crossword, &mut domains, None).expect_err("inconsistent");

        assert!(domains.is_empty(failure.slot_id));
    }

    #[test]
    fn test_ac3_checks_every_domain_not_just_the_last_revised() {
        // The isolated slot has no arcs at all, so only a global check notices it's empty.
        let crossword = Crossword::new(5, 3, vec![
            Slot::new(0, 0, 3, Direction::Across),
            Slot::new(0, 2, 3, Direction::Down),
            Slot::new(2, 4, 1, Direction::Down),
        ]);
        let words = WordList::new(["CAT", "TIP"]);
        let mut domains = Domains::new(&crossword, &words);
        enforce_node_consistency(&crossword, &mut domains);

        assert_eq!(ac3(&crossword, &mut domains, None), Err(ArcConsistencyFailure { slot_id: 2 }));
    }

    #[test]
    fn test_ac3_is_idempotent() {
        let crossword = ladder_crossword();
        let words = WordList::new([
            "SEAT", "NEED", "SUN", "ARE", "BOAT", "TREE", "SAT", "ANT", "TEN",
        ]);
        let mut domains = Domains::new(&crossword, &words);
        enforce_node_consistency(&crossword, &mut domains);

        ac3(&crossword, &mut domains, None).expect("consistent");
        let after_first = all_domains(&crossword, &domains);

        let second = ac3(&crossword, &mut domains, None).expect("still consistent");

        assert_eq!(second.eliminations, 0);
        assert_eq!(all_domains(&crossword, &domains), after_first);
    }

    #[test]
    fn test_ac3_with_no_arcs_is_a_no_op() {
        let crossword = Crossword::new(4, 1, vec![Slot::new(0, 0, 4, Direction::Across)]);
        let words = WordList::new(["WORD", "TREE"]);
        let mut domains = Domains::new(&crossword, &words);
        enforce_node_consistency(&crossword, &mut domains);

        let success = ac3(&crossword, &mut domains, None).expect("consistent");

        assert_eq!(success.revisions, 0);
        assert_eq!(domains.strings(0), vec!["WORD", "TREE"]);
    }
}
