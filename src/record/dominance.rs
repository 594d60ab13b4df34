// SPDX-License-Identifier: Apache-2.0

//! Pin-delay dominance ordering for instance chains.
//!
//! A chain holds alternative realizations of one function. An entry whose
//! delay vector is pointwise no better than another's can never win a
//! lookup, so insertion keeps chains pairwise incomparable: the
//! classification against each resident entry is computed once and
//! dispatched in a single `match`, and one sweep pass removes entries a
//! newly placed winner obsoletes.

/// Pin-delay sentinel for leaves with no path to the root (padding pins).
pub const UNREACHABLE: i8 = 120;

/// Largest representable real delay; longer paths saturate here.
pub const MAX_DELAY: i8 = 119;

pub fn clamp_delay(hops: u32) -> i8 {
    hops.min(MAX_DELAY as u32) as i8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayCmp {
    Equal,
    /// Left is pointwise <= right with at least one strict improvement.
    Dominates,
    /// Left is pointwise >= right with at least one strict regression.
    Dominated,
    Incomparable,
}

/// Costs a chain entry exposes to the insertion and lookup logic.
pub trait DelayCost {
    fn delays(&self) -> &[i8];
    fn area(&self) -> u8;
}

pub fn compare(lhs: &[i8], rhs: &[i8]) -> DelayCmp {
    debug_assert_eq!(lhs.len(), rhs.len());
    let mut some_less = false;
    let mut some_greater = false;
    for (a, b) in lhs.iter().zip(rhs) {
        if a < b {
            some_less = true;
        } else if a > b {
            some_greater = true;
        }
    }
    match (some_less, some_greater) {
        (false, false) => DelayCmp::Equal,
        (true, false) => DelayCmp::Dominates,
        (false, true) => DelayCmp::Dominated,
        (true, true) => DelayCmp::Incomparable,
    }
}

fn lex_before(lhs: &[i8], rhs: &[i8]) -> bool {
    for (a, b) in lhs.iter().zip(rhs) {
        if a != b {
            return a < b;
        }
    }
    false
}

#[derive(Debug)]
pub enum InsertOutcome<T> {
    /// The entry went in; `evicted` holds every resident it displaced, so
    /// the caller can release their graph-side resources.
    Inserted { evicted: Vec<T> },
    /// An existing entry is at least as good everywhere.
    Rejected(T),
}

/// Places `new` into `chain`, preserving pairwise incomparability.
///
/// Equal-delay entries keep whichever has the smaller area. Incomparable
/// entries are ordered by the lexicographic tie-break on delay vectors,
/// which makes chain contents independent of insertion order.
pub fn insert_by_dominance<T: DelayCost>(chain: &mut Vec<T>, new: T) -> InsertOutcome<T> {
    let mut pos = 0;
    while pos < chain.len() {
        match compare(new.delays(), chain[pos].delays()) {
            DelayCmp::Equal => {
                if new.area() < chain[pos].area() {
                    let old = std::mem::replace(&mut chain[pos], new);
                    return InsertOutcome::Inserted { evicted: vec![old] };
                }
                return InsertOutcome::Rejected(new);
            }
            DelayCmp::Dominates => {
                let old = std::mem::replace(&mut chain[pos], new);
                let mut evicted = vec![old];
                evicted.extend(sweep_tail(chain, pos));
                return InsertOutcome::Inserted { evicted };
            }
            DelayCmp::Dominated => return InsertOutcome::Rejected(new),
            DelayCmp::Incomparable => {
                if lex_before(new.delays(), chain[pos].delays()) {
                    chain.insert(pos, new);
                    let evicted = sweep_tail(chain, pos);
                    return InsertOutcome::Inserted { evicted };
                }
                pos += 1;
            }
        }
    }
    chain.push(new);
    InsertOutcome::Inserted { evicted: Vec::new() }
}

/// Removes every entry past `pos` that `chain[pos]` dominates or matches.
fn sweep_tail<T: DelayCost>(chain: &mut Vec<T>, pos: usize) -> Vec<T> {
    let mut evicted = Vec::new();
    let mut k = pos + 1;
    while k < chain.len() {
        match compare(chain[pos].delays(), chain[k].delays()) {
            DelayCmp::Dominates | DelayCmp::Equal => evicted.push(chain.remove(k)),
            DelayCmp::Dominated | DelayCmp::Incomparable => k += 1,
        }
    }
    evicted
}

/// True when no entry dominates or equals any other, in either direction.
pub fn chain_is_pareto<T: DelayCost>(chain: &[T]) -> bool {
    for i in 0..chain.len() {
        for j in i + 1..chain.len() {
            if compare(chain[i].delays(), chain[j].delays()) != DelayCmp::Incomparable {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::prelude::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Entry {
        delays: Vec<i8>,
        area: u8,
    }

    impl Entry {
        fn new(delays: &[i8], area: u8) -> Self {
            Entry { delays: delays.to_vec(), area }
        }
    }

    impl DelayCost for Entry {
        fn delays(&self) -> &[i8] {
            &self.delays
        }
        fn area(&self) -> u8 {
            self.area
        }
    }

    fn delays_of(chain: &[Entry]) -> Vec<Vec<i8>> {
        chain.iter().map(|e| e.delays.clone()).collect()
    }

    #[test]
    fn compare_classifies_all_four_ways() {
        assert_eq!(compare(&[1, 2], &[1, 2]), DelayCmp::Equal);
        assert_eq!(compare(&[1, 2], &[1, 3]), DelayCmp::Dominates);
        assert_eq!(compare(&[2, 3], &[1, 3]), DelayCmp::Dominated);
        assert_eq!(compare(&[1, 3], &[2, 1]), DelayCmp::Incomparable);
    }

    #[test]
    fn dominated_insert_is_rejected() {
        let mut chain = vec![Entry::new(&[1, 1], 3)];
        let outcome = insert_by_dominance(&mut chain, Entry::new(&[2, 1], 1));
        assert!(matches!(outcome, InsertOutcome::Rejected(_)));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn dominating_insert_replaces_and_sweeps() {
        let mut chain = vec![
            Entry::new(&[1, 5], 2),
            Entry::new(&[3, 3], 2),
            Entry::new(&[5, 1], 2),
        ];
        let outcome = insert_by_dominance(&mut chain, Entry::new(&[1, 1], 4));
        match outcome {
            InsertOutcome::Inserted { evicted } => assert_eq!(evicted.len(), 3),
            InsertOutcome::Rejected(_) => panic!("expected insertion"),
        }
        assert_eq!(delays_of(&chain), vec![vec![1, 1]]);
    }

    #[test]
    fn equal_delays_keep_the_smaller_area() {
        let mut chain = vec![Entry::new(&[2, 2], 5)];
        let outcome = insert_by_dominance(&mut chain, Entry::new(&[2, 2], 3));
        assert!(matches!(outcome, InsertOutcome::Inserted { .. }));
        assert_eq!(chain[0].area, 3);

        let outcome = insert_by_dominance(&mut chain, Entry::new(&[2, 2], 3));
        assert!(matches!(outcome, InsertOutcome::Rejected(_)));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn incomparable_entries_sort_lexicographically() {
        let mut chain = Vec::new();
        insert_by_dominance(&mut chain, Entry::new(&[5, 1], 1));
        insert_by_dominance(&mut chain, Entry::new(&[1, 5], 1));
        insert_by_dominance(&mut chain, Entry::new(&[3, 3], 1));
        assert_eq!(delays_of(&chain), vec![vec![1, 5], vec![3, 3], vec![5, 1]]);
        assert!(chain_is_pareto(&chain));
    }

    #[test]
    fn mid_chain_insert_sweeps_later_losers() {
        let mut chain = Vec::new();
        insert_by_dominance(&mut chain, Entry::new(&[1, 9], 1));
        insert_by_dominance(&mut chain, Entry::new(&[4, 4], 1));
        insert_by_dominance(&mut chain, Entry::new(&[9, 1], 1));
        // [2, 3] lands between [1, 9] and [4, 4] and obsoletes [4, 4].
        let outcome = insert_by_dominance(&mut chain, Entry::new(&[2, 3], 1));
        match outcome {
            InsertOutcome::Inserted { evicted } => {
                assert_eq!(delays_of(&evicted), vec![vec![4, 4]]);
            }
            InsertOutcome::Rejected(_) => panic!("expected insertion"),
        }
        assert_eq!(delays_of(&chain), vec![vec![1, 9], vec![2, 3], vec![9, 1]]);
    }

    #[test]
    fn chain_contents_are_insertion_order_independent() {
        let entries = [
            Entry::new(&[1, 9, 4], 1),
            Entry::new(&[9, 1, 4], 2),
            Entry::new(&[4, 4, 4], 3),
            Entry::new(&[2, 8, 5], 4),
            Entry::new(&[8, 8, 8], 5),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let mut reference: Option<Vec<Entry>> = None;
        for _ in 0..50 {
            let mut order = entries.to_vec();
            order.shuffle(&mut rng);
            let mut chain = Vec::new();
            for e in order {
                insert_by_dominance(&mut chain, e);
            }
            assert!(chain_is_pareto(&chain));
            match &reference {
                None => reference = Some(chain),
                Some(r) => assert_eq!(&chain, r),
            }
        }
    }

    #[test]
    fn random_chains_stay_pareto() {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        for _ in 0..200 {
            let mut chain = Vec::new();
            for _ in 0..30 {
                let delays: Vec<i8> = (0..4).map(|_| rng.gen_range(0..6)).collect();
                insert_by_dominance(&mut chain, Entry::new(&delays, rng.gen_range(1..10)));
            }
            assert!(chain_is_pareto(&chain));
            // Everything still resident must be clamped into the real range.
            for e in &chain {
                assert!(e.delays.iter().all(|d| (0..=MAX_DELAY).contains(d)));
            }
        }
    }

    #[test]
    fn clamp_saturates_at_the_sentinel_boundary() {
        assert_eq!(clamp_delay(0), 0);
        assert_eq!(clamp_delay(118), 118);
        assert_eq!(clamp_delay(119), MAX_DELAY);
        assert_eq!(clamp_delay(5000), MAX_DELAY);
        assert!(MAX_DELAY < UNREACHABLE);
    }
}
