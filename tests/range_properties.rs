//! Property-based tests for the range algebra's invariants.
//!
//! Grounded on the testable properties enumerated for the Range Algebra:
//! insert idempotence, insert commutativity on disjoint ranges, invariant
//! preservation across arbitrary insert/truncate sequences, coverage
//! monotonicity, and overlap completeness.

use cowolf::range::{find_overlaps, insert, truncate, Record, Span};
use proptest::prelude::*;

const SPACE: u64 = 10_000;

fn small_range() -> impl Strategy<Value = (u64, u64)> {
    (0..SPACE).prop_flat_map(|s| (Just(s), s..SPACE).prop_map(|(s, e)| (s, e)))
}

fn covered_bytes(recs: &[Record], ceiling: u64) -> Vec<bool> {
    let mut covered = vec![false; ceiling as usize];
    for r in recs {
        let end = r.off_end.min(ceiling.saturating_sub(1));
        if r.off_start >= ceiling {
            continue;
        }
        let start = r.off_start as usize;
        let count = end as usize + 1 - start;
        for b in covered.iter_mut().skip(start).take(count) {
            *b = true;
        }
    }
    covered
}

fn assert_invariants(recs: &[Record]) {
    for w in recs.windows(2) {
        assert!(
            w[0].off_end + 1 < w[1].off_start,
            "records must be sorted, disjoint, and non-adjacent: {:?}",
            recs
        );
    }
    if let Some(last) = recs.last() {
        assert_eq!(last.off_end, u64::MAX, "last record must be the sentinel");
    }
}

proptest! {
    #[test]
    fn insert_idempotent((s, e) in small_range()) {
        let mut once = vec![Record::sentinel(SPACE)];
        insert(Record::new(s, e), &mut once);

        let mut twice = vec![Record::sentinel(SPACE)];
        insert(Record::new(s, e), &mut twice);
        insert(Record::new(s, e), &mut twice);

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn insert_commutative_on_disjoint_ranges(
        (s1, gap, len2) in (0u64..SPACE/2, 2u64..100, 1u64..100),
    ) {
        let e1 = s1 + 10;
        let s2 = e1 + gap;
        let e2 = s2 + len2;
        prop_assume!(e2 < SPACE);

        let mut ab = vec![Record::sentinel(SPACE)];
        insert(Record::new(s1, e1), &mut ab);
        insert(Record::new(s2, e2), &mut ab);

        let mut ba = vec![Record::sentinel(SPACE)];
        insert(Record::new(s2, e2), &mut ba);
        insert(Record::new(s1, e1), &mut ba);

        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn invariants_hold_after_arbitrary_sequence(
        ops in prop::collection::vec((any::<bool>(), small_range()), 0..20),
    ) {
        let mut recs = vec![Record::sentinel(SPACE)];
        for (is_insert, (s, e)) in ops {
            if is_insert {
                insert(Record::new(s, e), &mut recs);
            } else {
                let mut without_sentinel = recs.clone();
                without_sentinel.pop();
                let new_size = s.max(1);
                truncate(new_size, &mut without_sentinel);
                let sentinel_start = recs.last().unwrap().off_start.min(new_size);
                insert(Record::sentinel(sentinel_start), &mut without_sentinel);
                recs = without_sentinel;
            }
            assert_invariants(&recs);
        }
    }

    #[test]
    fn insert_never_shrinks_coverage((s, e) in small_range()) {
        let mut recs = vec![Record::sentinel(SPACE)];
        let before = covered_bytes(&recs, SPACE);
        insert(Record::new(s, e), &mut recs);
        let after = covered_bytes(&recs, SPACE);
        for i in 0..SPACE as usize {
            if before[i] {
                prop_assert!(after[i]);
            }
        }
    }

    #[test]
    fn truncate_never_grows_coverage((s, e, new_size) in (0u64..SPACE, 0u64..SPACE, 0u64..SPACE)) {
        prop_assume!(s <= e);
        let mut recs = vec![Record::new(s, e)];
        let before = covered_bytes(&recs, SPACE);
        truncate(new_size, &mut recs);
        let after = covered_bytes(&recs, SPACE);
        for i in 0..SPACE as usize {
            if after[i] {
                prop_assert!(before[i]);
            }
        }
    }

    #[test]
    fn overlap_completeness((off, len) in (0u64..SPACE, 1u64..500)) {
        let mut recs = vec![Record::new(100, 199), Record::new(300, 399), Record::sentinel(5000)];
        let window = find_overlaps(Span::new(off, len), &recs);
        let range_end = off + len - 1;

        let expected: Vec<Record> = recs
            .drain(..)
            .filter(|r| r.off_start <= range_end && r.off_end >= off)
            .collect();

        prop_assert_eq!(window.len(), expected.len());
    }
}
