//! Property-based tests for row-balanced output splitting.

use pqc_columnar::chunk_ranges;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn ranges_cover_every_row_exactly_once(total in 0usize..100_000, count in 0usize..500) {
        let ranges = chunk_ranges(total, count);
        prop_assert!(!ranges.is_empty());
        prop_assert_eq!(ranges[0].start, 0);
        prop_assert_eq!(ranges.last().map(|r| r.end), Some(total));
        for pair in ranges.windows(2) {
            prop_assert_eq!(pair[0].end, pair[1].start);
        }
        let covered: usize = ranges.iter().map(|r| r.len()).sum();
        prop_assert_eq!(covered, total);
    }

    #[test]
    fn ranges_are_balanced(total in 1usize..100_000, count in 1usize..500) {
        let ranges = chunk_ranges(total, count);
        prop_assert_eq!(ranges.len(), count.min(total));
        let min = ranges.iter().map(|r| r.len()).min().unwrap_or(0);
        let max = ranges.iter().map(|r| r.len()).max().unwrap_or(0);
        prop_assert!(max - min <= 1, "unbalanced split: min {} max {}", min, max);
        prop_assert!(min >= 1);
    }
}
