// SPDX-FileCopyrightText: 2026 Dripfeed Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Weighted category allocation.
//!
//! Slot counts are proportional to configured weights, with fractional
//! rounding residue assigned to the fallback category rather than spread by
//! remainder size. The residue is at most the number of categories, so with
//! realistic weight tables the fallback over-allocation stays small, and it
//! guarantees the total always equals the requested slot count.

use std::collections::HashMap;

use rand::Rng;
use rand::seq::SliceRandom;

/// Tolerance when checking that weights sum to 1.0.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Per-category slot counts for `total` slots.
///
/// Invalid weight tables (negative entries, sum off by more than the
/// epsilon) are reported through `issues` and treated as no weighting at
/// all; callers then allocate uncategorized slots. An unweighted plan is
/// better than a silently skewed one.
pub fn category_counts(
    weights: &HashMap<String, f64>,
    total: u32,
    fallback: &str,
    issues: &mut Vec<String>,
) -> Option<Vec<(String, u32)>> {
    if weights.is_empty() {
        return None;
    }
    if let Some((name, w)) = weights.iter().find(|(_, w)| **w < 0.0) {
        issues.push(format!("negative weight {w} for category '{name}'"));
        return None;
    }
    let sum: f64 = weights.values().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
        issues.push(format!("category weights sum to {sum}, expected 1.0"));
        return None;
    }

    // Deterministic iteration so floor residue does not depend on hash order.
    let mut names: Vec<&String> = weights.keys().collect();
    names.sort();

    let mut counts: Vec<(String, u32)> = names
        .iter()
        .map(|name| {
            let share = weights[*name] * f64::from(total);
            (name.to_string(), share.floor() as u32)
        })
        .collect();

    let assigned: u32 = counts.iter().map(|(_, n)| n).sum();
    let residue = total - assigned;
    if residue > 0 {
        match counts.iter_mut().find(|(name, _)| name == fallback) {
            Some((_, n)) => *n += residue,
            None => counts.push((fallback.to_string(), residue)),
        }
    }

    Some(counts)
}

/// Expand per-category counts into a shuffled per-slot category sequence.
pub fn slot_sequence<R: Rng>(
    counts: &[(String, u32)],
    rng: &mut R,
) -> Vec<Option<String>> {
    let mut sequence: Vec<Option<String>> = counts
        .iter()
        .flat_map(|(name, n)| std::iter::repeat_n(Some(name.clone()), *n as usize))
        .collect();
    sequence.shuffle(rng);
    sequence
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn weights(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn counts_conserve_total_and_track_ratios() {
        let w = weights(&[("cats", 0.5), ("dogs", 0.3), ("birds", 0.2)]);
        let mut issues = Vec::new();
        let counts = category_counts(&w, 21, "cats", &mut issues).unwrap();
        assert!(issues.is_empty());

        let total: u32 = counts.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 21);

        for (name, n) in &counts {
            let exact = w[name] * 21.0;
            // Non-fallback categories floor their share; the fallback absorbs
            // the residue.
            if name == "cats" {
                assert!(f64::from(*n) >= exact.floor());
            } else {
                assert_eq!(f64::from(*n), exact.floor());
            }
        }
    }

    #[test]
    fn residue_lands_on_fallback_even_when_unweighted() {
        let w = weights(&[("cats", 0.5), ("dogs", 0.5)]);
        let mut issues = Vec::new();
        // 0.5 * 7 floors to 3 each, residue 1 goes to "general".
        let counts = category_counts(&w, 7, "general", &mut issues).unwrap();
        let general = counts.iter().find(|(n, _)| n == "general").unwrap();
        assert_eq!(general.1, 1);
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<u32>(), 7);
    }

    #[test]
    fn bad_sum_reports_issue_and_disables_weighting() {
        let w = weights(&[("cats", 0.5), ("dogs", 0.2)]);
        let mut issues = Vec::new();
        assert!(category_counts(&w, 10, "cats", &mut issues).is_none());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("sum"));
    }

    #[test]
    fn negative_weight_reports_issue() {
        let w = weights(&[("cats", 1.5), ("dogs", -0.5)]);
        let mut issues = Vec::new();
        assert!(category_counts(&w, 10, "cats", &mut issues).is_none());
        assert!(issues[0].contains("negative"));
    }

    #[test]
    fn sequence_has_exact_multiplicities() {
        let counts = vec![("cats".to_string(), 3), ("dogs".to_string(), 2)];
        let mut rng = StdRng::seed_from_u64(7);
        let sequence = slot_sequence(&counts, &mut rng);
        assert_eq!(sequence.len(), 5);
        let cats = sequence
            .iter()
            .filter(|c| c.as_deref() == Some("cats"))
            .count();
        assert_eq!(cats, 3);
    }
}
