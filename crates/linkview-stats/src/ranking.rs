//! Stable ranking of case values
//!
//! A ranking is the list of case indices ordered by ascending value. Missing
//! values (and NaN) are left out. Ties keep their original case order, so
//! the ranking of a subset can always be derived from the full ranking by
//! filtering instead of sorting again.

use std::cmp::Ordering;

/// Rank the present values of a column
///
/// Returns the case indices of all `Some` (non-NaN) values sorted by
/// ascending value. The sort is stable: equal values keep case order.
///
/// Time complexity: O(n log n)
pub fn rank_order(values: &[Option<f64>]) -> Vec<usize> {
    let mut keyed: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(case, value)| match value {
            Some(v) if !v.is_nan() => Some((case, *v)),
            _ => None,
        })
        .collect();

    // slice::sort_by is stable, which gives us the tie rule for free
    keyed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    keyed.into_iter().map(|(case, _)| case).collect()
}

/// Keep the cases of a ranking accepted by `keep`, preserving rank order
pub fn filter_ranks<F>(ranks: &[usize], mut keep: F) -> Vec<usize>
where
    F: FnMut(usize) -> bool,
{
    ranks.iter().copied().filter(|&case| keep(case)).collect()
}

/// Check that `ranks` lists cases by non-decreasing value
///
/// Cases pointing outside `values` or at missing entries make the ranking
/// invalid.
pub fn is_rank_ordered(values: &[Option<f64>], ranks: &[usize]) -> bool {
    let mut last = f64::NEG_INFINITY;
    for &case in ranks {
        match values.get(case).copied().flatten() {
            Some(v) if v >= last => last = v,
            _ => return false,
        }
    }
    true
}
