use super::model::{CurveTable, LabelList, RefinedCurve, RefinedSet};

// ---------------------------------------------------------------------------
// Shape classification
// ---------------------------------------------------------------------------

/// Count strict interior local minima: `v[i] < v[i-1] && v[i] < v[i+1]`.
/// Endpoints never count, so rows shorter than 3 always yield 0.
pub fn count_minima(values: &[f64]) -> usize {
    values
        .windows(3)
        .filter(|w| w[1] < w[0] && w[1] < w[2])
        .count()
}

/// A curve is refined when it has exactly one interior minimum.
pub fn is_refined(values: &[f64]) -> bool {
    count_minima(values) == 1
}

// ---------------------------------------------------------------------------
// Refinement selector
// ---------------------------------------------------------------------------

/// Return indices of rows that pass the single-minimum predicate, in table
/// order.
pub fn refined_indices(table: &CurveTable) -> Vec<usize> {
    table
        .rows()
        .enumerate()
        .filter(|(_, row)| is_refined(row))
        .map(|(i, _)| i)
        .collect()
}

/// Stable filter of `table` down to its refined rows.
///
/// Labels missing from `labels` are synthesized as `Set_<i+1>` using the
/// source row index. Style slots are assigned to survivors only, counting
/// up from 0.
pub fn select_refined(table: &CurveTable, labels: &LabelList) -> RefinedSet {
    let curves = refined_indices(table)
        .into_iter()
        .enumerate()
        .map(|(slot, i)| RefinedCurve {
            source_index: i,
            label: labels.label_for(i),
            values: table.row(i).to_vec(),
            style_slot: slot,
        })
        .collect();

    RefinedSet { curves }
}
