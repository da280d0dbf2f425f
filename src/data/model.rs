use crate::error::{ScanError, ScanResult};

// ---------------------------------------------------------------------------
// CurveTable – one matrix of scan values
// ---------------------------------------------------------------------------

/// `nSets` rows of `nData` goodness-of-fit values each.
///
/// Invariants: at least one row, every row non-empty, every row the same
/// length, every value finite. Transforms build a new table instead of
/// mutating this one.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveTable {
    rows: Vec<Vec<f64>>,
}

impl CurveTable {
    /// Validate and wrap a set of rows.
    pub fn new(rows: Vec<Vec<f64>>) -> ScanResult<Self> {
        let first = rows.first().ok_or(ScanError::EmptyTable)?;
        let expected = first.len();

        for (set, row) in rows.iter().enumerate() {
            if row.is_empty() {
                return Err(ScanError::EmptyRow { set });
            }
            if row.len() != expected {
                return Err(ScanError::RaggedRow {
                    set,
                    expected,
                    found: row.len(),
                });
            }
            if let Some(index) = row.iter().position(|v| !v.is_finite()) {
                return Err(ScanError::NonFiniteValue { set, index });
            }
        }
        Ok(CurveTable { rows })
    }

    /// Number of curves (`nSets`).
    pub fn n_sets(&self) -> usize {
        self.rows.len()
    }

    /// Number of scan points per curve (`nData`).
    pub fn n_data(&self) -> usize {
        self.rows[0].len()
    }

    pub fn row(&self, set: usize) -> &[f64] {
        &self.rows[set]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

// ---------------------------------------------------------------------------
// LabelList – one label per row, index-aligned
// ---------------------------------------------------------------------------

/// Labels for the rows of a [`CurveTable`]. May be shorter than the table;
/// never reordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelList {
    labels: Vec<String>,
}

impl LabelList {
    pub fn new(labels: Vec<String>) -> Self {
        LabelList { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Label for `index`, or `<prefix><index+1>` when the list is too short.
    pub fn label_or(&self, index: usize, prefix: &str) -> String {
        match self.get(index) {
            Some(label) => label.to_string(),
            None => format!("{prefix}{}", index + 1),
        }
    }

    /// Label for `index`, falling back to `Set_<index+1>`.
    pub fn label_for(&self, index: usize) -> String {
        self.label_or(index, "Set_")
    }

    /// Exactly `n` labels: entries past the end are synthesized, entries
    /// beyond `n` are ignored.
    pub fn resolved(&self, n: usize) -> Vec<String> {
        (0..n).map(|i| self.label_for(i)).collect()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}

// ---------------------------------------------------------------------------
// Per-row diagnostics
// ---------------------------------------------------------------------------

/// Input extent of one row, reported by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowRange {
    pub min: f64,
    pub max: f64,
}

impl RowRange {
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }
}

// ---------------------------------------------------------------------------
// RefinedSet – rows with exactly one local minimum
// ---------------------------------------------------------------------------

/// One surviving curve of the refinement selector.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedCurve {
    /// Row index in the source table.
    pub source_index: usize,
    pub label: String,
    pub values: Vec<f64>,
    /// Colour/marker rotation index: survivor ordinal, starting at 0.
    pub style_slot: usize,
}

/// Refined subset of a normalized table, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefinedSet {
    pub curves: Vec<RefinedCurve>,
}

impl RefinedSet {
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.curves.iter().map(|c| c.label.clone()).collect()
    }

    pub fn source_indices(&self) -> Vec<usize> {
        self.curves.iter().map(|c| c.source_index).collect()
    }
}

// ---------------------------------------------------------------------------
// MatchedPair – same canonical ID in two sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub id: String,
    pub a_index: usize,
    pub b_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rejects_bad_shapes() {
        assert!(matches!(CurveTable::new(vec![]), Err(ScanError::EmptyTable)));
        assert!(matches!(
            CurveTable::new(vec![vec![1.0], vec![]]),
            Err(ScanError::EmptyRow { set: 1 })
        ));
        assert!(matches!(
            CurveTable::new(vec![vec![1.0, 2.0], vec![3.0]]),
            Err(ScanError::RaggedRow {
                set: 1,
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn table_rejects_non_finite_values() {
        assert!(matches!(
            CurveTable::new(vec![vec![1.0, 2.0], vec![3.0, f64::NAN]]),
            Err(ScanError::NonFiniteValue { set: 1, index: 1 })
        ));
        assert!(matches!(
            CurveTable::new(vec![vec![f64::INFINITY, 2.0]]),
            Err(ScanError::NonFiniteValue { set: 0, index: 0 })
        ));
    }

    #[test]
    fn table_reports_dimensions() {
        let table = CurveTable::new(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(table.n_sets(), 2);
        assert_eq!(table.n_data(), 3);
        assert_eq!(table.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn short_label_list_synthesizes_one_based_names() {
        let labels = LabelList::new(vec!["a.pdf".into()]);
        assert_eq!(labels.resolved(3), vec!["a.pdf", "Set_2", "Set_3"]);
        assert_eq!(labels.label_or(4, "plot_set_"), "plot_set_5");
    }
}
