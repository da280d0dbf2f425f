use super::model::{CurveTable, RowRange};
use crate::error::{ScanError, ScanResult};

/// Upper bound of the normalized scale; the lower bound is 0.
pub const SCALE_MAX: f64 = 10.0;

// ---------------------------------------------------------------------------
// Min-max rescaling onto [0, 10]
// ---------------------------------------------------------------------------

/// Output of [`normalize_table`]: the rescaled table plus the input extent of
/// every row.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub table: CurveTable,
    pub ranges: Vec<RowRange>,
}

/// Rescale one row to `[0, 10]`. A constant row maps to all zeros.
pub fn normalize_row(values: &[f64], set: usize) -> ScanResult<(Vec<f64>, RowRange)> {
    if values.is_empty() {
        return Err(ScanError::EmptyRow { set });
    }

    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = RowRange { min, max };

    let scaled = if range.is_degenerate() {
        vec![0.0; values.len()]
    } else if (max - min).is_finite() {
        values
            .iter()
            .map(|&v| SCALE_MAX * ((v - min) / (max - min)))
            .collect()
    } else {
        // span overflows f64; halving every term keeps the ratios
        let (lo, hi) = (min / 2.0, max / 2.0);
        values
            .iter()
            .map(|&v| SCALE_MAX * ((v / 2.0 - lo) / (hi - lo)))
            .collect()
    };
    Ok((scaled, range))
}

/// Rescale every row of `table` independently.
pub fn normalize_table(table: &CurveTable) -> ScanResult<Normalized> {
    let mut rows = Vec::with_capacity(table.n_sets());
    let mut ranges = Vec::with_capacity(table.n_sets());

    for (set, row) in table.rows().enumerate() {
        let (scaled, range) = normalize_row(row, set)?;
        log::debug!("set {set}: min {} max {}", range.min, range.max);
        rows.push(scaled);
        ranges.push(range);
    }

    Ok(Normalized {
        table: CurveTable::new(rows)?,
        ranges,
    })
}
