use std::path::PathBuf;

use super::loader::read_x_values;
use crate::error::{ScanError, ScanResult};

// ---------------------------------------------------------------------------
// X-axis sources
// ---------------------------------------------------------------------------

/// Evenly spaced scan points: `min + i * step`. `max` only bounds the axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

/// Where the x coordinates of a curve table come from.
#[derive(Debug, Clone, PartialEq)]
pub enum XSource {
    File(PathBuf),
    Range(XRange),
    /// 1-based positional index.
    Index,
}

/// X-axis options as given on the command line. Any combination may be
/// set; [`XAxisConfig::source`] picks one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XAxisConfig {
    pub file: Option<PathBuf>,
    pub range: Option<XRange>,
}

impl XAxisConfig {
    /// Precedence: explicit file, then explicit range, then index.
    pub fn source(&self) -> XSource {
        if let Some(path) = &self.file {
            XSource::File(path.clone())
        } else if let Some(range) = self.range {
            XSource::Range(range)
        } else {
            XSource::Index
        }
    }
}

/// A resolved coordinate sequence plus the axis span it asks for.
#[derive(Debug, Clone, PartialEq)]
pub struct XAxis {
    pub values: Vec<f64>,
    /// `None` lets the renderer use the data extent.
    pub limits: Option<(f64, f64)>,
}

impl XSource {
    /// Produce the coordinates for `n_data` points.
    ///
    /// A file source yields whatever its first non-empty line holds; use
    /// [`XSource::resolve_checked`] when the length must equal `n_data`.
    pub fn resolve(&self, n_data: usize) -> ScanResult<Vec<f64>> {
        match self {
            XSource::File(path) => read_x_values(path),
            XSource::Range(r) => Ok((0..n_data).map(|i| r.min + i as f64 * r.step).collect()),
            XSource::Index => Ok((1..=n_data).map(|i| i as f64).collect()),
        }
    }

    /// Like [`XSource::resolve`] but fails with `SizeMismatch` unless exactly
    /// `n_data` coordinates were produced.
    pub fn resolve_checked(&self, n_data: usize) -> ScanResult<XAxis> {
        let values = self.resolve(n_data)?;
        if values.len() != n_data {
            return Err(ScanError::SizeMismatch {
                expected: n_data,
                found: values.len(),
            });
        }

        let limits = match self {
            XSource::File(_) => values.first().zip(values.last()).map(|(a, b)| (*a, *b)),
            XSource::Range(r) => Some((r.min, r.max)),
            XSource::Index => None,
        };
        Ok(XAxis { values, limits })
    }

    pub fn describe(&self) -> String {
        match self {
            XSource::File(path) => format!("file {}", path.display()),
            XSource::Range(r) => format!("range {}..{} step {}", r.min, r.max, r.step),
            XSource::Index => "index".to_string(),
        }
    }
}
