/// Data layer: curve tables, normalization, refinement and matching.
///
/// Architecture:
/// ```text
///  raw scan file (nSets nData v...)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → CurveTable (+ LabelList)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ normalize  │  each row → [0, 10]
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  rows with exactly one local minimum → RefinedSet
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ matching  │  canonical IDs → union filter / matched pairs
///   └──────────┘
/// ```
/// `axis` supplies the x coordinates that go with a table.

pub mod axis;
pub mod filter;
pub mod loader;
pub mod matching;
pub mod model;
pub mod normalize;
