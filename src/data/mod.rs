/// Data layer: core types, loading, cleaning and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawFrame
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cleaner  │  coerce types, drop undated rows → OrderTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply FilterParams → FilteredView (row indices)
///   └──────────┘
/// ```

pub mod cleaner;
pub mod filter;
pub mod loader;
pub mod model;
