/// Invoice analytics over the union of every loaded dataset.
///
/// ```text
///   registry snapshot ──► UnionView ──► Engine ──► Analysis
///                            ▲
///                  AliasTable (column roles)
/// ```

pub mod columns;
pub mod engine;
pub mod report;
pub mod union;

pub use columns::{AliasTable, ColumnRole};
pub use engine::{Engine, Query};
pub use report::{format_brl, format_count, Analysis, AnalysisError, ValueStats, YearMonth};
pub use union::UnionView;
