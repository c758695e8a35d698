/// Data layer: invoice tables, loading, the dataset registry, and export.
///
/// Architecture:
/// ```text
///  .csv / .zip / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  decode, sniff delimiter, parse → Dataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ registry  │  named Arc<Dataset>s + active selection
///   └──────────┘
///        │                     │
///        ▼                     ▼
///   ┌──────────┐         ┌──────────┐
///   │  filter   │         │  export   │  union → .csv / .parquet
///   └──────────┘         └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod registry;
