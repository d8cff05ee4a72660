/// Data layer: tables, loading, caching and the pure derivations the pages
/// are built from.
///
/// Architecture:
/// ```text
///  .las / .csv / .parquet
///        │
///        ▼
///   ┌──────────┐      ┌─────────┐
///   │  loader   │◄─────│  cache   │  md5-keyed, never evicted
///   └──────────┘      └─────────┘
///        │  (las for well logs, date normalization)
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Table + source name + LAS well header
///   └──────────┘
///        │
///        ▼
///   filter · resample · stats · decline · kpi   (pure functions)
/// ```

pub mod cache;
pub mod decline;
pub mod filter;
pub mod kpi;
pub mod las;
pub mod loader;
pub mod model;
pub mod resample;
pub mod stats;
