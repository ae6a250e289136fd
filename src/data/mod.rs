/// Data layer: core types, loading, filtering, aggregation and comparison.
///
/// Architecture:
/// ```text
///  .geojson                      .csv / .json / .parquet
///        │                               │
///        ▼                               ▼
///   ┌──────────┐                   ┌──────────┐
///   │  cache    │ path → Arc<..>   │  loader   │  parse file → Table
///   └──────────┘                   └──────────┘
///        │                               │
///        ▼                               ▼
///   ┌─────────────────┐            ┌──────────┐
///   │ DivisionDataset  │ divisions │  compare  │  inner join vs reference
///   └─────────────────┘ + totals   └──────────┘
///        │                               │
///        ▼                               │
///   ┌──────────┐                         │
///   │  filter   │  Selection → indices   │
///   └──────────┘                         │
///        │                               │
///        ▼                               ▼
///   ┌───────────┐                  ┌──────────┐
///   │ aggregate  │ ───────────────▶ │  export   │  CSV
///   └───────────┘                  └──────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod compare;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod table;
