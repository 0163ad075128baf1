/// Data layer: archive types, loading, merging, selection and export.
///
/// Architecture:
/// ```text
///  cands_*.pkl / noise_*.pkl
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  two pickled records → ArchiveState + Candidates
///   └──────────┘
///        │                         ┌─────────┐
///        ├────────────────────────▶│  merge   │  union of segments, last wins
///        ▼                         └─────────┘
///   ┌──────────────┐
///   │  Candidates   │  sorted location keys ⟷ feature rows
///   └──────────────┘
///        │
///        ▼
///   ┌──────────┐      ┌──────────┐
///   │  filter   │      │  export   │  csv / json / parquet
///   └──────────┘      └──────────┘
/// ```

pub mod export;
pub mod filter;
pub mod loader;
pub mod merge;
pub mod model;
pub mod pickle;
