/// Data layer: trace sources, loading, and the volume model.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → TraceTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ TraceSource   │  samples, header sequences, dt
///   └──────────────┘
///        │   geometry::resolver
///        ▼
///   ┌──────────┐
///   │  model    │  Seismic: reshaped volume, time basis, line slicing
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod source;
