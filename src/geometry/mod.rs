/// Geometry layer: survey grid inference from trace headers.
///
/// ```text
///   xline headers ──┐            inline headers
///                   ▼                  │
///   ┌─────────────────────┐            │
///   │ pattern::classify   │  sawtooth / stairstep / monotonic
///   └─────────────────────┘            │
///                   │                  ▼
///   ┌─────────────────────────────────────┐
///   │ resolver::GeometryResolver          │  counts + coordinates
///   └─────────────────────────────────────┘
///                   │
///                   ▼
///            VolumeGeometry
/// ```

pub mod pattern;
pub mod resolver;
