//! Seismic survey geometry inference and bandwidth estimation.
//!
//! Given decoded traces and their per-trace headers, `seisplot` works out
//! the 3D grid the traces were acquired on (from the shape of the header
//! sequences alone), holds the reshaped volume, and estimates the usable
//! frequency band of trace ensembles. Drawing is left to a [`Renderer`].
//!
//! ```text
//!  TraceSource ─► geometry::pattern ─► geometry::resolver ─► data::model::Seismic
//!                                                                │
//!                                                                ▼
//!                                                   spectral ─► render
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod geometry;
pub mod render;
pub mod spectral;

pub use config::{EdgeDetection, HeaderKeys, SeismicParams, SpectrumOptions, WiggleOptions};
pub use data::loader::load_file;
pub use data::model::{Direction, LineIndex, Seismic};
pub use data::source::{HeaderValue, TraceSource, TraceTable};
pub use error::{Result, SeismicError};
pub use geometry::pattern::{classify, Pattern};
pub use geometry::resolver::{
    Adjustment, GeometryHints, GeometryResolver, Resolution, VolumeGeometry,
};
pub use render::{Renderer, ScaleHint, WiggleTrace};
pub use spectral::{bandwidth, estimate, spectrum, BandwidthEstimate, EnsembleEstimate, Spectrum};
