use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, ArrayViewD, Axis};

use super::source::{format_textual_header, TraceSource};
use crate::config::{SeismicParams, SpectrumOptions, WiggleOptions};
use crate::error::{Result, SeismicError};
use crate::geometry::resolver::{
    adjust, consecutive, fills_grid, Adjustment, GeometryHints, GeometryResolver,
    VolumeGeometry,
};
use crate::spectral::{self, EnsembleEstimate};

// ---------------------------------------------------------------------------
// Direction / LineIndex – how a line is addressed
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Inline,
    Xline,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Inline => write!(f, "inline"),
            Direction::Xline => write!(f, "xline"),
        }
    }
}

impl FromStr for Direction {
    type Err = SeismicError;

    /// Anything starting with `i` is an inline, with `x` a crossline.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
            Some('i') => Ok(Direction::Inline),
            Some('x') => Ok(Direction::Xline),
            _ => Err(SeismicError::InvalidInput(format!("unknown direction '{s}'"))),
        }
    }
}

/// A line position along an axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineIndex {
    /// Fraction of the axis length in `[0, 1)`; `0.5` is the middle line.
    Fraction(f64),
    /// 0-based line position.
    Absolute(usize),
}

impl From<usize> for LineIndex {
    fn from(i: usize) -> Self {
        LineIndex::Absolute(i)
    }
}

impl From<f64> for LineIndex {
    /// Values in `(0, 1)` are fractions; values `>= 1` are absolute
    /// positions (truncated). Anything else is kept as an (invalid) fraction.
    fn from(v: f64) -> Self {
        if v >= 1.0 && v.is_finite() {
            LineIndex::Absolute(v as usize)
        } else if v == 0.0 {
            LineIndex::Absolute(0)
        } else {
            LineIndex::Fraction(v)
        }
    }
}

impl LineIndex {
    fn position(self, len: usize) -> Option<usize> {
        match self {
            LineIndex::Absolute(i) => (i < len).then_some(i),
            LineIndex::Fraction(f) if (0.0..1.0).contains(&f) => {
                Some((f * len as f64).floor() as usize).filter(|&i| i < len)
            }
            LineIndex::Fraction(_) => None,
        }
    }

    fn value(self) -> f64 {
        match self {
            LineIndex::Absolute(i) => i as f64,
            LineIndex::Fraction(f) => f,
        }
    }
}

// ---------------------------------------------------------------------------
// Seismic – the volume model
// ---------------------------------------------------------------------------

/// Seismic data with its time basis and survey geometry.
///
/// `data` is `(ninlines, nxlines, nsamples)` for a resolved 3D grid,
/// `(ntraces, nsamples)` for a line, or `(nsamples,)` for a single trace.
/// It is reshaped once at construction and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Seismic {
    data: ArrayD<f64>,
    geometry: VolumeGeometry,
    dt: f64,
    tstart: f64,
    tbasis: Array1<f64>,
    /// Textual file header, 80-column lines.
    pub header: String,
    /// Extra per-trace attributes (elevation, fold, water depth, ...).
    pub attributes: BTreeMap<String, Vec<f64>>,
    adjustments: Vec<Adjustment>,
    spectrum_options: SpectrumOptions,
    wiggle_options: WiggleOptions,
}

impl Seismic {
    /// Build from a `(ntraces, nsamples)` matrix and explicit parameters.
    ///
    /// With only `nxlines` given, the inline count is inferred from the trace
    /// count; with `ninlines > 1`, `nxlines` is recomputed from the data.
    pub fn new(data: Array2<f64>, params: &SeismicParams) -> Result<Self> {
        params.validate()?;
        let dt = params
            .dt
            .ok_or_else(|| SeismicError::InvalidInput("dt is required".into()))?;
        let ntraces = data.nrows();
        let mut adjustments = Vec::new();

        let mut ninlines = params.ninlines.unwrap_or(1).max(1);
        let mut nxlines = params.nxlines.unwrap_or(0);
        if ninlines == 1 && nxlines > 0 {
            ninlines = (ntraces / nxlines).max(1);
        }
        if ninlines > 1 {
            if ninlines > ntraces || ntraces % ninlines != 0 {
                return Err(SeismicError::GeometryMismatch {
                    ninlines,
                    nxlines: ntraces / ninlines,
                    ntraces,
                });
            }
            let resolved = ntraces / ninlines;
            if nxlines > 0 && resolved != nxlines {
                adjust(&mut adjustments, Adjustment::Nxlines { requested: nxlines, resolved });
            }
            nxlines = resolved;
        }

        let inlines = match &params.inlines {
            Some(c) if c.len() == ninlines => c.clone(),
            _ => consecutive(ninlines),
        };
        let xlines = match &params.xlines {
            Some(c) if c.len() == nxlines => c.clone(),
            _ => consecutive(nxlines),
        };
        let geometry = VolumeGeometry {
            ninlines,
            nxlines,
            nsamples: params.nsamples.unwrap_or(0),
            inlines,
            xlines,
        };

        let mut model = Self::from_geometry(data, geometry, dt, params.tstart.unwrap_or(0.0))?;
        adjustments.append(&mut model.adjustments);
        model.adjustments = adjustments;
        model.header = params.header.clone();
        model.spectrum_options = params.spectrum.clone();
        model.wiggle_options = params.wiggle.clone();
        Ok(model)
    }

    /// Build from a resolved geometry.
    ///
    /// Reshapes to `(ninlines, nxlines, nsamples)` when the geometry is 3D;
    /// the grid must use every trace exactly.
    pub fn from_geometry(
        data: Array2<f64>,
        geometry: VolumeGeometry,
        dt: f64,
        tstart: f64,
    ) -> Result<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SeismicError::InvalidInput(format!(
                "dt must be finite and > 0, got {dt}"
            )));
        }
        let mut geometry = geometry;
        let mut adjustments = Vec::new();
        let (ntraces, nsamples) = data.dim();

        if geometry.nsamples != 0 && geometry.nsamples != nsamples {
            adjust(
                &mut adjustments,
                Adjustment::Nsamples { requested: geometry.nsamples, resolved: nsamples },
            );
        }
        geometry.nsamples = nsamples;

        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };

        let data = if geometry.is_3d() {
            let (ni, nx) = (geometry.ninlines, geometry.nxlines);
            if !fills_grid(ni, nx, ntraces) {
                return Err(SeismicError::GeometryMismatch {
                    ninlines: ni,
                    nxlines: nx,
                    ntraces,
                });
            }
            data.into_shape_with_order((ni, nx, nsamples))?.into_dyn()
        } else {
            data.into_dyn()
        };

        Ok(Self {
            data,
            tbasis: time_basis(tstart, dt, nsamples),
            geometry,
            dt,
            tstart,
            header: String::new(),
            attributes: BTreeMap::new(),
            adjustments,
            spectrum_options: SpectrumOptions::default(),
            wiggle_options: WiggleOptions::default(),
        })
    }

    /// A single trace.
    pub fn from_trace(trace: Array1<f64>, dt: f64, tstart: f64) -> Result<Self> {
        let nsamples = trace.len();
        let mut model = Self::from_geometry(
            trace.insert_axis(Axis(0)),
            VolumeGeometry::line(1, nsamples),
            dt,
            tstart,
        )?;
        model.data = model.data.index_axis_move(Axis(0), 0);
        Ok(model)
    }

    /// Build from a trace source, inferring the survey geometry from its
    /// headers. Counts and coordinates in `params` are hints only.
    pub fn from_source<S: TraceSource + ?Sized>(source: &S, params: &SeismicParams) -> Result<Self> {
        params.validate()?;
        let samples = source.samples();
        let (ntraces, nsamples) = samples.dim();
        let keys = &params.headers;

        let xline_headers = match source.header(&keys.xline) {
            Some(h) if h.len() == ntraces => h,
            Some(h) => {
                return Err(SeismicError::Source(format!(
                    "header '{}' has {} values for {ntraces} traces",
                    keys.xline,
                    h.len()
                )))
            }
            None => {
                log::warn!("no '{}' header; treating data as a single line", keys.xline);
                Vec::new()
            }
        };
        let inline_headers = source.header(&keys.inline).filter(|h| h.len() == ntraces);

        let hints = GeometryHints {
            ninlines: params.ninlines,
            nxlines: params.nxlines,
            inlines: params.inlines.clone(),
            xlines: params.xlines.clone(),
        };
        let resolution = GeometryResolver::new(hints)
            .with_nsamples(params.nsamples.unwrap_or(nsamples))
            .resolve(&xline_headers, inline_headers.as_deref(), ntraces)?;

        let dt = params.dt.unwrap_or_else(|| source.sample_interval());
        let tstart = params.tstart.unwrap_or_else(|| source.start_time());

        let mut model = Self::from_geometry(samples.to_owned(), resolution.geometry, dt, tstart)?;
        let mut adjustments = resolution.adjustments;
        adjustments.append(&mut model.adjustments);
        model.adjustments = adjustments;
        model.spectrum_options = params.spectrum.clone();
        model.wiggle_options = params.wiggle.clone();

        model.header = if params.header.is_empty() {
            source.textual_header().map(format_textual_header).unwrap_or_default()
        } else {
            params.header.clone()
        };

        for key in &keys.extra {
            match source.attribute(key) {
                Some(values) if values.len() == ntraces => {
                    model.attributes.insert(key.clone(), values);
                }
                Some(values) => log::warn!(
                    "attribute '{key}' has {} values for {ntraces} traces; skipped",
                    values.len()
                ),
                None => {}
            }
        }

        log::info!(
            "built {:?} volume: {} inlines × {} xlines × {} samples",
            model.shape(),
            model.geometry.ninlines,
            model.geometry.nxlines,
            model.geometry.nsamples
        );
        Ok(model)
    }

    // -- accessors --

    pub fn data(&self) -> ArrayViewD<'_, f64> {
        self.data.view()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn geometry(&self) -> &VolumeGeometry {
        &self.geometry
    }

    /// Spectrum options the model was built with.
    pub fn spectrum_options(&self) -> &SpectrumOptions {
        &self.spectrum_options
    }

    /// Wiggle and clip options the model was built with.
    pub fn wiggle_options(&self) -> &WiggleOptions {
        &self.wiggle_options
    }

    /// Caller-supplied values that were replaced to match the data.
    pub fn adjustments(&self) -> &[Adjustment] {
        &self.adjustments
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn tstart(&self) -> f64 {
        self.tstart
    }

    pub fn nsamples(&self) -> usize {
        self.geometry.nsamples
    }

    pub fn ntraces(&self) -> usize {
        match self.data.ndim() {
            0 | 1 => 1,
            _ => self.data.len() / self.nsamples().max(1),
        }
    }

    /// `tstart + i·dt` for every sample.
    pub fn time_basis(&self) -> ArrayView1<'_, f64> {
        self.tbasis.view()
    }

    /// Time of the last sample.
    pub fn tend(&self) -> Option<f64> {
        self.tbasis.last().copied()
    }

    /// First and last coordinate along `direction`.
    pub fn trace_range(&self, direction: Direction) -> Option<(f64, f64)> {
        let coords = match direction {
            Direction::Inline => &self.geometry.inlines,
            Direction::Xline => &self.geometry.xlines,
        };
        Some((*coords.first()?, *coords.last()?))
    }

    // -- slicing --

    /// One inline or crossline of a 3D volume.
    ///
    /// Data with fewer than three dimensions has no lines to slice and is
    /// returned whole.
    pub fn get_line(&self, index: impl Into<LineIndex>, direction: Direction) -> Result<ArrayViewD<'_, f64>> {
        if self.data.ndim() < 3 {
            return Ok(self.data.view());
        }
        let index = index.into();
        let axis = match direction {
            Direction::Inline => 0,
            Direction::Xline => 1,
        };
        let len = self.data.len_of(Axis(axis));
        let pos = index.position(len).ok_or(SeismicError::IndexOutOfRange {
            index: index.value(),
            axis: direction,
            len,
        })?;
        Ok(self.data.index_axis(Axis(axis), pos))
    }

    pub fn inline(&self, index: impl Into<LineIndex>) -> Result<ArrayViewD<'_, f64>> {
        self.get_line(index, Direction::Inline)
    }

    pub fn xline(&self, index: impl Into<LineIndex>) -> Result<ArrayViewD<'_, f64>> {
        self.get_line(index, Direction::Xline)
    }

    /// All traces in acquisition order, `(ntraces, nsamples)`.
    pub fn traces(&self) -> Result<ArrayView2<'_, f64>> {
        let shape = (self.ntraces(), self.nsamples());
        Ok(self.data.view().into_shape_with_order(shape)?)
    }

    // -- spectra --

    /// Ensemble spectrum using the options the model was built with.
    pub fn estimate_bandwidth(&self) -> Result<EnsembleEstimate> {
        self.estimate_bandwidth_with(&self.spectrum_options)
    }

    /// Ensemble spectrum over `options.ntraces` evenly spaced traces.
    pub fn estimate_bandwidth_with(&self, options: &SpectrumOptions) -> Result<EnsembleEstimate> {
        let traces = self.traces()?;
        let indices = spectral::select_trace_indices(traces.nrows(), options.ntraces);
        let selected = traces.select(Axis(0), &indices);
        spectral::estimate(selected.view(), 1.0 / self.dt, options)
    }
}

fn time_basis(tstart: f64, dt: f64, nsamples: usize) -> Array1<f64> {
    (0..nsamples).map(|i| tstart + i as f64 * dt).collect()
}
