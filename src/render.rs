use ndarray::{ArrayView1, ArrayView2, Axis, Ix2};

use crate::config::WiggleOptions;
use crate::data::model::{Direction, LineIndex, Seismic};
use crate::error::{Result, SeismicError};
use crate::spectral::EnsembleEstimate;

// ---------------------------------------------------------------------------
// Renderer seam
// ---------------------------------------------------------------------------

/// A display backend. Every call names its target surface explicitly.
pub trait Renderer {
    /// Whatever the backend draws into (an axes handle, a canvas, a file).
    type Surface;
    type Error: From<SeismicError>;

    fn draw_wiggles(
        &mut self,
        surface: &mut Self::Surface,
        traces: &[WiggleTrace],
    ) -> std::result::Result<(), Self::Error>;

    /// `image` is `(ntraces, nsamples)`; values outside `scale` saturate.
    fn draw_image(
        &mut self,
        surface: &mut Self::Surface,
        image: ArrayView2<'_, f64>,
        scale: ScaleHint,
    ) -> std::result::Result<(), Self::Error>;

    fn draw_spectrum(
        &mut self,
        surface: &mut Self::Surface,
        frequencies: &[f64],
        db: &[f64],
        annotation: &str,
    ) -> std::result::Result<(), Self::Error>;
}

// ---------------------------------------------------------------------------
// Intensity scaling
// ---------------------------------------------------------------------------

/// `p`-th percentile (0–100), interpolating linearly between order
/// statistics. NaNs are ignored.
pub fn percentile<I: IntoIterator<Item = f64>>(values: I, p: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() || !(0.0..=100.0).contains(&p) {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Value range for intensity mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleHint {
    pub vmin: f64,
    pub vmax: f64,
}

impl ScaleHint {
    /// `(-v, v)` with `v` the `perc`-th percentile of the data.
    pub fn symmetric<I: IntoIterator<Item = f64>>(values: I, perc: f64) -> Option<Self> {
        let v = percentile(values, perc)?.abs();
        Some(Self { vmin: -v, vmax: v })
    }

    pub fn min_max<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let (vmin, vmax) = values
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        (vmin <= vmax).then_some(Self { vmin, vmax })
    }
}

// ---------------------------------------------------------------------------
// Wiggle traces
// ---------------------------------------------------------------------------

/// One wiggle curve, ready to draw: amplitudes are offset by `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct WiggleTrace {
    /// Trace position along the line.
    pub position: f64,
    pub time_ms: Vec<f64>,
    pub amplitude: Vec<f64>,
}

/// Normalised, oversampled wiggle curves for a `(ntraces, nsamples)` line.
pub fn wiggle_traces(
    line: ArrayView2<'_, f64>,
    tbasis: ArrayView1<'_, f64>,
    options: &WiggleOptions,
) -> Result<Vec<WiggleTrace>> {
    let nsamples = line.ncols();
    if tbasis.len() != nsamples {
        return Err(SeismicError::InvalidInput(format!(
            "time basis has {} samples, line has {nsamples}",
            tbasis.len()
        )));
    }
    if nsamples == 0 {
        return Ok(Vec::new());
    }
    let skip = options.skip.max(1);
    let oversample = options.oversample.max(1);

    let sc = match percentile(line.iter().copied(), options.perc) {
        Some(v) if v != 0.0 => v,
        _ => 1.0,
    };

    let (t0, t1) = (tbasis[0], tbasis[nsamples - 1]);
    let npoints = oversample * (nsamples - 1) + 1;
    let time_ms: Vec<f64> = (0..npoints)
        .map(|k| {
            let frac = if npoints > 1 { k as f64 / (npoints - 1) as f64 } else { 0.0 };
            1000.0 * (t0 + frac * (t1 - t0))
        })
        .collect();

    let traces = line
        .axis_iter(Axis(0))
        .enumerate()
        .step_by(skip)
        .map(|(x, trace)| {
            let x = x as f64;
            let amp: Vec<f64> = trace.iter().map(|&a| options.gain * a / sc + x).collect();
            let amplitude = (0..npoints)
                .map(|k| {
                    let i = k / oversample;
                    let frac = (k % oversample) as f64 / oversample as f64;
                    match amp.get(i + 1) {
                        Some(&next) => amp[i] + frac * (next - amp[i]),
                        None => amp[i],
                    }
                })
                .collect();
            WiggleTrace {
                position: x,
                time_ms: time_ms.clone(),
                amplitude,
            }
        })
        .collect();
    Ok(traces)
}

/// Annotation text for an ensemble spectrum.
pub fn spectrum_annotation(estimate: &EnsembleEstimate) -> String {
    format!("AMPLITUDE SPECTRUM\n{}", estimate.bandwidth)
}

// ---------------------------------------------------------------------------
// Model → renderer
// ---------------------------------------------------------------------------

fn line_2d<'a>(model: &'a Seismic, index: LineIndex, direction: Direction) -> Result<ArrayView2<'a, f64>> {
    let line = model.get_line(index, direction)?;
    let line = if line.ndim() == 1 {
        line.insert_axis(Axis(0))
    } else {
        line
    };
    Ok(line.into_dimensionality::<Ix2>()?)
}

/// Draw one line of `model` as wiggle traces, using the model's wiggle
/// options.
pub fn render_wiggles<R: Renderer>(
    renderer: &mut R,
    surface: &mut R::Surface,
    model: &Seismic,
    index: impl Into<LineIndex>,
    direction: Direction,
) -> std::result::Result<(), R::Error> {
    let line = line_2d(model, index.into(), direction)?;
    let traces = wiggle_traces(line, model.time_basis(), model.wiggle_options())?;
    renderer.draw_wiggles(surface, &traces)
}

/// Draw one line of `model` as a variable-density image clipped at the
/// model's `perc`-th percentile.
pub fn render_image<R: Renderer>(
    renderer: &mut R,
    surface: &mut R::Surface,
    model: &Seismic,
    index: impl Into<LineIndex>,
    direction: Direction,
) -> std::result::Result<(), R::Error> {
    let line = line_2d(model, index.into(), direction)?;
    let perc = model.wiggle_options().perc;
    let scale = ScaleHint::symmetric(model.data().iter().copied(), perc)
        .ok_or_else(|| SeismicError::InvalidInput("no finite samples to scale".into()))?;
    renderer.draw_image(surface, line, scale)
}

/// Draw the ensemble amplitude spectrum of `model` with its bandwidth
/// annotation.
pub fn render_spectrum<R: Renderer>(
    renderer: &mut R,
    surface: &mut R::Surface,
    model: &Seismic,
) -> std::result::Result<EnsembleEstimate, R::Error> {
    let estimate = model.estimate_bandwidth()?;
    renderer.draw_spectrum(
        surface,
        &estimate.spectrum.frequencies,
        &estimate.db,
        &spectrum_annotation(&estimate),
    )?;
    Ok(estimate)
}
