use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use ndarray::{ArrayView1, ArrayView2};
use realfft::{RealFftPlanner, RealToComplex};

use crate::config::{EdgeDetection, SpectrumOptions};
use crate::error::{Result, SeismicError};

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Blackman window of length `n` (symmetric, `n == 1` gives `[1.0]`).
pub fn blackman(n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![1.0; n];
    }
    let m = (n - 1) as f64;
    (0..n)
        .map(|i| {
            let x = i as f64 / m;
            0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Spectrum
// ---------------------------------------------------------------------------

/// One-sided amplitude spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// rFFT bin frequencies, Hz.
    pub frequencies: Vec<f64>,
    /// Magnitudes, same length as `frequencies`.
    pub amplitudes: Vec<f64>,
}

impl Spectrum {
    /// `20·log10(a)`, shifted so the maximum is 0 dB. Zero amplitudes map
    /// to `-inf`.
    pub fn to_db(&self) -> Vec<f64> {
        let db: Vec<f64> = self.amplitudes.iter().map(|&a| 20.0 * a.log10()).collect();
        let max = db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max.is_finite() {
            db.iter().map(|&v| v - max).collect()
        } else {
            db
        }
    }

    /// Frequency of the largest amplitude; ties go to the lowest bin.
    pub fn peak_frequency(&self) -> Option<f64> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &a) in self.amplitudes.iter().enumerate() {
            if a.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, b)| a > b) {
                best = Some((i, a));
            }
        }
        best.map(|(i, _)| self.frequencies[i])
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Frequency at a fractional bin index, interpolated linearly between
    /// the neighbouring bins.
    fn frequency_at(&self, bin: f64) -> f64 {
        let last = self.frequencies.len() - 1;
        let lo = (bin.floor().max(0.0) as usize).min(last);
        let hi = (lo + 1).min(last);
        let t = (bin - lo as f64).clamp(0.0, 1.0);
        self.frequencies[lo] + t * (self.frequencies[hi] - self.frequencies[lo])
    }
}

/// Windowed rFFT for traces of one fixed length.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn RealToComplex<f64>>,
    window: Vec<f64>,
    frequencies: Vec<f64>,
}

impl SpectrumAnalyzer {
    pub fn new(nsamples: usize, sample_rate: f64) -> Result<Self> {
        if nsamples == 0 {
            return Err(SeismicError::InvalidInput("trace has no samples".into()));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(SeismicError::InvalidInput(format!(
                "sample rate must be finite and > 0, got {sample_rate}"
            )));
        }
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nsamples);
        let frequencies = (0..nsamples / 2 + 1)
            .map(|k| k as f64 * sample_rate / nsamples as f64)
            .collect();
        Ok(Self {
            fft,
            window: blackman(nsamples),
            frequencies,
        })
    }

    pub fn nsamples(&self) -> usize {
        self.window.len()
    }

    /// rFFT bin frequencies, Hz.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn analyze(&self, trace: ArrayView1<'_, f64>) -> Result<Spectrum> {
        if trace.len() != self.window.len() {
            return Err(SeismicError::InvalidInput(format!(
                "trace has {} samples, analyzer expects {}",
                trace.len(),
                self.window.len()
            )));
        }
        let mut input = self.fft.make_input_vec();
        let mut output = self.fft.make_output_vec();
        for (slot, (&s, &w)) in input.iter_mut().zip(trace.iter().zip(self.window.iter())) {
            *slot = s * w;
        }
        self.fft
            .process(&mut input, &mut output)
            .map_err(|e| SeismicError::InvalidInput(format!("FFT failed: {e}")))?;

        Ok(Spectrum {
            frequencies: self.frequencies.clone(),
            amplitudes: output.iter().map(|c| c.norm()).collect(),
        })
    }
}

/// Amplitude spectrum of one trace sampled at `sample_rate` Hz.
pub fn spectrum(trace: &[f64], sample_rate: f64) -> Result<Spectrum> {
    SpectrumAnalyzer::new(trace.len(), sample_rate)?.analyze(ArrayView1::from(trace))
}

// ---------------------------------------------------------------------------
// Bandwidth
// ---------------------------------------------------------------------------

/// Fractional bin indices where `shifted` crosses zero.
///
/// A rising crossing goes from `< 0` to `>= 0`; with [`EdgeDetection::Both`]
/// falling crossings are kept as well. The position is interpolated
/// linearly between the two bracketing samples.
pub fn threshold_crossings(shifted: &[f64], edges: EdgeDetection) -> Vec<f64> {
    shifted
        .windows(2)
        .enumerate()
        .filter_map(|(z, w)| {
            let (a, b) = (w[0], w[1]);
            let rising = a < 0.0 && b >= 0.0;
            let falling = edges == EdgeDetection::Both && a >= 0.0 && b < 0.0;
            if !(rising || falling) {
                return None;
            }
            let z = z as f64;
            Some(if a.is_finite() && b.is_finite() {
                z - a / (b - a)
            } else if rising {
                z + 1.0
            } else {
                z
            })
        })
        .collect()
}

/// `(f_min, f_max)`: the lowest and highest frequencies where the spectrum
/// crosses `threshold_db` below its peak.
///
/// A spectrum with no crossings (flat, silent) is
/// [`SeismicError::EmptyBandwidth`].
pub fn bandwidth(spectrum: &Spectrum, options: &SpectrumOptions) -> Result<(f64, f64)> {
    if spectrum.len() < 2 {
        return Err(SeismicError::EmptyBandwidth);
    }
    let db = spectrum.to_db();
    if !db.iter().any(|v| v.is_finite()) {
        return Err(SeismicError::EmptyBandwidth);
    }
    let shifted: Vec<f64> = db.iter().map(|&v| v + options.threshold_db).collect();

    let crossings = threshold_crossings(&shifted, options.edges);
    if crossings.is_empty() {
        return Err(SeismicError::EmptyBandwidth);
    }
    let lo = crossings.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = crossings.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok((spectrum.frequency_at(lo), spectrum.frequency_at(hi)))
}

// ---------------------------------------------------------------------------
// Ensemble estimate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthEstimate {
    pub f_min: f64,
    pub f_peak: f64,
    pub f_max: f64,
}

impl fmt::Display for BandwidthEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Min: {:.2} Hz\nPeak: {:.2} Hz\nMax: {:.2} Hz",
            self.f_min, self.f_peak, self.f_max
        )
    }
}

/// Averaged spectrum of a set of traces plus their bandwidth envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleEstimate {
    /// Mean amplitude spectrum.
    pub spectrum: Spectrum,
    /// `spectrum` in dB, 0 dB at its maximum.
    pub db: Vec<f64>,
    pub bandwidth: BandwidthEstimate,
    /// Traces analysed.
    pub ntraces: usize,
    /// Traces with no threshold crossing, left out of the envelope.
    pub without_crossings: usize,
}

/// Ensemble spectrum of `traces`, shaped `(ntraces, nsamples)`.
///
/// Amplitudes are averaged across traces for the displayed curve. `f_min`
/// and `f_max` are the envelope of the per-trace crossings, not crossings of
/// the mean curve, and the peak is the mean of the per-trace peaks over the
/// same traces. Traces with no crossing only contribute to the mean curve.
pub fn estimate(
    traces: ArrayView2<'_, f64>,
    sample_rate: f64,
    options: &SpectrumOptions,
) -> Result<EnsembleEstimate> {
    let (ntraces, nsamples) = traces.dim();
    if ntraces == 0 {
        return Err(SeismicError::InvalidInput("no traces to analyse".into()));
    }
    let analyzer = SpectrumAnalyzer::new(nsamples, sample_rate)?;

    let mut sum = vec![0.0; analyzer.frequencies().len()];
    let mut peaks = 0.0;
    let mut f_min = f64::INFINITY;
    let mut f_max = f64::NEG_INFINITY;
    let mut without_crossings = 0;

    for trace in traces.rows() {
        let spec = analyzer.analyze(trace)?;
        for (acc, &a) in sum.iter_mut().zip(spec.amplitudes.iter()) {
            *acc += a;
        }

        match bandwidth(&spec, options) {
            Ok((lo, hi)) => {
                f_min = f_min.min(lo);
                f_max = f_max.max(hi);
                peaks += spec.peak_frequency().unwrap_or(0.0);
            }
            Err(SeismicError::EmptyBandwidth) => without_crossings += 1,
            Err(e) => return Err(e),
        }
    }

    if without_crossings == ntraces {
        return Err(SeismicError::EmptyBandwidth);
    }
    if without_crossings > 0 {
        log::debug!("{without_crossings} of {ntraces} traces have no threshold crossing");
    }

    let spectrum = Spectrum {
        frequencies: analyzer.frequencies().to_vec(),
        amplitudes: sum.iter().map(|s| s / ntraces as f64).collect(),
    };
    let db = spectrum.to_db();
    Ok(EnsembleEstimate {
        spectrum,
        db,
        bandwidth: BandwidthEstimate {
            f_min,
            f_peak: peaks / (ntraces - without_crossings) as f64,
            f_max,
        },
        ntraces,
        without_crossings,
    })
}

/// `n` evenly spaced, distinct trace indices out of `total`.
pub fn select_trace_indices(total: usize, n: usize) -> Vec<usize> {
    if n >= total {
        return (0..total).collect();
    }
    (0..n).map(|i| (2 * i + 1) * total / (2 * n)).collect()
}
