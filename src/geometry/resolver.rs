use std::fmt;

use super::pattern::{is_monotonic, is_sawtooth, is_stairstep, Pattern};
use crate::error::{Result, SeismicError};

// ---------------------------------------------------------------------------
// VolumeGeometry
// ---------------------------------------------------------------------------

/// Survey grid implied by the trace headers.
///
/// `nxlines == 0` means the crossline axis is unresolved and the data is
/// treated as a single 2D line.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGeometry {
    pub ninlines: usize,
    pub nxlines: usize,
    pub nsamples: usize,
    pub inlines: Vec<f64>,
    pub xlines: Vec<f64>,
}

impl VolumeGeometry {
    /// A single line of `ntraces` traces, no 3D structure.
    pub fn line(ntraces: usize, nsamples: usize) -> Self {
        Self {
            ninlines: 1,
            nxlines: ntraces,
            nsamples,
            inlines: consecutive(1),
            xlines: consecutive(ntraces),
        }
    }

    /// Whether both axes are resolved into a grid with more than one inline.
    pub fn is_3d(&self) -> bool {
        self.ninlines > 1 && self.nxlines > 0
    }
}

/// Whether an `ninlines × nxlines` grid holds exactly `ntraces` traces.
pub(crate) fn fills_grid(ninlines: usize, nxlines: usize, ntraces: usize) -> bool {
    ninlines > 0 && ninlines.checked_mul(nxlines) == Some(ntraces)
}

/// `1.0, 2.0, ..., n`.
pub fn consecutive(n: usize) -> Vec<f64> {
    (1..=n).map(|i| i as f64).collect()
}

// ---------------------------------------------------------------------------
// Adjustments – caller hints overridden by data
// ---------------------------------------------------------------------------

/// A caller-supplied value replaced by one that matches the data.
#[derive(Debug, Clone, PartialEq)]
pub enum Adjustment {
    Ninlines { requested: usize, resolved: usize },
    Nxlines { requested: usize, resolved: usize },
    Nsamples { requested: usize, resolved: usize },
    /// Supplied coordinates had the wrong length and were replaced.
    Coordinates { axis: &'static str, requested: usize, resolved: usize },
}

impl fmt::Display for Adjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjustment::Ninlines { requested, resolved } => {
                write!(f, "ninlines changed from {requested} to {resolved} to match data")
            }
            Adjustment::Nxlines { requested, resolved } => {
                write!(f, "nxlines changed from {requested} to {resolved} to match data")
            }
            Adjustment::Nsamples { requested, resolved } => {
                write!(f, "number of time samples changed from {requested} to {resolved} to match data")
            }
            Adjustment::Coordinates { axis, requested, resolved } => {
                write!(f, "{axis} coordinates replaced: {requested} supplied, {resolved} lines")
            }
        }
    }
}

/// Record an adjustment and log it.
pub(crate) fn adjust(adjustments: &mut Vec<Adjustment>, adjustment: Adjustment) {
    log::info!("{adjustment}");
    adjustments.push(adjustment);
}

// ---------------------------------------------------------------------------
// GeometryResolver
// ---------------------------------------------------------------------------

/// Caller-supplied geometry. Every field is optional and loses to the data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryHints {
    pub ninlines: Option<usize>,
    pub nxlines: Option<usize>,
    pub inlines: Option<Vec<f64>>,
    pub xlines: Option<Vec<f64>>,
}

/// Result of a resolve: the geometry plus how it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub geometry: VolumeGeometry,
    pub xline_pattern: Pattern,
    pub inline_pattern: Pattern,
    pub adjustments: Vec<Adjustment>,
}

#[derive(Debug, Clone, Default)]
pub struct GeometryResolver {
    hints: GeometryHints,
    nsamples: usize,
}

impl GeometryResolver {
    pub fn new(hints: GeometryHints) -> Self {
        Self { hints, nsamples: 0 }
    }

    /// Number of samples per trace recorded in the resolved geometry.
    pub fn with_nsamples(mut self, nsamples: usize) -> Self {
        self.nsamples = nsamples;
        self
    }

    /// Infer the survey grid from the crossline header sequence and, for a
    /// 3D survey, the inline header sequence.
    ///
    /// The crossline axis is tried as a sawtooth (3D) then as monotonic
    /// (2D). Line counts come from the header range, `max - min + 1`. The
    /// inline axis is only looked at when the crosslines are a sawtooth.
    ///
    /// Counts read from the headers are never rewritten; a 3D grid whose
    /// counts cannot account for every trace is a
    /// [`SeismicError::GeometryMismatch`]. Caller hints lose to the headers.
    pub fn resolve(
        &self,
        xline_headers: &[i64],
        inline_headers: Option<&[i64]>,
        total_traces: usize,
    ) -> Result<Resolution> {
        let mut adjustments = Vec::new();

        let (xline_pattern, threed) = match is_sawtooth(xline_headers) {
            Some(p) => (p, true),
            None => (is_monotonic(xline_headers).unwrap_or(Pattern::None), false),
        };
        if xline_pattern.is_none() && !xline_headers.is_empty() {
            log::warn!(
                "{}",
                SeismicError::PatternUndetected { header: "xline".into() }
            );
        }

        let inline_pattern = match (threed, inline_headers) {
            (true, Some(seq)) => is_stairstep(seq).unwrap_or(Pattern::None),
            _ => Pattern::None,
        };
        if threed && inline_pattern.is_none() && inline_headers.is_some() {
            log::warn!(
                "{}",
                SeismicError::PatternUndetected { header: "inline".into() }
            );
        }

        let mismatch = |ninlines, nxlines| SeismicError::GeometryMismatch {
            ninlines,
            nxlines,
            ntraces: total_traces,
        };

        let (ninlines, nxlines) = match (xline_pattern.line_count(), inline_pattern.line_count()) {
            // Both counts from the headers: the grid must hold every trace.
            (Some(nx), Some(ni)) => {
                self.note_conflict(&mut adjustments, self.hints.nxlines, nx, true);
                self.note_conflict(&mut adjustments, self.hints.ninlines, ni, false);
                if !fills_grid(ni, nx, total_traces) {
                    return Err(mismatch(ni, nx));
                }
                (ni, nx)
            }
            // Crosslines from a sawtooth: inlines follow from the trace count.
            (Some(nx), None) if threed => {
                self.note_conflict(&mut adjustments, self.hints.nxlines, nx, true);
                let ni = total_traces / nx;
                if !fills_grid(ni, nx, total_traces) {
                    return Err(mismatch(ni, nx));
                }
                self.note_conflict(&mut adjustments, self.hints.ninlines, ni, false);
                (ni, nx)
            }
            // Monotonic crosslines: one line.
            (Some(nx), None) => {
                self.note_conflict(&mut adjustments, self.hints.nxlines, nx, true);
                self.note_conflict(&mut adjustments, self.hints.ninlines, 1, false);
                (1, nx)
            }
            // No crossline pattern: fit the caller's crossline count to the
            // requested inline count.
            (None, _) => {
                let nx = self.hints.nxlines.unwrap_or(0);
                match self.hints.ninlines {
                    Some(ni) if ni > 1 => {
                        if ni > total_traces || total_traces % ni != 0 {
                            return Err(mismatch(ni, total_traces / ni));
                        }
                        let resolved = total_traces / ni;
                        if nx > 0 && nx != resolved {
                            adjust(&mut adjustments, Adjustment::Nxlines { requested: nx, resolved });
                        }
                        (ni, resolved)
                    }
                    _ => (1, nx),
                }
            }
        };

        let xlines = self.coordinates(
            &mut adjustments,
            "xline",
            self.hints.xlines.as_ref(),
            xline_pattern.range(),
            nxlines,
        );
        let inlines = self.coordinates(
            &mut adjustments,
            "inline",
            self.hints.inlines.as_ref(),
            inline_pattern.range(),
            ninlines,
        );

        Ok(Resolution {
            geometry: VolumeGeometry {
                ninlines,
                nxlines,
                nsamples: self.nsamples,
                inlines,
                xlines,
            },
            xline_pattern,
            inline_pattern,
            adjustments,
        })
    }

    fn note_conflict(
        &self,
        adjustments: &mut Vec<Adjustment>,
        requested: Option<usize>,
        resolved: usize,
        xline: bool,
    ) {
        match requested {
            Some(requested) if requested != resolved => {
                let adjustment = if xline {
                    Adjustment::Nxlines { requested, resolved }
                } else {
                    Adjustment::Ninlines { requested, resolved }
                };
                adjust(adjustments, adjustment);
            }
            _ => {}
        }
    }

    /// Supplied coordinates if they fit, else the header range if it fits,
    /// else `1..=n`.
    fn coordinates(
        &self,
        adjustments: &mut Vec<Adjustment>,
        axis: &'static str,
        supplied: Option<&Vec<f64>>,
        range: Option<(i64, i64)>,
        n: usize,
    ) -> Vec<f64> {
        if let Some(coords) = supplied {
            if coords.len() == n {
                return coords.clone();
            }
            adjust(
                adjustments,
                Adjustment::Coordinates { axis, requested: coords.len(), resolved: n },
            );
        }
        match range {
            Some((min, max)) if (max.abs_diff(min) as usize).saturating_add(1) == n => {
                (min..=max).map(|v| v as f64).collect()
            }
            _ => consecutive(n),
        }
    }
}
