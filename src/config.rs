use serde::Deserialize;

use crate::error::{Result, SeismicError};

// ---------------------------------------------------------------------------
// Header keys
// ---------------------------------------------------------------------------

/// Names of the per-trace header columns read from a trace source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeaderKeys {
    /// Crossline-like header (sawtooth in a 3D, monotonic in a 2D).
    pub xline: String,
    /// Inline-like header (stairstep in a 3D).
    pub inline: String,
    /// Extra per-trace attributes copied verbatim into the model.
    pub extra: Vec<String>,
}

impl Default for HeaderKeys {
    fn default() -> Self {
        Self {
            xline: "xline".to_string(),
            inline: "inline".to_string(),
            extra: vec![
                "elevation".to_string(),
                "fold".to_string(),
                "water_depth".to_string(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum options
// ---------------------------------------------------------------------------

/// Which threshold crossings count as bandwidth edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDetection {
    /// Only rising crossings (below threshold → at/above threshold).
    #[default]
    Rising,
    /// Rising and falling crossings.
    Both,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpectrumOptions {
    /// The bandwidth threshold sits this many dB below the spectral peak.
    pub threshold_db: f64,
    /// Number of traces sampled for an ensemble estimate.
    pub ntraces: usize,
    pub edges: EdgeDetection,
}

impl Default for SpectrumOptions {
    fn default() -> Self {
        Self {
            threshold_db: 20.0,
            ntraces: 10,
            edges: EdgeDetection::Rising,
        }
    }
}

// ---------------------------------------------------------------------------
// Wiggle options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WiggleOptions {
    /// 1 = every trace, 2 = every second trace, ...
    pub skip: usize,
    /// Percentile of the line amplitudes used as the normalisation factor.
    pub perc: f64,
    pub gain: f64,
    /// Time-axis oversampling factor for smooth curves.
    pub oversample: usize,
}

impl Default for WiggleOptions {
    fn default() -> Self {
        Self {
            skip: 1,
            perc: 99.0,
            gain: 1.0,
            oversample: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Model parameters
// ---------------------------------------------------------------------------

/// Every recognised construction option and its default.
///
/// Counts and coordinate arrays are hints: when the data implies something
/// else, the data wins and the change is reported as an adjustment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeismicParams {
    /// Free-text (EBCDIC-style) file header.
    pub header: String,
    pub ninlines: Option<usize>,
    pub nxlines: Option<usize>,
    pub nsamples: Option<usize>,
    pub inlines: Option<Vec<f64>>,
    pub xlines: Option<Vec<f64>>,
    /// Sample interval in seconds. Taken from the trace source when absent.
    pub dt: Option<f64>,
    /// Time of the first sample, in seconds. Taken from the trace source
    /// when absent, else 0.
    pub tstart: Option<f64>,
    pub headers: HeaderKeys,
    pub spectrum: SpectrumOptions,
    pub wiggle: WiggleOptions,
}

impl Default for SeismicParams {
    fn default() -> Self {
        Self {
            header: String::new(),
            ninlines: None,
            nxlines: None,
            nsamples: None,
            inlines: None,
            xlines: None,
            dt: None,
            tstart: None,
            headers: HeaderKeys::default(),
            spectrum: SpectrumOptions::default(),
            wiggle: WiggleOptions::default(),
        }
    }
}

impl SeismicParams {
    /// Parse parameters from JSON; missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let params: SeismicParams = serde_json::from_str(text)
            .map_err(|e| SeismicError::InvalidInput(format!("parameters: {e}")))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(dt) = self.dt {
            if !(dt.is_finite() && dt > 0.0) {
                return Err(SeismicError::InvalidInput(format!(
                    "dt must be finite and > 0, got {dt}"
                )));
            }
        }
        if self.tstart.is_some_and(|t| !t.is_finite()) {
            return Err(SeismicError::InvalidInput("tstart must be finite".into()));
        }
        if !(0.0..=100.0).contains(&self.wiggle.perc) {
            return Err(SeismicError::InvalidInput(format!(
                "wiggle percentile must lie in [0, 100], got {}",
                self.wiggle.perc
            )));
        }
        if self.wiggle.skip == 0 || self.wiggle.oversample == 0 {
            return Err(SeismicError::InvalidInput(
                "wiggle skip and oversample must be >= 1".into(),
            ));
        }
        if !(self.spectrum.threshold_db.is_finite() && self.spectrum.threshold_db > 0.0) {
            return Err(SeismicError::InvalidInput(format!(
                "threshold_db must be finite and > 0, got {}",
                self.spectrum.threshold_db
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() {
        let params = SeismicParams::from_json_str("{}").unwrap();
        assert_eq!(params, SeismicParams::default());
        assert_eq!(params.headers.xline, "xline");
        assert_eq!(params.spectrum.threshold_db, 20.0);
        assert_eq!(params.spectrum.edges, EdgeDetection::Rising);
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let text = r#"{
            "dt": 0.004,
            "nxlines": 120,
            "headers": { "xline": "cdp" },
            "spectrum": { "edges": "both" }
        }"#;
        let params = SeismicParams::from_json_str(text).unwrap();
        assert_eq!(params.dt, Some(0.004));
        assert_eq!(params.nxlines, Some(120));
        assert_eq!(params.headers.xline, "cdp");
        assert_eq!(params.headers.inline, "inline");
        assert_eq!(params.spectrum.edges, EdgeDetection::Both);
        assert_eq!(params.spectrum.ntraces, 10);
    }

    #[test]
    fn non_positive_dt_is_rejected() {
        let err = SeismicParams::from_json_str(r#"{ "dt": 0.0 }"#).unwrap_err();
        assert!(matches!(err, SeismicError::InvalidInput(_)));
    }
}
