use std::collections::BTreeMap;
use std::fmt;

use ndarray::{Array2, ArrayView2};

use crate::error::{Result, SeismicError};

// ---------------------------------------------------------------------------
// HeaderValue – one cell of a per-trace header column
// ---------------------------------------------------------------------------

/// A dynamically-typed trace header value.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Integer(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Integer(i) => write!(f, "{i}"),
            HeaderValue::Float(v) => write!(f, "{v:.4}"),
            HeaderValue::String(s) => write!(f, "{s}"),
            HeaderValue::Bool(b) => write!(f, "{b}"),
            HeaderValue::Null => write!(f, "<null>"),
        }
    }
}

impl HeaderValue {
    /// Integer view for line numbering. Floats must be whole.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(i) => Some(*i),
            HeaderValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(v) => Some(*v),
            HeaderValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// TraceSource – where samples and headers come from
// ---------------------------------------------------------------------------

/// Already-decoded traces and their headers.
pub trait TraceSource {
    /// Raw samples shaped `(ntraces, nsamples)`.
    fn samples(&self) -> ArrayView2<'_, f64>;

    /// Integer header sequence, one value per trace.
    fn header(&self, name: &str) -> Option<Vec<i64>>;

    /// Numeric per-trace attribute (elevation, fold, ...).
    fn attribute(&self, name: &str) -> Option<Vec<f64>>;

    /// Sample interval in seconds.
    fn sample_interval(&self) -> f64;

    fn start_time(&self) -> f64 {
        0.0
    }

    fn textual_header(&self) -> Option<&str> {
        None
    }
}

/// Scale a sample interval by 0.001 until it is at most 20 ms, turning
/// microseconds or milliseconds into seconds.
pub fn normalize_sample_interval(dt: f64) -> f64 {
    let mut dt = dt;
    if !(dt.is_finite() && dt > 0.0) {
        return dt;
    }
    while dt > 0.02 {
        dt *= 0.001;
    }
    dt
}

/// Lay a card-image textual header out as 80-column lines (40 of them for
/// the usual 3200 characters).
pub fn format_textual_header(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    chars
        .chunks(80)
        .map(|line| line.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// TraceTable – in-memory trace source
// ---------------------------------------------------------------------------

/// Sample matrix plus named header columns.
#[derive(Debug, Clone)]
pub struct TraceTable {
    samples: Array2<f64>,
    /// Header column name → one value per trace.
    pub headers: BTreeMap<String, Vec<HeaderValue>>,
    /// Sample interval in seconds.
    pub dt: f64,
    pub tstart: f64,
    pub textual_header: Option<String>,
}

impl TraceTable {
    /// `dt` may be given in seconds, milliseconds or microseconds.
    pub fn new(samples: Array2<f64>, dt: f64) -> Self {
        Self {
            samples,
            headers: BTreeMap::new(),
            dt: normalize_sample_interval(dt),
            tstart: 0.0,
            textual_header: None,
        }
    }

    /// Build from one sample vector per trace; all must have equal length.
    pub fn from_traces(traces: Vec<Vec<f64>>, dt: f64) -> Result<Self> {
        let ntraces = traces.len();
        let nsamples = traces.first().map_or(0, Vec::len);
        if let Some((i, t)) = traces.iter().enumerate().find(|(_, t)| t.len() != nsamples) {
            return Err(SeismicError::Source(format!(
                "trace {i} has {} samples, expected {nsamples}",
                t.len()
            )));
        }
        let flat: Vec<f64> = traces.into_iter().flatten().collect();
        let samples = Array2::from_shape_vec((ntraces, nsamples), flat)?;
        Ok(Self::new(samples, dt))
    }

    /// Add a header column; it must have one value per trace.
    pub fn with_header(mut self, name: &str, values: Vec<HeaderValue>) -> Result<Self> {
        if values.len() != self.samples.nrows() {
            return Err(SeismicError::Source(format!(
                "header '{name}' has {} values for {} traces",
                values.len(),
                self.samples.nrows()
            )));
        }
        self.headers.insert(name.to_string(), values);
        Ok(self)
    }

    /// Convenience for integer header columns.
    pub fn with_int_header(self, name: &str, values: &[i64]) -> Result<Self> {
        self.with_header(name, values.iter().map(|&v| HeaderValue::Integer(v)).collect())
    }

    pub fn ntraces(&self) -> usize {
        self.samples.nrows()
    }

    pub fn nsamples(&self) -> usize {
        self.samples.ncols()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.headers.keys().map(String::as_str).collect()
    }
}

impl TraceSource for TraceTable {
    fn samples(&self) -> ArrayView2<'_, f64> {
        self.samples.view()
    }

    /// `None` when the column is missing or any value is not a whole number.
    fn header(&self, name: &str) -> Option<Vec<i64>> {
        self.headers.get(name)?.iter().map(HeaderValue::as_i64).collect()
    }

    fn attribute(&self, name: &str) -> Option<Vec<f64>> {
        self.headers.get(name)?.iter().map(HeaderValue::as_f64).collect()
    }

    fn sample_interval(&self) -> f64 {
        self.dt
    }

    fn start_time(&self) -> f64 {
        self.tstart
    }

    fn textual_header(&self) -> Option<&str> {
        self.textual_header.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_interval_is_normalised_to_seconds() {
        assert!((normalize_sample_interval(4000.0) - 0.004).abs() < 1e-12);
        assert!((normalize_sample_interval(2.0) - 0.002).abs() < 1e-12);
        assert_eq!(normalize_sample_interval(0.001), 0.001);
    }

    #[test]
    fn textual_header_is_laid_out_in_card_images() {
        let raw: String = (0..40).map(|i| format!("C{:02}{}", i + 1, " ".repeat(77))).collect();
        assert_eq!(raw.len(), 3200);
        let text = format_textual_header(&raw);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 40);
        assert!(lines[0].starts_with("C01"));
        assert!(lines[39].starts_with("C40"));
        assert!(lines.iter().all(|l| l.chars().count() == 80));
    }

    #[test]
    fn ragged_traces_are_rejected() {
        let err = TraceTable::from_traces(vec![vec![0.0; 4], vec![0.0; 3]], 0.004).unwrap_err();
        assert!(matches!(err, SeismicError::Source(_)));
    }

    #[test]
    fn headers_read_back_as_integers() {
        let table = TraceTable::from_traces(vec![vec![0.0; 2]; 3], 4.0)
            .unwrap()
            .with_header(
                "xline",
                vec![HeaderValue::Integer(1), HeaderValue::Float(2.0), HeaderValue::Integer(3)],
            )
            .unwrap()
            .with_header("note", vec![HeaderValue::String("a".into()); 3])
            .unwrap();
        assert_eq!(table.header("xline"), Some(vec![1, 2, 3]));
        assert_eq!(table.header("note"), None);
        assert_eq!(table.header("missing"), None);
        assert!((table.sample_interval() - 0.004).abs() < 1e-12);
    }

    #[test]
    fn header_length_must_match_trace_count() {
        let table = TraceTable::from_traces(vec![vec![0.0; 2]; 3], 0.004).unwrap();
        assert!(table.with_int_header("xline", &[1, 2]).is_err());
    }
}
