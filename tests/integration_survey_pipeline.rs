//! Integration tests for the trace-source → geometry → model → spectrum
//! pipeline.
//!
//! Coverage
//! --------
//! - `data::source` / `data::loader`: trace tables built in memory and read
//!   back from JSON on disk.
//! - `geometry`: sawtooth/stairstep headers resolved into a 3D grid,
//!   monotonic CDP numbers into a 2D line, and mismatched trace counts.
//! - `data::model::Seismic`: construction from a source, caller hints that
//!   lose to the data, line slicing and trace-order round trips.
//! - `spectral`: ensemble bandwidth of band-limited synthetic traces.
//!
//! Exclusions
//! ----------
//! - Per-predicate classification edge cases and the threshold-crossing
//!   arithmetic; those are covered by unit tests.
use std::f64::consts::PI;
use std::io::Write;

use ndarray::Array2;
use seisplot::{
    load_file, Adjustment, Direction, HeaderValue, Pattern, Seismic, SeismicError,
    SeismicParams, SpectrumOptions, TraceSource, TraceTable,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Traces in acquisition order for an `ninlines × nxlines` grid. Each trace
/// is a sum of two sinusoids so that its spectrum has a clear band.
fn survey(ninlines: usize, nxlines: usize, nsamples: usize, fs: f64) -> TraceTable {
    let ntraces = ninlines * nxlines;
    let samples = Array2::from_shape_fn((ntraces, nsamples), |(t, s)| {
        let time = s as f64 / fs;
        (2.0 * PI * 25.0 * time).sin() + 0.5 * (2.0 * PI * (40.0 + t as f64 % 5.0) * time).sin()
    });
    let inlines: Vec<i64> = (0..ntraces).map(|i| 500 + (i / nxlines) as i64).collect();
    let xlines: Vec<i64> = (0..ntraces).map(|i| 1 + (i % nxlines) as i64).collect();
    let elevation: Vec<HeaderValue> =
        (0..ntraces).map(|i| HeaderValue::Float(10.0 + i as f64)).collect();

    TraceTable::new(samples, 1e6 / fs)
        .with_int_header("inline", &inlines)
        .unwrap()
        .with_int_header("xline", &xlines)
        .unwrap()
        .with_header("elevation", elevation)
        .unwrap()
}

#[test]
fn grid_is_inferred_from_headers_alone() {
    init_logging();
    let table = survey(6, 8, 256, 500.0);
    let model = Seismic::from_source(&table, &SeismicParams::default()).unwrap();

    assert_eq!(model.shape(), &[6, 8, 256]);
    let geometry = model.geometry();
    assert_eq!(geometry.ninlines, 6);
    assert_eq!(geometry.nxlines, 8);
    assert_eq!(geometry.inlines.first(), Some(&500.0));
    assert_eq!(model.trace_range(Direction::Xline), Some((1.0, 8.0)));
    assert!((model.dt() - 0.002).abs() < 1e-12);
    assert_eq!(model.attributes["elevation"].len(), 48);
    assert!(model.adjustments().is_empty());
}

#[test]
fn flattening_recovers_source_trace_order() {
    let table = survey(4, 5, 64, 500.0);
    let model = Seismic::from_source(&table, &SeismicParams::default()).unwrap();
    assert_eq!(model.traces().unwrap(), table.samples());

    // Inline 2, crossline 3 is trace 2·5 + 3.
    let line = model.get_line(2usize, Direction::Inline).unwrap();
    assert_eq!(line.index_axis(ndarray::Axis(0), 3), table.samples().row(13).into_dyn());
}

#[test]
fn caller_counts_lose_to_the_data() {
    init_logging();
    let table = survey(3, 4, 32, 500.0);
    let params = SeismicParams {
        ninlines: Some(2),
        nxlines: Some(6),
        ..Default::default()
    };
    let model = Seismic::from_source(&table, &params).unwrap();
    assert_eq!(model.shape(), &[3, 4, 32]);
    assert!(model
        .adjustments()
        .contains(&Adjustment::Ninlines { requested: 2, resolved: 3 }));
    assert!(model
        .adjustments()
        .contains(&Adjustment::Nxlines { requested: 6, resolved: 4 }));
}

#[test]
fn monotonic_cdps_make_a_single_line() {
    let samples = Array2::from_elem((40, 16), 0.25);
    let cdps: Vec<i64> = (1001..1041).collect();
    let table = TraceTable::new(samples, 4000.0)
        .with_int_header("cdp", &cdps)
        .unwrap();
    let params = SeismicParams::from_json_str(r#"{ "headers": { "xline": "cdp" } }"#).unwrap();

    let model = Seismic::from_source(&table, &params).unwrap();
    assert_eq!(model.ndim(), 2);
    assert_eq!(model.geometry().nxlines, 40);
    assert_eq!(model.geometry().ninlines, 1);
    assert_eq!(model.trace_range(Direction::Xline), Some((1001.0, 1040.0)));
    // No 3D structure: any line request returns the whole section.
    assert_eq!(model.get_line(7usize, Direction::Inline).unwrap().shape(), &[40, 16]);
}

#[test]
fn ten_traces_on_a_three_by_three_grid_is_a_mismatch() {
    let samples = Array2::zeros((10, 8));
    let table = TraceTable::new(samples, 0.004)
        .with_int_header("xline", &[1, 2, 3, 1, 2, 3, 1, 2, 3, 1])
        .unwrap();
    let err = Seismic::from_source(&table, &SeismicParams::default()).unwrap_err();
    assert!(matches!(
        err,
        SeismicError::GeometryMismatch { ninlines: 3, nxlines: 3, ntraces: 10 }
    ));
}

#[test]
fn nine_trace_scenario() {
    let xl = [1, 2, 3, 1, 2, 3, 1, 2, 3];
    assert_eq!(
        seisplot::classify(&xl),
        Pattern::Sawtooth { min: 1, max: 3, period: 3 }
    );
    let table = TraceTable::new(Array2::zeros((9, 4)), 0.004)
        .with_int_header("xline", &xl)
        .unwrap();
    let model = Seismic::from_source(&table, &SeismicParams::default()).unwrap();
    assert_eq!(model.shape(), &[3, 3, 4]);
}

#[test]
fn ensemble_bandwidth_brackets_the_signal_band() {
    let fs = 500.0;
    let table = survey(5, 5, 512, fs);
    let mut params = SeismicParams::default();
    params.spectrum = SpectrumOptions {
        edges: seisplot::EdgeDetection::Both,
        ..Default::default()
    };
    let model = Seismic::from_source(&table, &params).unwrap();
    let est = model.estimate_bandwidth().unwrap();

    let bw = est.bandwidth;
    assert!(bw.f_min < 25.0, "{bw}");
    assert!(bw.f_max > 40.0, "{bw}");
    assert!(bw.f_max < fs / 2.0);
    assert!((bw.f_peak - 25.0).abs() <= fs / 512.0);
    assert_eq!(est.ntraces, 10);
    assert_eq!(est.spectrum.len(), 257);
}

#[test]
fn dead_edge_traces_leave_the_peak_inside_the_band() {
    let fs = 500.0;
    let live = survey(4, 4, 512, fs);
    let mut samples = live.samples().to_owned();
    for corner in [0, 3, 12, 15] {
        samples.row_mut(corner).fill(0.0);
    }
    let mut table = TraceTable::new(samples, 1e6 / fs);
    table.headers = live.headers.clone();

    let mut params = SeismicParams::default();
    params.spectrum.edges = seisplot::EdgeDetection::Both;
    params.spectrum.ntraces = 16;
    let model = Seismic::from_source(&table, &params).unwrap();
    let est = model.estimate_bandwidth().unwrap();

    let bw = est.bandwidth;
    assert_eq!(est.without_crossings, 4);
    assert!(bw.f_min <= bw.f_peak && bw.f_peak <= bw.f_max, "{bw}");
    assert!((bw.f_peak - 25.0).abs() <= fs / 512.0, "{bw}");
}

#[test]
fn silent_survey_reports_empty_bandwidth() {
    let table = TraceTable::new(Array2::zeros((4, 128)), 0.002)
        .with_int_header("xline", &[1, 2, 1, 2])
        .unwrap();
    let model = Seismic::from_source(&table, &SeismicParams::default()).unwrap();
    assert!(matches!(
        model.estimate_bandwidth(),
        Err(SeismicError::EmptyBandwidth)
    ));
}

#[test]
fn json_survey_loads_end_to_end() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("survey.json");
    let mut f = std::fs::File::create(&path).unwrap();
    let mut records = Vec::new();
    for il in 0..3 {
        for xl in 0..4 {
            let samples: Vec<f64> = (0..16).map(|s| ((il * 4 + xl) * 100 + s) as f64).collect();
            records.push(serde_json::json!({
                "samples": samples,
                "inline": 20 + il,
                "xline": 100 + xl,
                "dt": 4,
            }));
        }
    }
    write!(f, "{}", serde_json::Value::Array(records)).unwrap();
    drop(f);

    let table = load_file(&path).unwrap();
    let model = Seismic::from_source(&table, &SeismicParams::default()).unwrap();
    assert_eq!(model.shape(), &[3, 4, 16]);
    assert!((model.dt() - 0.004).abs() < 1e-12);
    assert_eq!(model.geometry().xlines, vec![100.0, 101.0, 102.0, 103.0]);
    let xl = model.xline(0.5).unwrap();
    assert_eq!(xl[[1, 0]], 600.0);
}
