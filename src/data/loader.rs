use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    LargeListArray, ListArray, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::source::{HeaderValue, TraceTable};

/// Column holding the trace samples.
pub const SAMPLES_COLUMN: &str = "samples";
/// Optional column holding the sample interval (s, ms or µs).
pub const DT_COLUMN: &str = "dt";

type HeaderRow = BTreeMap<String, HeaderValue>;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a trace table from a file.  Dispatch by extension.
///
/// Every format stores one trace per row: a `samples` column with the
/// amplitudes and any number of header columns (`inline`, `xline`, `dt`,
/// `elevation`, ...).
///
/// Supported formats:
/// * `.parquet` – `samples` as a List<Float64/Float32> column
/// * `.json`    – `[{ "samples": [...], "xline": 1, ... }, ...]`
/// * `.csv`     – `samples` column containing semicolon-separated floats
pub fn load_file(path: &Path) -> Result<TraceTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} traces × {} samples with headers {:?}",
        table.ntraces(),
        table.nsamples(),
        table.column_names()
    );
    Ok(table)
}

/// Assemble rows into a table. Headers missing from a row become `Null`.
fn build_table(traces: Vec<Vec<f64>>, rows: Vec<HeaderRow>) -> Result<TraceTable> {
    let dt = rows
        .iter()
        .find_map(|r| r.get(DT_COLUMN).and_then(HeaderValue::as_f64))
        .unwrap_or(0.0);
    if dt == 0.0 {
        log::warn!("no '{DT_COLUMN}' column; the sample interval must be supplied separately");
    }

    let columns: BTreeSet<String> = rows.iter().flat_map(|r| r.keys().cloned()).collect();
    let mut table = TraceTable::from_traces(traces, dt)?;
    for col in columns {
        let values = rows
            .iter()
            .map(|r| r.get(&col).cloned().unwrap_or(HeaderValue::Null))
            .collect();
        table = table.with_header(&col, values)?;
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented):
///
/// ```json
/// [
///   { "samples": [0.0, 0.12, ...], "inline": 100, "xline": 1, "dt": 4000 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<TraceTable> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut traces = Vec::with_capacity(records.len());
    let mut rows = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        traces.push(json_array_to_f64(obj.get(SAMPLES_COLUMN), i)?);

        let row: HeaderRow = obj
            .iter()
            .filter(|(key, _)| key.as_str() != SAMPLES_COLUMN)
            .map(|(key, val)| (key.clone(), json_to_header(val)))
            .collect();
        rows.push(row);
    }

    build_table(traces, rows)
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{SAMPLES_COLUMN}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {SAMPLES_COLUMN}[{j}]: not a number"))
        })
        .collect()
}

fn json_to_header(val: &JsonValue) -> HeaderValue {
    match val {
        JsonValue::String(s) => HeaderValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                HeaderValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                HeaderValue::Float(f)
            } else {
                HeaderValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => HeaderValue::Bool(*b),
        JsonValue::Null => HeaderValue::Null,
        other => HeaderValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names.
/// The `samples` column contains semicolon-separated floats:
///   `"0.0;0.12;-0.4"`
/// All other columns are trace headers.
fn load_csv(path: &Path) -> Result<TraceTable> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let samples_idx = headers
        .iter()
        .position(|h| h == SAMPLES_COLUMN)
        .with_context(|| format!("CSV missing '{SAMPLES_COLUMN}' column"))?;

    let mut traces = Vec::new();
    let mut rows = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        traces.push(parse_semicolon_floats(
            record.get(samples_idx).unwrap_or(""),
            row_no,
        )?);

        let row: HeaderRow = record
            .iter()
            .enumerate()
            .filter(|(col_idx, _)| *col_idx != samples_idx)
            .map(|(col_idx, value)| (headers[col_idx].clone(), guess_header_type(value)))
            .collect();
        rows.push(row);
    }

    build_table(traces, rows)
}

fn parse_semicolon_floats(s: &str, row: usize) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim().parse::<f64>().with_context(|| {
                format!("Row {row}, {SAMPLES_COLUMN}[{j}]: '{tok}' is not a number")
            })
        })
        .collect()
}

fn guess_header_type(s: &str) -> HeaderValue {
    if s.is_empty() {
        return HeaderValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return HeaderValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return HeaderValue::Float(f);
    }
    if s == "true" || s == "false" {
        return HeaderValue::Bool(s == "true");
    }
    HeaderValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing one trace per row.
///
/// Expected schema:
/// - `samples`: List<Float64> or LargeList<Float64> (Float32 inner accepted)
/// - Any other columns are trace headers (ints, floats, strings, bools)
fn load_parquet(path: &Path) -> Result<TraceTable> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut traces = Vec::new();
    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let samples_idx = schema
            .index_of(SAMPLES_COLUMN)
            .map_err(|_| anyhow::anyhow!("Parquet file missing '{SAMPLES_COLUMN}' column"))?;
        let samples_col = batch.column(samples_idx);

        let header_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != samples_idx)
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..batch.num_rows() {
            traces.push(
                extract_f64_list(samples_col, row)
                    .with_context(|| format!("Row {row}: failed to read '{SAMPLES_COLUMN}'"))?,
            );

            let header_row: HeaderRow = header_cols
                .iter()
                .map(|(col_idx, name)| {
                    (name.clone(), extract_header_value(batch.column(*col_idx), row))
                })
                .collect();
            rows.push(header_row);
        }
    }

    build_table(traces, rows)
}

// -- Parquet / Arrow helpers --

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    if let Some(f64_arr) = values_array.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values_array.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.unwrap_or(f32::NAN) as f64).collect())
    } else {
        bail!(
            "List inner type is {:?}, expected Float64 or Float32",
            values_array.data_type()
        )
    }
}

/// Extract a single header value from an Arrow column at a given row.
fn extract_header_value(col: &Arc<dyn Array>, row: usize) -> HeaderValue {
    if col.is_null(row) {
        return HeaderValue::Null;
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| HeaderValue::String(s.value(row).to_string())),
        DataType::LargeUtf8 => Some(HeaderValue::String(
            col.as_string::<i64>().value(row).to_string(),
        )),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| HeaderValue::Integer(a.value(row) as i64)),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| HeaderValue::Integer(a.value(row))),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| HeaderValue::Float(a.value(row) as f64)),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| HeaderValue::Float(a.value(row))),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| HeaderValue::Bool(a.value(row))),
        other => Some(HeaderValue::String(format!("{other:?}"))),
    };
    value.unwrap_or(HeaderValue::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::TraceSource;
    use std::io::Write;

    #[test]
    fn json_records_become_a_trace_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("line.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"[
                {{"samples": [0.0, 1.0, 0.5], "xline": 1, "dt": 4000, "fold": 12.5}},
                {{"samples": [0.1, 0.9, 0.4], "xline": 2, "dt": 4000}}
            ]"#
        )
        .unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.ntraces(), 2);
        assert_eq!(table.nsamples(), 3);
        assert_eq!(table.header("xline"), Some(vec![1, 2]));
        assert!((table.sample_interval() - 0.004).abs() < 1e-12);
        assert_eq!(table.headers["fold"][1], HeaderValue::Null);
    }

    #[test]
    fn csv_samples_are_semicolon_separated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("line.csv");
        std::fs::write(
            &path,
            "inline,xline,samples\n10,1,0.0;1.0\n10,2,2.0;3.0\n11,1,4.0;5.0\n",
        )
        .unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.samples()[[2, 1]], 5.0);
        assert_eq!(table.header("inline"), Some(vec![10, 10, 11]));
        assert_eq!(table.sample_interval(), 0.0);
    }

    #[test]
    fn ragged_rows_are_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "xline,samples\n1,0.0;1.0\n2,0.0\n").unwrap();
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_file(Path::new("survey.sgy")).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension"));
    }

    #[test]
    fn header_types_are_guessed() {
        assert_eq!(guess_header_type("12"), HeaderValue::Integer(12));
        assert_eq!(guess_header_type("1.5"), HeaderValue::Float(1.5));
        assert_eq!(guess_header_type("true"), HeaderValue::Bool(true));
        assert_eq!(guess_header_type(""), HeaderValue::Null);
        assert_eq!(guess_header_type("N"), HeaderValue::String("N".into()));
    }
}
