use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, Int64Array, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Ricker wavelet of peak frequency `f` at time `t` (seconds).
fn ricker(t: f64, f: f64) -> f64 {
    let a = (std::f64::consts::PI * f * t).powi(2);
    (1.0 - 2.0 * a) * (-a).exp()
}

/// Synthetic trace: a few dipping reflectors convolved with a Ricker wavelet.
fn generate_trace(
    inline: usize,
    xline: usize,
    nsamples: usize,
    dt: f64,
    peak_hz: f64,
    rng: &mut SimpleRng,
) -> Vec<f64> {
    let reflectors = [
        (0.20 + 0.002 * inline as f64, 1.0),
        (0.45 + 0.001 * xline as f64, -0.7),
        (0.80 - 0.0015 * inline as f64 + 0.001 * xline as f64, 0.5),
    ];
    (0..nsamples)
        .map(|i| {
            let t = i as f64 * dt;
            let signal: f64 = reflectors
                .iter()
                .map(|&(t0, r)| r * ricker(t - t0, peak_hz))
                .sum();
            signal + rng.gauss(0.0, 0.02)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = SimpleRng::new(42);

    let (ninlines, nxlines) = (20usize, 30usize);
    let (first_inline, first_xline) = (1001i64, 2001i64);
    let nsamples = 500;
    let dt_us: i64 = 2000;
    let dt = dt_us as f64 * 1e-6;

    // Traces in acquisition order: inline slowest, crossline fastest.
    let mut samples = ListBuilder::new(Float64Builder::new());
    let mut inlines = Vec::with_capacity(ninlines * nxlines);
    let mut xlines = Vec::with_capacity(ninlines * nxlines);
    let mut folds = Vec::with_capacity(ninlines * nxlines);

    for il in 0..ninlines {
        for xl in 0..nxlines {
            let trace = generate_trace(il, xl, nsamples, dt, 30.0, &mut rng);
            let values = samples.values();
            for v in trace {
                values.append_value(v);
            }
            samples.append(true);

            inlines.push(first_inline + il as i64);
            xlines.push(first_xline + xl as i64);
            folds.push(40 + (il + xl) as i64 % 20);
        }
    }
    let ntraces = inlines.len();
    log::info!("generated {ntraces} traces of {nsamples} samples");

    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "samples",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("inline", DataType::Int64, false),
        Field::new("xline", DataType::Int64, false),
        Field::new("fold", DataType::Int64, false),
        Field::new("dt", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(samples.finish()),
            Arc::new(Int64Array::from(inlines)),
            Arc::new(Int64Array::from(xlines)),
            Arc::new(Int64Array::from(folds)),
            Arc::new(Int64Array::from(vec![dt_us; ntraces])),
        ],
    )
    .context("creating record batch")?;

    let output_path = "sample_survey.parquet";
    let file = std::fs::File::create(output_path).context("creating output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    println!(
        "Wrote {ntraces} traces ({ninlines} inlines × {nxlines} xlines, {nsamples} samples each) to {output_path}"
    );
    Ok(())
}
