//! Per-format throughput measurement
//!
//! Runs a 1024-sample mono cosine through a single raw-coefficient biquad
//! and reports how long each block takes relative to its playback time.

use anyhow::{bail, Result};
use drain_core::domain::*;
use serde::Serialize;
use std::time::Instant;

pub const BLOCK_FRAMES: usize = 1024;
pub const SAMPLE_RATE: f64 = 48000.0;
const TONE_HZ: f64 = 480.0;
const TONE_AMPLITUDE: f64 = 5.0;
const COEFFICIENTS: [f64; 5] = [0.01, 0.02, 0.03, 0.05, 0.06];

/// Timing summary for one format
#[derive(Debug, Clone, Serialize)]
pub struct PerfReport {
    pub format: SampleFormat,
    pub iterations: usize,
    pub min_ns: u128,
    pub avg_ns: u128,
    pub max_ns: u128,
    /// Average block time as a share of the block's playback time
    pub realtime_percent: f64,
}

fn block_duration_ns() -> f64 {
    BLOCK_FRAMES as f64 / SAMPLE_RATE * 1e9
}

fn measure<T: Sample>(format: SampleFormat, iterations: usize) -> Result<PerfReport> {
    if iterations == 0 {
        bail!("iteration count must be at least 1");
    }

    let mut eq = Equalizer::new();
    eq.initialize(SAMPLE_RATE, 1, format)?;
    let [a0, a1, a2, b0, b1] = COEFFICIENTS;
    eq.add_biquad_coefficients(a0, a1, a2, b0, b1)?;

    let input: Vec<T> = (0..BLOCK_FRAMES)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * TONE_HZ * i as f64 / SAMPLE_RATE;
            T::from_f64(TONE_AMPLITUDE * phase.cos())
        })
        .collect();
    let mut output = vec![T::default(); BLOCK_FRAMES];

    let mut min_ns = u128::MAX;
    let mut max_ns = 0;
    let mut total_ns = 0;
    for _ in 0..iterations {
        let start = Instant::now();
        eq.process(&mut output, &input, BLOCK_FRAMES)?;
        let elapsed = start.elapsed().as_nanos();
        min_ns = min_ns.min(elapsed);
        max_ns = max_ns.max(elapsed);
        total_ns += elapsed;
    }

    if output.iter().any(|sample| !sample.to_f64().is_finite()) {
        bail!("{format} produced non-finite output");
    }

    let avg_ns = total_ns / iterations as u128;
    Ok(PerfReport {
        format,
        iterations,
        min_ns,
        avg_ns,
        max_ns,
        realtime_percent: avg_ns as f64 / block_duration_ns() * 100.0,
    })
}

/// Measure one stream format
pub fn measure_format(format: SampleFormat, iterations: usize) -> Result<PerfReport> {
    match format {
        SampleFormat::Double => measure::<f64>(format, iterations),
        SampleFormat::Float => measure::<f32>(format, iterations),
        SampleFormat::Int8 => measure::<Int8Sample>(format, iterations),
        SampleFormat::Int8On16 => measure::<Int8On16Sample>(format, iterations),
        SampleFormat::Int16 => measure::<Int16Sample>(format, iterations),
        SampleFormat::Int16On32 => measure::<Int16On32Sample>(format, iterations),
        SampleFormat::Int24On32 => measure::<Int24On32Sample>(format, iterations),
        SampleFormat::Int32 => measure::<Int32Sample>(format, iterations),
        SampleFormat::Int32On64 | SampleFormat::Int64 => {
            measure::<Int32On64Sample>(format, iterations)
        }
        SampleFormat::Unknown => bail!("cannot measure the unknown format"),
    }
}
