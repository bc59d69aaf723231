//! Drain CLI Application

mod perf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use drain_core::domain::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "drain")]
#[command(about = "Multi-channel biquad equalizer", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Equalizer preset (TOML)
    #[arg(short, long, global = true)]
    preset: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Time one biquad per sample format
    Performance {
        /// Blocks processed per format
        #[arg(short, long, default_value_t = 1000)]
        iterations: usize,
    },
    /// Print the preset's theoretical magnitude response
    Theory {
        /// Emit JSON instead of `freq gain_db` lines
        #[arg(long)]
        json: bool,

        /// Use a logarithmic frequency axis
        #[arg(long)]
        log: bool,
    },
    /// Filter raw interleaved little-endian f32 samples
    Process {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct ResponsePoint {
    frequency_hz: f32,
    gain_db: f32,
}

async fn load_config(preset: Option<&Path>) -> anyhow::Result<EqualizerConfig> {
    match preset {
        Some(path) => EqualizerConfig::load_from_file(path)
            .await
            .with_context(|| format!("failed to load preset {}", path.display())),
        None => Ok(EqualizerConfig::default()),
    }
}

fn run_performance(iterations: usize) -> anyhow::Result<()> {
    println!("{:<16} {:>10} {:>10} {:>10} {:>9}", "format", "min ns", "avg ns", "max ns", "% rt");
    for format in SampleFormat::ALL {
        let report = perf::measure_format(format, iterations)?;
        println!(
            "{:<16} {:>10} {:>10} {:>10} {:>8.3}%",
            report.format.name(),
            report.min_ns,
            report.avg_ns,
            report.max_ns,
            report.realtime_percent
        );
    }
    Ok(())
}

fn run_theory(config: &EqualizerConfig, json: bool, log: bool) -> anyhow::Result<()> {
    let scale = if log { ResponseScale::Logarithmic } else { ResponseScale::Linear };
    let response = config.build()?.calculate_theory_with_scale(scale);

    if json {
        let points: Vec<ResponsePoint> = response
            .into_iter()
            .map(|(frequency_hz, gain_db)| ResponsePoint { frequency_hz, gain_db })
            .collect();
        println!("{}", serde_json::to_string_pretty(&points)?);
    } else {
        for (freq, gain) in response {
            println!("{freq} {gain}");
        }
    }
    Ok(())
}

async fn run_process(config: &EqualizerConfig, input: &Path, output: &Path) -> anyhow::Result<()> {
    if config.format != SampleFormat::Float {
        bail!("process only handles float presets, got {}", config.format);
    }

    let bytes = tokio::fs::read(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;
    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    let frames = samples.len() / config.channels;
    if samples.len() % config.channels != 0 || bytes.len() % 4 != 0 {
        tracing::warn!(frames, "Input ends with a partial frame, trailing data dropped");
    }

    let mut eq = config.build()?;
    let mut filtered = vec![0.0f32; frames * config.channels];
    eq.process(&mut filtered, &samples, frames)?;

    let out_bytes: Vec<u8> = filtered.iter().flat_map(|s| s.to_le_bytes()).collect();
    tokio::fs::write(output, out_bytes)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    tracing::info!(frames, path = %output.display(), "Processed audio written");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("Drain starting...");

    match &cli.command {
        Command::Performance { iterations } => run_performance(*iterations),
        Command::Theory { json, log } => {
            let config = load_config(cli.preset.as_deref()).await?;
            run_theory(&config, *json, *log)
        }
        Command::Process { input, output } => {
            let config = load_config(cli.preset.as_deref()).await?;
            run_process(&config, input, output).await
        }
    }
}
