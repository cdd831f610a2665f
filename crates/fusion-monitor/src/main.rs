//! Fusion Monitor - headless host for the sensor fusion simulation

mod monitor;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fusion_core::SensorModality;
use fusion_simulation::{
    run_benchmark, BenchmarkConfig, BenchmarkRow, SimulationConfig, DEFAULT_NOISE_LEVELS,
};
use tracing::Level;

use crate::monitor::RunOptions;

#[derive(Parser)]
#[command(name = "fusion-monitor")]
#[command(about = "Simulated multi-sensor fusion with rolling signal quality metrics")]
#[command(version)]
struct Cli {
    /// More log output (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the real-time simulation and log quality metrics
    Run {
        #[arg(long, value_enum, default_value = "biomedical")]
        modality: Modality,

        /// JSON configuration file; overrides --modality
        #[arg(long)]
        config: Option<PathBuf>,

        /// Stop after this many wall-clock seconds (runs until Ctrl-C when omitted)
        #[arg(long)]
        seconds: Option<f64>,

        #[arg(long)]
        seed: Option<u64>,

        /// Timer ticks per second
        #[arg(long)]
        tick_rate: Option<f64>,

        /// Generator sub-steps per tick
        #[arg(long)]
        sub_steps: Option<usize>,

        /// Log metrics every N ticks
        #[arg(long, default_value = "15")]
        report_every: u64,
    },

    /// Compare fusion methods across noise levels
    Benchmark {
        #[arg(long, value_enum, default_value = "automotive")]
        modality: Modality,

        /// Samples generated per noise level
        #[arg(long, default_value = "1000")]
        samples: usize,

        #[arg(long, default_value = "42")]
        seed: u64,

        /// Print rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print a preset configuration as JSON
    Preset {
        #[arg(long, value_enum, default_value = "biomedical")]
        modality: Modality,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Modality {
    Biomedical,
    Automotive,
}

impl From<Modality> for SensorModality {
    fn from(modality: Modality) -> Self {
        match modality {
            Modality::Biomedical => SensorModality::Biomedical,
            Modality::Automotive => SensorModality::Automotive,
        }
    }
}

fn log_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::WARN;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Apply command line overrides on top of a preset or a config file
fn resolve_config(
    modality: Modality,
    path: Option<&PathBuf>,
    seed: Option<u64>,
    tick_rate: Option<f64>,
    sub_steps: Option<usize>,
) -> Result<SimulationConfig> {
    let mut config = match path {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => SimulationConfig::for_modality(modality.into()),
    };

    if seed.is_some() {
        config.seed = seed;
    }
    if let Some(rate) = tick_rate {
        config.timing.tick_rate_hz = rate;
    }
    if let Some(steps) = sub_steps {
        config.timing.sub_steps_per_tick = steps;
    }

    config.validate().context("Invalid simulation configuration")?;
    Ok(config)
}

fn print_benchmark_table(rows: &[BenchmarkRow]) {
    println!(
        "{:>6}  {:<20} {:>12} {:>8} {:>8} {:>9} {:>9}",
        "noise", "method", "mse", "r2", "corr", "snr_db", "time_us"
    );
    for row in rows {
        let e = &row.evaluation;
        println!(
            "{:>6.2}  {:<20} {:>12.6} {:>8.3} {:>8.3} {:>9.2} {:>9}",
            row.noise_level,
            row.method.to_string(),
            e.mse,
            e.r2,
            e.correlation,
            e.snr_db,
            row.processing_time_us
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose, cli.quiet))
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            modality,
            config,
            seconds,
            seed,
            tick_rate,
            sub_steps,
            report_every,
        } => {
            let config = resolve_config(modality, config.as_ref(), seed, tick_rate, sub_steps)?;
            let options = RunOptions {
                seconds,
                report_every: report_every.max(1),
            };
            monitor::run(config, options).await?;
        }

        Commands::Benchmark {
            modality,
            samples,
            seed,
            json,
        } => {
            let bench = BenchmarkConfig {
                noise_levels: DEFAULT_NOISE_LEVELS.to_vec(),
                sample_count: samples,
                seed,
            };
            let base = SimulationConfig::for_modality(modality.into());
            let rows = run_benchmark(&base, &bench).context("Benchmark failed")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_benchmark_table(&rows);
            }
        }

        Commands::Preset { modality } => {
            let config = SimulationConfig::for_modality(modality.into());
            println!("{}", config.to_json()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_arguments() {
        let cli = Cli::try_parse_from([
            "fusion-monitor",
            "-v",
            "run",
            "--modality",
            "automotive",
            "--seconds",
            "2.5",
            "--sub-steps",
            "4",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Run {
                modality,
                seconds,
                sub_steps,
                report_every,
                ..
            } => {
                assert_eq!(modality, Modality::Automotive);
                assert_eq!(seconds, Some(2.5));
                assert_eq!(sub_steps, Some(4));
                assert_eq!(report_every, 15);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_unknown_modality_is_rejected() {
        assert!(Cli::try_parse_from(["fusion-monitor", "preset", "--modality", "marine"]).is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0, false), Level::INFO);
        assert_eq!(log_level(1, false), Level::DEBUG);
        assert_eq!(log_level(3, false), Level::TRACE);
        assert_eq!(log_level(2, true), Level::WARN);
    }

    #[test]
    fn test_resolve_config_overrides() {
        let config =
            resolve_config(Modality::Automotive, None, Some(5), Some(30.0), Some(2)).unwrap();
        assert_eq!(config.layout.channel_count(), 5);
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.timing.tick_rate_hz, 30.0);
        assert_eq!(config.timing.sub_steps_per_tick, 2);

        assert!(resolve_config(Modality::Biomedical, None, None, None, Some(0)).is_err());
        let missing = PathBuf::from("/missing.json");
        assert!(resolve_config(Modality::Biomedical, Some(&missing), None, None, None).is_err());

        for rate in [1e-310, 1e12] {
            assert!(resolve_config(Modality::Biomedical, None, None, Some(rate), None).is_err());
        }
    }
}
