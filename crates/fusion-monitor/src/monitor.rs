//! Drives a simulation stream and logs its quality metrics

use anyhow::{Context, Result};
use fusion_core::{fused_series, QualityMetrics, SeriesStats};
use fusion_simulation::{spawn_simulation, SimulationConfig, TickUpdate};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Wall-clock run time; `None` runs until Ctrl-C
    pub seconds: Option<f64>,
    pub report_every: u64,
}

/// Running summary of the metrics seen during one session
#[derive(Debug, Default)]
pub struct MetricsSummary {
    pub reports: u64,
    pub min_confidence: Option<f64>,
    pub last: QualityMetrics,
}

impl MetricsSummary {
    pub fn record(&mut self, metrics: QualityMetrics) {
        self.reports += 1;
        self.min_confidence = Some(match self.min_confidence {
            Some(min) => min.min(metrics.fusion_confidence),
            None => metrics.fusion_confidence,
        });
        self.last = metrics;
    }
}

/// Convert the requested run time, rejecting negative, NaN and unrepresentable values
fn run_duration(seconds: Option<f64>) -> Result<Option<Duration>> {
    seconds
        .map(|s| {
            Duration::try_from_secs_f64(s)
                .with_context(|| format!("Invalid run time of {} seconds", s))
        })
        .transpose()
}

fn report(update: &TickUpdate, summary: &mut MetricsSummary) {
    summary.record(update.metrics);
    info!(
        tick = update.tick,
        t = update.t,
        grade = %update.metrics.grade(),
        "{}",
        update.metrics
    );
    debug!(samples = update.new_samples.len(), "tick detail");
}

pub async fn run(config: SimulationConfig, options: RunOptions) -> Result<()> {
    let run_for = run_duration(options.seconds)?;
    info!(
        modality = ?config.layout.modality,
        channels = ?config.layout.labels(),
        weights = ?config.layout.weights(),
        simulated_rate_hz = config.timing.simulated_rate_hz(),
        "starting simulation"
    );
    let (handle, task) =
        spawn_simulation(config).context("Failed to create simulation stream")?;
    let mut updates = handle.subscribe();
    let mut summary = MetricsSummary::default();

    let deadline = async {
        match run_for {
            Some(period) => sleep(period).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            }
        }
    };
    tokio::pin!(deadline);

    handle.start();

    loop {
        tokio::select! {
            _ = &mut deadline => break,

            update = updates.recv() => {
                match update {
                    Ok(update) => {
                        if update.tick % options.report_every == 0 {
                            report(&update, &mut summary);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "metrics reporter fell behind the stream");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    handle.stop();
    let stats = handle.stats().await;
    let snapshot = handle.snapshot().await;
    handle.shutdown().await.ok();
    task.await.context("Simulation task panicked")?;

    info!(
        ticks = stats.ticks,
        samples = stats.samples_generated,
        buffered = snapshot.samples.len(),
        average_tick_us = stats.average_tick_us,
        overruns = stats.overruns,
        "session finished"
    );
    let fused = SeriesStats::calculate(&fused_series(&snapshot.samples));
    info!(
        mean = fused.mean,
        rms = fused.rms,
        peak_to_peak = fused.peak_to_peak,
        "fused channel over the buffer"
    );
    info!(
        reports = summary.reports,
        min_confidence = summary
            .min_confidence
            .unwrap_or(snapshot.metrics.fusion_confidence),
        "final metrics: {}",
        snapshot.metrics
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_tracks_minimum() {
        let mut summary = MetricsSummary::default();
        for confidence in [0.8, 0.4, 0.9] {
            summary.record(QualityMetrics {
                fusion_confidence: confidence,
                ..Default::default()
            });
        }

        assert_eq!(summary.reports, 3);
        assert_eq!(summary.min_confidence, Some(0.4));
        assert_eq!(summary.last.fusion_confidence, 0.9);
    }

    #[test]
    fn test_run_duration_bounds() {
        assert_eq!(run_duration(None).unwrap(), None);
        assert_eq!(run_duration(Some(1.5)).unwrap(), Some(Duration::from_millis(1500)));
        assert!(run_duration(Some(f64::INFINITY)).is_err());
        assert!(run_duration(Some(f64::NAN)).is_err());
        assert!(run_duration(Some(-1.0)).is_err());
        assert!(run_duration(Some(1e30)).is_err());
    }

    #[tokio::test]
    async fn test_infinite_run_time_is_an_error() {
        let options = RunOptions {
            seconds: Some(f64::INFINITY),
            report_every: 1,
        };
        assert!(run(SimulationConfig::biomedical(), options).await.is_err());
    }

    #[tokio::test]
    async fn test_short_run_completes() {
        let mut config = SimulationConfig::biomedical();
        config.timing.tick_rate_hz = 100.0;
        config.seed = Some(3);

        let options = RunOptions {
            seconds: Some(0.1),
            report_every: 2,
        };
        run(config, options).await.unwrap();
    }
}
