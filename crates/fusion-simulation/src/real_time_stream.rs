//! Timer-driven simulation stream with start/stop lifecycle control

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fusion_core::{FusionError, FusionResult, QualityAnalyzer, QualityMetrics, SensorSample};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant, Interval};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SimulationConfig;
use crate::generator::SampleGenerator;

/// Capacity of the tick update broadcast channel
const UPDATE_CHANNEL_CAPACITY: usize = 64;
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Commands handled by the stream task between ticks
#[derive(Debug, Clone)]
pub enum StreamCommand {
    /// Zero the clock and clear the buffer
    Reset,
    UpdateConfig(Box<SimulationConfig>),
    /// End the stream task
    Shutdown,
}

/// Published after every running tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickUpdate {
    pub tick: u64,
    /// Simulation time after the tick
    pub t: f64,
    pub new_samples: Vec<SensorSample>,
    pub metrics: QualityMetrics,
}

/// Stream statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamStats {
    pub ticks: u64,
    pub samples_generated: u64,
    pub last_tick_us: u64,
    pub average_tick_us: f64,
    /// Ticks whose work took longer than the tick period
    pub overruns: u64,
}

/// Point-in-time copy of the stream state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSnapshot {
    pub session_id: Uuid,
    pub t: f64,
    pub is_running: bool,
    pub samples: Vec<SensorSample>,
    pub metrics: QualityMetrics,
}

struct StreamState {
    generator: SampleGenerator,
    analyzer: QualityAnalyzer,
    metrics: QualityMetrics,
    stats: StreamStats,
    sub_steps: usize,
}

impl StreamState {
    fn refresh_metrics(&mut self) {
        self.metrics = self.analyzer.analyze(self.generator.buffer());
    }
}

/// Owns the tick loop. Create with [`SimulationStream::new`], drive with
/// [`SimulationStream::run`] and control through the returned handle.
pub struct SimulationStream {
    session_id: Uuid,
    tick_period: Duration,
    state: Arc<Mutex<StreamState>>,
    running: Arc<AtomicBool>,
    updates: broadcast::Sender<TickUpdate>,
    commands: mpsc::Receiver<StreamCommand>,
}

/// Cloneable control and read access to a running stream
#[derive(Clone)]
pub struct SimulationHandle {
    session_id: Uuid,
    state: Arc<Mutex<StreamState>>,
    running: Arc<AtomicBool>,
    updates: broadcast::Sender<TickUpdate>,
    commands: mpsc::Sender<StreamCommand>,
}

fn tick_period(config: &SimulationConfig) -> FusionResult<Duration> {
    config.timing.tick_period().ok_or(FusionError::InvalidTiming {
        field: "tick_rate_hz",
        value: config.timing.tick_rate_hz,
    })
}

impl SimulationStream {
    /// Build a stopped stream and its control handle
    pub fn new(config: SimulationConfig) -> FusionResult<(Self, SimulationHandle)> {
        let generator = SampleGenerator::new(&config)?;
        let tick_period = tick_period(&config)?;
        let analyzer = QualityAnalyzer::new(config.layout.clone(), config.calibration.clone());
        let metrics = analyzer.analyze(generator.buffer());

        let state = Arc::new(Mutex::new(StreamState {
            generator,
            analyzer,
            metrics,
            stats: StreamStats::default(),
            sub_steps: config.timing.sub_steps_per_tick,
        }));
        let running = Arc::new(AtomicBool::new(false));
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (command_sender, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let session_id = Uuid::new_v4();

        let handle = SimulationHandle {
            session_id,
            state: state.clone(),
            running: running.clone(),
            updates: updates.clone(),
            commands: command_sender,
        };

        let stream = Self {
            session_id,
            tick_period,
            state,
            running,
            updates,
            commands,
        };

        Ok((stream, handle))
    }

    /// Run the tick loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        let mut timer = interval(self.tick_period);
        info!(
            session = %self.session_id,
            period_ms = self.tick_period.as_secs_f64() * 1000.0,
            "simulation stream ready"
        );

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    if self.running.load(Ordering::SeqCst) {
                        self.tick().await;
                    }
                }

                command = self.commands.recv() => {
                    match command {
                        Some(StreamCommand::Reset) => {
                            let mut state = self.state.lock().await;
                            state.generator.reset();
                            state.stats = StreamStats::default();
                            state.refresh_metrics();
                            info!(session = %self.session_id, "simulation reset");
                        }
                        Some(StreamCommand::UpdateConfig(config)) => {
                            if let Some(new_timer) = self.apply_config(&config).await {
                                timer = new_timer;
                            }
                        }
                        Some(StreamCommand::Shutdown) => {
                            info!(session = %self.session_id, "simulation stream shut down");
                            break;
                        }
                        None => {
                            info!(
                                session = %self.session_id,
                                "control channel closed, stopping stream"
                            );
                            break;
                        }
                    }
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
    }

    async fn tick(&mut self) {
        let started = Instant::now();
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let before = state.generator.time();
        let sub_steps = state.sub_steps;
        state.generator.advance(sub_steps);
        let new_samples: Vec<SensorSample> = state
            .generator
            .recent(sub_steps)
            .into_iter()
            .filter(|s| s.t > before)
            .collect();
        state.refresh_metrics();

        let elapsed = started.elapsed();
        let elapsed_us = elapsed.as_micros() as u64;
        let stats = &mut state.stats;
        stats.ticks += 1;
        stats.samples_generated += new_samples.len() as u64;
        stats.last_tick_us = elapsed_us;
        stats.average_tick_us += (elapsed_us as f64 - stats.average_tick_us) / stats.ticks as f64;

        if elapsed > self.tick_period {
            stats.overruns += 1;
            warn!(
                session = %self.session_id,
                tick_us = elapsed_us,
                period_us = self.tick_period.as_micros() as u64,
                "tick exceeded its period"
            );
        }

        let update = TickUpdate {
            tick: stats.ticks,
            t: state.generator.time(),
            new_samples,
            metrics: state.metrics,
        };
        drop(guard);

        // No subscribers is fine
        let _ = self.updates.send(update);
    }

    /// Returns a fresh timer when the tick rate changed
    async fn apply_config(&mut self, config: &SimulationConfig) -> Option<Interval> {
        let mut state = self.state.lock().await;
        let applied = tick_period(config)
            .and_then(|period| state.generator.update_config(config).map(|()| period));
        let period = match applied {
            Ok(period) => period,
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "rejected configuration update");
                return None;
            }
        };

        state.analyzer = QualityAnalyzer::new(config.layout.clone(), config.calibration.clone());
        state.sub_steps = config.timing.sub_steps_per_tick;
        state.refresh_metrics();
        info!(
            session = %self.session_id,
            channels = config.layout.channel_count(),
            tick_rate_hz = config.timing.tick_rate_hz,
            "simulation configuration updated"
        );

        if period != self.tick_period {
            self.tick_period = period;
            Some(interval(period))
        } else {
            None
        }
    }
}

impl SimulationHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Resume ticking. Never resets the clock or buffer. Does nothing once
    /// the stream task has ended.
    pub fn start(&self) {
        if self.commands.is_closed() {
            warn!(session = %self.session_id, "start ignored, simulation stream has ended");
            return;
        }
        if !self.running.swap(true, Ordering::SeqCst) {
            info!(session = %self.session_id, "simulation started");
        }
    }

    /// Pause ticking. Never resets the clock or buffer.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!(session = %self.session_id, "simulation stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Receiver for per-tick updates
    pub fn subscribe(&self) -> broadcast::Receiver<TickUpdate> {
        self.updates.subscribe()
    }

    pub async fn send(&self, command: StreamCommand) -> FusionResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| FusionError::StreamClosed)
    }

    pub async fn reset(&self) -> FusionResult<()> {
        self.send(StreamCommand::Reset).await
    }

    /// Validate locally, then hand the configuration to the stream task
    pub async fn update_config(&self, config: SimulationConfig) -> FusionResult<()> {
        config.validate()?;
        self.send(StreamCommand::UpdateConfig(Box::new(config))).await
    }

    pub async fn shutdown(&self) -> FusionResult<()> {
        self.send(StreamCommand::Shutdown).await
    }

    /// Current simulation time
    pub async fn time(&self) -> f64 {
        self.state.lock().await.generator.time()
    }

    pub async fn metrics(&self) -> QualityMetrics {
        self.state.lock().await.metrics
    }

    pub async fn stats(&self) -> StreamStats {
        self.state.lock().await.stats.clone()
    }

    pub async fn recent(&self, count: usize) -> Vec<SensorSample> {
        self.state.lock().await.generator.recent(count)
    }

    pub async fn snapshot(&self) -> StreamSnapshot {
        let state = self.state.lock().await;
        StreamSnapshot {
            session_id: self.session_id,
            t: state.generator.time(),
            is_running: self.is_running(),
            samples: state.generator.buffer().iter().cloned().collect(),
            metrics: state.metrics,
        }
    }
}

/// Create a stream and run it in a background task
pub fn spawn_simulation(
    config: SimulationConfig,
) -> FusionResult<(SimulationHandle, JoinHandle<()>)> {
    let (stream, handle) = SimulationStream::new(config)?;
    let task = tokio::spawn(stream.run());
    debug!(session = %handle.session_id(), "simulation task spawned");
    Ok((handle, task))
}
