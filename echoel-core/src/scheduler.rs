//! FrameScheduler - the fixed-rate coordination tick

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use echoel_plugin_api::{BioData, QuantumPluginState, VisualContext, VisualOutput};

use crate::config::period_for_rate;
use crate::registry::PluginRegistry;

struct VisualSink {
    tx: mpsc::Sender<Vec<VisualOutput>>,
    width: u32,
    height: u32,
}

/// Drives `on_frame` and the coordination-side relays at a nominal rate.
///
/// Each tick passes the measured time since the previous tick to every
/// plugin. A slow tick delays the following ones instead of causing a burst.
pub struct FrameScheduler {
    registry: Arc<PluginRegistry>,
    period: Duration,
    bio: Option<watch::Receiver<BioData>>,
    quantum: Option<watch::Receiver<QuantumPluginState>>,
    visual: Option<VisualSink>,
}

impl FrameScheduler {
    /// Create a scheduler ticking at the registry's configured frame rate
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        let period = registry.config().frame_period();
        Self {
            registry,
            period,
            bio: None,
            quantum: None,
            visual: None,
        }
    }

    /// Builder: override the tick rate. Non-positive rates are ignored and
    /// the period is clamped like
    /// [`HostConfig::frame_period`](crate::HostConfig::frame_period).
    pub fn with_rate(mut self, hz: f64) -> Self {
        if let Some(period) = period_for_rate(hz) {
            self.period = period;
        }
        self
    }

    /// Builder: relay bio-data published on `rx` to every plugin
    pub fn with_bio_source(mut self, rx: watch::Receiver<BioData>) -> Self {
        self.bio = Some(rx);
        self
    }

    /// Builder: relay quantum state published on `rx` to every plugin
    pub fn with_quantum_source(mut self, rx: watch::Receiver<QuantumPluginState>) -> Self {
        self.quantum = Some(rx);
        self
    }

    /// Builder: render visuals every tick and send them to `tx`.
    ///
    /// If the consumer has not drained the previous frame the new one is
    /// dropped.
    pub fn with_visual_sink(
        mut self,
        tx: mpsc::Sender<Vec<VisualOutput>>,
        width: u32,
        height: u32,
    ) -> Self {
        self.visual = Some(VisualSink { tx, width, height });
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawn the tick loop on the current tokio runtime
    pub fn start(self) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let frames = Arc::new(AtomicU64::new(0));
        let dropped = Arc::new(AtomicU64::new(0));

        tracing::info!(period = ?self.period, "Starting frame scheduler");
        let task = tokio::spawn(self.run(
            cancel.clone(),
            Arc::clone(&frames),
            Arc::clone(&dropped),
        ));

        SchedulerHandle {
            cancel,
            task,
            frames,
            dropped,
        }
    }

    async fn run(
        mut self,
        cancel: CancellationToken,
        frames: Arc<AtomicU64>,
        dropped: Arc<AtomicU64>,
    ) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        let started = Instant::now();
        let mut last = started;
        let mut latest_bio = self.bio.as_ref().map(|rx| rx.borrow().clone());

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let now = Instant::now();
            let delta_time = now.duration_since(last).as_secs_f64();
            last = now;
            let frame = frames.fetch_add(1, Ordering::Relaxed) + 1;

            if let Some(rx) = self.bio.as_mut()
                && rx.has_changed().unwrap_or(false)
            {
                let data = rx.borrow_and_update().clone();
                self.registry.broadcast_bio_data(&data);
                latest_bio = Some(data);
            }

            if let Some(rx) = self.quantum.as_mut()
                && rx.has_changed().unwrap_or(false)
            {
                let state = rx.borrow_and_update().clone();
                self.registry.broadcast_quantum_state(&state);
            }

            self.registry.dispatch_frame(delta_time);

            if let Some(sink) = &self.visual {
                let context = VisualContext {
                    width: sink.width,
                    height: sink.height,
                    time: now.duration_since(started).as_secs_f64(),
                    delta_time,
                    frame,
                    bio_data: latest_bio.clone(),
                };
                let outputs = self.registry.render_visuals(&context);
                if sink.tx.try_send(outputs).is_err() {
                    dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(frame, "Visual sink full, dropped frame");
                }
            }

            tracing::trace!(frame, delta_time, "Frame tick");
        }

        tracing::info!(frames = frames.load(Ordering::Relaxed), "Frame scheduler stopped");
    }
}

/// Handle to a running [`FrameScheduler`]
pub struct SchedulerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    frames: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl SchedulerHandle {
    /// Ticks completed so far
    pub fn frame_count(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Visual frames dropped because the sink was full or closed
    pub fn dropped_visual_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel future ticks and wait for the in-flight one to finish
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Frame scheduler task failed");
        }
    }
}
