//! Run the host with the demo plugins against simulated inputs

use anyhow::{Context, Result, anyhow};
use clap::Args;
use echoel_core::{FrameScheduler, HostEvent, PluginRegistry};
use echoel_plugin_api::BioData;
use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, watch};

use crate::config::{AudioConfig, ConfigLoader};
use crate::demo;

/// Simulated sensor update rate
const BIO_PERIOD: Duration = Duration::from_millis(100);

const VISUAL_WIDTH: u32 = 1280;
const VISUAL_HEIGHT: u32 = 720;

/// Run arguments
#[derive(Args)]
pub struct RunArgs {
    /// How long to run before shutting down
    #[arg(long, default_value_t = 3.0)]
    pub seconds: f64,
}

/// Run the host until the duration elapses or Ctrl+C
pub async fn run(args: RunArgs) -> Result<()> {
    let duration = run_duration(args.seconds)?;
    let config = ConfigLoader::load()?;
    let registry = Arc::new(PluginRegistry::new(config.host));

    let events = tokio::spawn(log_events(registry.subscribe()));

    for plugin in demo::plugins() {
        let id = plugin.manifest().id;
        if let Err(e) = registry.load(plugin).await {
            tracing::warn!(plugin = %id, error = %e, "Failed to load demo plugin");
        }
    }

    let (bio_tx, bio_rx) = watch::channel(BioData::default());
    let (visual_tx, mut visual_rx) = mpsc::channel(4);

    let scheduler = FrameScheduler::new(Arc::clone(&registry))
        .with_bio_source(bio_rx)
        .with_visual_sink(visual_tx, VISUAL_WIDTH, VISUAL_HEIGHT)
        .start();

    let visuals = tokio::spawn(async move {
        let mut frames = 0u64;
        while let Some(outputs) = visual_rx.recv().await {
            tracing::trace!(layers = outputs.len(), "Visual frame");
            frames += 1;
        }
        frames
    });

    let audio_stop = Arc::new(AtomicBool::new(false));
    let audio = spawn_audio_thread(&registry, config.audio.clone(), Arc::clone(&audio_stop))?;

    let started = Instant::now();
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let mut ticker = tokio::time::interval(BIO_PERIOD);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            _ = ticker.tick() => {
                let _ = bio_tx.send(simulated_bio(started.elapsed().as_secs_f64()));
            }
        }
    }

    let frames = scheduler.frame_count();
    let dropped = scheduler.dropped_visual_frames();
    scheduler.stop().await;

    audio_stop.store(true, Ordering::Release);
    let callbacks = audio
        .join()
        .map_err(|_| anyhow!("audio thread panicked"))?;

    let messages = registry.shared_state().message_count();
    let unloaded = registry.unload_all().await;

    let visual_frames = visuals.await?;
    events.abort();

    println!("Frames:          {}", frames);
    println!("Audio callbacks: {}", callbacks);
    println!("Visual frames:   {} ({} dropped)", visual_frames, dropped);
    println!("Shared messages: {}", messages);
    println!("Unloaded:        {}", unloaded.join(", "));
    Ok(())
}

/// Wall-clock run length from `--seconds`
fn run_duration(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("--seconds must be a non-negative number of seconds, got {seconds}"))
}

/// Pull buffers through the audio chain at the device rate until `stop` is set.
/// Returns the number of callbacks made.
fn spawn_audio_thread(
    registry: &PluginRegistry,
    audio: AudioConfig,
    stop: Arc<AtomicBool>,
) -> Result<std::thread::JoinHandle<u64>> {
    let chain = Arc::new(registry.audio_chain());
    let channels = usize::from(audio.channels);
    let sample_rate = f64::from(audio.sample_rate);
    let period = audio.buffer_duration();

    let handle = std::thread::Builder::new()
        .name("echoel-audio".into())
        .spawn(move || {
            let mut buffer = vec![0.0_f32; audio.buffer_frames * channels];
            while !stop.load(Ordering::Acquire) {
                buffer.fill(0.0);
                chain.process(&mut buffer, sample_rate, channels);
                std::thread::sleep(period);
            }
            chain.callbacks()
        })?;
    Ok(handle)
}

/// Slowly rising and falling coherence with a matching heart and breath rhythm
fn simulated_bio(t: f64) -> BioData {
    let wave = (t * TAU / 20.0).sin() * 0.5 + 0.5;
    BioData::new(wave as f32)
        .with_heart_rate((64.0 + 8.0 * (t * TAU / 10.0).sin()) as f32)
        .with_breathing_rate(6.0)
}

async fn log_events(mut rx: broadcast::Receiver<HostEvent>) {
    loop {
        match rx.recv().await {
            Ok(HostEvent::PluginLoaded { id, version }) => {
                tracing::info!(plugin = %id, %version, "Plugin loaded");
            }
            Ok(HostEvent::PluginUnloaded { id }) => {
                tracing::info!(plugin = %id, "Plugin unloaded");
            }
            Ok(HostEvent::PluginLoadFailed { id, error }) => {
                tracing::warn!(plugin = %id, %error, "Plugin failed to load");
            }
            Ok(HostEvent::PluginFaulted { id, hook }) => {
                tracing::warn!(plugin = %id, %hook, "Plugin faulted");
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::debug!(skipped = n, "Event log lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
