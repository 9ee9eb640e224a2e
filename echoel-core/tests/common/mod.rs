//! Shared test plugins and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use echoel_core::{HostConfig, PluginRegistry};
use echoel_core::api::{
    BioData, Capability, InteractionEvent, Plugin, PluginContext, PluginError, PluginManifest,
    QuantumPluginState, VisualContext, VisualOutput,
};

pub type Log = Arc<Mutex<Vec<String>>>;

/// Registry rooted in a temp dir with a short load deadline
pub fn test_registry(dir: &TempDir) -> Arc<PluginRegistry> {
    let config = HostConfig::default()
        .with_root(dir.path())
        .with_load_timeout(Duration::from_millis(200));
    Arc::new(PluginRegistry::new(config))
}

/// Entries in `log` that start with `prefix`
pub fn entries(log: &Log, prefix: &str) -> Vec<String> {
    log.lock()
        .iter()
        .filter(|entry| entry.starts_with(prefix))
        .cloned()
        .collect()
}

/// A configurable plugin that records every hook it receives
pub struct Recorder {
    manifest: PluginManifest,
    log: Log,
    deltas: Arc<Mutex<Vec<f64>>>,
    addresses: Arc<Mutex<Vec<usize>>>,
    fail_load: Option<String>,
    hang_on_load: bool,
    unload_delay: Option<Duration>,
    panic_in: Option<&'static str>,
    audio_offset: f32,
}

impl Recorder {
    pub fn new(id: &str, capabilities: &[Capability]) -> Self {
        Self {
            manifest: PluginManifest::new(id, id).with_capabilities(capabilities.iter().copied()),
            log: Arc::new(Mutex::new(Vec::new())),
            deltas: Arc::new(Mutex::new(Vec::new())),
            addresses: Arc::new(Mutex::new(Vec::new())),
            fail_load: None,
            hang_on_load: false,
            unload_delay: None,
            panic_in: None,
            audio_offset: 0.0,
        }
    }

    /// Record into an existing log, to observe ordering across plugins
    pub fn sharing_log(mut self, log: &Log) -> Self {
        self.log = Arc::clone(log);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_load = Some(message.to_string());
        self
    }

    pub fn hanging(mut self) -> Self {
        self.hang_on_load = true;
        self
    }

    pub fn slow_unload(mut self, delay: Duration) -> Self {
        self.unload_delay = Some(delay);
        self
    }

    pub fn panicking_in(mut self, hook: &'static str) -> Self {
        self.panic_in = Some(hook);
        self
    }

    pub fn requiring_sdk(mut self, version: &str) -> Self {
        self.manifest = self.manifest.requires_sdk(version);
        self
    }

    pub fn depending_on(mut self, ids: &[&str]) -> Self {
        self.manifest = self.manifest.depends_on(ids.iter().copied());
        self
    }

    pub fn conflicting_with(mut self, ids: &[&str]) -> Self {
        self.manifest = self.manifest.conflicts_with(ids.iter().copied());
        self
    }

    /// Add `offset` to every sample in `process_audio`
    pub fn adding(mut self, offset: f32) -> Self {
        self.audio_offset = offset;
        self
    }

    pub fn log(&self) -> Log {
        Arc::clone(&self.log)
    }

    pub fn deltas(&self) -> Arc<Mutex<Vec<f64>>> {
        Arc::clone(&self.deltas)
    }

    /// Address of `self` at each `on_load`
    pub fn addresses(&self) -> Arc<Mutex<Vec<usize>>> {
        Arc::clone(&self.addresses)
    }

    pub fn boxed(self) -> Box<dyn Plugin> {
        Box::new(self)
    }

    fn record(&self, hook: &str) {
        self.log.lock().push(format!("{}:{}", self.manifest.id, hook));
    }

    fn maybe_panic(&self, hook: &str) {
        if self.panic_in == Some(hook) {
            panic!("{} exploded in {}", self.manifest.id, hook);
        }
    }
}

#[async_trait]
impl Plugin for Recorder {
    fn manifest(&self) -> PluginManifest {
        self.manifest.clone()
    }

    async fn on_load(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
        self.record("on_load");
        self.maybe_panic("on_load");
        self.addresses.lock().push(self as *const Self as usize);
        if self.hang_on_load {
            std::future::pending::<()>().await;
        }
        match &self.fail_load {
            Some(message) => Err(PluginError::custom(message.clone())),
            None => Ok(()),
        }
    }

    async fn on_unload(&mut self) {
        if let Some(delay) = self.unload_delay {
            tokio::time::sleep(delay).await;
        }
        self.record("on_unload");
    }

    fn on_frame(&mut self, delta_time: f64) {
        self.maybe_panic("on_frame");
        self.record("on_frame");
        self.deltas.lock().push(delta_time);
    }

    fn on_bio_data_update(&mut self, data: &BioData) {
        self.record(&format!("bio:{}", data.coherence));
    }

    fn on_quantum_state_change(&mut self, state: &QuantumPluginState) {
        self.record(&format!("quantum:{}", state.superposition_count));
    }

    fn process_audio(&mut self, buffer: &mut [f32], _sample_rate: f64, _channel_count: usize) {
        self.maybe_panic("process_audio");
        self.record("process_audio");
        for sample in buffer.iter_mut() {
            *sample += self.audio_offset;
        }
    }

    fn render_visual(&mut self, context: &VisualContext) -> Option<VisualOutput> {
        self.maybe_panic("render_visual");
        self.record("render_visual");
        Some(VisualOutput::default().with_uniform("frame", context.frame as f32))
    }

    fn handle_interaction(&mut self, event: &InteractionEvent) {
        self.record(&format!("interaction:{:?}", event.kind));
    }
}

/// Captures the context it was loaded with
pub struct ContextCapture {
    pub captured: Arc<Mutex<Option<PluginContext>>>,
}

#[async_trait]
impl Plugin for ContextCapture {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("test.context", "Context Capture")
    }

    async fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        *self.captured.lock() = Some(ctx.clone());
        Ok(())
    }

    async fn on_unload(&mut self) {}
}
