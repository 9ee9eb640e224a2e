//! Built-in sample plugins used by `echoel run` and `echoel plugins`

use async_trait::async_trait;
use std::f64::consts::TAU;
use std::sync::Arc;

use echoel_plugin_api::{
    BioData, BlendMode, Capability, Plugin, PluginContext, PluginError, PluginManifest,
    PluginMessage, SharedState, VisualContext, VisualOutput,
};

/// Shared parameter the gain effect follows
pub const GAIN_PARAMETER: &str = "gain";

/// Shared parameter the breath pacer publishes, in [0, 1)
pub const BREATH_PHASE_PARAMETER: &str = "breath_phase";

/// One instance of every demo plugin, in load order
pub fn plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(SineGenerator::new(220.0, 0.1)),
        Box::new(GainEffect::default()),
        Box::new(CoherenceVisualizer::default()),
        Box::new(BreathPacer::default()),
    ]
}

// ─── Sine Generator ─────────────────────────────────────────────────

/// Adds a sine tone to every channel
pub struct SineGenerator {
    frequency: f64,
    amplitude: f32,
    phase: f64,
}

impl SineGenerator {
    pub fn new(frequency: f64, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
            phase: 0.0,
        }
    }
}

#[async_trait]
impl Plugin for SineGenerator {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("com.echoel.sine", "Sine Generator")
            .with_author("Echoel")
            .with_description("Adds a quiet sine tone to the output")
            .with_capabilities([Capability::AudioGenerator])
    }

    async fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        ctx.log_debug(&format!("tone at {} Hz", self.frequency));
        Ok(())
    }

    async fn on_unload(&mut self) {}

    fn process_audio(&mut self, buffer: &mut [f32], sample_rate: f64, channel_count: usize) {
        if channel_count == 0 || sample_rate <= 0.0 {
            return;
        }
        let step = TAU * self.frequency / sample_rate;
        for frame in buffer.chunks_mut(channel_count) {
            let value = self.amplitude * self.phase.sin() as f32;
            for sample in frame {
                *sample += value;
            }
            self.phase = (self.phase + step) % TAU;
        }
    }
}

// ─── Gain Effect ────────────────────────────────────────────────────

/// Scales the audio by a gain that follows heart coherence.
///
/// The target gain is read from the shared state on each frame tick and
/// smoothed, so `process_audio` only touches its own fields.
pub struct GainEffect {
    shared: Option<Arc<SharedState>>,
    target: f32,
    gain: f32,
}

impl Default for GainEffect {
    fn default() -> Self {
        Self {
            shared: None,
            target: 0.8,
            gain: 0.8,
        }
    }
}

#[async_trait]
impl Plugin for GainEffect {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("com.echoel.gain", "Coherence Gain")
            .with_author("Echoel")
            .with_description("Scales output level with heart coherence")
            .with_capabilities([Capability::AudioEffect, Capability::BioProcessing])
    }

    async fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        ctx.shared_state()
            .set_parameter(GAIN_PARAMETER, f64::from(self.target));
        self.shared = Some(Arc::clone(ctx.shared_state()));
        Ok(())
    }

    async fn on_unload(&mut self) {
        self.shared = None;
    }

    fn on_bio_data_update(&mut self, data: &BioData) {
        if let Some(shared) = &self.shared {
            shared.set_parameter(GAIN_PARAMETER, 0.4 + 0.6 * f64::from(data.coherence));
        }
    }

    fn on_frame(&mut self, delta_time: f64) {
        if let Some(gain) = self.shared.as_ref().and_then(|s| s.get_parameter(GAIN_PARAMETER)) {
            self.target = gain as f32;
        }
        // One-pole smoothing with a ~100 ms time constant
        let alpha = (delta_time / 0.1).min(1.0) as f32;
        self.gain += (self.target - self.gain) * alpha;
    }

    fn process_audio(&mut self, buffer: &mut [f32], _sample_rate: f64, _channel_count: usize) {
        for sample in buffer.iter_mut() {
            *sample *= self.gain;
        }
    }
}

// ─── Coherence Visualizer ───────────────────────────────────────────

/// Coherence above this posts a `coherence_high` message
const HIGH_COHERENCE: f32 = 0.7;

/// Renders heart coherence as shader uniforms
#[derive(Default)]
pub struct CoherenceVisualizer {
    shared: Option<Arc<SharedState>>,
    coherence: f32,
    heart_rate: Option<f32>,
    was_high: bool,
}

#[async_trait]
impl Plugin for CoherenceVisualizer {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("com.echoel.coherence-viz", "Coherence Visualizer")
            .with_author("Echoel")
            .with_description("Glow that brightens with heart coherence")
            .with_capabilities([Capability::Visualization, Capability::BioProcessing])
    }

    async fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        self.shared = Some(Arc::clone(ctx.shared_state()));
        Ok(())
    }

    async fn on_unload(&mut self) {
        self.shared = None;
    }

    fn on_bio_data_update(&mut self, data: &BioData) {
        self.coherence = data.coherence;
        self.heart_rate = data.heart_rate;

        let is_high = data.coherence >= HIGH_COHERENCE;
        if is_high && !self.was_high
            && let Some(shared) = &self.shared
        {
            shared.send_message(
                PluginMessage::new("com.echoel.coherence-viz", "coherence_high")
                    .with_data("coherence", format!("{:.2}", data.coherence)),
            );
        }
        self.was_high = is_high;
    }

    fn render_visual(&mut self, context: &VisualContext) -> Option<VisualOutput> {
        let pulse = match self.heart_rate {
            Some(bpm) => (context.time * f64::from(bpm) / 60.0 * TAU).sin() as f32 * 0.5 + 0.5,
            None => 0.0,
        };
        Some(
            VisualOutput::default()
                .with_uniform("u_coherence", self.coherence)
                .with_uniform("u_pulse", pulse)
                .with_uniform("u_time", context.time as f32)
                .with_blend_mode(BlendMode::Add),
        )
    }
}

// ─── Breath Pacer ───────────────────────────────────────────────────

/// Guides breathing at a slow rate and publishes the phase
pub struct BreathPacer {
    shared: Option<Arc<SharedState>>,
    breaths_per_minute: f64,
    phase: f64,
}

impl Default for BreathPacer {
    fn default() -> Self {
        Self {
            shared: None,
            breaths_per_minute: 6.0,
            phase: 0.0,
        }
    }
}

#[async_trait]
impl Plugin for BreathPacer {
    fn manifest(&self) -> PluginManifest {
        PluginManifest::new("com.echoel.breath-pacer", "Breath Pacer")
            .with_author("Echoel")
            .with_description("Resonance breathing guide")
            .with_capabilities([Capability::ShaderEffect, Capability::BioProcessing])
    }

    async fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        ctx.shared_state()
            .send_message(PluginMessage::new("com.echoel.breath-pacer", "pacer_ready"));
        self.shared = Some(Arc::clone(ctx.shared_state()));
        ctx.log_info(&format!("pacing at {} breaths/min", self.breaths_per_minute));
        Ok(())
    }

    async fn on_unload(&mut self) {
        self.shared = None;
    }

    fn on_bio_data_update(&mut self, data: &BioData) {
        // Drift gently toward the measured rate, staying in the resonance band
        if let Some(rate) = data.breathing_rate {
            let target = f64::from(rate).clamp(4.5, 7.0);
            self.breaths_per_minute += (target - self.breaths_per_minute) * 0.05;
        }
    }

    fn on_frame(&mut self, delta_time: f64) {
        self.phase = (self.phase + delta_time * self.breaths_per_minute / 60.0).fract();
        if let Some(shared) = &self.shared {
            shared.set_parameter(BREATH_PHASE_PARAMETER, self.phase);
        }
    }

    fn render_visual(&mut self, _context: &VisualContext) -> Option<VisualOutput> {
        let breath = (self.phase * TAU).sin() as f32 * 0.5 + 0.5;
        Some(
            VisualOutput::default()
                .with_uniform("u_breath", breath)
                .with_blend_mode(BlendMode::Screen),
        )
    }
}
