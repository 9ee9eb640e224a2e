//! Plugin types and metadata structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::capability::{Capability, CapabilitySet};

/// Plugin manifest containing identity and declared capabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Globally unique id while loaded (e.g. "com.echoel.breath-pacer")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Plugin version (semver)
    pub version: String,
    /// Plugin author
    pub author: String,
    /// Human-readable description
    pub description: String,
    /// Minimum host SDK version this plugin needs
    pub required_sdk_version: String,
    /// Dispatch capabilities
    pub capabilities: CapabilitySet,
    /// Plugin ids that must already be loaded
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Plugin ids that must not be loaded alongside this one
    #[serde(default)]
    pub conflicts: Vec<String>,
}

impl Default for PluginManifest {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            version: "0.1.0".to_string(),
            author: String::new(),
            description: String::new(),
            required_sdk_version: crate::SDK_VERSION.to_string(),
            capabilities: CapabilitySet::new(),
            dependencies: Vec::new(),
            conflicts: Vec::new(),
        }
    }
}

impl PluginManifest {
    /// Create a manifest with the given id and name
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: set the plugin version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Builder: set the author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Builder: set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the minimum SDK version
    pub fn requires_sdk(mut self, version: impl Into<String>) -> Self {
        self.required_sdk_version = version.into();
        self
    }

    /// Builder: declare capabilities
    pub fn with_capabilities(mut self, caps: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(caps);
        self
    }

    /// Builder: require other plugins to be loaded first
    pub fn depends_on(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Builder: refuse to load alongside these plugins
    pub fn conflicts_with(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.conflicts.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Check if a capability is declared
    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }
}

// ─── Bio & Quantum Data ─────────────────────────────────────────────

/// A physiological snapshot from the bio-sensor producer.
///
/// Only `coherence` is always present; the rest depends on the sensors
/// available to the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioData {
    /// Heart coherence in [0, 1]
    pub coherence: f32,
    /// Beats per minute
    pub heart_rate: Option<f32>,
    /// HRV standard deviation of NN intervals (ms)
    pub hrv_sdnn: Option<f32>,
    /// HRV root mean square of successive differences (ms)
    pub hrv_rmssd: Option<f32>,
    /// Breaths per minute
    pub breathing_rate: Option<f32>,
    /// Electrodermal activity (microsiemens)
    pub skin_conductance: Option<f32>,
    /// Skin temperature (celsius)
    pub temperature: Option<f32>,
    pub timestamp: DateTime<Utc>,
}

impl BioData {
    /// Create a record with only coherence set, clamped into [0, 1]
    pub fn new(coherence: f32) -> Self {
        Self {
            coherence: if coherence.is_nan() {
                0.0
            } else {
                coherence.clamp(0.0, 1.0)
            },
            heart_rate: None,
            hrv_sdnn: None,
            hrv_rmssd: None,
            breathing_rate: None,
            skin_conductance: None,
            temperature: None,
            timestamp: Utc::now(),
        }
    }

    /// Builder: set heart rate
    pub fn with_heart_rate(mut self, bpm: f32) -> Self {
        self.heart_rate = Some(bpm);
        self
    }

    /// Builder: set breathing rate
    pub fn with_breathing_rate(mut self, per_minute: f32) -> Self {
        self.breathing_rate = Some(per_minute);
        self
    }

    /// Builder: set both HRV measures
    pub fn with_hrv(mut self, sdnn: f32, rmssd: f32) -> Self {
        self.hrv_sdnn = Some(sdnn);
        self.hrv_rmssd = Some(rmssd);
        self
    }
}

impl Default for BioData {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// How quantum state is being produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmulationMode {
    #[default]
    Classical,
    QuantumInspired,
    FullQuantum,
    Hybrid,
}

/// Quantum emulation state broadcast to plugins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumPluginState {
    pub coherence_level: f32,
    pub entanglement_strength: f32,
    pub superposition_count: u32,
    pub emulation_mode: EmulationMode,
    pub timestamp: DateTime<Utc>,
}

impl Default for QuantumPluginState {
    fn default() -> Self {
        Self {
            coherence_level: 0.0,
            entanglement_strength: 0.0,
            superposition_count: 0,
            emulation_mode: EmulationMode::default(),
            timestamp: Utc::now(),
        }
    }
}

// ─── Visual ─────────────────────────────────────────────────────────

/// Per-frame information handed to `render_visual`
#[derive(Debug, Clone, Default)]
pub struct VisualContext {
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// Seconds since the scheduler started
    pub time: f64,
    /// Seconds since the previous frame
    pub delta_time: f64,
    /// Frame counter
    pub frame: u64,
    /// Latest bio-data, if a producer is wired
    pub bio_data: Option<BioData>,
}

/// How a visual output is composited over the layers below it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Multiply,
    Screen,
    Overlay,
}

/// One plugin's contribution to a visual frame.
///
/// The visual consumer owns compositing; the host only preserves order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisualOutput {
    /// Raw RGBA pixels, if the plugin rendered on the CPU
    pub pixel_data: Option<Vec<u8>>,
    /// GPU texture handle, if the plugin rendered on the GPU
    pub texture_id: Option<u32>,
    /// Uniform values for the compositing shader
    pub shader_uniforms: HashMap<String, f32>,
    pub blend_mode: BlendMode,
}

impl VisualOutput {
    /// Builder: set a shader uniform
    pub fn with_uniform(mut self, name: impl Into<String>, value: f32) -> Self {
        self.shader_uniforms.insert(name.into(), value);
        self
    }

    /// Builder: set the blend mode
    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }
}

// ─── Interaction ────────────────────────────────────────────────────

/// Kind of user interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Tap,
    Drag,
    Pinch,
    Rotate,
    Gesture,
    Voice,
}

/// A user interaction routed to plugins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    /// Normalised position, for pointer-like interactions
    pub position: Option<(f32, f32)>,
    /// Scalar payload (pinch scale, rotation angle, ...)
    pub value: Option<f32>,
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    /// Create an event of the given kind, stamped now
    pub fn new(kind: InteractionKind) -> Self {
        Self {
            kind,
            position: None,
            value: None,
            timestamp: Utc::now(),
        }
    }

    /// Builder: set position
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Some((x, y));
        self
    }

    /// Builder: set value
    pub fn with_value(mut self, value: f32) -> Self {
        self.value = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_default_requires_current_sdk() {
        let manifest = PluginManifest::default();
        assert_eq!(manifest.required_sdk_version, crate::SDK_VERSION);
        assert!(manifest.capabilities.is_empty());
    }

    #[test]
    fn test_manifest_builder() {
        let manifest = PluginManifest::new("com.echoel.test", "Test")
            .with_version("2.1.0")
            .requires_sdk("1.2.0")
            .with_capabilities([Capability::Visualization, Capability::ShaderEffect]);

        assert_eq!(manifest.id, "com.echoel.test");
        assert_eq!(manifest.version, "2.1.0");
        assert_eq!(manifest.required_sdk_version, "1.2.0");
        assert!(manifest.has_capability(Capability::Visualization));
        assert!(!manifest.has_capability(Capability::AudioEffect));
    }

    #[test]
    fn test_manifest_relations() {
        let manifest = PluginManifest::new("com.echoel.viz", "Viz")
            .depends_on(["com.echoel.gain"])
            .conflicts_with(["com.echoel.other-viz", "com.echoel.legacy-viz"]);
        assert_eq!(manifest.dependencies, vec!["com.echoel.gain"]);
        assert_eq!(manifest.conflicts.len(), 2);

        let bare = PluginManifest::default();
        assert!(bare.dependencies.is_empty());
        assert!(bare.conflicts.is_empty());
    }

    #[test]
    fn test_manifest_relations_optional_in_toml() {
        let toml_str = r#"
id = "com.echoel.sine"
name = "Sine"
version = "1.0.0"
author = ""
description = ""
required_sdk_version = "1.0.0"
capabilities = ["audioGenerator"]
"#;
        let manifest: PluginManifest = toml::from_str(toml_str).unwrap();
        assert!(manifest.dependencies.is_empty());
        assert!(manifest.has_capability(Capability::AudioGenerator));
    }

    #[test]
    fn test_manifest_capabilities_deduplicate() {
        let manifest = PluginManifest::new("a", "A")
            .with_capabilities([Capability::AudioEffect, Capability::AudioEffect]);
        assert_eq!(manifest.capabilities.len(), 1);
    }

    #[test]
    fn test_bio_data_clamps_coherence() {
        assert_eq!(BioData::new(1.7).coherence, 1.0);
        assert_eq!(BioData::new(-0.2).coherence, 0.0);
        assert_eq!(BioData::new(f32::NAN).coherence, 0.0);
        assert_eq!(BioData::new(0.42).coherence, 0.42);
    }

    #[test]
    fn test_bio_data_optional_fields_default_to_none() {
        let data = BioData::new(0.5).with_heart_rate(62.0);
        assert_eq!(data.heart_rate, Some(62.0));
        assert!(data.hrv_sdnn.is_none());
        assert!(data.skin_conductance.is_none());
    }

    #[test]
    fn test_visual_output_builder() {
        let output = VisualOutput::default()
            .with_uniform("u_coherence", 0.8)
            .with_blend_mode(BlendMode::Add);

        assert_eq!(output.shader_uniforms.get("u_coherence"), Some(&0.8));
        assert_eq!(output.blend_mode, BlendMode::Add);
        assert!(output.pixel_data.is_none());
    }

    #[test]
    fn test_interaction_event_builder() {
        let event = InteractionEvent::new(InteractionKind::Pinch)
            .at(0.25, 0.75)
            .with_value(1.5);

        assert_eq!(event.kind, InteractionKind::Pinch);
        assert_eq!(event.position, Some((0.25, 0.75)));
        assert_eq!(event.value, Some(1.5));
    }
}
