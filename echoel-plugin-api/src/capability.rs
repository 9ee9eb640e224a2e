//! Capability tags - select which dispatch channels a plugin joins

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::PluginError;

/// A declared capability of a plugin.
///
/// Capabilities are fixed for the lifetime of a loaded plugin. The host uses
/// them to decide which dispatch channels the plugin participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    /// Transforms the audio stream in place
    AudioEffect,
    /// Adds generated sound to the audio stream
    AudioGenerator,
    /// Draws into the visual frame
    Visualization,
    /// Provides shader uniforms for the visual frame
    ShaderEffect,
    /// Derives values from bio-data
    BioProcessing,
    /// Acts as a source of bio-data
    BioInput,
    /// Consumes quantum emulation state
    QuantumProcessing,
    /// Consumes gesture input
    GestureInput,
    /// Generates content with a model
    AiGeneration,
    /// Drives external hardware
    HardwareControl,
    /// Synchronises with peers over the network
    NetworkSync,
    /// Emits DMX lighting frames
    DmxOutput,
    /// Emits laser point frames
    LaserOutput,
}

/// The set of capabilities a plugin declares
pub type CapabilitySet = BTreeSet<Capability>;

impl Capability {
    /// Every capability, in declaration order
    pub const ALL: [Capability; 13] = [
        Capability::AudioEffect,
        Capability::AudioGenerator,
        Capability::Visualization,
        Capability::ShaderEffect,
        Capability::BioProcessing,
        Capability::BioInput,
        Capability::QuantumProcessing,
        Capability::GestureInput,
        Capability::AiGeneration,
        Capability::HardwareControl,
        Capability::NetworkSync,
        Capability::DmxOutput,
        Capability::LaserOutput,
    ];

    /// Wire name of the capability
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::AudioEffect => "audioEffect",
            Capability::AudioGenerator => "audioGenerator",
            Capability::Visualization => "visualization",
            Capability::ShaderEffect => "shaderEffect",
            Capability::BioProcessing => "bioProcessing",
            Capability::BioInput => "bioInput",
            Capability::QuantumProcessing => "quantumProcessing",
            Capability::GestureInput => "gestureInput",
            Capability::AiGeneration => "aiGeneration",
            Capability::HardwareControl => "hardwareControl",
            Capability::NetworkSync => "networkSync",
            Capability::DmxOutput => "dmxOutput",
            Capability::LaserOutput => "laserOutput",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|cap| cap.as_str() == s)
            .ok_or_else(|| PluginError::InvalidCapability(s.to_string()))
    }
}
