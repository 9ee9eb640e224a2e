use echoel_core::HostConfig;
use echoel_plugin_api::DeviceCapabilities;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default audio sample rate
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Default interleaved channel count
pub const DEFAULT_CHANNELS: u16 = 2;

/// Default frames per audio callback
pub const DEFAULT_BUFFER_FRAMES: usize = 512;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEchoelConfig {
    #[serde(default)]
    pub host: RawHostConfig,

    #[serde(default)]
    pub audio: RawAudioConfig,
}

/// Host config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawHostConfig {
    pub host_app_version: Option<String>,
    pub frame_rate_hz: Option<f64>,
    pub load_timeout_ms: Option<u64>,
    pub message_capacity: Option<usize>,
    pub data_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    /// Replaces the detected device capabilities as a whole
    pub device: Option<DeviceCapabilities>,
}

/// Audio config as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawAudioConfig {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub buffer_frames: Option<usize>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EchoelConfig {
    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub host: HostConfig,
}

/// Simulated audio device settings for `echoel run`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            buffer_frames: DEFAULT_BUFFER_FRAMES,
        }
    }
}

impl AudioConfig {
    /// Wall-clock length of one buffer
    pub fn buffer_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.buffer_frames as f64 / self.sample_rate.max(1) as f64)
    }
}
