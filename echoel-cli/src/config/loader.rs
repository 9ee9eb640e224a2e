use super::types::{
    AudioConfig, DEFAULT_BUFFER_FRAMES, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, EchoelConfig,
    RawAudioConfig, RawEchoelConfig, RawHostConfig,
};
use anyhow::{Context, Result};
use echoel_core::HostConfig;
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<EchoelConfig> {
        Self::load_layers(&Self::layer_paths())
    }

    /// Config files in merge order, each paired with its layer name
    pub fn layers() -> [(&'static str, PathBuf); 2] {
        [
            ("user", Self::user_config_path()),
            ("project", Self::project_config_path()),
        ]
    }

    fn layer_paths() -> Vec<PathBuf> {
        Self::layers().into_iter().map(|(_, path)| path).collect()
    }

    /// Merge the given files in order, later files overriding earlier ones.
    /// Missing files are skipped.
    pub fn load_layers(paths: &[PathBuf]) -> Result<EchoelConfig> {
        let mut raw = RawEchoelConfig::default();

        for path in paths {
            if !path.exists() {
                continue;
            }
            let layer = Self::read_raw(path)?;
            tracing::debug!(path = %path.display(), "Loaded config layer");
            raw = Self::merge_raw(raw, layer);
        }

        // Convert to final config with defaults applied
        Ok(Self::finalize(raw))
    }

    fn read_raw(path: &Path) -> Result<RawEchoelConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    /// Get user config path
    pub fn user_config_path() -> PathBuf {
        echoel_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with ECHOEL_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("ECHOEL_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".echoel/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawEchoelConfig, overlay: RawEchoelConfig) -> RawEchoelConfig {
        RawEchoelConfig {
            host: RawHostConfig {
                host_app_version: overlay.host.host_app_version.or(base.host.host_app_version),
                frame_rate_hz: overlay.host.frame_rate_hz.or(base.host.frame_rate_hz),
                load_timeout_ms: overlay.host.load_timeout_ms.or(base.host.load_timeout_ms),
                message_capacity: overlay.host.message_capacity.or(base.host.message_capacity),
                data_dir: overlay.host.data_dir.or(base.host.data_dir),
                cache_dir: overlay.host.cache_dir.or(base.host.cache_dir),
                device: overlay.host.device.or(base.host.device),
            },
            audio: RawAudioConfig {
                sample_rate: overlay.audio.sample_rate.or(base.audio.sample_rate),
                channels: overlay.audio.channels.or(base.audio.channels),
                buffer_frames: overlay.audio.buffer_frames.or(base.audio.buffer_frames),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawEchoelConfig) -> EchoelConfig {
        let defaults = HostConfig::default();
        EchoelConfig {
            host: HostConfig {
                host_app_version: raw
                    .host
                    .host_app_version
                    .unwrap_or(defaults.host_app_version),
                frame_rate_hz: raw.host.frame_rate_hz.unwrap_or(defaults.frame_rate_hz),
                load_timeout_ms: raw.host.load_timeout_ms.unwrap_or(defaults.load_timeout_ms),
                message_capacity: raw
                    .host
                    .message_capacity
                    .unwrap_or(defaults.message_capacity),
                data_dir: raw.host.data_dir.unwrap_or(defaults.data_dir),
                cache_dir: raw.host.cache_dir.unwrap_or(defaults.cache_dir),
                device: raw.host.device.unwrap_or(defaults.device),
            },
            audio: AudioConfig {
                sample_rate: raw.audio.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE),
                channels: raw.audio.channels.unwrap_or(DEFAULT_CHANNELS),
                buffer_frames: raw.audio.buffer_frames.unwrap_or(DEFAULT_BUFFER_FRAMES),
            },
        }
    }
}
