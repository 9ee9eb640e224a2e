//! PluginContext - the snapshot a plugin receives at load

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::shared_state::SharedState;

// ─── Platform & Device ──────────────────────────────────────────────

/// Operating system the host is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Ios,
    Android,
    Other,
}

impl Platform {
    /// Platform the binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else {
            Platform::Other
        }
    }
}

/// Hardware features the host exposes to plugins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeviceCapabilities {
    pub has_gpu: bool,
    pub has_neural_engine: bool,
    pub has_biometrics: bool,
    pub has_haptics: bool,
    pub has_spatial_audio: bool,
    /// Largest square texture edge the GPU accepts, 0 if unknown
    pub max_texture_size: u32,
    pub cpu_cores: u32,
    pub memory_mb: u64,
}

impl DeviceCapabilities {
    /// Detect what can be learned without platform APIs.
    ///
    /// Only the CPU core count is detected; everything else stays off
    /// until configured.
    pub fn detect() -> Self {
        let cpu_cores = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);
        Self {
            cpu_cores,
            ..Default::default()
        }
    }
}

// ─── Context ────────────────────────────────────────────────────────

/// Plugin's view of the host at load time.
///
/// The context is built by the host right before `on_load` and is
/// immutable from the plugin's side. A plugin that needs the shared state
/// later should clone the handle out of [`PluginContext::shared_state`].
#[derive(Debug, Clone)]
pub struct PluginContext {
    plugin_id: String,
    sdk_version: String,
    host_app_version: String,
    platform: Platform,
    device: DeviceCapabilities,
    data_dir: PathBuf,
    cache_dir: PathBuf,
    shared_state: Arc<SharedState>,
}

impl PluginContext {
    /// Create a context with default host info and empty directories
    pub fn new(plugin_id: impl Into<String>, shared_state: Arc<SharedState>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            sdk_version: crate::SDK_VERSION.to_string(),
            host_app_version: String::new(),
            platform: Platform::current(),
            device: DeviceCapabilities::default(),
            data_dir: PathBuf::new(),
            cache_dir: PathBuf::new(),
            shared_state,
        }
    }

    /// Builder: set the host application version
    pub fn with_host_app_version(mut self, version: impl Into<String>) -> Self {
        self.host_app_version = version.into();
        self
    }

    /// Builder: override the SDK version reported to the plugin
    pub fn with_sdk_version(mut self, version: impl Into<String>) -> Self {
        self.sdk_version = version.into();
        self
    }

    /// Builder: set device capabilities
    pub fn with_device(mut self, device: DeviceCapabilities) -> Self {
        self.device = device;
        self
    }

    /// Builder: set the plugin's data and cache directories
    pub fn with_directories(mut self, data_dir: PathBuf, cache_dir: PathBuf) -> Self {
        self.data_dir = data_dir;
        self.cache_dir = cache_dir;
        self
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn sdk_version(&self) -> &str {
        &self.sdk_version
    }

    pub fn host_app_version(&self) -> &str {
        &self.host_app_version
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn device(&self) -> &DeviceCapabilities {
        &self.device
    }

    /// Directory for persistent plugin data, created by the host
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory for disposable plugin data, created by the host
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The host-wide shared state bus
    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.shared_state
    }

    // ─── Logging ────────────────────────────────────────────────────

    /// Log an info message
    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin_id, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin_id, "{}", message);
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        tracing::error!(plugin = %self.plugin_id, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(plugin = %self.plugin_id, "{}", message);
    }
}
