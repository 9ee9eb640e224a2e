//! Host configuration

use echoel_plugin_api::{DEFAULT_MESSAGE_CAPACITY, DeviceCapabilities};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default coordination tick rate
pub const DEFAULT_FRAME_RATE_HZ: f64 = 60.0;

/// Shortest tick period, reached by very high frame rates
pub const MIN_FRAME_PERIOD: Duration = Duration::from_millis(1);

/// Longest tick period, reached by very low frame rates
pub const MAX_FRAME_PERIOD: Duration = Duration::from_secs(60);

/// Default deadline for `on_load`
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 5_000;

/// Configuration for [`PluginRegistry`](crate::PluginRegistry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Application version reported to plugins
    pub host_app_version: String,
    /// Nominal frame tick rate
    pub frame_rate_hz: f64,
    /// Deadline for a plugin's `on_load`
    pub load_timeout_ms: u64,
    /// Messages retained by the shared state bus
    pub message_capacity: usize,
    /// Root for per-plugin data directories
    pub data_dir: PathBuf,
    /// Root for per-plugin cache directories
    pub cache_dir: PathBuf,
    /// Hardware features exposed to plugins
    pub device: DeviceCapabilities,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host_app_version: env!("CARGO_PKG_VERSION").to_string(),
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            load_timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
            message_capacity: DEFAULT_MESSAGE_CAPACITY,
            data_dir: echoel_paths::data_dir(),
            cache_dir: echoel_paths::cache_dir(),
            device: DeviceCapabilities::detect(),
        }
    }
}

impl HostConfig {
    /// Builder: place data and cache roots under `root`
    pub fn with_root(mut self, root: &Path) -> Self {
        self.data_dir = root.join("data");
        self.cache_dir = root.join("cache");
        self
    }

    /// Builder: set the `on_load` deadline
    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Builder: set the frame rate
    pub fn with_frame_rate(mut self, hz: f64) -> Self {
        self.frame_rate_hz = hz;
        self
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Tick period, falling back to the default rate for non-positive values
    pub fn frame_period(&self) -> Duration {
        period_for_rate(self.frame_rate_hz)
            .unwrap_or_else(|| Duration::from_secs_f64(1.0 / DEFAULT_FRAME_RATE_HZ))
    }

    /// Data directory owned by one plugin
    pub fn plugin_data_dir(&self, id: &str) -> PathBuf {
        self.data_dir.join("plugins").join(id)
    }

    /// Cache directory owned by one plugin
    pub fn plugin_cache_dir(&self, id: &str) -> PathBuf {
        self.cache_dir.join("plugins").join(id)
    }
}

/// Period of a tick rate, clamped to [`MIN_FRAME_PERIOD`, `MAX_FRAME_PERIOD`].
///
/// `None` for rates that are not finite and positive.
pub(crate) fn period_for_rate(hz: f64) -> Option<Duration> {
    if !hz.is_finite() || hz <= 0.0 {
        return None;
    }
    let period = Duration::try_from_secs_f64(1.0 / hz).unwrap_or(MAX_FRAME_PERIOD);
    Some(period.clamp(MIN_FRAME_PERIOD, MAX_FRAME_PERIOD))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.frame_rate_hz, 60.0);
        assert_eq!(config.load_timeout(), Duration::from_secs(5));
        assert_eq!(config.message_capacity, 100);
        assert!(config.data_dir.ends_with("echoel"));
        assert!(config.device.cpu_cores >= 1);
    }

    #[test]
    fn test_frame_period() {
        let config = HostConfig::default().with_frame_rate(50.0);
        assert_eq!(config.frame_period(), Duration::from_millis(20));

        let broken = HostConfig::default().with_frame_rate(0.0);
        assert_eq!(broken.frame_period(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn test_extreme_frame_rates_are_clamped() {
        let crawling = HostConfig::default().with_frame_rate(1e-300);
        assert_eq!(crawling.frame_period(), MAX_FRAME_PERIOD);

        let racing = HostConfig::default().with_frame_rate(1e12);
        assert_eq!(racing.frame_period(), MIN_FRAME_PERIOD);

        let smallest = HostConfig::default().with_frame_rate(f64::MIN_POSITIVE);
        assert_eq!(smallest.frame_period(), MAX_FRAME_PERIOD);
    }

    #[test]
    fn test_period_for_rate_rejects_unusable_rates() {
        assert_eq!(period_for_rate(f64::NAN), None);
        assert_eq!(period_for_rate(f64::INFINITY), None);
        assert_eq!(period_for_rate(-5.0), None);
        assert_eq!(period_for_rate(100.0), Some(Duration::from_millis(10)));
    }

    #[test]
    fn test_plugin_directories() {
        let config = HostConfig::default().with_root(Path::new("/tmp/echoel-test"));
        assert_eq!(
            config.plugin_data_dir("com.echoel.gain"),
            PathBuf::from("/tmp/echoel-test/data/plugins/com.echoel.gain")
        );
        assert_eq!(
            config.plugin_cache_dir("com.echoel.gain"),
            PathBuf::from("/tmp/echoel-test/cache/plugins/com.echoel.gain")
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: HostConfig = toml::from_str("frame_rate_hz = 30.0\nload_timeout_ms = 250").unwrap();
        assert_eq!(config.frame_rate_hz, 30.0);
        assert_eq!(config.load_timeout(), Duration::from_millis(250));
        assert_eq!(config.message_capacity, 100);
    }
}
