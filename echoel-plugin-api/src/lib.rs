//! echoel-plugin-api - Plugin API for the Echoel host
//!
//! This crate provides the traits and types needed to write plugins for the
//! Echoel bio-reactive audio/visual host. A plugin declares its identity and
//! capabilities once, receives lifecycle hooks from the host, and then takes
//! part in whichever dispatch channels its capabilities select.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//! use echoel_plugin_api::{Capability, Plugin, PluginContext, PluginError, PluginManifest};
//!
//! #[derive(Default)]
//! pub struct HalfGain;
//!
//! #[async_trait]
//! impl Plugin for HalfGain {
//!     fn manifest(&self) -> PluginManifest {
//!         PluginManifest::new("com.example.half-gain", "Half Gain")
//!             .with_capabilities([Capability::AudioEffect])
//!     }
//!
//!     async fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
//!         ctx.log_info("Half gain loaded!");
//!         Ok(())
//!     }
//!
//!     async fn on_unload(&mut self) {}
//!
//!     fn process_audio(&mut self, buffer: &mut [f32], _sample_rate: f64, _channels: usize) {
//!         for sample in buffer.iter_mut() {
//!             *sample *= 0.5;
//!         }
//!     }
//! }
//! ```

pub mod capability;
pub mod context;
pub mod error;
pub mod shared_state;
pub mod types;

use async_trait::async_trait;

pub use capability::{Capability, CapabilitySet};
pub use context::{DeviceCapabilities, Platform, PluginContext};
pub use error::PluginError;
pub use shared_state::{DEFAULT_MESSAGE_CAPACITY, PluginMessage, SharedState};
pub use types::*;

/// Current host SDK version.
///
/// A plugin whose `required_sdk_version` is newer than this is refused at load.
pub const SDK_VERSION: &str = "1.0.0";

/// The core plugin trait - implement this to create an Echoel plugin.
///
/// All dispatch hooks have default no-op implementations, so plugins only
/// need to override the hooks their capabilities call for.
///
/// # Real-time contract
///
/// Every hook except `on_load`/`on_unload` is called synchronously and must
/// not block. `process_audio` runs on the audio callback and must perform
/// no heap allocation, no locking, no I/O and no suspension. Values a plugin
/// wants to use while processing audio should be copied into its own fields
/// from `on_frame`, not read from [`SharedState`] on the audio thread.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Return plugin identity and capabilities.
    ///
    /// The host captures this once at load; later changes are not observed.
    fn manifest(&self) -> PluginManifest;

    /// Called when the plugin is loaded. Failing here keeps the plugin out of the registry.
    async fn on_load(&mut self, ctx: &PluginContext) -> Result<(), PluginError>;

    /// Called when the plugin is unloaded. Errors must be absorbed by the plugin.
    async fn on_unload(&mut self);

    // ─── Dispatch Hooks (default no-ops) ─────────────────────────────

    /// Called once per coordination tick with the measured elapsed seconds
    fn on_frame(&mut self, _delta_time: f64) {}

    /// Called when the bio-data producer publishes a new record
    fn on_bio_data_update(&mut self, _data: &BioData) {}

    /// Called when the quantum emulation state changes
    fn on_quantum_state_change(&mut self, _state: &QuantumPluginState) {}

    /// Process an interleaved sample buffer in place. Real-time safe only.
    fn process_audio(&mut self, _buffer: &mut [f32], _sample_rate: f64, _channel_count: usize) {}

    /// Produce this plugin's contribution to the current visual frame
    fn render_visual(&mut self, _context: &VisualContext) -> Option<VisualOutput> {
        None
    }

    /// Called for user interaction events (touch, gesture, voice)
    fn handle_interaction(&mut self, _event: &InteractionEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Silent;

    #[async_trait]
    impl Plugin for Silent {
        fn manifest(&self) -> PluginManifest {
            PluginManifest::new("test.silent", "Silent")
        }

        async fn on_load(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
            Ok(())
        }

        async fn on_unload(&mut self) {}
    }

    #[test]
    fn test_sdk_version_is_set() {
        assert_eq!(SDK_VERSION, "1.0.0");
    }

    #[test]
    fn test_plugin_trait_is_object_safe() {
        // This compiles only if Plugin is object-safe
        fn _takes_boxed_plugin(_: Box<dyn Plugin>) {}
    }

    #[test]
    fn test_default_hooks_are_no_ops() {
        let mut plugin = Silent;
        let mut buffer = [0.25_f32; 4];

        plugin.on_frame(1.0 / 60.0);
        plugin.process_audio(&mut buffer, 48_000.0, 2);

        assert_eq!(buffer, [0.25; 4]);
        assert!(plugin.render_visual(&VisualContext::default()).is_none());
    }

    #[tokio::test]
    async fn test_boxed_plugin_lifecycle() {
        let mut plugin: Box<dyn Plugin> = Box::new(Silent);
        let ctx = PluginContext::new("test.silent", std::sync::Arc::new(SharedState::new()));

        plugin.on_load(&ctx).await.unwrap();
        plugin.on_unload().await;
    }
}
