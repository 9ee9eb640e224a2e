//! echoel-core - the Echoel plugin host
//!
//! This crate owns loaded plugins and dispatches to them across three
//! timing domains:
//!
//! - **Coordination**: the tokio runtime. Lifecycle operations on the
//!   [`PluginRegistry`], broadcasts, and the [`FrameScheduler`] tick.
//! - **Real-time audio**: [`AudioChain::process`], called from any OS audio
//!   thread. It never blocks, allocates or logs.
//! - **Plugin-internal**: anything a plugin does with its
//!   [`SharedState`](echoel_plugin_api::SharedState) handle.
//!
//! Which plugins a dispatch reaches is decided by the [`CapabilityRouter`],
//! rebuilt on every registration change.

pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod registry;
pub mod router;
pub mod scheduler;
mod slot;
pub mod version;

pub use audio::AudioChain;
pub use config::HostConfig;
pub use error::PluginHostError;
pub use events::HostEvent;
pub use registry::{PluginInfo, PluginRegistry, PluginState};
pub use router::{CapabilityRouter, Channel};
pub use scheduler::{FrameScheduler, SchedulerHandle};
pub use version::{SdkVersion, check_compatible};

pub use echoel_plugin_api as api;
