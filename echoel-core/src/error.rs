//! Plugin host error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the plugin host
#[derive(Error, Debug)]
pub enum PluginHostError {
    /// A plugin with this id is already registered
    #[error("Plugin '{id}' is already loaded")]
    AlreadyLoaded { id: String },

    /// Plugin not found
    #[error("Plugin '{id}' not found")]
    NotFound { id: String },

    /// Plugin id cannot be used as a directory name
    #[error("Invalid plugin id '{id}'")]
    InvalidId { id: String },

    /// Plugin needs a newer SDK than the host provides
    #[error("Plugin requires SDK {required}, host provides {current}")]
    IncompatibleVersion { required: String, current: String },

    /// Version string could not be parsed
    #[error("Invalid version string '{version}'")]
    InvalidVersion { version: String },

    /// A declared dependency is not loaded
    #[error("Plugin '{id}' depends on '{dependency}', which is not loaded")]
    MissingDependency { id: String, dependency: String },

    /// The plugin and a loaded plugin declare each other incompatible
    #[error("Plugin '{id}' conflicts with loaded plugin '{other}'")]
    Conflict { id: String, other: String },

    /// Plugin `on_load` returned an error
    #[error("Plugin load failed: {0}")]
    LoadFailed(#[from] echoel_plugin_api::PluginError),

    /// Unknown capability name
    #[error("Unknown capability '{name}'")]
    InvalidCapability { name: String },

    /// Plugin `on_load` did not finish within the deadline
    #[error("Plugin '{id}' timed out after {timeout:?}")]
    Timeout { id: String, timeout: Duration },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
