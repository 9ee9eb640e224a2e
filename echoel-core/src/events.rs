//! Host lifecycle events
//!
//! The registry publishes these on a broadcast channel. Subscribers that
//! fall behind see `RecvError::Lagged`; publishing with no subscribers is
//! not an error.

use serde::Serialize;

/// Something that happened to a plugin in the registry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// `on_load` succeeded and the plugin joined its channels
    PluginLoaded { id: String, version: String },
    /// The plugin left every channel and `on_unload` has returned
    PluginUnloaded { id: String },
    /// The plugin was refused or `on_load` failed
    PluginLoadFailed { id: String, error: String },
    /// A dispatch hook panicked; the plugin no longer receives callbacks
    PluginFaulted { id: String, hook: String },
}

impl HostEvent {
    /// Id of the plugin the event is about
    pub fn plugin_id(&self) -> &str {
        match self {
            HostEvent::PluginLoaded { id, .. }
            | HostEvent::PluginUnloaded { id }
            | HostEvent::PluginLoadFailed { id, .. }
            | HostEvent::PluginFaulted { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_id() {
        let event = HostEvent::PluginFaulted {
            id: "a".into(),
            hook: "on_frame".into(),
        };
        assert_eq!(event.plugin_id(), "a");
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let event = HostEvent::PluginUnloaded { id: "b".into() };
        let rendered = toml::to_string(&event).unwrap();
        assert!(rendered.contains("type = \"plugin_unloaded\""));
        assert!(rendered.contains("id = \"b\""));
    }
}
