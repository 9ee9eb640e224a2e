//! SharedState - host-owned parameter, flag and message bus
//!
//! Every loaded plugin holds the same `Arc<SharedState>` through its
//! context. All operations go through one internal mutex, so callers never
//! lock anything themselves.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Number of messages retained before the oldest are evicted
pub const DEFAULT_MESSAGE_CAPACITY: usize = 100;

/// A message posted on the shared bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMessage {
    pub from_plugin: String,
    /// Recipient id; `None` means every plugin
    pub to_plugin: Option<String>,
    pub message_type: String,
    pub data: HashMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl PluginMessage {
    /// Create a broadcast message, stamped now
    pub fn new(from_plugin: impl Into<String>, message_type: impl Into<String>) -> Self {
        Self {
            from_plugin: from_plugin.into(),
            to_plugin: None,
            message_type: message_type.into(),
            data: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Builder: address the message to one plugin
    pub fn to(mut self, plugin_id: impl Into<String>) -> Self {
        self.to_plugin = Some(plugin_id.into());
        self
    }

    /// Builder: add a payload entry
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Whether `plugin_id` should see this message
    pub fn is_visible_to(&self, plugin_id: Option<&str>) -> bool {
        self.to_plugin.is_none() || self.to_plugin.as_deref() == plugin_id
    }
}

#[derive(Debug, Default)]
struct Inner {
    parameters: HashMap<String, f64>,
    flags: HashMap<String, bool>,
    messages: VecDeque<PluginMessage>,
}

/// Concurrent key/value store plus bounded message queue
#[derive(Debug)]
pub struct SharedState {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MESSAGE_CAPACITY)
    }

    /// Create a bus that retains at most `capacity` messages (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                messages: VecDeque::with_capacity(capacity),
                ..Default::default()
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // ─── Parameters ─────────────────────────────────────────────────

    pub fn set_parameter(&self, key: impl Into<String>, value: f64) {
        self.inner.lock().parameters.insert(key.into(), value);
    }

    pub fn get_parameter(&self, key: &str) -> Option<f64> {
        self.inner.lock().parameters.get(key).copied()
    }

    /// Snapshot of every parameter
    pub fn parameters(&self) -> HashMap<String, f64> {
        self.inner.lock().parameters.clone()
    }

    // ─── Flags ──────────────────────────────────────────────────────

    pub fn set_flag(&self, key: impl Into<String>, value: bool) {
        self.inner.lock().flags.insert(key.into(), value);
    }

    /// Returns false for a flag that was never set
    pub fn get_flag(&self, key: &str) -> bool {
        self.inner.lock().flags.get(key).copied().unwrap_or(false)
    }

    // ─── Messages ───────────────────────────────────────────────────

    /// Append a message, evicting the oldest beyond capacity
    pub fn send_message(&self, message: PluginMessage) {
        let mut inner = self.inner.lock();
        inner.messages.push_back(message);
        while inner.messages.len() > self.capacity {
            inner.messages.pop_front();
        }
    }

    /// Messages visible to `for_id` in insertion order.
    ///
    /// Broadcast messages are always included. Reading does not consume.
    pub fn get_messages(&self, for_id: Option<&str>) -> Vec<PluginMessage> {
        self.inner
            .lock()
            .messages
            .iter()
            .filter(|m| m.is_visible_to(for_id))
            .cloned()
            .collect()
    }

    pub fn message_count(&self) -> usize {
        self.inner.lock().messages.len()
    }

    pub fn clear_messages(&self) {
        self.inner.lock().messages.clear();
    }
}
