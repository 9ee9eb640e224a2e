//! PluginRegistry - plugin lifecycle and coordination-context dispatch

use futures_util::FutureExt;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, broadcast};

use echoel_plugin_api::{
    BioData, Capability, InteractionEvent, Plugin, PluginContext, PluginError, PluginManifest,
    QuantumPluginState, SDK_VERSION, SharedState, VisualContext, VisualOutput,
};

use crate::audio::AudioChain;
use crate::config::HostConfig;
use crate::error::PluginHostError;
use crate::events::HostEvent;
use crate::router::{CapabilityRouter, Channel};
use crate::slot::PluginSlot;
use crate::version;

/// Capacity of the host event broadcast channel
const EVENT_CAPACITY: usize = 256;

/// Lifecycle state of a plugin id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Not known to the registry
    Unregistered,
    /// `on_load` is running
    Loading,
    /// Registered and receiving callbacks
    Active,
    /// Removed from routing, `on_unload` is running
    Unloading,
}

/// Information about a registered plugin
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub manifest: PluginManifest,
    pub state: PluginState,
    pub bypassed: bool,
    /// Hook that panicked, if the plugin has faulted
    pub fault: Option<String>,
}

/// The plugin registry owns every loaded plugin.
///
/// Lifecycle operations (`load`, `unload`, `reload`, `unload_all`) are
/// serialized through an async lock. Broadcast dispatch does not take that
/// lock and may run concurrently with them; a plugin is either routed or
/// not, never half-registered.
pub struct PluginRegistry {
    config: HostConfig,
    shared_state: Arc<SharedState>,
    plugins: RwLock<HashMap<String, Arc<PluginSlot>>>,
    transitions: RwLock<HashMap<String, PluginState>>,
    last_errors: RwLock<HashMap<String, String>>,
    router: Arc<CapabilityRouter>,
    lifecycle: Mutex<()>,
    next_order: AtomicU64,
    events: broadcast::Sender<HostEvent>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new(config: HostConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared_state: Arc::new(SharedState::with_capacity(config.message_capacity)),
            config,
            plugins: RwLock::new(HashMap::new()),
            transitions: RwLock::new(HashMap::new()),
            last_errors: RwLock::new(HashMap::new()),
            router: Arc::new(CapabilityRouter::new()),
            lifecycle: Mutex::new(()),
            next_order: AtomicU64::new(0),
            events,
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The host-wide shared state bus
    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.shared_state
    }

    pub fn router(&self) -> &Arc<CapabilityRouter> {
        &self.router
    }

    /// An audio chain reading this registry's routing
    pub fn audio_chain(&self) -> AudioChain {
        AudioChain::new(Arc::clone(&self.router))
    }

    /// Subscribe to lifecycle and fault events
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Load a plugin instance.
    ///
    /// On success the plugin is routed to every channel its capabilities
    /// select. On failure the registry is unchanged apart from the recorded
    /// error for the id.
    pub async fn load(&self, instance: Box<dyn Plugin>) -> Result<(), PluginHostError> {
        let _lifecycle = self.lifecycle.lock().await;
        self.load_locked(instance).await
    }

    /// Unload a plugin by id
    pub async fn unload(&self, id: &str) -> Result<(), PluginHostError> {
        let _lifecycle = self.lifecycle.lock().await;
        self.unload_locked(id).await.map(drop)
    }

    /// Unload then load the same instance
    pub async fn reload(&self, id: &str) -> Result<(), PluginHostError> {
        let _lifecycle = self.lifecycle.lock().await;
        let instance = self.unload_locked(id).await?;
        tracing::info!(plugin = %id, "Reloading plugin");
        match instance {
            Some(instance) => self.load_locked(instance).await,
            None => Err(PluginHostError::NotFound { id: id.to_string() }),
        }
    }

    /// Unload every plugin in registration order, continuing past failures.
    ///
    /// Returns the ids that were unloaded.
    pub async fn unload_all(&self) -> Vec<String> {
        let _lifecycle = self.lifecycle.lock().await;
        let mut unloaded = Vec::new();
        for id in self.ids() {
            match self.unload_locked(&id).await {
                Ok(_) => unloaded.push(id),
                Err(e) => {
                    tracing::warn!(plugin = %id, error = %e, "Failed to unload plugin");
                }
            }
        }
        unloaded
    }

    async fn load_locked(&self, mut instance: Box<dyn Plugin>) -> Result<(), PluginHostError> {
        let manifest = instance.manifest();
        let id = manifest.id.clone();

        if self.plugins.read().contains_key(&id) {
            return Err(PluginHostError::AlreadyLoaded { id });
        }

        if let Err(e) = self.prepare(&manifest).await {
            self.record_failure(&id, &e);
            return Err(e);
        }

        let ctx = PluginContext::new(id.clone(), Arc::clone(&self.shared_state))
            .with_host_app_version(self.config.host_app_version.clone())
            .with_device(self.config.device.clone())
            .with_directories(
                self.config.plugin_data_dir(&id),
                self.config.plugin_cache_dir(&id),
            );

        self.transitions
            .write()
            .insert(id.clone(), PluginState::Loading);
        tracing::debug!(plugin = %id, "Calling on_load");

        let timeout = self.config.load_timeout();
        let on_load = AssertUnwindSafe(instance.on_load(&ctx)).catch_unwind();
        let outcome = tokio::time::timeout(timeout, on_load).await;
        self.transitions.write().remove(&id);

        let result = match outcome {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(PluginHostError::LoadFailed(e)),
            Ok(Err(payload)) => Err(PluginHostError::LoadFailed(PluginError::custom(format!(
                "on_load panicked: {}",
                panic_message(&*payload)
            )))),
            Err(_) => Err(PluginHostError::Timeout {
                id: id.clone(),
                timeout,
            }),
        };
        if let Err(e) = result {
            self.record_failure(&id, &e);
            return Err(e);
        }

        let order = self.next_order.fetch_add(1, Ordering::Relaxed);
        let version = manifest.version.clone();
        let capabilities = manifest.capabilities.clone();
        let slot = Arc::new(PluginSlot::new(manifest, order, instance));
        self.plugins.write().insert(id.clone(), slot);
        self.rebuild_routes();
        self.last_errors.write().remove(&id);

        tracing::info!(
            plugin = %id,
            version = %version,
            capabilities = ?capabilities,
            "Plugin loaded"
        );
        self.publish(HostEvent::PluginLoaded { id, version });
        Ok(())
    }

    /// Validate the manifest and create the plugin's directories
    async fn prepare(&self, manifest: &PluginManifest) -> Result<(), PluginHostError> {
        let id = manifest.id.as_str();
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
            return Err(PluginHostError::InvalidId { id: id.to_string() });
        }

        version::check_compatible(&manifest.required_sdk_version, SDK_VERSION)?;
        self.check_relations(manifest)?;

        tokio::fs::create_dir_all(self.config.plugin_data_dir(id)).await?;
        tokio::fs::create_dir_all(self.config.plugin_cache_dir(id)).await?;
        Ok(())
    }

    /// Dependencies must be loaded; neither side of a declared conflict may be
    fn check_relations(&self, manifest: &PluginManifest) -> Result<(), PluginHostError> {
        let plugins = self.plugins.read();

        if let Some(dependency) = manifest
            .dependencies
            .iter()
            .find(|dependency| !plugins.contains_key(dependency.as_str()))
        {
            return Err(PluginHostError::MissingDependency {
                id: manifest.id.clone(),
                dependency: dependency.clone(),
            });
        }

        let conflicting = plugins.values().find(|slot| {
            manifest.conflicts.iter().any(|other| other == slot.id())
                || slot.manifest().conflicts.contains(&manifest.id)
        });
        if let Some(slot) = conflicting {
            return Err(PluginHostError::Conflict {
                id: manifest.id.clone(),
                other: slot.id().to_string(),
            });
        }
        Ok(())
    }

    /// Remove a plugin from routing, run `on_unload`, and hand back the instance
    async fn unload_locked(&self, id: &str) -> Result<Option<Box<dyn Plugin>>, PluginHostError> {
        let slot = self
            .plugins
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| PluginHostError::NotFound { id: id.to_string() })?;

        self.transitions
            .write()
            .insert(id.to_string(), PluginState::Unloading);
        self.plugins.write().remove(id);
        self.rebuild_routes();

        let mut instance = slot.take_instance();
        if let Some(plugin) = instance.as_mut() {
            tracing::debug!(plugin = %id, "Calling on_unload");
            plugin.on_unload().await;
        }
        self.transitions.write().remove(id);

        tracing::info!(plugin = %id, "Plugin unloaded");
        self.publish(HostEvent::PluginUnloaded { id: id.to_string() });
        Ok(instance)
    }

    fn rebuild_routes(&self) {
        let slots: Vec<_> = self.plugins.read().values().cloned().collect();
        self.router.rebuild(slots);
    }

    fn record_failure(&self, id: &str, error: &PluginHostError) {
        tracing::error!(plugin = %id, error = %error, "Plugin failed to load");
        self.last_errors
            .write()
            .insert(id.to_string(), error.to_string());
        self.publish(HostEvent::PluginLoadFailed {
            id: id.to_string(),
            error: error.to_string(),
        });
    }

    fn publish(&self, event: HostEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // ─── Queries ────────────────────────────────────────────────────

    pub fn contains(&self, id: &str) -> bool {
        self.plugins.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> Vec<String> {
        self.router.members(Channel::Frame)
    }

    /// Manifest captured when the plugin was loaded
    pub fn manifest(&self, id: &str) -> Option<PluginManifest> {
        self.plugins
            .read()
            .get(id)
            .map(|slot| slot.manifest().clone())
    }

    pub fn state(&self, id: &str) -> PluginState {
        if let Some(state) = self.transitions.read().get(id) {
            return *state;
        }
        if self.contains(id) {
            PluginState::Active
        } else {
            PluginState::Unregistered
        }
    }

    /// Most recent failure for the id, cleared by the next successful load
    pub fn last_error(&self, id: &str) -> Option<String> {
        self.last_errors.read().get(id).cloned()
    }

    /// Ids declaring `capability`, in registration order
    pub fn find_by_capability(&self, capability: Capability) -> Vec<String> {
        self.router
            .table()
            .all()
            .iter()
            .filter(|slot| slot.manifest().has_capability(capability))
            .map(|slot| slot.id().to_string())
            .collect()
    }

    /// Like [`find_by_capability`](Self::find_by_capability), taking the wire name
    pub fn find_by_capability_name(&self, name: &str) -> Result<Vec<String>, PluginHostError> {
        let capability: Capability = name.parse().map_err(|_| PluginHostError::InvalidCapability {
            name: name.to_string(),
        })?;
        Ok(self.find_by_capability(capability))
    }

    /// Registered plugins in registration order
    pub fn list(&self) -> Vec<PluginInfo> {
        self.router
            .table()
            .all()
            .iter()
            .map(|slot| PluginInfo {
                manifest: slot.manifest().clone(),
                state: self.state(slot.id()),
                bypassed: slot.is_bypassed(),
                fault: slot.fault().map(str::to_string),
            })
            .collect()
    }

    /// Skip a plugin on the audio and visual channels without unloading it
    pub fn set_bypassed(&self, id: &str, bypassed: bool) -> Result<(), PluginHostError> {
        let plugins = self.plugins.read();
        let slot = plugins
            .get(id)
            .ok_or_else(|| PluginHostError::NotFound { id: id.to_string() })?;
        slot.set_bypassed(bypassed);
        tracing::info!(plugin = %id, bypassed, "Plugin bypass changed");
        Ok(())
    }

    // ─── Dispatch ───────────────────────────────────────────────────

    /// Call `on_frame` on every plugin
    pub fn dispatch_frame(&self, delta_time: f64) {
        self.for_each(Channel::Frame, "on_frame", |plugin| {
            plugin.on_frame(delta_time)
        });
    }

    /// Call `on_bio_data_update` on every plugin
    pub fn broadcast_bio_data(&self, data: &BioData) {
        self.for_each(Channel::Bio, "on_bio_data_update", |plugin| {
            plugin.on_bio_data_update(data)
        });
    }

    /// Call `on_quantum_state_change` on every plugin
    pub fn broadcast_quantum_state(&self, state: &QuantumPluginState) {
        self.for_each(Channel::Quantum, "on_quantum_state_change", |plugin| {
            plugin.on_quantum_state_change(state)
        });
    }

    /// Call `handle_interaction` on every plugin
    pub fn dispatch_interaction(&self, event: &InteractionEvent) {
        self.for_each(Channel::Interaction, "handle_interaction", |plugin| {
            plugin.handle_interaction(event)
        });
    }

    /// Collect visual outputs from the visual channel, in dispatch order
    pub fn render_visuals(&self, context: &VisualContext) -> Vec<VisualOutput> {
        let table = self.router.table();
        let outputs: Vec<VisualOutput> = table
            .members(Channel::Visual)
            .iter()
            .filter(|slot| !slot.is_bypassed())
            .filter_map(|slot| {
                slot.dispatch("render_visual", |plugin| plugin.render_visual(context))
                    .flatten()
            })
            .collect();
        drop(table);
        self.report_faults();
        outputs
    }

    fn for_each(&self, channel: Channel, hook: &'static str, f: impl Fn(&mut dyn Plugin)) {
        let table = self.router.table();
        for slot in table.members(channel) {
            slot.dispatch(hook, &f);
        }
        drop(table);
        self.report_faults();
    }

    /// Log, record and publish faults raised since the last report,
    /// including those from the audio chain.
    fn report_faults(&self) {
        let table = self.router.table();
        for slot in table.all() {
            if let Some(hook) = slot.take_unreported_fault() {
                let message = format!("Plugin panicked in {hook}");
                tracing::error!(plugin = %slot.id(), hook, "Plugin panicked, disabling");
                self.last_errors
                    .write()
                    .insert(slot.id().to_string(), message);
                self.publish(HostEvent::PluginFaulted {
                    id: slot.id().to_string(),
                    hook: hook.to_string(),
                });
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.ids())
            .field("router", &self.router)
            .finish()
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        let remaining = self.plugins.get_mut().len();
        if remaining > 0 {
            tracing::warn!(
                remaining,
                "Plugin registry dropped without unload_all; on_unload was not called"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Minimal {
        manifest: PluginManifest,
    }

    #[async_trait::async_trait]
    impl Plugin for Minimal {
        fn manifest(&self) -> PluginManifest {
            self.manifest.clone()
        }

        async fn on_load(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
            Ok(())
        }

        async fn on_unload(&mut self) {}
    }

    fn minimal(id: &str) -> Box<dyn Plugin> {
        Box::new(Minimal {
            manifest: PluginManifest::new(id, id),
        })
    }

    fn registry(dir: &TempDir) -> PluginRegistry {
        PluginRegistry::new(HostConfig::default().with_root(dir.path()))
    }

    #[test]
    fn test_new_registry_is_empty() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.state("missing"), PluginState::Unregistered);
        assert_eq!(registry.shared_state().capacity(), 100);
    }

    #[tokio::test]
    async fn test_load_creates_plugin_directories() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        registry.load(minimal("com.echoel.a")).await.unwrap();

        assert!(registry.config().plugin_data_dir("com.echoel.a").is_dir());
        assert!(registry.config().plugin_cache_dir("com.echoel.a").is_dir());
        assert_eq!(registry.state("com.echoel.a"), PluginState::Active);

        registry.unload_all().await;
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        for id in ["", "..", "a/b"] {
            let err = registry.load(minimal(id)).await.unwrap_err();
            assert!(matches!(err, PluginHostError::InvalidId { .. }), "{id:?}");
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_set_bypassed_unknown_id() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        assert!(matches!(
            registry.set_bypassed("nope", true),
            Err(PluginHostError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_by_capability_name_unknown() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let err = registry.find_by_capability_name("telepathy").unwrap_err();
        assert!(matches!(err, PluginHostError::InvalidCapability { ref name } if name == "telepathy"));
    }
}
