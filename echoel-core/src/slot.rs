//! A registered plugin instance and its dispatch state

use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use echoel_plugin_api::{Plugin, PluginManifest};

/// One loaded plugin.
///
/// The instance sits behind a mutex so the coordination context and the
/// audio callback never touch it at the same time. The audio callback only
/// ever uses [`PluginSlot::try_dispatch`], which gives up instead of waiting.
pub(crate) struct PluginSlot {
    manifest: PluginManifest,
    order: u64,
    instance: Mutex<Option<Box<dyn Plugin>>>,
    bypassed: AtomicBool,
    /// Hook that panicked, set at most once
    fault: OnceLock<&'static str>,
    fault_reported: AtomicBool,
}

impl PluginSlot {
    pub(crate) fn new(manifest: PluginManifest, order: u64, instance: Box<dyn Plugin>) -> Self {
        Self {
            manifest,
            order,
            instance: Mutex::new(Some(instance)),
            bypassed: AtomicBool::new(false),
            fault: OnceLock::new(),
            fault_reported: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.manifest.id
    }

    /// Manifest captured at load
    pub(crate) fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// Registration sequence number
    pub(crate) fn order(&self) -> u64 {
        self.order
    }

    pub(crate) fn is_bypassed(&self) -> bool {
        self.bypassed.load(Ordering::Acquire)
    }

    pub(crate) fn set_bypassed(&self, bypassed: bool) {
        self.bypassed.store(bypassed, Ordering::Release);
    }

    pub(crate) fn fault(&self) -> Option<&'static str> {
        self.fault.get().copied()
    }

    /// Returns the faulting hook the first time it is asked after a panic
    pub(crate) fn take_unreported_fault(&self) -> Option<&'static str> {
        let hook = self.fault()?;
        if self.fault_reported.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(hook)
        }
    }

    /// Run `f` against the instance from the coordination context.
    ///
    /// Waits for the lock. Returns `None` if the plugin has faulted, is
    /// being unloaded, or panicked inside `f`.
    pub(crate) fn dispatch<R>(
        &self,
        hook: &'static str,
        f: impl FnOnce(&mut dyn Plugin) -> R,
    ) -> Option<R> {
        if self.fault().is_some() {
            return None;
        }
        let mut guard = self.instance.lock();
        let plugin = guard.as_mut()?;
        self.guarded(hook, || f(plugin.as_mut()))
    }

    /// Run `f` against the instance from the audio callback.
    ///
    /// Never blocks: if the instance is momentarily held elsewhere the call
    /// is skipped. Never allocates on the success path.
    pub(crate) fn try_dispatch<R>(
        &self,
        hook: &'static str,
        f: impl FnOnce(&mut dyn Plugin) -> R,
    ) -> Option<R> {
        if self.fault().is_some() {
            return None;
        }
        let mut guard = self.instance.try_lock()?;
        let plugin = guard.as_mut()?;
        self.guarded(hook, || f(plugin.as_mut()))
    }

    fn guarded<R>(&self, hook: &'static str, f: impl FnOnce() -> R) -> Option<R> {
        match std::panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Some(value),
            Err(_) => {
                let _ = self.fault.set(hook);
                None
            }
        }
    }

    /// Move the instance out for `on_unload`, waiting for any in-flight call
    pub(crate) fn take_instance(&self) -> Option<Box<dyn Plugin>> {
        self.instance.lock().take()
    }
}

impl std::fmt::Debug for PluginSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSlot")
            .field("id", &self.manifest.id)
            .field("order", &self.order)
            .field("bypassed", &self.is_bypassed())
            .field("fault", &self.fault())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echoel_plugin_api::{PluginContext, PluginError};

    struct Counter {
        frames: u32,
        panic_on_frame: bool,
    }

    #[async_trait::async_trait]
    impl Plugin for Counter {
        fn manifest(&self) -> PluginManifest {
            PluginManifest::new("test.counter", "Counter")
        }

        async fn on_load(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
            Ok(())
        }

        async fn on_unload(&mut self) {}

        fn on_frame(&mut self, _delta_time: f64) {
            if self.panic_on_frame {
                panic!("frame hook exploded");
            }
            self.frames += 1;
        }
    }

    fn slot(panic_on_frame: bool) -> PluginSlot {
        let plugin = Counter {
            frames: 0,
            panic_on_frame,
        };
        PluginSlot::new(plugin.manifest(), 0, Box::new(plugin))
    }

    #[test]
    fn test_dispatch_reaches_instance() {
        let slot = slot(false);
        assert_eq!(slot.dispatch("on_frame", |p| p.on_frame(0.016)), Some(()));
        assert!(slot.fault().is_none());
    }

    #[test]
    fn test_panic_marks_slot_faulted_once() {
        let slot = slot(true);
        assert!(slot.dispatch("on_frame", |p| p.on_frame(0.016)).is_none());
        assert_eq!(slot.fault(), Some("on_frame"));

        assert_eq!(slot.take_unreported_fault(), Some("on_frame"));
        assert_eq!(slot.take_unreported_fault(), None);

        // Faulted slots are skipped without calling the plugin
        let mut called = false;
        slot.dispatch("render_visual", |_| called = true);
        assert!(!called);
    }

    #[test]
    fn test_try_dispatch_skips_when_locked() {
        let slot = slot(false);
        let _held = slot.instance.lock();
        assert!(slot.try_dispatch("process_audio", |_| ()).is_none());
        assert!(slot.fault().is_none());
    }

    #[test]
    fn test_take_instance_empties_slot() {
        let slot = slot(false);
        assert!(slot.take_instance().is_some());
        assert!(slot.dispatch("on_frame", |p| p.on_frame(0.0)).is_none());
        assert!(slot.take_instance().is_none());
    }

    #[test]
    fn test_bypass_flag() {
        let slot = slot(false);
        assert!(!slot.is_bypassed());
        slot.set_bypassed(true);
        assert!(slot.is_bypassed());
    }
}
