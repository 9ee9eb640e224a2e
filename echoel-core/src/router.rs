//! CapabilityRouter - per-channel membership, rebuilt on registration changes
//!
//! The route table is published through an `ArcSwap`, so readers on the
//! audio callback get a consistent table with one atomic load. The table a
//! rebuild replaces is kept alive until the following rebuild, which keeps
//! its deallocation off the audio thread.

use arc_swap::{ArcSwap, Guard};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

use echoel_plugin_api::{Capability, CapabilitySet};

use crate::slot::PluginSlot;

/// A dispatch channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// `process_audio`, from the audio callback
    Audio,
    /// `render_visual`
    Visual,
    /// `on_bio_data_update`
    Bio,
    /// `on_quantum_state_change`
    Quantum,
    /// `handle_interaction`
    Interaction,
    /// `on_frame`
    Frame,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Audio,
        Channel::Visual,
        Channel::Bio,
        Channel::Quantum,
        Channel::Interaction,
        Channel::Frame,
    ];

    /// Whether a plugin with these capabilities joins this channel
    pub fn admits(self, capabilities: &CapabilitySet) -> bool {
        match self {
            Channel::Audio => {
                capabilities.contains(&Capability::AudioEffect)
                    || capabilities.contains(&Capability::AudioGenerator)
            }
            Channel::Visual => {
                capabilities.contains(&Capability::Visualization)
                    || capabilities.contains(&Capability::ShaderEffect)
            }
            Channel::Bio | Channel::Quantum | Channel::Interaction | Channel::Frame => true,
        }
    }

    /// Every channel a plugin with these capabilities joins
    pub fn for_capabilities(capabilities: &CapabilitySet) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|channel| channel.admits(capabilities))
            .collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Audio => "audio",
            Channel::Visual => "visual",
            Channel::Bio => "bio",
            Channel::Quantum => "quantum",
            Channel::Interaction => "interaction",
            Channel::Frame => "frame",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Channel membership lists, each in registration order
#[derive(Debug, Default)]
pub(crate) struct RouteTable {
    audio: Vec<Arc<PluginSlot>>,
    visual: Vec<Arc<PluginSlot>>,
    all: Vec<Arc<PluginSlot>>,
}

impl RouteTable {
    fn build(mut slots: Vec<Arc<PluginSlot>>) -> Self {
        slots.sort_by_key(|slot| slot.order());

        let members = |channel: Channel| -> Vec<Arc<PluginSlot>> {
            slots
                .iter()
                .filter(|slot| channel.admits(&slot.manifest().capabilities))
                .cloned()
                .collect()
        };

        Self {
            audio: members(Channel::Audio),
            visual: members(Channel::Visual),
            all: slots.clone(),
        }
    }

    pub(crate) fn members(&self, channel: Channel) -> &[Arc<PluginSlot>] {
        match channel {
            Channel::Audio => &self.audio,
            Channel::Visual => &self.visual,
            Channel::Bio | Channel::Quantum | Channel::Interaction | Channel::Frame => &self.all,
        }
    }

    /// Every registered plugin
    pub(crate) fn all(&self) -> &[Arc<PluginSlot>] {
        &self.all
    }
}

/// Pre-computed capability routing shared by the registry and the audio chain
pub struct CapabilityRouter {
    current: ArcSwap<RouteTable>,
    retired: Mutex<Option<Arc<RouteTable>>>,
}

impl Default for CapabilityRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl CapabilityRouter {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(RouteTable::default()),
            retired: Mutex::new(None),
        }
    }

    /// Current table. Lock-free and allocation-free.
    pub(crate) fn table(&self) -> Guard<Arc<RouteTable>> {
        self.current.load()
    }

    /// Replace the table with one computed from `slots`
    pub(crate) fn rebuild(&self, slots: Vec<Arc<PluginSlot>>) {
        let table = Arc::new(RouteTable::build(slots));
        tracing::debug!(
            audio = table.audio.len(),
            visual = table.visual.len(),
            total = table.all.len(),
            "Rebuilt route table"
        );
        let previous = self.current.swap(table);
        // Dropping the table retired last time happens here, on the caller's thread
        *self.retired.lock() = Some(previous);
    }

    /// Ids on a channel, in dispatch order
    pub fn members(&self, channel: Channel) -> Vec<String> {
        self.table()
            .members(channel)
            .iter()
            .map(|slot| slot.id().to_string())
            .collect()
    }

    /// Number of plugins on a channel
    pub fn member_count(&self, channel: Channel) -> usize {
        self.table().members(channel).len()
    }
}

impl fmt::Debug for CapabilityRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRouter")
            .field("table", &*self.table())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echoel_plugin_api::{Plugin, PluginContext, PluginError, PluginManifest};

    struct Stub(PluginManifest);

    #[async_trait::async_trait]
    impl Plugin for Stub {
        fn manifest(&self) -> PluginManifest {
            self.0.clone()
        }

        async fn on_load(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
            Ok(())
        }

        async fn on_unload(&mut self) {}
    }

    fn slot(id: &str, order: u64, caps: &[Capability]) -> Arc<PluginSlot> {
        let manifest = PluginManifest::new(id, id).with_capabilities(caps.iter().copied());
        Arc::new(PluginSlot::new(
            manifest.clone(),
            order,
            Box::new(Stub(manifest)),
        ))
    }

    #[test]
    fn test_channel_admission() {
        let caps: CapabilitySet = [Capability::AudioGenerator].into_iter().collect();
        assert!(Channel::Audio.admits(&caps));
        assert!(!Channel::Visual.admits(&caps));
        assert!(Channel::Bio.admits(&caps));

        let shader: CapabilitySet = [Capability::ShaderEffect].into_iter().collect();
        assert!(Channel::Visual.admits(&shader));
        assert!(!Channel::Audio.admits(&shader));
    }

    #[test]
    fn test_unfiltered_channels_admit_empty_set() {
        let none = CapabilitySet::new();
        assert_eq!(
            Channel::for_capabilities(&none),
            vec![
                Channel::Bio,
                Channel::Quantum,
                Channel::Interaction,
                Channel::Frame
            ]
        );
    }

    #[test]
    fn test_rebuild_orders_by_registration() {
        let router = CapabilityRouter::new();
        router.rebuild(vec![
            slot("late", 7, &[Capability::AudioEffect]),
            slot("early", 2, &[Capability::AudioGenerator]),
            slot("visual", 5, &[Capability::Visualization]),
        ]);

        assert_eq!(router.members(Channel::Audio), vec!["early", "late"]);
        assert_eq!(router.members(Channel::Visual), vec!["visual"]);
        assert_eq!(router.members(Channel::Frame), vec!["early", "visual", "late"]);
    }

    #[test]
    fn test_rebuild_replaces_table() {
        let router = CapabilityRouter::new();
        router.rebuild(vec![slot("a", 0, &[Capability::AudioEffect])]);
        let held = router.table();

        router.rebuild(Vec::new());
        assert_eq!(router.member_count(Channel::Audio), 0);
        // A reader holding the old table keeps a consistent view
        assert_eq!(held.members(Channel::Audio).len(), 1);
    }
}
