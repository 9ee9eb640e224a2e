//! AudioChain - runs audio plugins from the real-time callback

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::router::{CapabilityRouter, Channel};

/// Sequential in-place audio processing over the audio channel.
///
/// Each member's `process_audio` sees the buffer as left by the previous
/// member. `process` takes no blocking lock, allocates nothing and does not
/// log. A panicking plugin is marked faulted and skipped from then on; the
/// registry reports the fault on its next dispatch. A plugin whose instance
/// is held by the coordination context misses that buffer, counted in
/// [`AudioChain::skipped`].
#[derive(Debug)]
pub struct AudioChain {
    router: Arc<CapabilityRouter>,
    callbacks: AtomicU64,
    skipped: AtomicU64,
}

impl AudioChain {
    pub fn new(router: Arc<CapabilityRouter>) -> Self {
        Self {
            router,
            callbacks: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    /// Process one interleaved buffer. Returns how many plugins ran.
    pub fn process(&self, buffer: &mut [f32], sample_rate: f64, channel_count: usize) -> usize {
        if buffer.is_empty() || channel_count == 0 {
            return 0;
        }
        self.callbacks.fetch_add(1, Ordering::Relaxed);

        let table = self.router.table();
        let mut ran = 0;
        for slot in table.members(Channel::Audio) {
            if slot.is_bypassed() || slot.fault().is_some() {
                continue;
            }
            let processed = slot.try_dispatch("process_audio", |plugin| {
                plugin.process_audio(buffer, sample_rate, channel_count)
            });
            match processed {
                Some(()) => ran += 1,
                // Busy elsewhere rather than panicked just now
                None if slot.fault().is_none() => {
                    self.skipped.fetch_add(1, Ordering::Relaxed);
                }
                None => {}
            }
        }
        ran
    }

    /// Number of non-empty buffers processed so far
    pub fn callbacks(&self) -> u64 {
        self.callbacks.load(Ordering::Relaxed)
    }

    /// Plugin invocations missed because the instance was busy
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}
