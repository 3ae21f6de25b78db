//! Packet serial numbers
//!
//! Numbering is per message type; a separate global counter is kept for
//! callers that want one sequence across all types. Counters start at 0,
//! wrap at `u32::MAX` and are not persisted.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Counters {
    global: u32,
    by_type: HashMap<u16, u32>,
}

/// Serial number generator
#[derive(Debug, Default)]
pub struct SerialNoGenerator {
    counters: Mutex<Counters>,
}

impl SerialNoGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next serial number for `msg_type`
    pub fn next_for_type(&self, msg_type: u16) -> u32 {
        let mut counters = self.lock();
        let slot = counters.by_type.entry(msg_type).or_insert(0);
        let serial = *slot;
        *slot = slot.wrapping_add(1);
        serial
    }

    /// Next serial number of the global sequence
    pub fn next(&self) -> u32 {
        let mut counters = self.lock();
        let serial = counters.global;
        counters.global = serial.wrapping_add(1);
        serial
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Counters> {
        // Counters are plain integers; a poisoned lock still holds valid ones.
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    fn set_for_type(&self, msg_type: u16, value: u32) {
        self.lock().by_type.insert(msg_type, value);
    }
}
