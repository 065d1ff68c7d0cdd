use indexmap::IndexMap;

use crate::beacon::constants::find_known_beacon;
use crate::beacon::types::DeviceEntry;

/// Discovered beacons in the order they were first seen, at most one entry per identifier.
///
/// A repeated sighting does not refresh the entry, so the signal strength shown is the one
/// from the first advertisement.
#[derive(Debug, Clone)]
pub struct DeviceRegistry<H> {
    entries: IndexMap<String, DeviceEntry<H>>,
}

impl<H> DeviceRegistry<H> {
    pub fn new() -> Self {
        DeviceRegistry { entries: IndexMap::new() }
    }

    /// Returns true if a new entry was appended.
    pub fn add_if_new(&mut self, identifier: &str, device: H, signal_strength: i16) -> bool {
        if self.entries.contains_key(identifier) {
            return false;
        }

        self.entries.insert(identifier.to_string(), DeviceEntry {
            identifier: identifier.to_string(),
            label: find_known_beacon(identifier).map(|beacon| beacon.label),
            device,
            signal_strength,
        });
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<&DeviceEntry<H>> {
        self.entries.get_index(index).map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceEntry<H>> {
        self.entries.values()
    }
}

impl<H> Default for DeviceRegistry<H> {
    fn default() -> Self {
        DeviceRegistry::new()
    }
}
