use std::collections::HashMap;
use uuid::Uuid;

use crate::beacon::constants::RSSI_UNAVAILABLE;

/// One observed advertisement. `H` is the platform's handle for the advertising device.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisementRecord<H> {
    pub device: H,
    pub service_data: HashMap<Uuid, Vec<u8>>,
    pub signal_strength: i16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeaconMatch<H> {
    pub identifier: &'static str,
    pub label: &'static str,
    pub signal_strength: i16,
    pub device: H,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEntry<H> {
    pub identifier: String,
    pub label: Option<&'static str>,
    pub device: H,
    pub signal_strength: i16,
}

pub fn format_signal_strength(signal_strength: i16) -> String {
    if signal_strength == RSSI_UNAVAILABLE {
        return "? dBm".to_string();
    }
    format!("{} dBm", signal_strength)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_signal_strength() {
        assert_eq!(format_signal_strength(-67), "-67 dBm");
        assert_eq!(format_signal_strength(RSSI_UNAVAILABLE), "? dBm");
    }
}
