use uuid::Uuid;

/**
 * The UUID of the service data that carries the beacon identifier: 0000fe9a-0000-1000-8000-00805f9b34fb
 */
pub const BEACON_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000fe9a_0000_1000_8000_00805f9b34fb);

/**
 * The identifier starts after the leading type/flag byte of the service data
 */
pub const IDENTIFIER_OFFSET: usize = 1;

/**
 * Length (bytes) of a beacon identifier. Rendered as hex it is twice as long.
 */
pub const IDENTIFIER_LEN: usize = 16;

/**
 * Signal strength reported for records without an RSSI value (HCI "RSSI not available").
 */
pub const RSSI_UNAVAILABLE: i16 = 127;

/**
 * How long (seconds) a scan runs before it is stopped automatically.
 */
pub const DEFAULT_SCAN_PERIOD: u64 = 20;

#[derive(Debug, PartialEq, Eq)]
pub struct KnownBeacon {
    pub identifier: &'static str,
    pub label: &'static str,
}

pub static KNOWN_BEACONS: [KnownBeacon; 8] = [
    KnownBeacon { identifier: "59bfdda585767280f886db284653ee35", label: "Icy B" },
    KnownBeacon { identifier: "283acdcf5be28c0f71dc4b6a84219d29", label: "Icy A" },
    KnownBeacon { identifier: "5812ca89ff64bf356564f5ee641f6f1b", label: "Mint B" },
    KnownBeacon { identifier: "6a811095d963f29290ea5371b4177020", label: "Mint A" },
    KnownBeacon { identifier: "3c52a5930c34db229451868164d7fc13", label: "Coconut B" },
    KnownBeacon { identifier: "4454649ebee76a8e5f23a202825c8401", label: "Coconut A" },
    KnownBeacon { identifier: "e158516ea666f214c38d5464c5440d1f", label: "Blueberry B" },
    KnownBeacon { identifier: "d9b0b6f879088d8f767576e07841e43a", label: "Blueberry A" },
];

pub fn find_known_beacon(identifier: &str) -> Option<&'static KnownBeacon> {
    KNOWN_BEACONS.iter().find(|beacon| beacon.identifier == identifier)
}
