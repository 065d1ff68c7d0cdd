use std::fmt::Write;

use crate::beacon::constants::{find_known_beacon, BEACON_SERVICE_UUID, IDENTIFIER_LEN, IDENTIFIER_OFFSET};
use crate::beacon::types::{AdvertisementRecord, BeaconMatch};

/// Renders the identifier bytes of a service data payload as lowercase hex.
///
/// Byte 0 is skipped. Payloads shorter than `IDENTIFIER_OFFSET + IDENTIFIER_LEN` produce a
/// shorter string, bytes beyond the identifier are ignored.
pub fn encode_identifier(service_data: &[u8]) -> String {
    let end = service_data.len().min(IDENTIFIER_OFFSET + IDENTIFIER_LEN);
    let bytes = service_data.get(IDENTIFIER_OFFSET..end).unwrap_or_default();

    let mut identifier = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // writing to a String can not fail
        let _ = write!(identifier, "{:02x}", byte);
    }
    identifier
}

/// Classifies an advertisement as a known beacon, or `None` if it should be ignored.
pub fn evaluate<H: Clone>(record: &AdvertisementRecord<H>) -> Option<BeaconMatch<H>> {
    let service_data = record.service_data.get(&BEACON_SERVICE_UUID)?;
    let identifier = encode_identifier(service_data);
    let beacon = find_known_beacon(&identifier)?;

    Some(BeaconMatch {
        identifier: beacon.identifier,
        label: beacon.label,
        signal_strength: record.signal_strength,
        device: record.device.clone(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use uuid::Uuid;

    use super::*;
    use crate::beacon::constants::KNOWN_BEACONS;

    const ICY_B_PAYLOAD: [u8; 17] = [
        0x00, 0x59, 0xbf, 0xdd, 0xa5, 0x85, 0x76, 0x72, 0x80, 0xf8, 0x86, 0xdb, 0x28, 0x46, 0x53, 0xee, 0x35,
    ];

    fn record(uuid: Uuid, payload: &[u8]) -> AdvertisementRecord<&'static str> {
        AdvertisementRecord {
            device: "device-1",
            service_data: HashMap::from([(uuid, payload.to_vec())]),
            signal_strength: -61,
        }
    }

    fn payload_for(identifier: &str) -> Vec<u8> {
        let mut payload = vec![0x10];
        for index in (0..identifier.len()).step_by(2) {
            payload.push(u8::from_str_radix(&identifier[index..index + 2], 16).unwrap());
        }
        payload
    }

    #[test]
    fn encode_skips_the_leading_byte() {
        assert_eq!(encode_identifier(&ICY_B_PAYLOAD), "59bfdda585767280f886db284653ee35");
    }

    #[test]
    fn encode_ignores_bytes_after_the_identifier() {
        let mut payload = ICY_B_PAYLOAD.to_vec();
        payload.extend_from_slice(&[0xaa, 0xbb]);
        assert_eq!(encode_identifier(&payload), "59bfdda585767280f886db284653ee35");
    }

    #[test]
    fn encode_short_payloads() {
        assert_eq!(encode_identifier(&[]), "");
        assert_eq!(encode_identifier(&[0x01]), "");
        assert_eq!(encode_identifier(&ICY_B_PAYLOAD[..10]), "59bfdda585767280f8");
    }

    #[test]
    fn icy_b_matches() {
        let result = evaluate(&record(BEACON_SERVICE_UUID, &ICY_B_PAYLOAD)).expect("expected a match");
        assert_eq!(result.identifier, "59bfdda585767280f886db284653ee35");
        assert_eq!(result.label, "Icy B");
        assert_eq!(result.signal_strength, -61);
        assert_eq!(result.device, "device-1");
    }

    #[test]
    fn every_known_beacon_matches() {
        for beacon in &KNOWN_BEACONS {
            let result = evaluate(&record(BEACON_SERVICE_UUID, &payload_for(beacon.identifier)));
            assert_eq!(result.map(|m| m.identifier), Some(beacon.identifier));
        }
    }

    #[test]
    fn truncated_payload_does_not_match() {
        assert_eq!(evaluate(&record(BEACON_SERVICE_UUID, &ICY_B_PAYLOAD[..10])), None);
    }

    #[test]
    fn missing_service_data_does_not_match() {
        let other_service = Uuid::from_u128(0x0000feaa_0000_1000_8000_00805f9b34fb);
        assert_eq!(evaluate(&record(other_service, &ICY_B_PAYLOAD)), None);

        let empty = AdvertisementRecord { device: "device-1", service_data: HashMap::new(), signal_strength: -40 };
        assert_eq!(evaluate(&empty), None);
    }

    #[test]
    fn near_misses_do_not_match() {
        for beacon in &KNOWN_BEACONS {
            let mut payload = payload_for(beacon.identifier);
            for index in 1..payload.len() {
                let original = payload[index];
                payload[index] ^= 0x01;
                assert_eq!(evaluate(&record(BEACON_SERVICE_UUID, &payload)), None);
                payload[index] = original;
            }
        }
    }

    #[test]
    fn leading_byte_is_not_part_of_the_identifier() {
        let mut payload = ICY_B_PAYLOAD;
        payload[0] = 0xff;
        assert!(evaluate(&record(BEACON_SERVICE_UUID, &payload)).is_some());
    }

    #[test]
    fn evaluate_is_idempotent() {
        let matching = record(BEACON_SERVICE_UUID, &ICY_B_PAYLOAD);
        assert_eq!(evaluate(&matching), evaluate(&matching));

        let other = record(BEACON_SERVICE_UUID, &[0x00, 0x01, 0x02]);
        assert_eq!(evaluate(&other), evaluate(&other));
    }
}
