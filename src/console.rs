use std::time::Duration;
use futures::channel::mpsc::channel;
use futures::StreamExt;
use log::{info, warn};
use tokio::runtime::Runtime;
use tokio::signal::ctrl_c;
use tokio_util::sync::CancellationToken;

use crate::beacon::types::{format_signal_strength, DeviceEntry};
use crate::config::types::Config;
use crate::error::AppRunError;
use crate::scan::session::{ScanSession, SessionUpdate};
use crate::scan::source::scan;
use crate::scan::types::{DeviceHandle, ScanMessage};

pub fn format_entry(index: usize, entry: &DeviceEntry<DeviceHandle>) -> String {
    format!(
        "{:>2}. {:<12} {} {:>8}  {}",
        index + 1,
        entry.label.unwrap_or("Unknown"),
        entry.identifier,
        format_signal_strength(entry.signal_strength),
        entry.device,
    )
}

async fn scan_and_print(scan_period: Duration) -> Result<(), AppRunError> {
    let mut session = ScanSession::new();
    let id = session.start(scan_period);
    let cancel = CancellationToken::new();
    let (sender, mut receiver) = channel::<ScanMessage>(64);

    println!("Scanning for beacons for {} (Ctrl-C to stop)", humantime::format_duration(scan_period));
    let source = tokio::spawn(scan(id, scan_period, cancel.clone(), sender));
    let mut failure: Option<String> = None;

    // the source drops its sender once the scan has stopped
    loop {
        tokio::select! {
            result = ctrl_c(), if !cancel.is_cancelled() => {
                if let Err(err) = result {
                    warn!("Failed to listen for Ctrl-C: {}", err);
                }
                info!("Interrupted, stopping scan");
                session.stop();
                cancel.cancel();
            },
            message = receiver.next() => match message {
                None => break,
                Some(message) => match session.handle(message) {
                    Some(SessionUpdate::DeviceAdded(index)) => {
                        if let Some(entry) = session.registry().at(index) {
                            println!("{}", format_entry(index, entry));
                        }
                    },
                    Some(SessionUpdate::Unavailable { message, .. }) => {
                        failure = Some(message);
                    },
                    Some(SessionUpdate::StateChange(state)) => {
                        info!("Scan state changed to {:?}", state);
                    },
                    None => {},
                },
            },
        }
    }

    if let Err(err) = source.await {
        warn!("Scan task did not finish cleanly: {}", err);
    }

    if let Some(message) = failure {
        return Err(AppRunError::ScanUnavailable { message });
    }

    println!("{} beacon(s) found", session.registry().count());
    Ok(())
}

pub fn run_headless(config: &Config) -> Result<(), AppRunError> {
    let runtime = Runtime::new()?;
    runtime.block_on(scan_and_print(config.scan_period()))
}

#[cfg(test)]
mod tests {
    use btleplug::api::BDAddr;

    use super::*;

    #[test]
    fn formats_known_beacon_rows() {
        let entry = DeviceEntry {
            identifier: "e158516ea666f214c38d5464c5440d1f".to_string(),
            label: Some("Blueberry B"),
            device: DeviceHandle {
                address: BDAddr::from([0xd4, 0x3a, 0x2c, 0x01, 0x02, 0x03]),
                local_name: Some("kontakt".to_string()),
            },
            signal_strength: -58,
        };

        assert_eq!(
            format_entry(0, &entry),
            " 1. Blueberry B  e158516ea666f214c38d5464c5440d1f  -58 dBm  D4:3A:2C:01:02:03 (kontakt)",
        );
    }
}
