use std::convert::Infallible;
use std::time::Duration;
use std::future::Future;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, PeripheralProperties, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::channel::mpsc::{channel, Sender};
use futures::future::pending;
use futures::stream::select_all;
use futures::{SinkExt, StreamExt};
use iced::subscription::{self, Subscription};
use log::{debug, info, warn};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::beacon::constants::RSSI_UNAVAILABLE;
use crate::beacon::types::AdvertisementRecord;
use crate::error::ScanError;
use crate::scan::types::{Advertisement, DeviceHandle, ScanEvent, ScanMessage, StopReason};

async fn start_scanning(manager: &Manager) -> Result<Vec<Adapter>, ScanError> {
    let adapters = manager.adapters().await?;
    if adapters.is_empty() {
        return Err(ScanError::NoAdapter);
    }

    // Beacons carry the identifier in service data and do not necessarily advertise the
    // service uuid itself, so the filter can not be used to narrow down the scan.
    for adapter in &adapters {
        info!("Scanning using adapter {}...", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));
        adapter.start_scan(ScanFilter::default()).await?;
    }

    Ok(adapters)
}

async fn open_adapters() -> Result<Vec<Adapter>, ScanError> {
    let manager = Manager::new().await?;
    start_scanning(&manager).await
}

async fn stop_scanning(adapters: &[Adapter]) {
    for adapter in adapters {
        if let Err(err) = adapter.stop_scan().await {
            warn!("Failed to stop scanning: {:?}", err);
        }
    }
}

async fn read_advertisement(adapter: &Adapter, id: &PeripheralId) -> Result<Option<Advertisement>, ScanError> {
    let peripheral = adapter.peripheral(id).await?;

    let properties = peripheral.properties().await?;
    Ok(properties.map(advertisement_from_properties))
}

/// Records without an RSSI are kept, the identifier in their service data can still match.
pub fn advertisement_from_properties(properties: PeripheralProperties) -> Advertisement {
    AdvertisementRecord {
        device: DeviceHandle {
            address: properties.address,
            local_name: properties.local_name,
        },
        service_data: properties.service_data,
        signal_strength: properties.rssi.unwrap_or(RSSI_UNAVAILABLE),
    }
}

async fn send_event(sender: &mut Sender<ScanMessage>, session: u64, event: ScanEvent) -> Result<(), ScanError> {
    sender.send(ScanMessage { session, event }).await?;
    Ok(())
}

async fn forward_advertisements(adapters: &[Adapter], session: u64, sender: &mut Sender<ScanMessage>) -> Result<(), ScanError> {
    let mut streams = Vec::with_capacity(adapters.len());
    for (index, adapter) in adapters.iter().enumerate() {
        let events = adapter.events().await?;
        streams.push(events.map(move |event| (index, event)));
    }

    let mut events = select_all(streams);

    while let Some((index, event)) = events.next().await {
        let id = match event {
            CentralEvent::DeviceDiscovered(id) => id,
            CentralEvent::DeviceUpdated(id) => id,
            CentralEvent::ServiceDataAdvertisement { id, .. } => id,
            _ => continue,
        };

        match read_advertisement(&adapters[index], &id).await {
            Ok(Some(advertisement)) => {
                send_event(sender, session, ScanEvent::Advertisement(advertisement)).await?;
            },
            Ok(None) => {
                debug!("Peripheral {:?} has no properties", id);
            },
            Err(err) => {
                warn!("Could not query peripheral {:?} for properties: {:?}", id, err);
            },
        }
    }

    Ok(())
}

/// Runs one scan session, delivering every advertisement over `sender` until the scan period
/// elapses, `cancel` is cancelled or the adapters stop producing events.
pub async fn scan(session: u64, scan_period: Duration, cancel: CancellationToken, mut sender: Sender<ScanMessage>) {
    let adapters = match open_adapters().await {
        Ok(adapters) => adapters,
        Err(err) => {
            warn!("Scanning failed {:?}", err);
            let event = ScanEvent::Unavailable {
                no_permission: err.is_permission_denied(),
                message: err.to_string(),
            };
            if let Err(err) = send_event(&mut sender, session, event).await {
                warn!("Failed to report scan failure: {}", err);
            }
            return;
        },
    };

    if let Err(err) = send_event(&mut sender, session, ScanEvent::Started).await {
        warn!("Nobody is listening for scan events: {}", err);
        stop_scanning(&adapters).await;
        return;
    }

    let reason = tokio::select! {
        _ = sleep(scan_period) => StopReason::Timeout,
        _ = cancel.cancelled() => StopReason::UserRequested,
        result = forward_advertisements(&adapters, session, &mut sender) => {
            if let Err(err) = result {
                warn!("Receiving advertisements failed: {:?}", err);
            }
            StopReason::SourceEnded
        },
    };

    stop_scanning(&adapters).await;
    info!("Scan session {} stopped: {:?}", session, reason);

    if let Err(err) = send_event(&mut sender, session, ScanEvent::Stopped(reason)).await {
        debug!("Scan stop was not delivered: {}", err);
    }
}

/// Runs `task` on its own tokio task and forwards what it sends to `output`.
///
/// Dropping the returned future only stops the forwarding, `task` still runs to completion so
/// that a cancelled scan always stops its adapters.
pub async fn forward_detached<F, Fut>(task: F, mut output: Sender<ScanMessage>)
where
    F: FnOnce(Sender<ScanMessage>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (sender, mut receiver) = channel::<ScanMessage>(64);
    let handle = tokio::spawn(task(sender));

    while let Some(message) = receiver.next().await {
        if output.send(message).await.is_err() {
            break;
        }
    }
    drop(receiver);

    if let Err(err) = handle.await {
        warn!("Scan task did not finish cleanly: {}", err);
    }
}

pub fn scan_subscription(session: u64, scan_period: Duration, cancel: CancellationToken) -> Subscription<ScanMessage> {
    struct Scan;

    // a new session id starts a new subscription, which drops the previous one
    subscription::channel(
        (std::any::TypeId::of::<Scan>(), session),
        64,
        move |subscription_sender| {
            async move {
                forward_detached(
                    move |sender| scan(session, scan_period, cancel, sender),
                    subscription_sender,
                ).await;

                // note: subscription::channel expects the future to never resolve (Infallible)
                pending::<Infallible>().await
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use btleplug::api::BDAddr;
    use futures::channel::{mpsc, oneshot};

    use super::*;
    use crate::beacon::constants::BEACON_SERVICE_UUID;
    use crate::beacon::filter::evaluate;
    use crate::beacon::types::format_signal_strength;

    const COCONUT_A: [u8; 17] = [
        0x00, 0x44, 0x54, 0x64, 0x9e, 0xbe, 0xe7, 0x6a, 0x8e, 0x5f, 0x23, 0xa2, 0x02, 0x82, 0x5c, 0x84, 0x01,
    ];

    #[test]
    fn properties_without_rssi_still_match() {
        let properties = PeripheralProperties {
            address: BDAddr::from([0xe2, 0x11, 0x22, 0x33, 0x44, 0x55]),
            local_name: Some("Coconut".to_string()),
            rssi: None,
            service_data: HashMap::from([(BEACON_SERVICE_UUID, COCONUT_A.to_vec())]),
            ..Default::default()
        };

        let advertisement = advertisement_from_properties(properties);
        assert_eq!(advertisement.signal_strength, RSSI_UNAVAILABLE);
        assert_eq!(advertisement.device.address, BDAddr::from([0xe2, 0x11, 0x22, 0x33, 0x44, 0x55]));
        assert_eq!(advertisement.device.local_name.as_deref(), Some("Coconut"));
        assert_eq!(advertisement.service_data.get(&BEACON_SERVICE_UUID), Some(&COCONUT_A.to_vec()));

        let beacon = evaluate(&advertisement).expect("expected a match");
        assert_eq!(beacon.label, "Coconut A");
        assert_eq!(format_signal_strength(beacon.signal_strength), "? dBm");
    }

    #[test]
    fn properties_keep_the_reported_rssi() {
        let properties = PeripheralProperties {
            rssi: Some(-73),
            ..Default::default()
        };

        let advertisement = advertisement_from_properties(properties);
        assert_eq!(advertisement.signal_strength, -73);
        assert!(advertisement.service_data.is_empty());
        assert_eq!(evaluate(&advertisement), None);
    }

    #[tokio::test]
    async fn detached_task_finishes_after_forwarding_stops() {
        let (resume_tx, resume_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel::<bool>();
        let (output, mut received) = mpsc::channel::<ScanMessage>(8);

        let forwarder = tokio::spawn(forward_detached(
            move |mut sender: Sender<ScanMessage>| async move {
                sender.send(ScanMessage { session: 1, event: ScanEvent::Started }).await.unwrap();
                let _ = resume_rx.await;

                // the forwarder is gone by now, the task still gets to clean up
                let delivered = sender
                    .send(ScanMessage { session: 1, event: ScanEvent::Stopped(StopReason::UserRequested) })
                    .await
                    .is_ok();
                let _ = done_tx.send(delivered);
            },
            output,
        ));

        assert!(matches!(received.next().await, Some(ScanMessage { session: 1, event: ScanEvent::Started })));

        forwarder.abort();
        assert!(forwarder.await.unwrap_err().is_cancelled());

        resume_tx.send(()).unwrap();
        assert_eq!(done_rx.await, Ok(false));
    }
}
