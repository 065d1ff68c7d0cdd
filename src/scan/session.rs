use std::time::{Duration, Instant};
use log::{debug, info, warn};

use crate::beacon::filter::evaluate;
use crate::beacon::registry::DeviceRegistry;
use crate::scan::types::{DeviceHandle, ScanEvent, ScanMessage, ScanState, StopReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A beacon was added to the registry at this index
    DeviceAdded(usize),
    StateChange(ScanState),
    Unavailable {
        no_permission: bool,
        message: String,
    },
}

/// Owns the device registry and applies scan events to it, in delivery order.
///
/// Every scan started gets a new session id. Messages produced by a previous session, and
/// advertisements that arrive while not scanning, are dropped.
#[derive(Debug)]
pub struct ScanSession {
    id: u64,
    state: ScanState,
    scan_period: Duration,
    deadline: Option<Instant>,
    registry: DeviceRegistry<DeviceHandle>,
}

impl ScanSession {
    pub fn new() -> Self {
        ScanSession {
            id: 0,
            state: ScanState::Idle,
            scan_period: Duration::ZERO,
            deadline: None,
            registry: DeviceRegistry::new(),
        }
    }

    /// Clears the registry and returns the id of the new session.
    pub fn start(&mut self, scan_period: Duration) -> u64 {
        self.id += 1;
        self.state = ScanState::Scanning;
        self.scan_period = scan_period;
        self.deadline = Some(Instant::now() + scan_period);
        self.registry.clear();
        info!("Starting scan session {} ({})", self.id, humantime::format_duration(scan_period));
        self.id
    }

    pub fn stop(&mut self) {
        if self.state == ScanState::Scanning {
            info!("Stopping scan session {}", self.id);
            self.state = ScanState::Stopped(StopReason::UserRequested);
            self.deadline = None;
        }
    }

    /// Discards all discovered devices, for example when the screen is left.
    pub fn reset(&mut self) {
        self.stop();
        self.registry.clear();
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn is_scanning(&self) -> bool {
        self.state == ScanState::Scanning
    }

    pub fn registry(&self) -> &DeviceRegistry<DeviceHandle> {
        &self.registry
    }

    /// Time left before the scan source stops on its own.
    pub fn remaining(&self) -> Option<Duration> {
        match (self.state, self.deadline) {
            (ScanState::Scanning, Some(deadline)) => Some(deadline.saturating_duration_since(Instant::now())),
            _ => None,
        }
    }

    pub fn handle(&mut self, message: ScanMessage) -> Option<SessionUpdate> {
        if message.session != self.id {
            debug!("Ignoring message from stale scan session {}", message.session);
            return None;
        }

        match message.event {
            ScanEvent::Started => {
                debug!("Scan session {} started", self.id);
                // the source starts its timer once the adapters are scanning
                if self.is_scanning() {
                    self.deadline = Some(Instant::now() + self.scan_period);
                }
                None
            },
            ScanEvent::Advertisement(record) => {
                if !self.is_scanning() {
                    return None;
                }

                let beacon = evaluate(&record)?;
                if !self.registry.add_if_new(beacon.identifier, beacon.device.clone(), beacon.signal_strength) {
                    return None;
                }

                info!(
                    "identifier: {} ({}) address: {} name: {} rssi: {}",
                    beacon.identifier,
                    beacon.label,
                    beacon.device.address,
                    beacon.device.local_name.as_deref().unwrap_or("NONE"),
                    beacon.signal_strength,
                );
                Some(SessionUpdate::DeviceAdded(self.registry.count() - 1))
            },
            ScanEvent::Stopped(reason) => {
                if !self.is_scanning() {
                    return None;
                }

                self.state = ScanState::Stopped(reason);
                self.deadline = None;
                Some(SessionUpdate::StateChange(self.state))
            },
            ScanEvent::Unavailable { no_permission, message } => {
                warn!("Scanning is unavailable: {}", message);
                self.state = ScanState::Unavailable { no_permission };
                self.deadline = None;
                Some(SessionUpdate::Unavailable { no_permission, message })
            },
        }
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        ScanSession::new()
    }
}
