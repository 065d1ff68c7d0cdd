use std::fmt;
use btleplug::api::BDAddr;

use crate::beacon::types::AdvertisementRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    pub address: BDAddr,
    pub local_name: Option<String>,
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.local_name {
            Some(name) => write!(f, "{} ({})", self.address, name),
            None => write!(f, "{}", self.address),
        }
    }
}

pub type Advertisement = AdvertisementRecord<DeviceHandle>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Timeout,
    UserRequested,
    SourceEnded,
}

#[derive(Debug, Clone)]
pub enum ScanEvent {
    Started,
    Advertisement(Advertisement),
    Stopped(StopReason),
    Unavailable {
        no_permission: bool,
        message: String,
    },
}

/// A scan event tagged with the scan session that produced it.
#[derive(Debug, Clone)]
pub struct ScanMessage {
    pub session: u64,
    pub event: ScanEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning,
    Stopped(StopReason),
    Unavailable {
        no_permission: bool,
    },
}
