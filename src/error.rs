use std::io;
use thiserror::Error;
use msgbox::IconType;
use std::fmt::Display;
use std::str::Utf8Error;
use btleplug;
use iced;
use serde_json;
use futures::channel::mpsc::SendError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Error scanning for beacons (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("No bluetooth adapter is available")]
    NoAdapter,

    #[error("Failed to deliver scan event over mpsc channel: {source}")]
    SendError { #[from] source: SendError },
}

impl ScanError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ScanError::Btle { source: btleplug::Error::PermissionDenied })
    }
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (iced): {source}")]
    Iced { #[from] source: iced::Error },

    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },

    #[error("Failed to start async runtime: {source}")]
    Runtime { #[from] source: io::Error },

    #[error("Scanning for beacons failed: {message}")]
    ScanUnavailable { message: String },
}

pub fn error_msgbox<T: Display>(message: &'static str, error: &T) {
    let message = format!("{}: {}", message, error);
    eprintln!("{}", &message);
    if let Err(err) = msgbox::create(concat!("Beacon Scanner ", env!("CARGO_PKG_VERSION")), &message, IconType::Error) {
        eprintln!("Failed to create msgbox: {:?}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_is_detected() {
        assert!(ScanError::from(btleplug::Error::PermissionDenied).is_permission_denied());
        assert!(!ScanError::NoAdapter.is_permission_denied());
    }
}
