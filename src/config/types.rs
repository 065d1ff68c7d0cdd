use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::beacon::constants::DEFAULT_SCAN_PERIOD;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Seconds after which a scan stops on its own
    pub scan_period_secs: u64,
    pub scan_on_launch: bool,
}

impl Config {
    pub fn scan_period(&self) -> Duration {
        // a zero period would stop every scan before it delivers anything
        Duration::from_secs(self.scan_period_secs.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scan_period_secs: DEFAULT_SCAN_PERIOD,
            scan_on_launch: true,
        }
    }
}
