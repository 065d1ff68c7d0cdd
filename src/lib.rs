use std::env;
use std::time::Duration;
use log::{error, info, LevelFilter};
use tokio::runtime::Builder;

use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::error::AppRunError;
use crate::gui::application::run_application;

pub mod beacon;
pub mod config;
pub mod console;
pub mod error;
pub mod gui;
pub mod scan;

pub fn init_logging(level: LevelFilter) {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                humantime::format_rfc3339(std::time::SystemTime::now()),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr());

    if let Ok(log_file) = env::var("LOG_FILE") {
        dispatch = dispatch.chain(
            fern::log_file(log_file).expect("Failed to open LOG_FILE")
        );
    }

    dispatch.apply().expect("Failed to initialize logger");
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub headless: bool,
    pub scan_period: Option<Duration>,
    pub no_autostart: bool,
}

impl RunOptions {
    /// Command line options take precedence over the config file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(scan_period) = self.scan_period {
            config.scan_period_secs = scan_period.as_secs();
        }
        if self.no_autostart {
            config.scan_on_launch = false;
        }
    }
}

fn load_config(config_io: &ConfigIO) -> Result<Config, AppRunError> {
    let runtime = Builder::new_current_thread().enable_all().build()?;

    match runtime.block_on(config_io.read_or_init()) {
        Ok(config) => Ok(config),
        Err(err) => {
            error!("Failed to load config, using defaults: {}", &err);
            Ok(Config::default())
        },
    }
}

pub fn run(options: RunOptions) -> Result<(), AppRunError> {
    let config_io = ConfigIO::new_sync()?;
    let mut config_locker = config_io.locker()?;
    let _lock_guard = config_locker.lock()?;

    let mut config = load_config(&config_io)?;
    options.apply(&mut config);
    info!("Scan period {}s, scan on launch: {}", config.scan_period().as_secs(), config.scan_on_launch);

    if options.headless {
        console::run_headless(&config)
    } else {
        let autostart = config.scan_on_launch;
        run_application(config, autostart)
    }
}
