use std::time::Duration;
use clap::Parser;
use log::{info, LevelFilter};
use msgbox::IconType;
use beacon_scanner::{init_logging, run, RunOptions};
use beacon_scanner::error::{error_msgbox, AppRunError, ConfigError};

#[derive(Parser, Debug)]
#[command(author, version)]
#[command(about = "Scans for nearby Bluetooth LE beacons and lists the known ones.", long_about = None)]
struct Args {
    /// Print discovered beacons to stdout instead of opening a window
    #[arg(long)]
    headless: bool,

    /// How long a scan runs before it stops on its own, for example "20s" or "2m"
    #[arg(long, value_parser = humantime::parse_duration)]
    scan_period: Option<Duration>,

    /// Do not start scanning when the window opens
    #[arg(long)]
    no_autostart: bool,

    /// Log debug messages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), AppRunError> {
    let args = Args::parse();

    init_logging(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info });
    info!(concat!("Beacon Scanner ", env!("CARGO_PKG_VERSION")));

    let headless = args.headless;
    let options = RunOptions {
        headless,
        scan_period: args.scan_period,
        no_autostart: args.no_autostart,
    };

    match run(options) {
        Err(AppRunError::ConfigError { source: ConfigError::CanNotLock { .. } }) => {
            let message = "This application has already been started";
            if headless {
                eprintln!("{}", message);
            } else {
                msgbox::create(
                    concat!("Beacon Scanner ", env!("CARGO_PKG_VERSION")),
                    message,
                    IconType::Error,
                ).expect("Could not create msgbox");
            }
            Ok(())
        },
        Err(err) if headless => Err(err),
        Err(err) => {
            error_msgbox("Unexpected error", &err);
            Err(err)
        }
        Ok(_) => Ok(())
    }
}
