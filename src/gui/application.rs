use iced::{Alignment, Application, Command, Element, Font, Length, Settings, Size, Subscription, window};
use iced::event::{self, Event};
use iced::executor;
use iced::time::{every as iced_time_every};
use iced::theme::{self, Theme};
use iced::widget::{Column, button, column, container, horizontal_rule, row, scrollable, text};
use std::time::Duration;
use log::info;
use tokio_util::sync::CancellationToken;

use crate::beacon::types::{format_signal_strength, DeviceEntry};
use crate::config::types::Config;
use crate::error::AppRunError;
use crate::gui::types::Message;
use crate::scan::session::{ScanSession, SessionUpdate};
use crate::scan::source::scan_subscription;
use crate::scan::types::{DeviceHandle, ScanState, StopReason};

pub struct ApplicationFlags {
    pub config: Config,
    pub autostart: bool,
}

pub struct BeaconScannerApplication {
    // this token is cancelled upon exit
    app_cancel: CancellationToken,
    // cancelled when the user stops the current scan
    scan_cancel: CancellationToken,

    // messages that the user must click away
    notices: Vec<String>,

    config: Config,
    session: ScanSession,
}

impl BeaconScannerApplication {
    fn before_close(&mut self) {
        self.app_cancel.cancel();
        self.session.reset();
    }

    fn start_scan(&mut self) {
        self.scan_cancel.cancel();
        self.scan_cancel = self.app_cancel.child_token();
        self.session.start(self.config.scan_period());
    }

    fn stop_scan(&mut self) {
        self.session.stop();
        self.scan_cancel.cancel();
    }

    fn status_text(&self) -> String {
        match self.session.state() {
            ScanState::Idle => "".to_string(),
            ScanState::Scanning => {
                let remaining = self.session.remaining().unwrap_or_default();
                format!("Scanning… {}s", remaining.as_secs())
            },
            ScanState::Stopped(StopReason::Timeout) => "Scan finished".to_string(),
            ScanState::Stopped(StopReason::UserRequested) => "Scan stopped".to_string(),
            ScanState::Stopped(StopReason::SourceEnded) => "Bluetooth stopped delivering advertisements".to_string(),
            ScanState::Unavailable { no_permission: true } => "Not allowed to access Bluetooth!".to_string(),
            ScanState::Unavailable { no_permission: false } => "Bluetooth is not available".to_string(),
        }
    }
}

fn device_row(entry: &DeviceEntry<DeviceHandle>) -> Element<Message> {
    row![
        text(entry.label.unwrap_or("Unknown")).width(100),
        text(&entry.identifier).font(Font::MONOSPACE).width(300),
        text(format_signal_strength(entry.signal_strength)).width(70),
        text(&entry.device).size(14),
    ]
    .align_items(Alignment::Center)
    .spacing(10)
    .into()
}

impl Application for BeaconScannerApplication {
    type Executor = executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = ApplicationFlags;

    fn new(flags: ApplicationFlags) -> (BeaconScannerApplication, Command<Self::Message>) {
        let app_cancel = CancellationToken::new();
        let scan_cancel = app_cancel.child_token();

        let mut app = BeaconScannerApplication {
            app_cancel,
            scan_cancel,
            notices: Vec::new(),
            config: flags.config,
            session: ScanSession::new(),
        };

        if flags.autostart {
            app.start_scan();
        }

        (app, Command::none())
    }

    fn title(&self) -> String {
        String::from(concat!("Beacon Scanner ", env!("CARGO_PKG_VERSION")))
    }

    fn update(&mut self, message: Message) -> Command<Self::Message> {
        match message {
            Message::Scan(scan_message) => {
                if let Some(SessionUpdate::Unavailable { no_permission, message }) = self.session.handle(scan_message) {
                    if no_permission {
                        self.notices.push(
                            "This application is not allowed to access Bluetooth. Grant the permission \
in your system settings and try again.".to_string()
                        );
                    } else {
                        self.notices.push(format!("Bluetooth is not available: {}", message));
                    }
                }
            },
            Message::StartScan => {
                if !self.session.is_scanning() {
                    self.start_scan();
                }
            },
            Message::StopScan => {
                self.stop_scan();
            },
            Message::Tick => {
                // only redraws the remaining scan time
            },
            Message::NoticeConfirmed => {
                if !self.notices.is_empty() {
                    self.notices.remove(0);
                }
            },
            Message::EventOccurred(Event::Window(id, window::Event::CloseRequested)) => {
                info!("Close requested");
                self.before_close();
                return window::close(id);
            },
            Message::EventOccurred(_) => {},
        }

        Command::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![event::listen().map(Message::EventOccurred)];

        // kept alive after the scan stops so that the final Stopped event arrives; replaced
        // when the next scan session starts
        if self.session.id() > 0 {
            subscriptions.push(
                scan_subscription(
                    self.session.id(),
                    self.config.scan_period(),
                    self.scan_cancel.clone(),
                ).map(Message::Scan)
            );
        }

        if self.session.is_scanning() {
            subscriptions.push(iced_time_every(Duration::from_secs(1)).map(|_| Message::Tick));
        }

        Subscription::batch(subscriptions)
    }

    fn view(&self) -> Element<Message> {
        if let Some(notice) = self.notices.first() {
            return container(
                column![
                    text(notice),

                    button(text("Okay"))
                        .on_press(Message::NoticeConfirmed),

                ].align_items(Alignment::Center).spacing(20),
            )
            .width(Length::Fill)
            .padding(20)
            .into()
        }

        let scan_button = if self.session.is_scanning() {
            button(text("Stop"))
                .style(theme::Button::Destructive)
                .on_press(Message::StopScan)
        } else {
            button(text("Scan"))
                .style(theme::Button::Primary)
                .on_press(Message::StartScan)
        };

        let registry = self.session.registry();
        let devices: Element<Message> = if registry.is_empty() {
            text("No beacons found").into()
        } else {
            scrollable(
                Column::with_children(registry.iter().map(device_row))
                    .spacing(10)
                    .width(Length::Fill)
            )
            .height(Length::Fill)
            .into()
        };

        container(
            column![
                row![
                    text(self.status_text()).width(Length::Fill),
                    scan_button,
                ].align_items(Alignment::Center),

                horizontal_rule(10),

                devices,
            ]
            .spacing(20)
            .width(Length::Fill)
            .height(Length::Fill),
        )
        .width(Length::Fill)
        .padding(20)
        .into()
    }
}

pub fn run_application(config: Config, autostart: bool) -> Result<(), AppRunError> {
    let flags = ApplicationFlags { config, autostart };
    let mut settings = Settings::with_flags(flags);

    // handle exits ourselves (Event::CloseRequested)
    settings.id = Some("beacon-scanner".to_string());
    settings.window.exit_on_close_request = false;
    settings.window.size = Size::new(720.0, 520.0);

    // this function will call process::exit() unless there was a startup error
    BeaconScannerApplication::run(settings)?;
    Ok(())
}
