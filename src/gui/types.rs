use iced::Event;

use crate::scan::types::ScanMessage;

#[derive(Debug, Clone)]
pub enum Message {
    EventOccurred(Event),
    Scan(ScanMessage),
    StartScan,
    StopScan,
    Tick,
    NoticeConfirmed,
}
