use crate::infrastructure::notifications::Notification;
use std::fmt;

/// Separator the peripheral uses between detected labels.
pub const LABEL_SEPARATOR: &str = ", ";

/// Lifecycle of the single peripheral connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Scanning,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// Scanning and connecting both show a progress indicator instead of a button.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Scanning | Self::Connecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

/// Decoded label payload: the raw text as received plus the individual labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    pub raw: String,
    pub labels: Vec<String>,
}

impl LabelSet {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            labels: raw.split(LABEL_SEPARATOR).map(str::to_string).collect(),
        }
    }
}

/// Caption shown for the peripheral's IP address, e.g. `IP<192.168.1.5>`.
pub fn ip_caption(ip: &str) -> String {
    format!("IP<{}>", ip)
}

/// Blocking, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Commands sent from the front-end to the Bluetooth thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BluetoothCommand {
    Connect,
    Disconnect,
    Shutdown,
}

/// Events sent from the Bluetooth thread to the front-end.
#[derive(Debug, Clone)]
pub enum AppEvent {
    ConnectionState(ConnectionState),
    IpValue(Option<String>),
    Labels(Option<LabelSet>),
    Alert(Alert),
    Notification(Notification),
    LogMessage(StatusMessage),
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_set_splits_on_comma_space() {
        let set = LabelSet::parse("Stop, Speed Limit 50 Km/h");
        assert_eq!(set.raw, "Stop, Speed Limit 50 Km/h");
        assert_eq!(set.labels, vec!["Stop", "Speed Limit 50 Km/h"]);
    }

    #[test]
    fn test_label_set_single_label() {
        let set = LabelSet::parse("Pede.");
        assert_eq!(set.labels, vec!["Pede."]);
    }

    #[test]
    fn test_label_set_keeps_plain_commas() {
        // Only ", " separates labels.
        let set = LabelSet::parse("a,b, c");
        assert_eq!(set.labels, vec!["a,b", "c"]);
    }

    #[test]
    fn test_ip_caption_brackets_address() {
        assert_eq!(ip_caption("192.168.1.5"), "IP<192.168.1.5>");
    }

    #[test]
    fn test_busy_states() {
        assert!(ConnectionState::Scanning.is_busy());
        assert!(ConnectionState::Connecting.is_busy());
        assert!(!ConnectionState::Idle.is_busy());
        assert!(!ConnectionState::Connected.is_busy());
    }
}
