//! Rpi peripheral GATT contract
//!
//! The peripheral advertises one service with two characteristics:
//! a readable IP address and a notifying list of detected labels.
//! Both carry plain text.

use anyhow::{Context, Result};
use std::fmt;
use uuid::Uuid;

/// General purpose service UUID
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x00000001_1000_2000_3000_111122223333);

/// IP address characteristic (read)
pub const IP_CHAR_UUID: Uuid = Uuid::from_u128(0x00000002_1000_2000_3000_111122223333);

/// Label characteristic (notify)
pub const LABEL_CHAR_UUID: Uuid = Uuid::from_u128(0x00000003_1000_2000_3000_111122223333);

/// Advertised name of the peripheral
pub const DEVICE_NAME: &str = "Rpi";

/// Scan budget in milliseconds
pub const SCAN_TIMEOUT_MS: u64 = 5000;

/// Maximum payload size requested on connect
pub const REQUESTED_MTU: u16 = 75;

/// Named, cancellable operations against the connected peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransactionId {
    IpRead,
    LabelSubscribe,
}

impl TransactionId {
    pub const ALL: [TransactionId; 2] = [TransactionId::IpRead, TransactionId::LabelSubscribe];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IpRead => "ip-read",
            Self::LabelSubscribe => "label-subscribe",
        }
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a UUID string
pub fn parse_uuid(uuid_str: &str) -> Result<Uuid> {
    Uuid::parse_str(uuid_str.trim()).with_context(|| format!("Invalid UUID '{}'", uuid_str))
}

/// Decode a characteristic payload as text.
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub fn decode_text(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uuid() {
        let uuid = parse_uuid(" 00000001-1000-2000-3000-111122223333 ").unwrap();
        assert_eq!(uuid, SERVICE_UUID);
        assert_eq!(uuid.as_fields().0, 0x0000_0001);
        assert_eq!(
            LABEL_CHAR_UUID.to_string(),
            "00000003-1000-2000-3000-111122223333"
        );
    }

    #[test]
    fn test_parse_uuid_rejects_garbage() {
        let err = parse_uuid("not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(decode_text(b"192.168.1.5"), "192.168.1.5");
        assert_eq!(decode_text(&[0x4f, 0x4b, 0xff]), "OK\u{fffd}");
    }

    #[test]
    fn test_transaction_names() {
        assert_eq!(TransactionId::IpRead.to_string(), "ip-read");
        assert_eq!(TransactionId::LabelSubscribe.as_str(), "label-subscribe");
    }
}
