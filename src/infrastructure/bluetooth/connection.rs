//! BLE Connection Module
//!
//! Connect-then-discover handshake and the state held for an open link.

use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::backend::{BleError, BlePeripheral, PeripheralId};
use crate::infrastructure::bluetooth::protocol;
use anyhow::Result;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Configuration for connection behavior
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Advertised name that must match exactly
    pub device_name: String,
    /// Scan budget
    pub scan_timeout: Duration,
    /// Maximum payload size requested on connect
    pub requested_mtu: u16,
    /// Service UUID to look for
    pub service_uuid: Uuid,
    /// IP characteristic UUID (read once)
    pub ip_char_uuid: Uuid,
    /// Label characteristic UUID (subscribed)
    pub label_char_uuid: Uuid,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            device_name: protocol::DEVICE_NAME.to_string(),
            scan_timeout: Duration::from_millis(protocol::SCAN_TIMEOUT_MS),
            requested_mtu: protocol::REQUESTED_MTU,
            service_uuid: protocol::SERVICE_UUID,
            ip_char_uuid: protocol::IP_CHAR_UUID,
            label_char_uuid: protocol::LABEL_CHAR_UUID,
        }
    }
}

impl ConnectionConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            device_name: settings.device_name.clone(),
            scan_timeout: Duration::from_millis(settings.scan_timeout_ms),
            requested_mtu: settings.requested_mtu,
            service_uuid: protocol::parse_uuid(&settings.ble_service_uuid)?,
            ip_char_uuid: protocol::parse_uuid(&settings.ble_ip_char_uuid)?,
            label_char_uuid: protocol::parse_uuid(&settings.ble_label_char_uuid)?,
        })
    }
}

/// Connect to `peripheral` and discover its services.
///
/// If discovery fails after the link came up, the link is closed again.
pub async fn open<P: BlePeripheral>(peripheral: &P, requested_mtu: u16) -> Result<(), BleError> {
    info!(peripheral = %peripheral.id(), requested_mtu, "Connecting to device...");
    peripheral.connect(requested_mtu).await?;

    if let Err(e) = peripheral.discover_services().await {
        warn!("Service discovery failed: {}", e);
        if let Err(close_err) = peripheral.disconnect().await {
            warn!("Failed to close link after discovery failure: {}", close_err);
        }
        return Err(e);
    }

    info!(peripheral = %peripheral.id(), "Services discovered");
    Ok(())
}

/// The single open connection, owned by the controller.
pub struct ActiveConnection<P> {
    pub peripheral: P,
    pub name: String,
    /// Distinguishes results of this connection from late results of earlier ones.
    pub epoch: u64,
    /// Cancels the disconnect observer.
    pub observer: CancellationToken,
}

impl<P: BlePeripheral> ActiveConnection<P> {
    pub fn id(&self) -> PeripheralId {
        self.peripheral.id()
    }
}
