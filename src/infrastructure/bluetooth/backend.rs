//! BLE Backend Abstraction
//!
//! The connection controller talks to the Bluetooth stack only through these
//! traits. The backend handle is created at start-up and injected into the
//! controller.

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Platform-assigned peripheral identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeripheralId(pub String);

impl fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    Unknown,
    PoweredOn,
    PoweredOff,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BleError {
    #[error("no Bluetooth adapter available")]
    NoAdapter,
    #[error("scan failed: {0}")]
    Scan(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("service discovery failed: {0}")]
    Discovery(String),
    #[error("characteristic {characteristic} not found in service {service}")]
    CharacteristicNotFound { service: Uuid, characteristic: Uuid },
    #[error("GATT operation failed: {0}")]
    Gatt(String),
}

/// A peripheral reported during a scan, with its advertised name.
#[derive(Debug, Clone)]
pub struct Discovered<P> {
    pub peripheral: P,
    pub name: Option<String>,
}

pub type ScanStream<P> = BoxStream<'static, Result<Discovered<P>, BleError>>;
pub type NotificationStream = BoxStream<'static, Vec<u8>>;
pub type DisconnectStream = BoxStream<'static, PeripheralId>;

#[async_trait]
pub trait BleBackend: Send + Sync + 'static {
    type Peripheral: BlePeripheral;

    async fn radio_state(&self) -> Result<RadioState, BleError>;

    /// Start scanning for all peripherals. The stream yields every
    /// advertisement until [`BleBackend::stop_scan`] is called.
    async fn start_scan(&self) -> Result<ScanStream<Self::Peripheral>, BleError>;

    async fn stop_scan(&self) -> Result<(), BleError>;

    /// Identifiers of peripherals whose link dropped.
    async fn disconnections(&self) -> Result<DisconnectStream, BleError>;
}

#[async_trait]
pub trait BlePeripheral: Clone + Send + Sync + 'static {
    fn id(&self) -> PeripheralId;

    async fn connect(&self, requested_mtu: u16) -> Result<(), BleError>;

    async fn discover_services(&self) -> Result<(), BleError>;

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, BleError>;

    /// Enable notifications and return the payload stream for `characteristic`.
    async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<NotificationStream, BleError>;

    async fn disconnect(&self) -> Result<(), BleError>;
}
