//! btleplug Backend
//!
//! Cross-platform implementation of the backend traits on top of `btleplug`.

use crate::infrastructure::bluetooth::backend::{
    BleBackend, BleError, BlePeripheral, Discovered, DisconnectStream, NotificationStream,
    PeripheralId, RadioState, ScanStream,
};
use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CentralState, Characteristic, Manager as _, Peripheral as _,
    ScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tracing::{debug, info};
use uuid::Uuid;

/// Backend bound to the first Bluetooth adapter of the host.
pub struct BtleplugBackend {
    adapter: Adapter,
}

impl BtleplugBackend {
    pub async fn new() -> Result<Self, BleError> {
        let manager = Manager::new()
            .await
            .map_err(|e| BleError::Scan(e.to_string()))?;
        let adapter = manager
            .adapters()
            .await
            .map_err(|e| BleError::Scan(e.to_string()))?
            .into_iter()
            .next()
            .ok_or(BleError::NoAdapter)?;

        match adapter.adapter_info().await {
            Ok(adapter_info) => info!("Using Bluetooth adapter: {}", adapter_info),
            Err(e) => debug!("Could not read adapter info: {}", e),
        }

        Ok(Self { adapter })
    }
}

#[async_trait]
impl BleBackend for BtleplugBackend {
    type Peripheral = BtleplugPeripheral;

    async fn radio_state(&self) -> Result<RadioState, BleError> {
        let state = self
            .adapter
            .adapter_state()
            .await
            .map_err(|e| BleError::Scan(e.to_string()))?;
        Ok(match state {
            CentralState::PoweredOn => RadioState::PoweredOn,
            CentralState::PoweredOff => RadioState::PoweredOff,
            _ => RadioState::Unknown,
        })
    }

    async fn start_scan(&self) -> Result<ScanStream<BtleplugPeripheral>, BleError> {
        let events = self
            .adapter
            .events()
            .await
            .map_err(|e| BleError::Scan(e.to_string()))?;
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| BleError::Scan(e.to_string()))?;

        let adapter = self.adapter.clone();
        let stream = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    _ => return None,
                };
                let peripheral = adapter.peripheral(&id).await.ok()?;
                let name = peripheral
                    .properties()
                    .await
                    .ok()
                    .flatten()
                    .and_then(|p| p.local_name);
                Some(Ok(Discovered {
                    peripheral: BtleplugPeripheral { inner: peripheral },
                    name,
                }))
            }
        });

        Ok(stream.boxed())
    }

    async fn stop_scan(&self) -> Result<(), BleError> {
        self.adapter
            .stop_scan()
            .await
            .map_err(|e| BleError::Scan(e.to_string()))
    }

    async fn disconnections(&self) -> Result<DisconnectStream, BleError> {
        let events = self
            .adapter
            .events()
            .await
            .map_err(|e| BleError::Gatt(e.to_string()))?;
        Ok(events
            .filter_map(|event| async move {
                match event {
                    CentralEvent::DeviceDisconnected(id) => Some(PeripheralId(id.to_string())),
                    _ => None,
                }
            })
            .boxed())
    }
}

#[derive(Debug, Clone)]
pub struct BtleplugPeripheral {
    inner: Peripheral,
}

impl BtleplugPeripheral {
    fn characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Characteristic, BleError> {
        self.inner
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic)
            .ok_or(BleError::CharacteristicNotFound {
                service,
                characteristic,
            })
    }
}

#[async_trait]
impl BlePeripheral for BtleplugPeripheral {
    fn id(&self) -> PeripheralId {
        PeripheralId(self.inner.id().to_string())
    }

    async fn connect(&self, requested_mtu: u16) -> Result<(), BleError> {
        // btleplug has no MTU request; the platform stack negotiates it.
        debug!(requested_mtu, "Connecting with platform-negotiated MTU");
        if self
            .inner
            .is_connected()
            .await
            .map_err(|e| BleError::Connect(e.to_string()))?
        {
            return Ok(());
        }
        self.inner
            .connect()
            .await
            .map_err(|e| BleError::Connect(e.to_string()))
    }

    async fn discover_services(&self) -> Result<(), BleError> {
        self.inner
            .discover_services()
            .await
            .map_err(|e| BleError::Discovery(e.to_string()))
    }

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, BleError> {
        let characteristic = self.characteristic(service, characteristic)?;
        self.inner
            .read(&characteristic)
            .await
            .map_err(|e| BleError::Gatt(e.to_string()))
    }

    async fn subscribe(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<NotificationStream, BleError> {
        let characteristic = self.characteristic(service, characteristic)?;
        // Open the stream before enabling notifications so no payload is missed.
        let notifications = self
            .inner
            .notifications()
            .await
            .map_err(|e| BleError::Gatt(e.to_string()))?;
        self.inner
            .subscribe(&characteristic)
            .await
            .map_err(|e| BleError::Gatt(e.to_string()))?;

        let uuid = characteristic.uuid;
        Ok(notifications
            .filter_map(move |n| async move { (n.uuid == uuid).then_some(n.value) })
            .boxed())
    }

    async fn disconnect(&self) -> Result<(), BleError> {
        self.inner
            .disconnect()
            .await
            .map_err(|e| BleError::Connect(e.to_string()))
    }
}
