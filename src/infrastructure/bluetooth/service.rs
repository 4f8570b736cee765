//! Connection Controller
//!
//! Owns the scan → connect → discover → read/subscribe → disconnect lifecycle
//! of the single peripheral connection.
//!
//! The controller is an actor: every asynchronous result (read completion,
//! subscription payload, link drop) arrives as a [`LinkEvent`] on its private
//! channel, so connection state is only ever mutated here.

use crate::domain::models::{
    Alert, AppEvent, BluetoothCommand, ConnectionState, LabelSet, MessageSeverity, StatusMessage,
};
use crate::domain::permissions::{Permission, PermissionGate};
use crate::infrastructure::bluetooth::{
    backend::{BleBackend, BleError, BlePeripheral, PeripheralId, RadioState},
    connection::{self, ActiveConnection, ConnectionConfig},
    protocol::{self, TransactionId},
    scanner::{BleScanner, ScanOutcome},
    transactions::TransactionRegistry,
};
use crate::infrastructure::notifications::NotificationBridge;
use futures::StreamExt;
use std::ops::ControlFlow;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Bluetooth radio is not powered on ({0:?})")]
    RadioNotReady(RadioState),
    #[error("missing permissions: {missing:?}")]
    PermissionDenied { missing: Vec<Permission> },
    #[error("{device_name} not found within the scan window")]
    ScanTimeout { device_name: String },
    #[error("scan failed: {0}")]
    Scan(BleError),
    #[error("{0}")]
    Connect(BleError),
    #[error("connect request rejected while {0}")]
    Busy(ConnectionState),
}

impl ControllerError {
    /// User-facing alert for this failure, if it warrants one.
    pub fn alert(&self) -> Option<Alert> {
        let alert = match self {
            Self::RadioNotReady(_) => Alert::new(
                "Warning!!!",
                "Bluetooth is required to use this app. Turn it ON first!",
            ),
            Self::PermissionDenied { .. } => Alert::new(
                "Warning!!!",
                "Go to Settings -> Apps -> RpiBleApp. And allow required permissions to continue.",
            ),
            Self::ScanTimeout { device_name } => Alert::new(
                "Connection Failure!",
                format!("{} is out of range.", device_name),
            ),
            Self::Scan(e) => Alert::new("ERROR", e.to_string()),
            Self::Connect(e) => Alert::new("ERROR!!!", e.to_string()),
            Self::Busy(_) => return None,
        };
        Some(alert)
    }
}

/// Asynchronous results fed back into the controller, tagged with the epoch
/// of the connection that produced them.
#[derive(Debug)]
pub enum LinkEvent {
    IpRead {
        epoch: u64,
        result: Result<Vec<u8>, BleError>,
    },
    LabelPayload {
        epoch: u64,
        payload: Vec<u8>,
    },
    SubscribeFailed {
        epoch: u64,
        error: BleError,
    },
    PeripheralDropped {
        epoch: u64,
        id: PeripheralId,
    },
}

impl LinkEvent {
    fn epoch(&self) -> u64 {
        match self {
            Self::IpRead { epoch, .. }
            | Self::LabelPayload { epoch, .. }
            | Self::SubscribeFailed { epoch, .. }
            | Self::PeripheralDropped { epoch, .. } => *epoch,
        }
    }
}

pub struct ConnectionController<B: BleBackend> {
    backend: Arc<B>,
    config: ConnectionConfig,
    scanner: BleScanner,
    permissions: PermissionGate,
    bridge: Arc<NotificationBridge>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
    link_tx: mpsc::UnboundedSender<LinkEvent>,
    link_rx: mpsc::UnboundedReceiver<LinkEvent>,
    state: watch::Sender<ConnectionState>,
    /// Peripheral between scan match and established connection.
    pending: Option<B::Peripheral>,
    connection: Option<ActiveConnection<B::Peripheral>>,
    transactions: TransactionRegistry,
    ip: Option<String>,
    labels: Option<LabelSet>,
    next_epoch: u64,
}

impl<B: BleBackend> ConnectionController<B> {
    pub fn new(
        backend: Arc<B>,
        config: ConnectionConfig,
        permissions: PermissionGate,
        bridge: Arc<NotificationBridge>,
        event_sender: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            scanner: BleScanner::new(config.device_name.clone(), config.scan_timeout),
            config,
            permissions,
            bridge,
            event_sender,
            link_tx,
            link_rx,
            state: watch::channel(ConnectionState::Idle).0,
            pending: None,
            connection: None,
            transactions: TransactionRegistry::new(),
            ip: None,
            labels: None,
            next_epoch: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn ip_value(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn label_set(&self) -> Option<&LabelSet> {
        self.labels.as_ref()
    }

    pub fn active_transactions(&self) -> Vec<TransactionId> {
        self.transactions.active()
    }

    /// Scan for the peripheral, connect, and start the read and subscribe
    /// transactions.
    ///
    /// On failure the alert has already been surfaced and the controller is
    /// back in `Idle`.
    pub async fn connect(&mut self) -> Result<(), ControllerError> {
        let state = self.state();
        if state != ConnectionState::Idle {
            return Err(reject_busy(state));
        }

        match self.try_connect().await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Connection failed: {}", e);
                self.pending = None;
                self.set_state(ConnectionState::Idle);
                self.send(AppEvent::LogMessage(StatusMessage {
                    message: format!("Connection failed: {}", e),
                    severity: MessageSeverity::Error,
                }));
                if let Some(alert) = e.alert() {
                    self.send(AppEvent::Alert(alert));
                }
                Err(e)
            }
        }
    }

    async fn try_connect(&mut self) -> Result<(), ControllerError> {
        let radio = self
            .backend
            .radio_state()
            .await
            .unwrap_or(RadioState::Unknown);
        if radio != RadioState::PoweredOn {
            return Err(ControllerError::RadioNotReady(radio));
        }

        if let Err(missing) = self.permissions.ensure_granted() {
            return Err(ControllerError::PermissionDenied { missing });
        }

        self.set_state(ConnectionState::Scanning);
        let found = match self.scanner.find(self.backend.as_ref()).await {
            ScanOutcome::Matched(found) => found,
            ScanOutcome::TimedOut => {
                return Err(ControllerError::ScanTimeout {
                    device_name: self.scanner.device_name().to_string(),
                })
            }
            ScanOutcome::Failed(e) => return Err(ControllerError::Scan(e)),
        };

        self.set_state(ConnectionState::Connecting);
        let name = found
            .name
            .unwrap_or_else(|| self.config.device_name.clone());
        info!("Connecting to Device: {}", name);
        self.pending = Some(found.peripheral.clone());
        connection::open(&found.peripheral, self.config.requested_mtu)
            .await
            .map_err(ControllerError::Connect)?;

        self.establish(found.peripheral, name).await;
        Ok(())
    }

    /// Register the disconnect observer and start both transactions.
    async fn establish(&mut self, peripheral: B::Peripheral, name: String) {
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let observer = CancellationToken::new();

        match self.backend.disconnections().await {
            Ok(mut drops) => {
                let token = observer.clone();
                let link_tx = self.link_tx.clone();
                let id = peripheral.id();
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            _ = token.cancelled() => break,
                            dropped = drops.next() => match dropped {
                                Some(dropped) if dropped == id => {
                                    let _ = link_tx.send(LinkEvent::PeripheralDropped { epoch, id });
                                    break;
                                }
                                Some(_) => continue,
                                None => break,
                            },
                        }
                    }
                });
            }
            Err(e) => warn!("Could not observe disconnects: {}", e),
        }

        self.pending = None;
        self.connection = Some(ActiveConnection {
            peripheral: peripheral.clone(),
            name: name.clone(),
            epoch,
            observer,
        });

        self.start_ip_read(&peripheral, epoch);
        self.start_label_subscription(&peripheral, epoch);

        self.set_state(ConnectionState::Connected);
        info!("Connected!");
        self.send(AppEvent::LogMessage(StatusMessage {
            message: format!("Connected to {}", name),
            severity: MessageSeverity::Success,
        }));
    }

    fn start_ip_read(&mut self, peripheral: &B::Peripheral, epoch: u64) {
        let peripheral = peripheral.clone();
        let link_tx = self.link_tx.clone();
        let (service, characteristic) = (self.config.service_uuid, self.config.ip_char_uuid);
        self.transactions.start(TransactionId::IpRead, async move {
            let result = peripheral.read(service, characteristic).await;
            let _ = link_tx.send(LinkEvent::IpRead { epoch, result });
        });
    }

    fn start_label_subscription(&mut self, peripheral: &B::Peripheral, epoch: u64) {
        let peripheral = peripheral.clone();
        let link_tx = self.link_tx.clone();
        let (service, characteristic) = (self.config.service_uuid, self.config.label_char_uuid);
        self.transactions.start(TransactionId::LabelSubscribe, async move {
            let mut payloads = match peripheral.subscribe(service, characteristic).await {
                Ok(payloads) => payloads,
                Err(error) => {
                    let _ = link_tx.send(LinkEvent::SubscribeFailed { epoch, error });
                    return;
                }
            };
            while let Some(payload) = payloads.next().await {
                if link_tx
                    .send(LinkEvent::LabelPayload { epoch, payload })
                    .is_err()
                {
                    break;
                }
            }
            debug!("Label notification stream ended");
        });
    }

    /// User-initiated disconnect. No-op when nothing is connected.
    pub async fn disconnect(&mut self) {
        let Some(connection) = self.teardown() else {
            return;
        };

        info!(
            "Disconnecting from Device: {}-{}",
            connection.name,
            connection.id()
        );
        if let Err(e) = connection.peripheral.disconnect().await {
            warn!("Failed to cancel device connection: {}", e);
        }
        self.send(AppEvent::LogMessage(StatusMessage {
            message: "Disconnected from device".to_string(),
            severity: MessageSeverity::Info,
        }));
    }

    /// Cancel both transactions, release the observer and clear the values.
    fn teardown(&mut self) -> Option<ActiveConnection<B::Peripheral>> {
        let connection = self.connection.take()?;

        for id in self.transactions.cancel_all() {
            debug!(transaction = %id, "Cancelled pending transaction");
        }
        connection.observer.cancel();

        if self.ip.take().is_some() {
            self.send(AppEvent::IpValue(None));
        }
        if self.labels.take().is_some() {
            self.send(AppEvent::Labels(None));
        }
        self.set_state(ConnectionState::Idle);
        Some(connection)
    }

    /// Apply one asynchronous result. Results from an earlier connection are
    /// dropped.
    pub async fn handle_link_event(&mut self, event: LinkEvent) {
        let current = self.connection.as_ref().map(|c| c.epoch);
        if current != Some(event.epoch()) {
            debug!(epoch = event.epoch(), ?current, "Ignoring stale link event");
            return;
        }

        match event {
            LinkEvent::IpRead { result, .. } => match result {
                Ok(payload) => {
                    let ip = protocol::decode_text(&payload);
                    info!("IP value received: {}", ip);
                    self.ip = Some(ip.clone());
                    self.send(AppEvent::IpValue(Some(ip)));
                }
                Err(e) => {
                    warn!("IP read failed: {}", e);
                    self.send(AppEvent::LogMessage(StatusMessage {
                        message: format!("Could not read IP: {}", e),
                        severity: MessageSeverity::Warning,
                    }));
                }
            },
            LinkEvent::LabelPayload { payload, .. } => {
                let text = protocol::decode_text(&payload);
                info!("Label update received: {}", text);
                let labels = LabelSet::parse(&text);
                self.labels = Some(labels.clone());
                self.send(AppEvent::Labels(Some(labels)));
                if let Err(e) = self.bridge.display_update(&text) {
                    error!("Failed to display label notification: {:#}", e);
                }
            }
            LinkEvent::SubscribeFailed { error, .. } => {
                warn!("Label subscription failed: {}", error);
                self.send(AppEvent::LogMessage(StatusMessage {
                    message: format!("Label updates unavailable: {}", error),
                    severity: MessageSeverity::Warning,
                }));
            }
            LinkEvent::PeripheralDropped { id, .. } => {
                info!(peripheral = %id, "Disconnected!");
                self.teardown();
            }
        }
    }

    /// Wait for the next link event and apply it.
    pub async fn pump(&mut self) {
        if let Some(event) = self.link_rx.recv().await {
            self.handle_link_event(event).await;
        }
    }

    /// Serve front-end commands and link events until `Shutdown` or until the
    /// command channel closes.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<BluetoothCommand>) {
        self.permissions.request_all();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(BluetoothCommand::Connect) => {
                        if self.connect_serving(&mut commands).await.is_break() {
                            break;
                        }
                    }
                    Some(BluetoothCommand::Disconnect) => self.disconnect().await,
                    Some(BluetoothCommand::Shutdown) | None => {
                        self.disconnect().await;
                        break;
                    }
                },
                Some(event) = self.link_rx.recv() => self.handle_link_event(event).await,
            }
        }

        info!("Connection controller stopped");
    }

    /// Drive one connect attempt while still answering commands.
    ///
    /// Further `Connect`s are rejected as busy. `Disconnect` aborts the
    /// attempt; `Shutdown` aborts it and breaks the run loop.
    async fn connect_serving(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<BluetoothCommand>,
    ) -> ControlFlow<()> {
        let state = self.state.subscribe();
        let interrupted = {
            let attempt = self.connect();
            tokio::pin!(attempt);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut attempt => break None,
                    command = commands.recv() => match command {
                        Some(BluetoothCommand::Connect) => {
                            let current = *state.borrow();
                            let _ = reject_busy(current);
                        }
                        Some(BluetoothCommand::Disconnect) => {
                            break Some(ControlFlow::Continue(()))
                        }
                        Some(BluetoothCommand::Shutdown) | None => {
                            break Some(ControlFlow::Break(()))
                        }
                    },
                }
            }
        };

        match interrupted {
            Some(flow) => {
                self.abort_connect().await;
                flow
            }
            None => ControlFlow::Continue(()),
        }
    }

    /// Undo a connect attempt that was dropped before it finished.
    async fn abort_connect(&mut self) {
        match self.state() {
            ConnectionState::Scanning => {
                if let Err(e) = self.backend.stop_scan().await {
                    warn!("Failed to stop scan cleanly: {}", e);
                }
            }
            ConnectionState::Connecting => {
                if let Some(peripheral) = self.pending.take() {
                    if let Err(e) = peripheral.disconnect().await {
                        warn!("Failed to cancel device connection: {}", e);
                    }
                }
            }
            ConnectionState::Idle | ConnectionState::Connected => return,
        }

        info!("Connection attempt aborted");
        self.pending = None;
        self.set_state(ConnectionState::Idle);
        self.send(AppEvent::LogMessage(StatusMessage {
            message: "Connection attempt cancelled".to_string(),
            severity: MessageSeverity::Info,
        }));
    }

    fn set_state(&mut self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
            self.send(AppEvent::ConnectionState(state));
        }
    }

    fn send(&self, event: AppEvent) {
        let _ = self.event_sender.send(event);
    }
}

fn reject_busy(state: ConnectionState) -> ControllerError {
    let err = ControllerError::Busy(state);
    warn!("{}", err);
    err
}
