use crate::infrastructure::bluetooth::backend::{
    BleBackend, BleError, BlePeripheral, Discovered, DisconnectStream, NotificationStream,
    PeripheralId, RadioState, ScanStream,
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

#[derive(Debug)]
struct PeripheralState {
    id: String,
    name: String,
    connect_error: Mutex<Option<BleError>>,
    connect_delay: Mutex<Duration>,
    discover_error: Mutex<Option<BleError>>,
    read_result: Mutex<Result<Vec<u8>, BleError>>,
    read_delay: Mutex<Duration>,
    label_tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    requested_mtu: Mutex<Option<u16>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    subscribes: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct MockPeripheral {
    state: Arc<PeripheralState>,
}

impl MockPeripheral {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            state: Arc::new(PeripheralState {
                id: id.to_string(),
                name: name.to_string(),
                connect_error: Mutex::new(None),
                connect_delay: Mutex::new(Duration::ZERO),
                discover_error: Mutex::new(None),
                read_result: Mutex::new(Ok(Vec::new())),
                read_delay: Mutex::new(Duration::ZERO),
                label_tx: Mutex::new(None),
                requested_mtu: Mutex::new(None),
                connects: AtomicUsize::new(0),
                disconnects: AtomicUsize::new(0),
                subscribes: AtomicUsize::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn with_read_value(self, value: &[u8]) -> Self {
        *self.state.read_result.lock().unwrap() = Ok(value.to_vec());
        self
    }

    pub fn with_read_error(self, error: BleError) -> Self {
        *self.state.read_result.lock().unwrap() = Err(error);
        self
    }

    pub fn with_read_delay(self, delay: Duration) -> Self {
        *self.state.read_delay.lock().unwrap() = delay;
        self
    }

    pub fn with_connect_error(self, error: BleError) -> Self {
        *self.state.connect_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_connect_delay(self, delay: Duration) -> Self {
        *self.state.connect_delay.lock().unwrap() = delay;
        self
    }

    pub fn with_discover_error(self, error: BleError) -> Self {
        *self.state.discover_error.lock().unwrap() = Some(error);
        self
    }

    /// Emit a label notification on the open subscription.
    pub fn push_label(&self, payload: &[u8]) -> bool {
        self.state
            .label_tx
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| tx.send(payload.to_vec()).is_ok())
    }

    /// Whether a subscription is open and its consumer still listening.
    pub fn has_subscriber(&self) -> bool {
        self.state
            .label_tx
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.state.disconnects.load(Ordering::SeqCst)
    }

    pub fn subscribes(&self) -> usize {
        self.state.subscribes.load(Ordering::SeqCst)
    }

    pub fn requested_mtu(&self) -> Option<u16> {
        *self.state.requested_mtu.lock().unwrap()
    }
}

#[async_trait]
impl BlePeripheral for MockPeripheral {
    fn id(&self) -> PeripheralId {
        PeripheralId(self.state.id.clone())
    }

    async fn connect(&self, requested_mtu: u16) -> Result<(), BleError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        *self.state.requested_mtu.lock().unwrap() = Some(requested_mtu);
        let delay = *self.state.connect_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let error = self.state.connect_error.lock().unwrap().clone();
        error.map_or(Ok(()), Err)
    }

    async fn discover_services(&self) -> Result<(), BleError> {
        let error = self.state.discover_error.lock().unwrap().clone();
        error.map_or(Ok(()), Err)
    }

    async fn read(&self, _service: Uuid, _characteristic: Uuid) -> Result<Vec<u8>, BleError> {
        let delay = *self.state.read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let result = self.state.read_result.lock().unwrap().clone();
        result
    }

    async fn subscribe(
        &self,
        _service: Uuid,
        _characteristic: Uuid,
    ) -> Result<NotificationStream, BleError> {
        self.state.subscribes.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        *self.state.label_tx.lock().unwrap() = Some(tx);
        Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|v| (v, rx)) }).boxed())
    }

    async fn disconnect(&self) -> Result<(), BleError> {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

type Advertisement = (Duration, Result<Discovered<MockPeripheral>, BleError>);

/// Scriptable backend. Advertisements are replayed on every scan at their
/// offset from the scan start.
pub struct MockBackend {
    radio: Mutex<RadioState>,
    advertisements: Mutex<Vec<Advertisement>>,
    scans_started: AtomicUsize,
    scans_stopped: AtomicUsize,
    drops: broadcast::Sender<PeripheralId>,
}

impl MockBackend {
    pub fn new() -> Self {
        let (drops, _) = broadcast::channel(16);
        Self {
            radio: Mutex::new(RadioState::PoweredOn),
            advertisements: Mutex::new(Vec::new()),
            scans_started: AtomicUsize::new(0),
            scans_stopped: AtomicUsize::new(0),
            drops,
        }
    }

    pub fn set_radio(&self, state: RadioState) {
        *self.radio.lock().unwrap() = state;
    }

    pub fn advertise(&self, at: Duration, peripheral: MockPeripheral) {
        let name = Some(peripheral.name().to_string());
        self.push(at, Ok(Discovered { peripheral, name }));
    }

    pub fn fail_scan_after(&self, at: Duration, error: BleError) {
        self.push(at, Err(error));
    }

    fn push(&self, at: Duration, item: Result<Discovered<MockPeripheral>, BleError>) {
        let mut ads = self.advertisements.lock().unwrap();
        ads.push((at, item));
        ads.sort_by_key(|(at, _)| *at);
    }

    /// Simulate the peripheral dropping the link.
    pub fn drop_link(&self, id: &str) {
        let _ = self.drops.send(PeripheralId(id.to_string()));
    }

    pub fn scans_started(&self) -> usize {
        self.scans_started.load(Ordering::SeqCst)
    }

    pub fn scans_stopped(&self) -> usize {
        self.scans_stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BleBackend for MockBackend {
    type Peripheral = MockPeripheral;

    async fn radio_state(&self) -> Result<RadioState, BleError> {
        Ok(*self.radio.lock().unwrap())
    }

    async fn start_scan(&self) -> Result<ScanStream<MockPeripheral>, BleError> {
        self.scans_started.fetch_add(1, Ordering::SeqCst);

        let mut previous = Duration::ZERO;
        let script: Vec<Advertisement> = self
            .advertisements
            .lock()
            .unwrap()
            .iter()
            .map(|(at, item)| {
                let delay = at.saturating_sub(previous);
                previous = *at;
                (delay, item.clone())
            })
            .collect();

        Ok(stream::iter(script)
            .then(|(delay, item)| async move {
                tokio::time::sleep(delay).await;
                item
            })
            .boxed())
    }

    async fn stop_scan(&self) -> Result<(), BleError> {
        self.scans_stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnections(&self) -> Result<DisconnectStream, BleError> {
        let rx = self.drops.subscribe();
        Ok(stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(id) => return Some((id, rx)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed())
    }
}
