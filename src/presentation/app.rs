use crate::domain::models::{
    Alert, AppEvent, BluetoothCommand, ConnectionState, LabelSet, StatusMessage,
};
use crate::domain::permissions::{PermissionGate, StaticPermissions};
use crate::domain::settings::{Settings, SettingsService};
use crate::infrastructure::bluetooth::btleplug_backend::BtleplugBackend;
use crate::infrastructure::bluetooth::connection::ConnectionConfig;
use crate::infrastructure::bluetooth::ConnectionController;
use crate::infrastructure::notifications::{
    ExecutionContext, InAppSurface, Notification, NotificationBridge,
};
use anyhow::Context as _;
use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub struct RpiBleApp {
    pub(crate) settings: SettingsService,
    pub(crate) bridge: Arc<NotificationBridge>,

    // Bluetooth thread
    pub(crate) bluetooth_tx: mpsc::UnboundedSender<BluetoothCommand>,
    pub(crate) event_rx: mpsc::UnboundedReceiver<AppEvent>,

    // Mirrored controller state
    pub(crate) connection_state: ConnectionState,
    pub(crate) ip: Option<String>,
    pub(crate) labels: Option<LabelSet>,

    // Overlays
    pub(crate) alert: Option<Alert>,
    pub(crate) notification: Option<Notification>,
    pub(crate) status_message: Option<StatusMessage>,

    pub(crate) is_dark_mode: bool,

    pub(crate) _logging_guard: Option<crate::infrastructure::logging::LoggingGuard>,
}

impl RpiBleApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = SettingsService::new().unwrap_or_else(|e| {
            eprintln!("Settings directory unavailable, using defaults: {}", e);
            SettingsService::at_path(PathBuf::from("settings.json"))
        });

        let logging_guard =
            crate::infrastructure::logging::init_logger(&settings.get().log_settings)
                .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
                .ok();

        info!("Starting Rpi BLE App");

        let is_dark_mode = settings.get().dark_mode;
        crate::presentation::theme::configure(&cc.egui_ctx, is_dark_mode);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (bluetooth_tx, bluetooth_rx) = mpsc::unbounded_channel();
        let bridge = Arc::new(NotificationBridge::new(Arc::new(InAppSurface::new(
            event_tx.clone(),
        ))));

        let thread_settings = settings.get().clone();
        let thread_bridge = bridge.clone();
        let thread_events = event_tx.clone();
        let spawned = std::thread::Builder::new()
            .name("bluetooth".to_string())
            .spawn(move || {
                run_bluetooth_thread(thread_settings, thread_bridge, thread_events, bluetooth_rx)
            });
        if let Err(e) = spawned {
            error!("Failed to start Bluetooth thread: {}", e);
            let _ = event_tx.send(AppEvent::Alert(Alert::new("ERROR", e.to_string())));
        }

        Self {
            settings,
            bridge,
            bluetooth_tx,
            event_rx,
            connection_state: ConnectionState::Idle,
            ip: None,
            labels: None,
            alert: None,
            notification: None,
            status_message: None,
            is_dark_mode,
            _logging_guard: logging_guard,
        }
    }

    pub(crate) fn send_command(&mut self, command: BluetoothCommand) {
        if self.bluetooth_tx.send(command).is_err() {
            warn!(?command, "Bluetooth thread is gone");
            self.alert = Some(Alert::new("ERROR", "Bluetooth service is not running."));
        }
    }

    pub(crate) fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.is_dark_mode = !self.is_dark_mode;
        crate::presentation::theme::configure(ctx, self.is_dark_mode);
        if let Err(e) = self.settings.set_dark_mode(self.is_dark_mode) {
            warn!("Failed to save theme preference: {}", e);
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ConnectionState(state) => self.connection_state = state,
            AppEvent::IpValue(ip) => self.ip = ip,
            AppEvent::Labels(labels) => self.labels = labels,
            AppEvent::Alert(alert) => self.alert = Some(alert),
            // Same id replaces the shown card.
            AppEvent::Notification(notification) => self.notification = Some(notification),
            AppEvent::LogMessage(msg) => self.status_message = Some(msg),
        }
    }
}

impl Drop for RpiBleApp {
    fn drop(&mut self) {
        let _ = self.bluetooth_tx.send(BluetoothCommand::Shutdown);
    }
}

impl eframe::App for RpiBleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.apply_event(event);
        }

        // The in-window card is only clickable when focused, so its
        // interactions are always delivered as foreground events.
        let context = if ctx.input(|i| i.focused) {
            ExecutionContext::Foreground
        } else {
            ExecutionContext::Background
        };
        self.bridge.set_context(context);

        crate::presentation::ui::render(self, ctx);

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

fn run_bluetooth_thread(
    settings: Settings,
    bridge: Arc<NotificationBridge>,
    events: mpsc::UnboundedSender<AppEvent>,
    commands: mpsc::UnboundedReceiver<BluetoothCommand>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime for Bluetooth: {}", e);
            let _ = events.send(AppEvent::Alert(Alert::new("ERROR", e.to_string())));
            return;
        }
    };

    rt.block_on(async move {
        let foreground = bridge.listen(ExecutionContext::Foreground).spawn_logger();
        let background = bridge.listen(ExecutionContext::Background).spawn_logger();

        if let Err(e) = serve(settings, bridge, events.clone(), commands).await {
            error!("Bluetooth service failed: {:#}", e);
            let _ = events.send(AppEvent::Alert(Alert::new("ERROR", format!("{:#}", e))));
        }

        foreground.abort();
        background.abort();
    });
}

async fn serve(
    settings: Settings,
    bridge: Arc<NotificationBridge>,
    events: mpsc::UnboundedSender<AppEvent>,
    commands: mpsc::UnboundedReceiver<BluetoothCommand>,
) -> anyhow::Result<()> {
    let config = ConnectionConfig::from_settings(&settings)?;
    let backend = BtleplugBackend::new()
        .await
        .context("No usable Bluetooth adapter")?;
    // Desktop platforms grant Bluetooth access at the OS level.
    let permissions = PermissionGate::new(Arc::new(StaticPermissions::all_granted()));

    ConnectionController::new(Arc::new(backend), config, permissions, bridge, events)
        .run(commands)
        .await;
    Ok(())
}
