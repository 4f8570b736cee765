//! Notification Bridge
//!
//! Mirrors label updates as a user-visible notification and logs the user's
//! interactions with it.
//!
//! ```text
//!  label payload ──► NotificationBridge::display_update ──► NotificationSurface
//!                                                               │
//!  listeners (foreground / background) ◄── deliver(event) ◄─────┘
//! ```
//!
//! The execution context is whatever the host last reported through
//! [`NotificationBridge::set_context`]. The desktop front-end derives it from
//! window focus and renders the notification inside its own window, so an
//! interaction there always arrives as `Foreground`. `Background` events
//! need a surface that can be interacted with while the window is unfocused,
//! such as a system notification daemon.

use crate::domain::models::AppEvent;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const CHANNEL_ID: &str = "important";
pub const CHANNEL_NAME: &str = "Important Notifications";
pub const NOTIFICATION_ID: &str = "lbl";
pub const NOTIFICATION_TITLE: &str = "LABELS:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Importance {
    Default,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Service,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub importance: Importance,
    pub visibility: Visibility,
}

impl ChannelSpec {
    /// The single high-importance channel label updates are posted to.
    pub fn important() -> Self {
        Self {
            id: CHANNEL_ID.to_string(),
            name: CHANNEL_NAME.to_string(),
            importance: Importance::High,
            visibility: Visibility::Public,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub body: String,
    pub category: Category,
    pub importance: Importance,
    pub visibility: Visibility,
    pub show_timestamp: bool,
    pub posted_at: SystemTime,
}

impl Notification {
    pub fn labels(channel_id: String, body: &str) -> Self {
        Self {
            id: NOTIFICATION_ID.to_string(),
            channel_id,
            title: NOTIFICATION_TITLE.to_string(),
            body: body.to_string(),
            category: Category::Service,
            importance: Importance::High,
            visibility: Visibility::Public,
            show_timestamp: true,
            posted_at: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Dismissed,
    Pressed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    /// Id of the notification the user interacted with.
    pub notification_id: String,
}

/// Where the application is running when an interaction arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Foreground,
    Background,
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Foreground => f.write_str("ForegroundEvent"),
            Self::Background => f.write_str("BackgroundEvent"),
        }
    }
}

/// Log line for an interaction seen by the listener of `scope`.
pub fn describe_interaction(scope: ExecutionContext, event: &InteractionEvent) -> String {
    let action = match event.kind {
        InteractionKind::Dismissed => "dismissed",
        InteractionKind::Pressed => "pressed",
    };
    format!("{}: User {} notification", scope, action)
}

/// Host surface that actually shows notifications.
pub trait NotificationSurface: Send + Sync {
    /// Create the channel if needed and return its id.
    fn create_channel(&self, channel: &ChannelSpec) -> Result<String>;

    /// Post `notification`, replacing any shown notification with the same id.
    fn display(&self, notification: Notification) -> Result<()>;
}

pub struct NotificationBridge {
    surface: Arc<dyn NotificationSurface>,
    interactions: broadcast::Sender<(ExecutionContext, InteractionEvent)>,
    context: watch::Sender<ExecutionContext>,
}

impl NotificationBridge {
    pub fn new(surface: Arc<dyn NotificationSurface>) -> Self {
        let (interactions, _) = broadcast::channel(32);
        let (context, _) = watch::channel(ExecutionContext::Foreground);
        Self {
            surface,
            interactions,
            context,
        }
    }

    /// Publish `text` as the labels notification.
    pub fn display_update(&self, text: &str) -> Result<()> {
        let channel_id = self.surface.create_channel(&ChannelSpec::important())?;
        debug!(channel = %channel_id, "Publishing label notification");
        self.surface.display(Notification::labels(channel_id, text))
    }

    /// Record where the application is running; later interactions are
    /// routed to listeners of this context.
    pub fn set_context(&self, context: ExecutionContext) {
        self.context.send_if_modified(|current| {
            if *current == context {
                return false;
            }
            debug!(?context, "Execution context changed");
            *current = context;
            true
        });
    }

    pub fn context(&self) -> ExecutionContext {
        *self.context.borrow()
    }

    /// Route a user interaction to the listeners of the current context.
    pub fn deliver(&self, event: InteractionEvent) {
        let context = self.context();
        if self.interactions.send((context, event)).is_err() {
            debug!(?context, "No notification listeners registered");
        }
    }

    pub fn listen(&self, scope: ExecutionContext) -> NotificationListener {
        NotificationListener {
            scope,
            rx: self.interactions.subscribe(),
        }
    }
}

/// Receives interactions delivered while the application is in one context.
pub struct NotificationListener {
    scope: ExecutionContext,
    rx: broadcast::Receiver<(ExecutionContext, InteractionEvent)>,
}

impl NotificationListener {
    /// Next interaction for this scope, or `None` once the bridge is gone.
    pub async fn next(&mut self) -> Option<InteractionEvent> {
        loop {
            match self.rx.recv().await {
                Ok((context, event)) if context == self.scope => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(scope = %self.scope, skipped, "Notification listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Log every interaction for this scope until the bridge is dropped.
    pub fn spawn_logger(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = self.next().await {
                info!(
                    notification = %event.notification_id,
                    "{}",
                    describe_interaction(self.scope, &event)
                );
            }
        })
    }
}

/// Surface that hands notifications to the desktop front-end, which renders
/// them and reports presses and dismissals back through
/// [`NotificationBridge::deliver`].
pub struct InAppSurface {
    event_sender: mpsc::UnboundedSender<AppEvent>,
    channels: Mutex<HashMap<String, ChannelSpec>>,
}

impl InAppSurface {
    pub fn new(event_sender: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            event_sender,
            channels: Mutex::new(HashMap::new()),
        }
    }
}

impl NotificationSurface for InAppSurface {
    fn create_channel(&self, channel: &ChannelSpec) -> Result<String> {
        let mut channels = self
            .channels
            .lock()
            .map_err(|_| anyhow::anyhow!("Lock error"))?;
        channels
            .entry(channel.id.clone())
            .or_insert_with(|| channel.clone());
        Ok(channel.id.clone())
    }

    fn display(&self, notification: Notification) -> Result<()> {
        let known = self
            .channels
            .lock()
            .map_err(|_| anyhow::anyhow!("Lock error"))?
            .contains_key(&notification.channel_id);
        if !known {
            anyhow::bail!("Unknown notification channel '{}'", notification.channel_id);
        }

        self.event_sender
            .send(AppEvent::Notification(notification))
            .map_err(|_| anyhow::anyhow!("Notification surface closed"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Surface that records what it was asked to show.
    #[derive(Default)]
    pub(crate) struct RecordingSurface {
        pub channels: Mutex<Vec<ChannelSpec>>,
        pub shown: Mutex<Vec<Notification>>,
    }

    impl RecordingSurface {
        pub fn bodies(&self) -> Vec<String> {
            self.shown
                .lock()
                .unwrap()
                .iter()
                .map(|n| n.body.clone())
                .collect()
        }
    }

    impl NotificationSurface for RecordingSurface {
        fn create_channel(&self, channel: &ChannelSpec) -> Result<String> {
            self.channels.lock().unwrap().push(channel.clone());
            Ok(channel.id.clone())
        }

        fn display(&self, notification: Notification) -> Result<()> {
            self.shown.lock().unwrap().push(notification);
            Ok(())
        }
    }

    fn pressed() -> InteractionEvent {
        InteractionEvent {
            kind: InteractionKind::Pressed,
            notification_id: NOTIFICATION_ID.to_string(),
        }
    }

    #[test]
    fn test_display_update_uses_important_channel() {
        let surface = Arc::new(RecordingSurface::default());
        let bridge = NotificationBridge::new(surface.clone());

        bridge.display_update("Stop, Speed Limit 50 Km/h").unwrap();

        let channels = surface.channels.lock().unwrap();
        assert_eq!(channels.as_slice(), &[ChannelSpec::important()]);
        assert_eq!(channels[0].importance, Importance::High);
        assert_eq!(channels[0].visibility, Visibility::Public);

        let shown = surface.shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, "lbl");
        assert_eq!(shown[0].title, "LABELS:");
        assert_eq!(shown[0].body, "Stop, Speed Limit 50 Km/h");
        assert!(shown[0].show_timestamp);
    }

    #[test]
    fn test_in_app_surface_forwards_notification() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let bridge = NotificationBridge::new(Arc::new(InAppSurface::new(tx)));

        bridge.display_update("Stop").unwrap();
        bridge.display_update("Yield").unwrap();

        let bodies: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                AppEvent::Notification(n) => Some(n.body),
                _ => None,
            })
            .collect();
        assert_eq!(bodies, vec!["Stop", "Yield"]);
    }

    #[test]
    fn test_in_app_surface_rejects_unknown_channel() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let surface = InAppSurface::new(tx);
        let err = surface
            .display(Notification::labels("other".to_string(), "x"))
            .unwrap_err();
        assert!(err.to_string().contains("other"));
    }

    #[test]
    fn test_in_app_surface_reports_closed_front_end() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let bridge = NotificationBridge::new(Arc::new(InAppSurface::new(tx)));
        assert!(bridge.display_update("Stop").is_err());
    }

    #[test]
    fn test_describe_interaction() {
        let dismissed = InteractionEvent {
            kind: InteractionKind::Dismissed,
            notification_id: NOTIFICATION_ID.to_string(),
        };
        assert_eq!(
            describe_interaction(ExecutionContext::Foreground, &dismissed),
            "ForegroundEvent: User dismissed notification"
        );
        assert_eq!(
            describe_interaction(ExecutionContext::Background, &pressed()),
            "BackgroundEvent: User pressed notification"
        );
    }

    #[tokio::test]
    async fn test_interactions_route_by_context() {
        let bridge = NotificationBridge::new(Arc::new(RecordingSurface::default()));
        let mut foreground = bridge.listen(ExecutionContext::Foreground);
        let mut background = bridge.listen(ExecutionContext::Background);

        bridge.deliver(pressed());
        bridge.set_context(ExecutionContext::Background);
        bridge.deliver(InteractionEvent {
            kind: InteractionKind::Dismissed,
            notification_id: NOTIFICATION_ID.to_string(),
        });
        drop(bridge);

        assert_eq!(foreground.next().await, Some(pressed()));
        assert_eq!(foreground.next().await, None);

        let event = background.next().await.unwrap();
        assert_eq!(event.kind, InteractionKind::Dismissed);
        assert_eq!(background.next().await, None);
    }
}
