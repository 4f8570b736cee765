use crate::domain::models::{ip_caption, BluetoothCommand, ConnectionState, MessageSeverity};
use crate::infrastructure::notifications::{InteractionEvent, InteractionKind};
use crate::presentation::app::RpiBleApp;
use crate::presentation::components::Components;
use crate::presentation::theme::Palette;
use eframe::egui;

pub fn render(app: &mut RpiBleApp, ctx: &egui::Context) {
    egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.heading("Rpi BLE App");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let switch_icon = if app.is_dark_mode {
                    "☀ Light"
                } else {
                    "🌙 Dark"
                };
                if ui.button(switch_icon).clicked() {
                    app.toggle_theme(ctx);
                }
            });
        });
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.vertical_centered(|ui| {
                ui.set_max_width(480.0);
                ui.add_space(20.0);

                connection_panel(app, ui);
                ui.add_space(15.0);

                peripheral_panel(app, ui);
                ui.add_space(15.0);

                notification_card(app, ui);

                if let Some(msg) = &app.status_message {
                    ui.add_space(15.0);
                    let color = match msg.severity {
                        MessageSeverity::Info => ui.visuals().text_color(),
                        MessageSeverity::Success => egui::Color32::from_rgb(0, 160, 0),
                        MessageSeverity::Warning => egui::Color32::from_rgb(230, 160, 0),
                        MessageSeverity::Error => egui::Color32::from_rgb(220, 40, 40),
                    };
                    Components::status_line(ui, &msg.message, color);
                }
            });
        });
    });

    alert_window(app, ctx);
}

fn connection_panel(app: &mut RpiBleApp, ui: &mut egui::Ui) {
    let state = app.connection_state;
    if state.is_busy() {
        ui.spinner();
        let text = match state {
            ConnectionState::Scanning => "Scanning...",
            _ => "Connecting...",
        };
        ui.label(text);
        return;
    }

    let (label, command) = if state == ConnectionState::Connected {
        ("Disconnect", BluetoothCommand::Disconnect)
    } else {
        ("Connect", BluetoothCommand::Connect)
    };
    if ui.button(label).clicked() {
        app.send_command(command);
    }
}

fn peripheral_panel(app: &RpiBleApp, ui: &mut egui::Ui) {
    if let Some(ip) = &app.ip {
        ui.label(ip_caption(ip));
    }

    if let Some(labels) = &app.labels {
        let palette = Palette::new(app.is_dark_mode);
        Components::bordered(ui, "Labels", |ui| {
            for label in &labels.labels {
                ui.label(egui::RichText::new(label).color(palette.important).strong());
            }
        });
    }
}

fn notification_card(app: &mut RpiBleApp, ui: &mut egui::Ui) {
    let Some(notification) = &app.notification else {
        return;
    };

    let mut interaction = None;
    Components::bordered(ui, &notification.title, |ui| {
        ui.label(&notification.body);
        ui.horizontal(|ui| {
            if ui.button("Open").clicked() {
                interaction = Some(InteractionKind::Pressed);
            }
            if ui.button("Dismiss").clicked() {
                interaction = Some(InteractionKind::Dismissed);
            }
        });
    });

    if let Some(kind) = interaction {
        app.bridge.deliver(InteractionEvent {
            kind,
            notification_id: notification.id.clone(),
        });
        app.notification = None;
    }
}

fn alert_window(app: &mut RpiBleApp, ctx: &egui::Context) {
    let Some(alert) = &app.alert else {
        return;
    };

    let mut acknowledged = false;
    egui::Window::new(&alert.title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            ui.label(&alert.message);
            ui.add_space(8.0);
            if ui.button("OK").clicked() {
                acknowledged = true;
            }
        });

    if acknowledged {
        app.alert = None;
    }
}
