use eframe::egui;

pub struct Components;

impl Components {
    /// Framed block with a bold caption, drawn with the current stroke colour.
    pub fn bordered<R>(
        ui: &mut egui::Ui,
        caption: &str,
        add_contents: impl FnOnce(&mut egui::Ui) -> R,
    ) -> R {
        let stroke = ui.style().visuals.widgets.noninteractive.bg_stroke;

        egui::Frame::none()
            .inner_margin(egui::Margin::same(12.0))
            .stroke(stroke)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.label(egui::RichText::new(caption).strong());
                    ui.add_space(6.0);
                    add_contents(ui)
                })
                .inner
            })
            .inner
    }

    pub fn status_line(ui: &mut egui::Ui, text: &str, color: egui::Color32) {
        ui.add_sized(
            [ui.available_width(), 24.0],
            egui::Label::new(egui::RichText::new(text).color(color).size(14.0))
                .wrap_mode(egui::TextWrapMode::Truncate),
        );
    }
}
