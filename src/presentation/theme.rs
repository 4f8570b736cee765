use eframe::egui;

pub struct Palette {
    pub bg: egui::Color32,
    pub fg: egui::Color32,
    pub stroke: egui::Color32,
    /// Label list entries and the labels notification card.
    pub important: egui::Color32,
    pub button: egui::Color32,
    pub button_text: egui::Color32,
}

impl Palette {
    pub fn new(is_dark: bool) -> Self {
        let (bg, fg) = if is_dark {
            (egui::Color32::from_gray(0x22), egui::Color32::from_gray(0xee))
        } else {
            (egui::Color32::from_gray(0xee), egui::Color32::from_gray(0x22))
        };
        Self {
            bg,
            fg,
            stroke: fg,
            important: egui::Color32::from_rgb(0xff, 0x00, 0x00),
            button: egui::Color32::from_rgb(0x21, 0x96, 0xf3),
            button_text: egui::Color32::WHITE,
        }
    }
}

pub fn configure(ctx: &egui::Context, is_dark: bool) {
    let mut style = (*ctx.style()).clone();
    let palette = Palette::new(is_dark);

    style
        .text_styles
        .iter_mut()
        .for_each(|(text_style, font_id)| {
            font_id.size = match text_style {
                egui::TextStyle::Heading => 26.0,
                egui::TextStyle::Body => 16.0,
                egui::TextStyle::Button => 16.0,
                _ => font_id.size,
            };
        });

    style.spacing.item_spacing = egui::vec2(10.0, 10.0);
    style.spacing.button_padding = egui::vec2(18.0, 10.0);

    style.visuals.dark_mode = is_dark;

    style.visuals.widgets.noninteractive.bg_stroke = egui::Stroke::new(1.5, palette.stroke);
    style.visuals.widgets.noninteractive.bg_fill = palette.bg;
    style.visuals.widgets.noninteractive.fg_stroke = egui::Stroke::new(1.0, palette.fg);

    style.visuals.widgets.inactive.bg_fill = palette.button;
    style.visuals.widgets.inactive.weak_bg_fill = palette.button;
    style.visuals.widgets.inactive.fg_stroke = egui::Stroke::new(1.0, palette.button_text);
    style.visuals.widgets.inactive.rounding = egui::Rounding::same(4.0);

    style.visuals.widgets.hovered.bg_fill = palette.button.gamma_multiply(0.85);
    style.visuals.widgets.hovered.weak_bg_fill = palette.button.gamma_multiply(0.85);
    style.visuals.widgets.hovered.fg_stroke = egui::Stroke::new(1.0, palette.button_text);
    style.visuals.widgets.hovered.rounding = egui::Rounding::same(4.0);

    style.visuals.widgets.active.bg_fill = palette.button.gamma_multiply(0.7);
    style.visuals.widgets.active.weak_bg_fill = palette.button.gamma_multiply(0.7);
    style.visuals.widgets.active.fg_stroke = egui::Stroke::new(1.0, palette.button_text);
    style.visuals.widgets.active.rounding = egui::Rounding::same(4.0);

    style.visuals.window_fill = palette.bg;
    style.visuals.window_stroke = egui::Stroke::new(1.5, palette.stroke);
    style.visuals.panel_fill = palette.bg;
    style.visuals.override_text_color = Some(palette.fg);

    ctx.set_style(style);
}
