use eframe::egui;
use rpi_ble_app::presentation::app::RpiBleApp;

fn main() -> Result<(), eframe::Error> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 640.0])
            .with_title("Rpi BLE App"),
        ..Default::default()
    };

    eframe::run_native(
        "Rpi BLE App",
        options,
        Box::new(|cc| Ok(Box::new(RpiBleApp::new(cc)))),
    )
}
