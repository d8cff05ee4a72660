use eframe::egui;
use rusty_derrick::app::RustyDerrickApp;
use rusty_derrick::config::DashboardConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::load();
    log::info!("data directory: {}", config.data_dir.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Oil & Gas Data Dashboard")
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Oil & Gas Data Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(RustyDerrickApp::new(config)))),
    )
}
