mod app;
mod color;
mod state;
mod ui;

use anyhow::Context;
use app::PrefectureExplorerApp;
use eframe::egui;
use prefecture_explorer::config::AppConfig;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = AppConfig::load().context("loading configuration")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Prefecture Explorer – Population Dashboard",
        options,
        Box::new(|_cc| Ok(Box::new(PrefectureExplorerApp::new(config)))),
    )
    .map_err(|e| anyhow::anyhow!("running the dashboard: {e}"))
}
