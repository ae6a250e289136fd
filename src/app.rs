use eframe::egui;
use prefecture_explorer::config::AppConfig;

use crate::state::{AppState, Page};
use crate::ui::{dialogs, pages, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct PrefectureExplorerApp {
    pub state: AppState,
}

impl PrefectureExplorerApp {
    /// Open the store and load the configured boundary dataset.
    pub fn new(config: AppConfig) -> Self {
        let mut state = AppState::new(config);
        state.load_configured_dataset();
        Self { state }
    }
}

impl eframe::App for PrefectureExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar and page tabs ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters (map pages only) ----
        if matches!(self.state.session.page, Page::Overview | Page::Regions) {
            egui::SidePanel::left("filter_panel")
                .default_width(240.0)
                .resizable(true)
                .show(ctx, |ui| {
                    panels::side_panel(ui, &mut self.state);
                });
        }

        // ---- Central panel: active page ----
        egui::CentralPanel::default().show(ctx, |ui| match self.state.session.page {
            Page::Overview => pages::overview(ui, &mut self.state),
            Page::Regions => pages::regions(ui, &mut self.state),
            Page::Compare => pages::compare(ui, &mut self.state),
            Page::Trends => pages::trends(ui, &mut self.state),
        });

        dialogs::show(ctx, &mut self.state);
    }
}
