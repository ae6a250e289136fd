use std::collections::BTreeSet;
use std::path::PathBuf;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use prefecture_explorer::data::filter::{search, Selection, ALL_REGIONS};

use crate::color::ColorScheme;
use crate::state::{Action, AppState, Metric, Page, Status};

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu, page tabs and status line.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open dataset…").clicked() {
                if let Some(path) = open_dataset_dialog() {
                    state.load_dataset(&path);
                }
                ui.close_menu();
            }
            if ui
                .add_enabled(state.dataset.is_some(), egui::Button::new("Reload dataset"))
                .clicked()
            {
                state.reload_dataset();
                ui.close_menu();
            }
            if ui.button("Upload trend table…").clicked() {
                if let Some(path) = open_upload_dialog() {
                    state.load_upload(&path);
                    state.dispatch(Action::ShowPage(Page::Compare));
                }
                ui.close_menu();
            }
            ui.separator();
            ui.add_enabled_ui(state.dataset.is_some(), |ui: &mut Ui| {
                export_menu(ui, state);
            });
        });

        ui.separator();

        for page in Page::ALL {
            if ui
                .selectable_label(state.session.page == page, page.title())
                .clicked()
            {
                state.dispatch(Action::ShowPage(page));
            }
        }

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} divisions loaded, {} visible",
                ds.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(status) = &state.session.status {
            let (text, color) = match status {
                Status::Info(msg) => (msg, Color32::from_rgb(40, 140, 60)),
                Status::Warning(msg) => (msg, Color32::from_rgb(200, 140, 0)),
                Status::Error(msg) => (msg, Color32::RED),
            };
            ui.label(RichText::new(text).color(color));
            if ui.small_button("✕").clicked() {
                state.dispatch(Action::ClearStatus);
            }
        }
    });
}

fn export_menu(ui: &mut Ui, state: &mut AppState) {
    ui.menu_button("Export CSV", |ui: &mut Ui| {
        let name = state.default_export_name();
        if ui.button("Filtered divisions").clicked() {
            if let Some(path) = save_csv_dialog(&name) {
                state.export_divisions(&path);
            }
            ui.close_menu();
        }
        if ui.button("Regional statistics").clicked() {
            if let Some(path) = save_csv_dialog(&name.replace("_population", "_regional_stats")) {
                state.export_group_summary(&path);
            }
            ui.close_menu();
        }
        if ui.button("Ranking").clicked() {
            if let Some(path) = save_csv_dialog(&name.replace("_population", "_ranking")) {
                state.export_ranked(&path);
            }
            ui.close_menu();
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq)]
enum FilterMode {
    All,
    ParentRegion,
    NameSet,
    ValueRange,
}

impl FilterMode {
    const ALL: [FilterMode; 4] = [
        FilterMode::All,
        FilterMode::ParentRegion,
        FilterMode::NameSet,
        FilterMode::ValueRange,
    ];

    fn of(selection: &Selection) -> Self {
        match selection {
            Selection::All => FilterMode::All,
            Selection::ByParentRegion(_) => FilterMode::ParentRegion,
            Selection::ByNameSet(_) => FilterMode::NameSet,
            Selection::ByValueRange { .. } => FilterMode::ValueRange,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FilterMode::All => "Entire country",
            FilterMode::ParentRegion => "By region",
            FilterMode::NameSet => "By prefecture",
            FilterMode::ValueRange => "By population range",
        }
    }

    /// Initial selection when switching to this mode.
    fn initial(&self, range: (u64, u64)) -> Selection {
        match self {
            FilterMode::All => Selection::All,
            FilterMode::ParentRegion => Selection::ByParentRegion(ALL_REGIONS.to_string()),
            FilterMode::NameSet => Selection::ByNameSet(BTreeSet::new()),
            FilterMode::ValueRange => Selection::ByValueRange {
                min: range.0,
                max: range.1,
            },
        }
    }
}

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let dataset = match &state.dataset {
        Some(ds) => ds.clone(),
        None => {
            ui.label("No dataset loaded.");
            return;
        }
    };
    let range = dataset.total_range().unwrap_or((0, 0));

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Filter mode ----
            let mode = FilterMode::of(&state.session.selection);
            egui::ComboBox::from_id_salt("filter_mode")
                .selected_text(mode.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for candidate in FilterMode::ALL {
                        if ui
                            .selectable_label(mode == candidate, candidate.label())
                            .clicked()
                            && mode != candidate
                        {
                            state.dispatch(Action::Select(candidate.initial(range)));
                        }
                    }
                });
            ui.add_space(4.0);

            // ---- Mode parameters ----
            match state.session.selection.clone() {
                Selection::All => {}
                Selection::ByParentRegion(current) => {
                    let mut options = vec![ALL_REGIONS.to_string()];
                    options.extend(dataset.parent_regions());
                    egui::ComboBox::from_id_salt("parent_region")
                        .selected_text(&current)
                        .show_ui(ui, |ui: &mut Ui| {
                            for region in options {
                                let color = state.region_colors.color_for(Some(&region));
                                let text = RichText::new(&region).color(color);
                                if ui.selectable_label(current == region, text).clicked() {
                                    state.dispatch(Action::Select(Selection::ByParentRegion(
                                        region,
                                    )));
                                }
                            }
                        });
                }
                Selection::ByNameSet(mut names) => {
                    ui.horizontal(|ui: &mut Ui| {
                        ui.strong(format!("{} selected", names.len()));
                        if ui.small_button("None").clicked() {
                            state.dispatch(Action::Select(Selection::ByNameSet(BTreeSet::new())));
                        }
                    });
                    ui.label("An empty selection shows every prefecture.");
                    let mut changed = false;
                    for name in dataset.names() {
                        let mut checked = names.contains(&name);
                        if ui.checkbox(&mut checked, &name).changed() {
                            changed = true;
                            if checked {
                                names.insert(name);
                            } else {
                                names.remove(&name);
                            }
                        }
                    }
                    if changed {
                        state.dispatch(Action::Select(Selection::ByNameSet(names)));
                    }
                }
                Selection::ByValueRange { mut min, mut max } => {
                    let lo = ui.add(egui::Slider::new(&mut min, range.0..=range.1).text("Min"));
                    let hi = ui.add(egui::Slider::new(&mut max, range.0..=range.1).text("Max"));
                    if lo.changed() || hi.changed() {
                        state.dispatch(Action::Select(Selection::ByValueRange { min, max }));
                    }
                }
            }
            ui.separator();

            // ---- Map styling ----
            ui.strong("Color by");
            let metric = state.session.metric;
            egui::ComboBox::from_id_salt("metric")
                .selected_text(metric.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for candidate in Metric::ALL {
                        if ui
                            .selectable_label(metric == candidate, candidate.label())
                            .clicked()
                        {
                            state.dispatch(Action::SetMetric(candidate));
                        }
                    }
                });
            let scheme = state.session.scheme;
            egui::ComboBox::from_id_salt("scheme")
                .selected_text(scheme.name())
                .show_ui(ui, |ui: &mut Ui| {
                    for candidate in ColorScheme::ALL {
                        let swatch = RichText::new("■").color(candidate.sample(0.75));
                        ui.horizontal(|ui: &mut Ui| {
                            ui.label(swatch);
                            if ui
                                .selectable_label(scheme == candidate, candidate.name())
                                .clicked()
                            {
                                state.dispatch(Action::SetScheme(candidate));
                            }
                        });
                    }
                });
            ui.separator();

            // ---- Search ----
            ui.strong("Find a prefecture");
            let mut term = state.session.search.clone();
            if ui.text_edit_singleline(&mut term).changed() {
                state.dispatch(Action::Search(term));
            }
            let hits: Vec<String> = search(&dataset.divisions, &state.session.search)
                .into_iter()
                .map(|r| r.name.clone())
                .collect();
            for name in hits {
                let focused = state.session.focus.as_deref() == Some(name.as_str());
                if ui.selectable_label(focused, &name).clicked() {
                    state.dispatch(Action::Focus(Some(name)));
                }
            }
        });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_dataset_dialog() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open boundary dataset")
        .add_filter("GeoJSON", &["geojson", "json"])
        .pick_file()
}

pub fn open_upload_dialog() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Upload trend data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file()
}

pub fn save_csv_dialog(default_name: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Export CSV")
        .set_file_name(default_name)
        .add_filter("CSV", &["csv"])
        .save_file()
}
