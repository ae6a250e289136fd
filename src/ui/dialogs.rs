use chrono::{Datelike, Local, NaiveDate};
use eframe::egui::{self, Align2, Color32, RichText, Ui};
use egui_extras::DatePickerButton;
use prefecture_explorer::store::form::{MAX_EPI_WEEK, MAX_EPI_YEAR, MIN_EPI_YEAR};
use prefecture_explorer::store::{DetectionLabel, NewTrendForm};

use crate::state::{Action, AppState, Dialog, Status};

/// Show whichever dialog the session has open.
pub fn show(ctx: &egui::Context, state: &mut AppState) {
    match state.session.dialog.clone() {
        Dialog::None => {}
        Dialog::EditLabels { rows, label } => edit_labels(ctx, state, rows, label),
        Dialog::NewRow(form) => new_row(ctx, state, form),
        Dialog::ConfirmDelete(rows) => confirm_delete(ctx, state, rows),
    }
}

fn modal(title: &str) -> egui::Window<'_> {
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(Align2::CENTER_CENTER, [0.0, 0.0])
}

fn warning_line(ui: &mut Ui, state: &AppState) {
    if let Some(Status::Warning(msg) | Status::Error(msg)) = &state.session.status {
        ui.label(RichText::new(msg).color(Color32::from_rgb(200, 140, 0)));
    }
}

fn label_combo(ui: &mut Ui, id: &str, current: Option<DetectionLabel>) -> Option<DetectionLabel> {
    let mut chosen = current;
    egui::ComboBox::from_id_salt(id)
        .selected_text(current.map_or("Select Label...", |l| l.as_str()))
        .show_ui(ui, |ui: &mut Ui| {
            for label in DetectionLabel::ALL {
                ui.selectable_value(&mut chosen, Some(label), label.as_str());
            }
        });
    chosen
}

// ---------------------------------------------------------------------------
// Edit
// ---------------------------------------------------------------------------

fn edit_labels(ctx: &egui::Context, state: &mut AppState, rows: Vec<usize>, label: DetectionLabel) {
    modal("Change Row Data").show(ctx, |ui: &mut Ui| {
        for &i in &rows {
            if let Some(t) = state.trends.get(i) {
                ui.label(format!(
                    "{}  {}-W{:02}  ({})  currently {}",
                    t.location, t.epi_year, t.epi_week, t.week_start, t.label
                ));
            }
        }
        ui.separator();
        if let Some(new_label) = label_combo(ui, "edit_label", Some(label)) {
            if new_label != label {
                state.dispatch(Action::OpenDialog(Dialog::EditLabels {
                    rows: rows.clone(),
                    label: new_label,
                }));
            }
        }
        warning_line(ui, state);
        ui.horizontal(|ui: &mut Ui| {
            if ui.button(RichText::new("Submit").strong()).clicked() {
                state.submit_edit();
            }
            if ui.button("Cancel").clicked() {
                state.dispatch(Action::CloseDialog);
            }
        });
    });
}

// ---------------------------------------------------------------------------
// New row
// ---------------------------------------------------------------------------

fn new_row(ctx: &egui::Context, state: &mut AppState, mut form: NewTrendForm) {
    let original = form.clone();
    let locations = state.config.trend_locations.clone();

    modal("Add New Row").show(ctx, |ui: &mut Ui| {
        ui.label("Fill in all fields for a new row:");
        egui::Grid::new("new_row_grid")
            .num_columns(2)
            .spacing([12.0, 6.0])
            .show(ui, |ui: &mut Ui| {
                ui.label("Location");
                egui::ComboBox::from_id_salt("new_location")
                    .selected_text(form.location.as_deref().unwrap_or("Select Location..."))
                    .show_ui(ui, |ui: &mut Ui| {
                        for location in &locations {
                            ui.selectable_value(
                                &mut form.location,
                                Some(location.clone()),
                                location,
                            );
                        }
                    });
                ui.end_row();

                let today = Local::now().date_naive();

                ui.label("EpiYear");
                optional_number(ui, &mut form.epi_year, today.year(), MIN_EPI_YEAR..=MAX_EPI_YEAR);
                ui.end_row();

                ui.label("EpiWeek");
                optional_number(ui, &mut form.epi_week, today.iso_week().week(), 1..=MAX_EPI_WEEK);
                ui.end_row();

                ui.label("Week_start");
                if form.week_start.is_none() {
                    if ui.button("Select date").clicked() {
                        form.week_start = Some(week_monday(today));
                    }
                } else if let Some(date) = form.week_start.as_mut() {
                    ui.add(DatePickerButton::new(date).id_salt("week_start"));
                }
                ui.end_row();

                ui.label("Label");
                form.label = label_combo(ui, "new_label", form.label);
                ui.end_row();
            });

        warning_line(ui, state);
        ui.horizontal(|ui: &mut Ui| {
            if ui.button(RichText::new("Submit New Row").strong()).clicked() {
                state.dispatch(Action::OpenDialog(Dialog::NewRow(form.clone())));
                state.submit_new_row();
            }
            if ui.button("Cancel").clicked() {
                state.dispatch(Action::CloseDialog);
            }
        });
    });

    if form != original && matches!(state.session.dialog, Dialog::NewRow(_)) {
        state.dispatch(Action::OpenDialog(Dialog::NewRow(form)));
    }
}

/// Number field that starts unset; the first click fills in `initial`.
fn optional_number<T>(
    ui: &mut Ui,
    value: &mut Option<T>,
    initial: T,
    range: std::ops::RangeInclusive<T>,
) where
    T: egui::emath::Numeric,
{
    if value.is_none() {
        if ui.button("Enter value").clicked() {
            *value = Some(initial);
        }
        return;
    }
    let Some(v) = value.as_mut() else {
        return;
    };
    let mut clear = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.add(egui::DragValue::new(v).range(range));
        clear = ui.small_button("✕").clicked();
    });
    if clear {
        *value = None;
    }
}

fn week_monday(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday();
    date - chrono::Days::new(u64::from(offset))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

fn confirm_delete(ctx: &egui::Context, state: &mut AppState, rows: Vec<usize>) {
    modal("Confirm Row Deletion").show(ctx, |ui: &mut Ui| {
        ui.label(
            RichText::new(format!(
                "Are you sure you want to delete {} row(s)? This action cannot be undone.",
                rows.len()
            ))
            .color(Color32::from_rgb(200, 140, 0)),
        );
        warning_line(ui, state);
        ui.horizontal(|ui: &mut Ui| {
            if ui.button(RichText::new("Delete").color(Color32::RED)).clicked() {
                state.confirm_delete();
            }
            if ui.button("Cancel").clicked() {
                state.dispatch(Action::CloseDialog);
            }
        });
    });
}
