use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use prefecture_explorer::data::aggregate::{self, Summary};
use prefecture_explorer::data::filter::GenderMajority;
use prefecture_explorer::data::compare::{LOCAL_SUFFIX, REFERENCE_SUFFIX};
use prefecture_explorer::store::DetectionLabel;

use crate::color::RegionColors;
use crate::state::{Action, AppState, Dialog};
use crate::ui::panels::{open_upload_dialog, save_csv_dialog};
use crate::ui::plot::{bar_chart, choropleth};
use crate::ui::tables::{format_count, selectable_table, simple_table, text, DIFF_HIGHLIGHT};

fn no_dataset(ui: &mut Ui) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.heading("Open a boundary dataset to begin  (File → Open dataset…)");
    });
}

fn summary_cards(ui: &mut Ui, summary: &Summary) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        let card = |ui: &mut Ui, title: &str, value: String| {
            ui.group(|ui: &mut Ui| {
                ui.vertical(|ui: &mut Ui| {
                    ui.label(RichText::new(title).small());
                    ui.heading(value);
                });
            });
        };
        card(ui, "Prefectures", summary.count.to_string());
        card(ui, "Total population", format_count(summary.sum_total));
        card(ui, "Male", format_count(summary.sum_male));
        card(ui, "Female", format_count(summary.sum_female));
        card(ui, "Average", format!("{:.0}", summary.mean_total));
        card(ui, "M/F ratio", format!("{:.1}", summary.male_female_ratio));
        if let Some(max) = &summary.max {
            card(ui, "Most populous", format!("{} ({})", max.name, format_count(max.total)));
        }
        if let Some(min) = &summary.min {
            card(ui, "Least populous", format!("{} ({})", min.name, format_count(min.total)));
        }
    });
}

fn region_legend(ui: &mut Ui, colors: &RegionColors) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for (region, color) in colors.legend_entries() {
            ui.label(RichText::new("■").color(color));
            ui.label(RichText::new(region).small());
        }
    });
}

// ---------------------------------------------------------------------------
// Overview: map, headline numbers, ranking
// ---------------------------------------------------------------------------

pub fn overview(ui: &mut Ui, state: &mut AppState) {
    let Some(dataset) = state.dataset.clone() else {
        no_dataset(ui);
        return;
    };

    ui.heading(format!("Population by prefecture: {}", state.session.selection.label()));
    let summary = state.summary();
    summary_cards(ui, &summary);

    if let Some((record, info)) = state.focused_rank() {
        let average = state.national_average();
        ui.group(|ui: &mut Ui| {
            ui.strong(&record.name);
            ui.label(format!(
                "Rank {} of {}, percentile {:.1}%, {} people, gender ratio {:.1}",
                info.rank,
                info.out_of,
                info.percentile,
                format_count(record.total),
                record.gender_ratio()
            ));
            ui.label(format!(
                "Difference from average: {:+.0} (average {:.0})",
                record.total as f64 - average,
                average
            ));
            if let Some(bounds) = record.geometry.bounds() {
                ui.label(format!("Geographic area: {:.4} degrees²", bounds.area()));
            }
        });
    }
    ui.separator();

    ui.columns(2, |columns| {
        choropleth(&mut columns[0], state);

        let ui = &mut columns[1];
        ScrollArea::vertical().show(ui, |ui: &mut Ui| {
            ui.strong("Ten most populous prefectures");
            let top: Vec<(String, f64, Color32)> = aggregate::top_n(&dataset.divisions, 10)
                .into_iter()
                .map(|r| {
                    let color = state.region_colors.color_for(r.parent_region.as_deref());
                    (r.name.clone(), r.total as f64, color)
                })
                .collect();
            bar_chart(ui, "top_ten", "Population", &top);
            region_legend(ui, &state.region_colors);

            ui.add_space(8.0);
            ui.strong("Ranking of the current selection");
            let records = state.visible_records();
            let ranked = aggregate::ranked_table(&records, dataset.grand_total());
            let headers = ["Rank", "Prefecture", "Region", "Population", "% of national"]
                .map(String::from);
            let rows: Vec<Vec<RichText>> = ranked
                .iter()
                .map(|row| {
                    vec![
                        text(row.dense_rank),
                        text(&row.record.name),
                        text(row.record.parent_region.as_deref().unwrap_or("")),
                        text(format_count(row.record.total)),
                        text(format!("{:.2}%", row.share_percent)),
                    ]
                })
                .collect();
            simple_table(ui, "ranking", &headers, &rows);
        });
    });
}

// ---------------------------------------------------------------------------
// Regional statistics
// ---------------------------------------------------------------------------

pub fn regions(ui: &mut Ui, state: &mut AppState) {
    if state.dataset.is_none() {
        no_dataset(ui);
        return;
    }
    let groups = state.group_summaries();
    let shares = aggregate::shares_of_total(&groups);

    ScrollArea::vertical().show(ui, |ui: &mut Ui| {
        ui.heading("Regional statistics");
        summary_cards(ui, &state.summary());
        ui.separator();

        let entries: Vec<(String, f64, Color32)> = groups
            .iter()
            .map(|(region, s)| {
                let color = state.region_colors.color_for(Some(region));
                (region.clone(), s.sum_total as f64, color)
            })
            .collect();
        bar_chart(ui, "region_totals", "Population", &entries);

        let headers = [
            "Region",
            "Prefectures",
            "Total",
            "Male",
            "Female",
            "% Male",
            "% Female",
            "M/F ratio",
            "Median",
            "Std dev",
            "% of national",
        ]
        .map(String::from);
        let rows: Vec<Vec<RichText>> = groups
            .iter()
            .zip(&shares)
            .map(|((region, s), share)| {
                vec![
                    text(region).color(state.region_colors.color_for(Some(region))),
                    text(s.count),
                    text(format_count(s.sum_total)),
                    text(format_count(s.sum_male)),
                    text(format_count(s.sum_female)),
                    text(format!("{:.2}", s.male_percent())),
                    text(format!("{:.2}", s.female_percent())),
                    text(format!("{:.1}", s.male_female_ratio)),
                    text(s.median_total.map_or(String::new(), |m| format!("{m:.0}"))),
                    text(s.std_dev_total.map_or(String::new(), |d| format!("{d:.0}"))),
                    text(format!("{share:.1}%")),
                ]
            })
            .collect();
        simple_table(ui, "group_summary", &headers, &rows);

        if let Some(balanced) = state.most_balanced_region() {
            ui.group(|ui: &mut Ui| {
                ui.strong("⚖ Most balanced region (gender)");
                ui.label(format!(
                    "{}: M/F ratio {:.2}%, difference {}",
                    balanced.region,
                    balanced.ratio,
                    format_count(balanced.difference)
                ));
            });
        }

        if ui.button("📥 Download regional statistics").clicked() {
            let name = state
                .default_export_name()
                .replace("_population", "_regional_stats");
            if let Some(path) = save_csv_dialog(&name) {
                state.export_group_summary(&path);
            }
        }
        ui.separator();

        // ---- Data quality ----
        ui.strong("Official regional totals");
        let headers = ["Region", "Official", "Sum of prefectures", "Difference"].map(String::from);
        let rows: Vec<Vec<RichText>> = state
            .validations()
            .iter()
            .map(|v| {
                let diff = text(format_count(v.difference));
                vec![
                    text(&v.parent_region),
                    text(format_count(v.official_total)),
                    text(format_count(v.computed_total)),
                    if v.is_consistent() {
                        diff
                    } else {
                        diff.color(Color32::RED)
                    },
                ]
            })
            .collect();
        simple_table(ui, "validations", &headers, &rows);

        ui.separator();
        gender_finder(ui, state);

        let mismatches = state.gender_mismatches();
        if mismatches.is_empty() {
            ui.label("Male and female counts add up to the total for every prefecture.");
        } else {
            ui.label(
                RichText::new(format!(
                    "{} prefectures where male + female differs from the total:",
                    mismatches.len()
                ))
                .color(Color32::from_rgb(200, 140, 0)),
            );
            for m in &mismatches {
                ui.label(format!("{}: {:+}", m.name, m.discrepancy));
            }
        }
    });
}

fn gender_finder(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Prefecture finder by gender majority");
    let current = state.session.majority;
    let mut chosen = current;
    egui::ComboBox::from_id_salt("gender_majority")
        .selected_text(current.label())
        .show_ui(ui, |ui: &mut Ui| {
            for majority in GenderMajority::ALL {
                ui.selectable_value(&mut chosen, majority, majority.label());
            }
        });
    if chosen != current {
        state.dispatch(Action::FindMajority(chosen));
    }

    let matches = state.majority_matches();
    ui.label(format!("{} prefectures", matches.len()));
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for record in &matches {
            let color = state.region_colors.color_for(record.parent_region.as_deref());
            ui.label(RichText::new(&record.name).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// Upload & compare
// ---------------------------------------------------------------------------

pub fn compare(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical().show(ui, |ui: &mut Ui| {
        ui.heading("Upload your trend data");
        ui.label(format!(
            "The uploaded file must contain at least the columns {}. \
             It is joined with the database trends on {}.",
            state
                .config
                .upload_rename
                .keys()
                .cloned()
                .chain(std::iter::once("Location".to_string()))
                .collect::<Vec<_>>()
                .join(", "),
            state.config.join_keys.join(" and "),
        ));
        ui.horizontal(|ui: &mut Ui| {
            if ui.button("Choose a file…").clicked() {
                if let Some(path) = open_upload_dialog() {
                    state.load_upload(&path);
                }
            }
            if ui.button("Refresh database trends").clicked() {
                state.refresh_reference();
                state.refresh_comparison();
            }
        });

        let Some(upload) = &state.upload else {
            ui.label(RichText::new("No file was uploaded...").color(Color32::RED));
            return;
        };
        ui.separator();
        ui.strong(format!(
            "Preview of {}",
            state
                .upload_source
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        ));
        let rows: Vec<Vec<RichText>> = upload
            .rows
            .iter()
            .map(|row| row.iter().map(text).collect())
            .collect();
        simple_table(ui, "upload_preview", &upload.columns, &rows);
        ui.separator();

        ui.heading("⚖️ Database vs upload: inner join");
        let Some(comparison) = &state.comparison else {
            ui.label("No comparison available.");
            return;
        };
        ui.label(format!(
            "{} matched rows, {} with differences",
            comparison.len(),
            comparison.differing_rows()
        ));
        for (field, n) in comparison.differences_per_field() {
            ui.label(format!("{field}: {n} differing"));
        }

        let headers = comparison.headers();
        let rows: Vec<Vec<RichText>> = comparison
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<RichText> = row.key.iter().map(text).collect();
                for ((local, reference), differs) in row.pairs.iter().zip(&row.differs) {
                    for value in [local, reference] {
                        let cell = text(value);
                        cells.push(if *differs {
                            cell.background_color(DIFF_HIGHLIGHT).strong()
                        } else {
                            cell
                        });
                    }
                }
                cells.extend(row.local_extra.iter().map(text));
                cells.extend(row.reference_extra.iter().map(text));
                cells
            })
            .collect();
        simple_table(ui, "comparison", &headers, &rows);
        ui.label(
            RichText::new(format!(
                "Highlighted pairs differ between the {} and {} columns.",
                LOCAL_SUFFIX, REFERENCE_SUFFIX
            ))
            .small(),
        );

        if ui.button("📥 Download comparison").clicked() {
            let name = format!("{}_comparison.csv", state.config.export_prefix);
            if let Some(path) = save_csv_dialog(&name) {
                state.export_comparison(&path);
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Detection trends (CRUD)
// ---------------------------------------------------------------------------

pub fn trends(ui: &mut Ui, state: &mut AppState) {
    ui.heading("🦠 Detection Trends");
    if state.store.is_none() {
        ui.label(RichText::new("Trend database unavailable.").color(Color32::RED));
        return;
    }

    let can_edit = state.config.user_can_edit;
    let selected: Vec<usize> = state.session.selected_trends.iter().copied().collect();

    ui.horizontal(|ui: &mut Ui| {
        if ui.button("⟳ Refresh").clicked() {
            state.refresh_trends();
        }
        if !can_edit {
            return;
        }
        if !selected.is_empty() {
            if ui.button("Edit selected row(s)").clicked() {
                let label = state
                    .trends
                    .get(selected[0])
                    .map_or(DetectionLabel::Consistent, |r| r.label);
                state.dispatch(Action::OpenDialog(Dialog::EditLabels {
                    rows: selected.clone(),
                    label,
                }));
            }
            if ui.button("Delete selected row(s)").clicked() {
                state.dispatch(Action::OpenDialog(Dialog::ConfirmDelete(selected.clone())));
            }
        }
        if ui.button("➕ Add new row").clicked() {
            state.dispatch(Action::OpenDialog(Dialog::NewRow(Default::default())));
        }
    });

    let headers = ["Location", "EpiYear", "EpiWeek", "Week_start", "Label"].map(String::from);
    let rows: Vec<Vec<RichText>> = state
        .trends
        .iter()
        .map(|t| {
            vec![
                text(&t.location),
                text(t.epi_year),
                text(t.epi_week),
                text(t.week_start),
                text(t.label),
            ]
        })
        .collect();
    if can_edit {
        let session = &state.session;
        let toggled = selectable_table(ui, "trends", &headers, &rows, |i| {
            session.selected_trends.contains(&i)
        });
        if let Some(i) = toggled {
            state.dispatch(Action::ToggleTrend(i));
        }
    } else {
        simple_table(ui, "trends", &headers, &rows);
    }

    ui.separator();
    egui::CollapsingHeader::new("Change log")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            let headers = ["When", "Change", "Before", "After"].map(String::from);
            let rows: Vec<Vec<RichText>> = state
                .audit_log
                .iter()
                .map(|e| {
                    vec![
                        text(&e.changed_at),
                        text(&e.change),
                        text(e.old_data.as_deref().unwrap_or("")),
                        text(e.new_data.as_deref().unwrap_or("")),
                    ]
                })
                .collect();
            simple_table(ui, "audit_log", &headers, &rows);
        });
}
