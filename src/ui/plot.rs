use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoint, PlotPoints, Polygon, Text};
use prefecture_explorer::data::model::total_bounds;

use crate::color::SequentialScale;
use crate::state::{Action, AppState};
use crate::ui::tables::format_count;

// ---------------------------------------------------------------------------
// Choropleth map (central panel)
// ---------------------------------------------------------------------------

/// Render visible divisions coloured by the session metric. Fills are drawn
/// from the precomputed triangles, outlines as lines. Clicking a division
/// focuses it.
pub fn choropleth(ui: &mut Ui, state: &mut AppState) {
    let records = state.visible_records();
    if records.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No prefectures match the current filter.");
        });
        return;
    }

    let metric = state.session.metric;
    let values: Vec<f64> = records.iter().map(|r| metric.value(r)).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let scale = SequentialScale::new(state.session.scheme, min, max);
    let focus = state.session.focus.clone();

    ui.horizontal(|ui: &mut Ui| {
        ui.label(metric.label());
        for (value, color) in scale.legend_entries(5) {
            ui.label(RichText::new("■").color(color));
            ui.label(format!("{value:.0}"));
        }
    });

    let bounds = total_bounds(records.iter().copied()).map(|b| b.padded(0.05));

    let response = Plot::new("choropleth")
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .include_x(bounds.map_or(0.0, |b| b.min_lon))
        .include_x(bounds.map_or(1.0, |b| b.max_lon))
        .include_y(bounds.map_or(0.0, |b| b.min_lat))
        .include_y(bounds.map_or(1.0, |b| b.max_lat))
        .show(ui, |plot_ui| {
            for ((record, value), &index) in records.iter().zip(&values).zip(&state.visible_indices) {
                let focused = focus.as_deref() == Some(record.name.as_str());
                let stroke = if focused {
                    Stroke::new(2.5, Color32::BLACK)
                } else {
                    Stroke::new(0.8, Color32::DARK_GRAY)
                };
                let fill = scale.color_for(*value);
                for triangle in state.division_fills.get(index).into_iter().flatten() {
                    let points: PlotPoints = triangle.iter().map(|&[lon, lat]| [lon, lat]).collect();
                    // A hairline in the fill colour hides seams between triangles.
                    plot_ui.polygon(
                        Polygon::new(points)
                            .fill_color(fill)
                            .stroke(Stroke::new(0.5, fill)),
                    );
                }
                for polygon in &record.geometry.polygons {
                    for ring in std::iter::once(&polygon.exterior).chain(&polygon.holes) {
                        let points: PlotPoints = ring.iter().map(|&[lon, lat]| [lon, lat]).collect();
                        plot_ui.line(Line::new(points).color(stroke.color).width(stroke.width));
                    }
                }
                if let Some([lon, lat]) = record.geometry.centroid() {
                    plot_ui.text(Text::new(
                        PlotPoint::new(lon, lat),
                        RichText::new(&record.name).size(10.0).color(Color32::BLACK),
                    ));
                }
            }

            plot_ui.pointer_coordinate().and_then(|p| {
                records
                    .iter()
                    .find(|r| r.geometry.contains([p.x, p.y]))
                    .map(|r| (r.name.clone(), r.total, r.gender_ratio()))
            })
        });

    let hovered = response.inner;
    let clicked = response.response.clicked();
    if let Some((name, total, ratio)) = &hovered {
        response.response.on_hover_text(format!(
            "{name}\nPopulation: {}\nGender ratio: {ratio:.1}",
            format_count(*total)
        ));
    }
    if clicked {
        state.dispatch(Action::Focus(hovered.map(|(name, _, _)| name)));
    }
}

// ---------------------------------------------------------------------------
// Bar charts
// ---------------------------------------------------------------------------

/// Vertical bar chart of `(label, value, colour)` entries in the given order.
pub fn bar_chart(ui: &mut Ui, id: &str, y_label: &str, entries: &[(String, f64, Color32)]) {
    let names: Vec<String> = entries.iter().map(|(n, _, _)| n.clone()).collect();
    let bars: Vec<Bar> = entries
        .iter()
        .enumerate()
        .map(|(i, (name, value, color))| {
            Bar::new(i as f64, *value)
                .name(name)
                .fill(*color)
                .width(0.7)
        })
        .collect();

    Plot::new(id)
        .height(260.0)
        .legend(Legend::default())
        .y_axis_label(y_label)
        .allow_drag(false)
        .allow_scroll(false)
        .x_axis_formatter(move |mark, _range| {
            let i = mark.value.round();
            if (mark.value - i).abs() > f64::EPSILON || i < 0.0 {
                return String::new();
            }
            names.get(i as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars));
        });
}
