use eframe::egui::{Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

/// Background used for cells that differ between upload and database.
pub const DIFF_HIGHLIGHT: Color32 = Color32::from_rgb(255, 204, 204);

/// Striped, resizable table of pre-formatted cells. `id` keeps several
/// tables on one page apart.
pub fn simple_table(ui: &mut Ui, id: &str, headers: &[String], rows: &[Vec<RichText>]) {
    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .max_scroll_height(320.0)
            .columns(Column::auto().at_least(60.0), headers.len())
            .header(20.0, |mut header| {
                for h in headers {
                    header.col(|ui: &mut Ui| {
                        ui.strong(h);
                    });
                }
            })
            .body(|mut body| {
                for row in rows {
                    body.row(18.0, |mut table_row| {
                        for cell in row {
                            table_row.col(|ui: &mut Ui| {
                                ui.label(cell.clone());
                            });
                        }
                    });
                }
            });
    });
}

/// Same as [`simple_table`] but with a leading checkbox column. Returns the
/// index of the row whose checkbox was toggled this frame.
pub fn selectable_table(
    ui: &mut Ui,
    id: &str,
    headers: &[String],
    rows: &[Vec<RichText>],
    is_selected: impl Fn(usize) -> bool,
) -> Option<usize> {
    let mut toggled = None;
    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .max_scroll_height(420.0)
            .column(Column::exact(24.0))
            .columns(Column::auto().at_least(60.0), headers.len())
            .header(20.0, |mut header| {
                header.col(|_ui: &mut Ui| {});
                for h in headers {
                    header.col(|ui: &mut Ui| {
                        ui.strong(h);
                    });
                }
            })
            .body(|mut body| {
                for (i, row) in rows.iter().enumerate() {
                    body.row(18.0, |mut table_row| {
                        table_row.col(|ui: &mut Ui| {
                            let mut checked = is_selected(i);
                            if ui.checkbox(&mut checked, "").changed() {
                                toggled = Some(i);
                            }
                        });
                        for cell in row {
                            table_row.col(|ui: &mut Ui| {
                                ui.label(cell.clone());
                            });
                        }
                    });
                }
            });
    });
    toggled
}

pub fn text(value: impl ToString) -> RichText {
    RichText::new(value.to_string())
}

/// Thousands separators for population counts.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_are_grouped() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1_000), "1,000");
        assert_eq!(format_count(8_095_498), "8,095,498");
    }
}
