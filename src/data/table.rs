use std::collections::BTreeMap;

use super::model::CellValue;

// ---------------------------------------------------------------------------
// Table – a small in-memory dataframe
// ---------------------------------------------------------------------------

/// Row-oriented table with named columns. Every row has exactly
/// `columns.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from column names and rows, padding short rows with
    /// nulls and truncating long ones.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();
        Table { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Null);
        self.rows.push(row);
    }

    /// Rename columns through `map` (`old → new`). Columns not in the map
    /// keep their name.
    pub fn rename_columns(mut self, map: &BTreeMap<String, String>) -> Self {
        for column in &mut self.columns {
            if let Some(new_name) = map.get(column.as_str()) {
                *column = new_name.clone();
            }
        }
        self
    }

    /// Keep only the listed columns that exist, in the listed order.
    pub fn select_existing(&self, columns: &[String]) -> Table {
        let picked: Vec<(usize, String)> = columns
            .iter()
            .filter_map(|c| self.column_index(c).map(|i| (i, c.clone())))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| picked.iter().map(|(i, _)| row[*i].clone()).collect())
            .collect();
        Table {
            columns: picked.into_iter().map(|(_, c)| c).collect(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload() -> Table {
        Table::from_rows(
            vec!["Location".into(), "Assay".into(), "Intensity".into(), "Extra".into()],
            vec![vec!["X".into(), "flu".into(), 5i64.into(), "drop me".into()]],
        )
    }

    #[test]
    fn rename_then_select_display_columns() {
        let map: BTreeMap<String, String> = [("Assay", "measure"), ("Intensity", "LatestLevel")]
            .into_iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect();
        let wanted: Vec<String> = ["Location", "measure", "latestTrends", "LatestLevel"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let table = upload().rename_columns(&map).select_existing(&wanted);
        assert_eq!(table.columns, vec!["Location", "measure", "LatestLevel"]);
        assert_eq!(table.get(0, "LatestLevel"), Some(&CellValue::Integer(5)));
        assert!(!table.has_column("Extra"));
    }

    #[test]
    fn short_rows_are_padded() {
        let table = Table::from_rows(vec!["a".into(), "b".into()], vec![vec![1i64.into()]]);
        assert_eq!(table.rows[0], vec![CellValue::Integer(1), CellValue::Null]);
    }
}
