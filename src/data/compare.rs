use std::collections::{HashMap, VecDeque};

use super::model::CellValue;
use super::table::Table;
use crate::error::{DataError, Result};

/// Suffix of the uploaded side of a paired column.
pub const LOCAL_SUFFIX: &str = "_upload";
/// Suffix of the stored side of a paired column.
pub const REFERENCE_SUFFIX: &str = "_database";

// ---------------------------------------------------------------------------
// Comparison result
// ---------------------------------------------------------------------------

/// One joined row.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    /// Values of the join-key columns.
    pub key: Vec<CellValue>,
    /// `(local, reference)` per paired field.
    pub pairs: Vec<(CellValue, CellValue)>,
    /// One flag per paired field.
    pub differs: Vec<bool>,
    pub local_extra: Vec<CellValue>,
    pub reference_extra: Vec<CellValue>,
}

impl ComparisonRow {
    pub fn has_differences(&self) -> bool {
        self.differs.iter().any(|d| *d)
    }
}

/// Inner join of an uploaded table against a reference table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    pub key_columns: Vec<String>,
    /// Fields present on both sides, compared cell by cell.
    pub paired_fields: Vec<String>,
    /// Columns only the uploaded table has.
    pub local_extra: Vec<String>,
    /// Columns only the reference table has.
    pub reference_extra: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

impl Comparison {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flattened column headers, paired fields suffixed per source.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = self.key_columns.clone();
        for field in &self.paired_fields {
            headers.push(format!("{field}{LOCAL_SUFFIX}"));
            headers.push(format!("{field}{REFERENCE_SUFFIX}"));
        }
        headers.extend(self.local_extra.iter().cloned());
        headers.extend(self.reference_extra.iter().cloned());
        headers
    }

    /// Number of rows with at least one differing field.
    pub fn differing_rows(&self) -> usize {
        self.rows.iter().filter(|r| r.has_differences()).count()
    }

    /// Number of differing cells per paired field.
    pub fn differences_per_field(&self) -> Vec<(String, usize)> {
        self.paired_fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let n = self.rows.iter().filter(|r| r.differs[i]).count();
                (field.clone(), n)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Inner join
// ---------------------------------------------------------------------------

/// Inner-join `local` and `reference` on `join_keys` and flag differing
/// cells.
///
/// Rows without a partner are dropped. Rows follow `local`'s order; when a
/// key repeats, local and reference rows pair off one-to-one in order of
/// appearance, so the result never exceeds the smaller input.
pub fn compare(local: &Table, reference: &Table, join_keys: &[&str]) -> Result<Comparison> {
    let local_keys = key_indices(local, join_keys, "uploaded")?;
    let reference_keys = key_indices(reference, join_keys, "database")?;

    let is_key = |c: &String| join_keys.contains(&c.as_str());
    let paired_fields: Vec<String> = local
        .columns
        .iter()
        .filter(|c| !is_key(c) && reference.has_column(c))
        .cloned()
        .collect();
    let local_extra: Vec<String> = local
        .columns
        .iter()
        .filter(|c| !is_key(c) && !reference.has_column(c))
        .cloned()
        .collect();
    let reference_extra: Vec<String> = reference
        .columns
        .iter()
        .filter(|c| !is_key(c) && !local.has_column(c))
        .cloned()
        .collect();

    let column_positions = |table: &Table, names: &[String]| -> Vec<usize> {
        names
            .iter()
            .filter_map(|n| table.column_index(n))
            .collect()
    };
    let local_paired = column_positions(local, &paired_fields);
    let reference_paired = column_positions(reference, &paired_fields);
    let local_extra_idx = column_positions(local, &local_extra);
    let reference_extra_idx = column_positions(reference, &reference_extra);

    let mut available: HashMap<Vec<CellValue>, VecDeque<usize>> = HashMap::new();
    for (i, row) in reference.rows.iter().enumerate() {
        available
            .entry(join_key(row, &reference_keys))
            .or_default()
            .push_back(i);
    }
    if available.values().any(|rows| rows.len() > 1) {
        log::warn!("Reference table has duplicate join keys; rows pair in order");
    }

    let mut rows = Vec::new();
    for local_row in &local.rows {
        let Some(ref_idx) = available
            .get_mut(&join_key(local_row, &local_keys))
            .and_then(VecDeque::pop_front)
        else {
            continue;
        };
        let reference_row = &reference.rows[ref_idx];

        let pairs: Vec<(CellValue, CellValue)> = local_paired
            .iter()
            .zip(&reference_paired)
            .map(|(&l, &r)| (local_row[l].clone(), reference_row[r].clone()))
            .collect();
        let differs = pairs.iter().map(|(l, r)| l.differs_from(r)).collect();

        rows.push(ComparisonRow {
            key: pick(local_row, &local_keys),
            pairs,
            differs,
            local_extra: pick(local_row, &local_extra_idx),
            reference_extra: pick(reference_row, &reference_extra_idx),
        });
    }

    log::info!(
        "Compared {} uploaded rows against {} reference rows: {} matched",
        local.len(),
        reference.len(),
        rows.len()
    );

    Ok(Comparison {
        key_columns: join_keys.iter().map(|k| k.to_string()).collect(),
        paired_fields,
        local_extra,
        reference_extra,
        rows,
    })
}

fn key_indices(table: &Table, join_keys: &[&str], side: &str) -> Result<Vec<usize>> {
    join_keys
        .iter()
        .map(|key| {
            table.column_index(key).ok_or_else(|| DataError::MergeKey {
                side: side.to_string(),
                key: key.to_string(),
            })
        })
        .collect()
}

fn pick(row: &[CellValue], indices: &[usize]) -> Vec<CellValue> {
    indices.iter().map(|&i| row[i].clone()).collect()
}

fn join_key(row: &[CellValue], indices: &[usize]) -> Vec<CellValue> {
    indices.iter().map(|&i| row[i].join_key()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<CellValue>>) -> Table {
        Table::from_rows(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn single_matching_row_flags_level() {
        let local = table(
            &["loc", "measure", "level"],
            vec![vec!["X".into(), "flu".into(), 5i64.into()]],
        );
        let reference = table(
            &["loc", "measure", "level"],
            vec![vec!["X".into(), "flu".into(), 7i64.into()]],
        );

        let cmp = compare(&local, &reference, &["loc", "measure"]).unwrap();
        assert_eq!(cmp.len(), 1);
        assert_eq!(cmp.paired_fields, vec!["level"]);
        assert_eq!(cmp.rows[0].differs, vec![true]);
        assert_eq!(
            cmp.headers(),
            vec!["loc", "measure", "level_upload", "level_database"]
        );
    }

    #[test]
    fn unmatched_rows_are_dropped() {
        let local = table(
            &["Location", "measure", "latestTrends"],
            vec![
                vec!["X".into(), "flu".into(), "Up".into()],
                vec!["Y".into(), "flu".into(), "Down".into()],
                vec!["X".into(), "rsv".into(), "Stable".into()],
            ],
        );
        let reference = table(
            &["Location", "measure", "latestTrends", "Viral_Activity_Level"],
            vec![
                vec!["X".into(), "rsv".into(), "Stable".into(), "Low".into()],
                vec!["Z".into(), "flu".into(), "Up".into(), "High".into()],
                vec!["X".into(), "flu".into(), "Up".into(), "Moderate".into()],
            ],
        );

        let cmp = compare(&local, &reference, &["Location", "measure"]).unwrap();
        let keys: Vec<String> = cmp.rows.iter().map(|r| r.key[1].to_string()).collect();
        // Local order is kept.
        assert_eq!(keys, vec!["flu", "rsv"]);
        assert_eq!(cmp.reference_extra, vec!["Viral_Activity_Level"]);
        assert_eq!(cmp.rows[0].reference_extra, vec![CellValue::from("Moderate")]);
        assert_eq!(cmp.differing_rows(), 0);
    }

    #[test]
    fn missing_join_key_is_merge_error() {
        let local = table(&["Location", "level"], vec![]);
        let reference = table(&["Location", "measure"], vec![]);
        let err = compare(&local, &reference, &["Location", "measure"]).unwrap_err();
        match err {
            DataError::MergeKey { side, key } => {
                assert_eq!(side, "uploaded");
                assert_eq!(key, "measure");
            }
            other => panic!("expected merge key error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_keys_stay_within_bounds() {
        let dup = |n: usize| {
            table(
                &["k", "v"],
                (0..n).map(|i| vec!["same".into(), (i as i64).into()]).collect(),
            )
        };
        let cmp = compare(&dup(3), &dup(2), &["k"]).unwrap();
        assert_eq!(cmp.len(), 2);
        assert!(cmp.len() <= 2.min(3));
        assert_eq!(cmp.differs_count(), 0);
    }

    #[test]
    fn integer_and_float_levels_are_equal() {
        let local = table(&["k", "level"], vec![vec!["a".into(), 5i64.into()]]);
        let reference = table(&["k", "level"], vec![vec!["a".into(), 5.0.into()]]);
        let cmp = compare(&local, &reference, &["k"]).unwrap();
        assert_eq!(cmp.rows[0].differs, vec![false]);
    }

    #[test]
    fn numeric_keys_match_across_types() {
        let local = table(&["site", "level"], vec![vec![5i64.into(), "Low".into()]]);
        let reference = table(&["site", "level"], vec![vec![5.0.into(), "High".into()]]);
        let cmp = compare(&local, &reference, &["site"]).unwrap();
        assert_eq!(cmp.len(), 1);
        assert_eq!(cmp.rows[0].key, vec![CellValue::Integer(5)]);
        assert_eq!(cmp.rows[0].differs, vec![true]);
    }

    #[test]
    fn missing_cells_count_as_differences() {
        let local = table(&["k", "trend"], vec![vec!["a".into(), CellValue::Null]]);
        let reference = table(&["k", "trend"], vec![vec!["a".into(), CellValue::Null]]);
        let cmp = compare(&local, &reference, &["k"]).unwrap();
        assert_eq!(cmp.rows[0].differs, vec![true]);
    }

    impl Comparison {
        fn differs_count(&self) -> usize {
            self.differences_per_field().iter().map(|(_, n)| n).sum()
        }
    }
}
