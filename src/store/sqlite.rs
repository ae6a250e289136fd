use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, Transaction};

use super::{
    AuditEntry, DetectionLabel, ReferenceTrend, StoreError, StoreResult, TrendRow,
};
use crate::data::loader::guess_cell_type;
use crate::data::table::Table;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Change labels written to the audit log.
pub const CHANGE_EDIT: &str = "Detection Trends";
pub const CHANGE_INSERT: &str = "Detection Trends - Add New Row";
pub const CHANGE_DELETE: &str = "Detection Trends - Delete";

/// Column names of the reference table, as the comparison screen sees them.
pub const REFERENCE_COLUMNS: [&str; 5] = [
    "Location",
    "measure",
    "LatestLevel",
    "Viral_Activity_Level",
    "latestTrends",
];

/// SQLite-backed trend tables.
#[derive(Debug)]
pub struct TrendStore {
    conn: Connection,
}

impl TrendStore {
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        log::info!("Opened trend store {}", path.as_ref().display());
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// In-memory store, used by tests and the sample generator.
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS detection_trends (
                location TEXT NOT NULL,
                epi_year INTEGER NOT NULL,
                epi_week INTEGER NOT NULL,
                week_start TEXT NOT NULL,
                label TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trends_key
                ON detection_trends(location, epi_year, epi_week, week_start);

            CREATE TABLE IF NOT EXISTS reference_trends (
                location TEXT NOT NULL,
                measure TEXT NOT NULL,
                latest_level TEXT NOT NULL,
                viral_activity_level TEXT NOT NULL,
                latest_trends TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                changed_at TEXT NOT NULL,
                change_type TEXT NOT NULL,
                old_data TEXT,
                new_data TEXT
            );",
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Detection trends
    // -----------------------------------------------------------------------

    pub fn fetch_trends(&self) -> StoreResult<Vec<TrendRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT location, epi_year, epi_week, week_start, label
             FROM detection_trends
             ORDER BY location, epi_year, epi_week",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i32>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut trends = Vec::new();
        for row in rows {
            let (location, epi_year, epi_week, week_start, label) = row?;
            let week_start = NaiveDate::parse_from_str(&week_start, DATE_FORMAT).map_err(|_| {
                StoreError::InvalidStored {
                    column: "week_start".to_string(),
                    value: week_start.clone(),
                }
            })?;
            let label = DetectionLabel::parse(&label).ok_or(StoreError::InvalidStored {
                column: "label".to_string(),
                value: label.clone(),
            })?;
            trends.push(TrendRow {
                location,
                epi_year,
                epi_week,
                week_start,
                label,
            });
        }
        Ok(trends)
    }

    pub fn insert_trend(&self, row: &TrendRow) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO detection_trends (location, epi_year, epi_week, week_start, label)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.location,
                row.epi_year,
                row.epi_week,
                row.week_start.format(DATE_FORMAT).to_string(),
                row.label.as_str(),
            ],
        )?;
        insert_audit(&tx, CHANGE_INSERT, None, Some(row))?;
        tx.commit()?;
        log::info!("Inserted trend row for {}", row.location);
        Ok(())
    }

    /// Change the label of one row, returning the updated row.
    pub fn update_label(&self, row: &TrendRow, label: DetectionLabel) -> StoreResult<TrendRow> {
        let updated = TrendRow {
            label,
            ..row.clone()
        };
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE detection_trends SET label = ?1
             WHERE location = ?2 AND epi_year = ?3 AND epi_week = ?4 AND week_start = ?5",
            params![
                label.as_str(),
                row.location,
                row.epi_year,
                row.epi_week,
                row.week_start.format(DATE_FORMAT).to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::RowNotFound(describe(row)));
        }
        insert_audit(&tx, CHANGE_EDIT, Some(row), Some(&updated))?;
        tx.commit()?;
        log::info!("Relabelled {} as {}", describe(row), label);
        Ok(updated)
    }

    /// Delete rows matching every field, with one audit entry per row.
    /// Nothing is deleted if any row is missing.
    pub fn delete_trends(&self, rows: &[TrendRow]) -> StoreResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for row in rows {
            let changed = tx.execute(
                "DELETE FROM detection_trends
                 WHERE location = ?1 AND epi_year = ?2 AND epi_week = ?3
                   AND week_start = ?4 AND label = ?5",
                params![
                    row.location,
                    row.epi_year,
                    row.epi_week,
                    row.week_start.format(DATE_FORMAT).to_string(),
                    row.label.as_str(),
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::RowNotFound(describe(row)));
            }
            insert_audit(&tx, CHANGE_DELETE, Some(row), None)?;
        }
        tx.commit()?;
        log::info!("Deleted {} trend rows", rows.len());
        Ok(rows.len())
    }

    /// Audit entries, newest first.
    pub fn fetch_audit_log(&self) -> StoreResult<Vec<AuditEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, changed_at, change_type, old_data, new_data
             FROM audit_log ORDER BY id DESC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    changed_at: row.get(1)?,
                    change: row.get(2)?,
                    old_data: row.get(3)?,
                    new_data: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // -----------------------------------------------------------------------
    // Reference trends
    // -----------------------------------------------------------------------

    /// The reference table as a generic [`Table`] for joining. Values are
    /// typed like CSV cells so numeric levels compare with uploads.
    pub fn fetch_reference_table(&self) -> StoreResult<Table> {
        let mut stmt = self.conn.prepare(
            "SELECT location, measure, latest_level, viral_activity_level, latest_trends
             FROM reference_trends",
        )?;
        let mut table = Table::new(REFERENCE_COLUMNS.iter().map(|c| c.to_string()).collect());
        let rows = stmt.query_map([], |row| {
            (0..REFERENCE_COLUMNS.len())
                .map(|i| row.get::<_, String>(i).map(|v| guess_cell_type(&v)))
                .collect::<Result<Vec<_>, _>>()
        })?;
        for row in rows {
            table.push_row(row?);
        }
        Ok(table)
    }

    pub fn replace_reference_trends(&self, trends: &[ReferenceTrend]) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM reference_trends", [])?;
        for t in trends {
            tx.execute(
                "INSERT INTO reference_trends
                 (location, measure, latest_level, viral_activity_level, latest_trends)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    t.location,
                    t.measure,
                    t.latest_level,
                    t.viral_activity_level,
                    t.latest_trends
                ],
            )?;
        }
        tx.commit()?;
        log::info!("Stored {} reference trends", trends.len());
        Ok(())
    }
}

fn insert_audit(
    tx: &Transaction<'_>,
    change: &str,
    old: Option<&TrendRow>,
    new: Option<&TrendRow>,
) -> StoreResult<()> {
    let old_data = old.map(serde_json::to_string).transpose()?;
    let new_data = new.map(serde_json::to_string).transpose()?;
    tx.execute(
        "INSERT INTO audit_log (changed_at, change_type, old_data, new_data)
         VALUES (?1, ?2, ?3, ?4)",
        params![Utc::now().to_rfc3339(), change, old_data, new_data],
    )?;
    Ok(())
}

fn describe(row: &TrendRow) -> String {
    format!("{} {}-W{:02}", row.location, row.epi_year, row.epi_week)
}
