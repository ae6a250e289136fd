//! Persistent trend tables and their audit log.

pub mod form;
pub mod sqlite;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use form::{FormWarning, NewTrendForm};
pub use sqlite::TrendStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by the trend store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be interpreted.
    #[error("Invalid stored value in column '{column}': {value}")]
    InvalidStored { column: String, value: String },

    /// Update or delete targeted a row that no longer exists.
    #[error("Trend row not found: {0}")]
    RowNotFound(String),
}

// ---------------------------------------------------------------------------
// Detection label
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionLabel {
    #[serde(rename = "Consistent Detection")]
    Consistent,
    #[serde(rename = "Intermittent Detection")]
    Intermittent,
    #[serde(rename = "No Detection")]
    NoDetection,
    #[serde(rename = "No Recent Data")]
    NoRecentData,
}

impl DetectionLabel {
    pub const ALL: [DetectionLabel; 4] = [
        DetectionLabel::Consistent,
        DetectionLabel::Intermittent,
        DetectionLabel::NoDetection,
        DetectionLabel::NoRecentData,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Consistent => "Consistent Detection",
            Self::Intermittent => "Intermittent Detection",
            Self::NoDetection => "No Detection",
            Self::NoRecentData => "No Recent Data",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == s)
    }
}

impl fmt::Display for DetectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One weekly detection classification for a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendRow {
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "EpiYear")]
    pub epi_year: i32,
    #[serde(rename = "EpiWeek")]
    pub epi_week: u32,
    #[serde(rename = "Week_start")]
    pub week_start: NaiveDate,
    #[serde(rename = "label")]
    pub label: DetectionLabel,
}

/// A row of the reference trends table the upload screen compares against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTrend {
    pub location: String,
    pub measure: String,
    pub latest_level: String,
    pub viral_activity_level: String,
    pub latest_trends: String,
}

/// One entry of the change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    /// RFC 3339 timestamp.
    pub changed_at: String,
    pub change: String,
    /// JSON of the row before the change; `None` for inserts.
    pub old_data: Option<String>,
    /// JSON of the row after the change; `None` for deletes.
    pub new_data: Option<String>,
}
