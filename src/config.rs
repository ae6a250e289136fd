use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "PREFECTURE_EXPLORER_CONFIG";

/// Configuration file picked up from the working directory when the
/// environment variable is unset.
pub const DEFAULT_CONFIG_FILE: &str = "prefecture-explorer.json";

// ---------------------------------------------------------------------------
// Field names of the boundary dataset
// ---------------------------------------------------------------------------

/// GeoJSON property names carrying the per-division attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub division: String,
    pub parent_region: String,
    pub total: String,
    pub male: String,
    pub female: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            division: "prefecture".to_string(),
            parent_region: "Region".to_string(),
            total: "Ensemble".to_string(),
            male: "Masculin".to_string(),
            female: "Feminin".to_string(),
        }
    }
}

impl FieldNames {
    /// Properties that must exist somewhere in the dataset.
    pub fn required(&self) -> [&str; 5] {
        [
            &self.division,
            &self.parent_region,
            &self.total,
            &self.male,
            &self.female,
        ]
    }
}

// ---------------------------------------------------------------------------
// Application configuration
// ---------------------------------------------------------------------------

/// Everything the application reads from its configuration file.
/// Absent keys fall back to [`AppConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// GeoJSON file with boundaries and population attributes.
    pub boundaries_path: PathBuf,
    /// SQLite database holding the trend tables and the audit log.
    pub database_path: PathBuf,
    pub fields: FieldNames,
    /// Divisions dropped at load time (city communes, protected areas...).
    pub excluded_divisions: Vec<String>,
    /// Upload column renames: `{ "Old Name": "new_name" }`.
    pub upload_rename: BTreeMap<String, String>,
    /// Renamed upload columns kept for review, in display order.
    pub upload_columns: Vec<String>,
    /// Columns the upload is joined on against the reference trends.
    pub join_keys: Vec<String>,
    /// Locations offered by the "add trend row" form.
    pub trend_locations: Vec<String>,
    pub user_can_edit: bool,
    /// Leading component of exported CSV file names.
    pub export_prefix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let upload_rename = [
            ("Assay", "measure"),
            ("Intensity", "LatestLevel"),
            ("Trend", "latestTrends"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        Self {
            boundaries_path: PathBuf::from("data/population_par_prefecture.geojson"),
            database_path: PathBuf::from("data/trends.sqlite"),
            fields: FieldNames::default(),
            excluded_divisions: vec!["LOME COMMUNE".to_string(), "PLAINE DU MO".to_string()],
            upload_rename,
            upload_columns: to_strings(&["Location", "measure", "latestTrends", "LatestLevel"]),
            join_keys: to_strings(&["Location", "measure"]),
            trend_locations: to_strings(&[
                "Calgary",
                "Edmonton",
                "Halifax",
                "Metro Vancouver",
                "Moncton",
                "Montreal",
                "Peel Region",
                "Regina",
                "St. John's",
                "Toronto",
                "Winnipeg",
            ]),
            user_can_edit: true,
            export_prefix: "prefecture".to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve and load the configuration.
    ///
    /// Order: `$PREFECTURE_EXPLORER_CONFIG`, then `./prefecture-explorer.json`,
    /// then built-in defaults. An explicitly named file that cannot be read
    /// is an error; a missing default file is not.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::from_file(default_path);
        }
        log::info!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn join_key_refs(&self) -> Vec<&str> {
        self.join_keys.iter().map(String::as_str).collect()
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
