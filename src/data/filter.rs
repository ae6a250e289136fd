use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::model::RegionRecord;

/// Parent-region parameter meaning "no region constraint".
pub const ALL_REGIONS: &str = "All Regions";

// ---------------------------------------------------------------------------
// Selection: which divisions the user is looking at
// ---------------------------------------------------------------------------

/// The active filter. Recomputed on every interaction, never persisted
/// beyond the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    #[default]
    All,
    ByParentRegion(String),
    /// An empty set falls back to every division.
    ByNameSet(BTreeSet<String>),
    /// Inclusive bounds on `total`.
    ByValueRange { min: u64, max: u64 },
}

impl Selection {
    /// Human-readable title for map and table headings.
    pub fn label(&self) -> String {
        match self {
            Selection::All => "All divisions".to_string(),
            Selection::ByParentRegion(region) if region == ALL_REGIONS => {
                "All divisions".to_string()
            }
            Selection::ByParentRegion(region) => format!("Region: {region}"),
            Selection::ByNameSet(names) if names.is_empty() => "All divisions".to_string(),
            Selection::ByNameSet(names) => format!("Selected divisions ({})", names.len()),
            Selection::ByValueRange { min, max } => format!("Population {min} - {max}"),
        }
    }

    /// Whether this selection passes every record through.
    pub fn is_unfiltered(&self) -> bool {
        match self {
            Selection::All => true,
            Selection::ByParentRegion(region) => region == ALL_REGIONS,
            Selection::ByNameSet(names) => names.is_empty(),
            Selection::ByValueRange { .. } => false,
        }
    }

    fn matches(&self, record: &RegionRecord) -> bool {
        match self {
            Selection::All => true,
            Selection::ByParentRegion(region) => {
                region == ALL_REGIONS || record.parent_region.as_deref() == Some(region.as_str())
            }
            Selection::ByNameSet(names) => names.is_empty() || names.contains(&record.name),
            Selection::ByValueRange { min, max } => (*min..=*max).contains(&record.total),
        }
    }
}

/// Return indices of records that pass the selection, in input order.
pub fn filtered_indices(records: &[RegionRecord], selection: &Selection) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| selection.matches(r))
        .map(|(i, _)| i)
        .collect()
}

/// Borrowing variant of [`filtered_indices`].
pub fn filter<'a>(records: &'a [RegionRecord], selection: &Selection) -> Vec<&'a RegionRecord> {
    records.iter().filter(|r| selection.matches(r)).collect()
}

// ---------------------------------------------------------------------------
// Gender majority finder
// ---------------------------------------------------------------------------

/// Largest `|male - female| / total` still counted as balanced.
pub const BALANCE_TOLERANCE: f64 = 0.02;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenderMajority {
    #[default]
    MoreMales,
    MoreFemales,
    /// Within [`BALANCE_TOLERANCE`] of the total.
    Balanced,
}

impl GenderMajority {
    pub const ALL: [GenderMajority; 3] = [
        GenderMajority::MoreMales,
        GenderMajority::MoreFemales,
        GenderMajority::Balanced,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GenderMajority::MoreMales => "More Males",
            GenderMajority::MoreFemales => "More Females",
            GenderMajority::Balanced => "Balanced (±2%)",
        }
    }

    fn matches(&self, record: &RegionRecord) -> bool {
        match self {
            GenderMajority::MoreMales => record.male > record.female,
            GenderMajority::MoreFemales => record.male < record.female,
            GenderMajority::Balanced => {
                record.total > 0
                    && record.male.abs_diff(record.female) as f64 / record.total as f64
                        <= BALANCE_TOLERANCE
            }
        }
    }
}

/// Records with the requested gender majority, in input order. A division
/// with a zero total is never balanced.
pub fn gender_majority<'a, I>(records: I, majority: GenderMajority) -> Vec<&'a RegionRecord>
where
    I: IntoIterator<Item = &'a RegionRecord>,
{
    records
        .into_iter()
        .filter(|r| majority.matches(r))
        .collect()
}

/// Case-insensitive substring search on division names. A blank term
/// matches nothing.
pub fn search<'a>(records: &'a [RegionRecord], term: &str) -> Vec<&'a RegionRecord> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|r| r.name.to_lowercase().contains(&term))
        .collect()
}
