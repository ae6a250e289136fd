use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{DetectionLabel, TrendRow};

pub const MIN_EPI_YEAR: i32 = 2000;
pub const MAX_EPI_YEAR: i32 = 2100;
pub const MAX_EPI_WEEK: u32 = 53;

/// Why a new-row form cannot be submitted yet. Shown inline; never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormWarning {
    #[error("Please select a location.")]
    MissingLocation,
    #[error("Please enter EpiYear.")]
    MissingYear,
    #[error("Please enter EpiWeek.")]
    MissingWeek,
    #[error("Please select Week_start.")]
    MissingWeekStart,
    #[error("Please select a label.")]
    MissingLabel,
    #[error("EpiYear must be between 2000 and 2100.")]
    YearOutOfRange,
    #[error("EpiWeek must be between 1 and 53.")]
    WeekOutOfRange,
}

/// Fields of the "add trend row" dialog. `None` is the unset placeholder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTrendForm {
    pub location: Option<String>,
    pub epi_year: Option<i32>,
    pub epi_week: Option<u32>,
    pub week_start: Option<NaiveDate>,
    pub label: Option<DetectionLabel>,
}

impl NewTrendForm {
    /// Check the fields in display order and build the row to insert.
    pub fn validate(&self) -> Result<TrendRow, FormWarning> {
        let location = self
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or(FormWarning::MissingLocation)?;
        let epi_year = self.epi_year.ok_or(FormWarning::MissingYear)?;
        if !(MIN_EPI_YEAR..=MAX_EPI_YEAR).contains(&epi_year) {
            return Err(FormWarning::YearOutOfRange);
        }
        let epi_week = self.epi_week.ok_or(FormWarning::MissingWeek)?;
        if !(1..=MAX_EPI_WEEK).contains(&epi_week) {
            return Err(FormWarning::WeekOutOfRange);
        }
        let week_start = self.week_start.ok_or(FormWarning::MissingWeekStart)?;
        let label = self.label.ok_or(FormWarning::MissingLabel)?;

        Ok(TrendRow {
            location: location.to_string(),
            epi_year,
            epi_week,
            week_start,
            label,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn complete() -> NewTrendForm {
        NewTrendForm {
            location: Some("Toronto".into()),
            epi_year: Some(2025),
            epi_week: Some(12),
            week_start: NaiveDate::from_ymd_opt(2025, 3, 16),
            label: Some(DetectionLabel::Intermittent),
        }
    }

    #[test]
    fn complete_form_builds_row() {
        let row = complete().validate().unwrap();
        assert_eq!(row.location, "Toronto");
        assert_eq!(row.epi_week, 12);
        assert_eq!(row.label, DetectionLabel::Intermittent);
    }

    #[test]
    fn empty_form_asks_for_location_first() {
        assert_eq!(
            NewTrendForm::default().validate(),
            Err(FormWarning::MissingLocation)
        );
    }

    #[rstest]
    #[case(|f: &mut NewTrendForm| f.location = Some("  ".into()), FormWarning::MissingLocation)]
    #[case(|f: &mut NewTrendForm| f.epi_year = None, FormWarning::MissingYear)]
    #[case(|f: &mut NewTrendForm| f.epi_year = Some(1999), FormWarning::YearOutOfRange)]
    #[case(|f: &mut NewTrendForm| f.epi_year = Some(2101), FormWarning::YearOutOfRange)]
    #[case(|f: &mut NewTrendForm| f.epi_week = Some(0), FormWarning::WeekOutOfRange)]
    #[case(|f: &mut NewTrendForm| f.epi_week = Some(54), FormWarning::WeekOutOfRange)]
    #[case(|f: &mut NewTrendForm| f.week_start = None, FormWarning::MissingWeekStart)]
    #[case(|f: &mut NewTrendForm| f.label = None, FormWarning::MissingLabel)]
    fn incomplete_form_warns(#[case] unset: fn(&mut NewTrendForm), #[case] expected: FormWarning) {
        let mut form = complete();
        unset(&mut form);
        assert_eq!(form.validate(), Err(expected));
    }

    #[test]
    fn boundary_years_and_weeks_are_accepted() {
        let mut form = complete();
        form.epi_year = Some(2100);
        form.epi_week = Some(53);
        assert!(form.validate().is_ok());
        form.epi_year = Some(2000);
        form.epi_week = Some(1);
        assert!(form.validate().is_ok());
    }
}
