use std::io::Write;

use serde::Serialize;

use super::aggregate::{shares_of_total, RankedRow, Summary};
use super::compare::Comparison;
use super::filter::Selection;
use super::model::RegionRecord;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Row shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct DivisionRow<'a> {
    #[serde(rename = "Prefecture")]
    name: &'a str,
    #[serde(rename = "Region")]
    parent_region: &'a str,
    #[serde(rename = "Total")]
    total: u64,
    #[serde(rename = "Male")]
    male: u64,
    #[serde(rename = "Female")]
    female: u64,
    #[serde(rename = "Gender Ratio")]
    gender_ratio: f64,
}

#[derive(Debug, Serialize)]
struct GroupRow<'a> {
    #[serde(rename = "Region")]
    region: &'a str,
    #[serde(rename = "Prefectures")]
    divisions: usize,
    #[serde(rename = "Total")]
    total: u64,
    #[serde(rename = "Male")]
    male: u64,
    #[serde(rename = "Female")]
    female: u64,
    #[serde(rename = "% Male")]
    male_percent: f64,
    #[serde(rename = "% Female")]
    female_percent: f64,
    #[serde(rename = "M/F Ratio")]
    ratio: f64,
    #[serde(rename = "% of National")]
    national_share: f64,
}

#[derive(Debug, Serialize)]
struct RankRow<'a> {
    #[serde(rename = "Prefecture")]
    name: &'a str,
    #[serde(rename = "Population")]
    total: u64,
    #[serde(rename = "Rank")]
    rank: usize,
    #[serde(rename = "% of Total")]
    share: f64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Filtered divisions with their gender ratio.
pub fn write_divisions_csv<'a, W, I>(writer: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a RegionRecord>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records {
        wtr.serialize(DivisionRow {
            name: &r.name,
            parent_region: r.parent_region.as_deref().unwrap_or(""),
            total: r.total,
            male: r.male,
            female: r.female,
            gender_ratio: round2(r.gender_ratio()),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Per-region statistics as produced by `summarize_by_group`, each with its
/// share of the exported groups' combined total.
pub fn write_group_summary_csv<W: Write>(writer: W, groups: &[(String, Summary)]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for ((region, s), share) in groups.iter().zip(shares_of_total(groups)) {
        wtr.serialize(GroupRow {
            region,
            divisions: s.count,
            total: s.sum_total,
            male: s.sum_male,
            female: s.sum_female,
            male_percent: round2(s.male_percent()),
            female_percent: round2(s.female_percent()),
            ratio: round2(s.male_female_ratio),
            national_share: round2(share),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_ranked_csv<W: Write>(writer: W, rows: &[RankedRow<'_>]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(RankRow {
            name: &row.record.name,
            total: row.record.total,
            rank: row.dense_rank,
            share: round2(row.share_percent),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Joined comparison rows. Column layout follows [`Comparison::headers`]
/// with one `<field>_differs` flag per paired field appended.
pub fn write_comparison_csv<W: Write>(writer: W, comparison: &Comparison) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut headers = comparison.headers();
    headers.extend(
        comparison
            .paired_fields
            .iter()
            .map(|f| format!("{f}_differs")),
    );
    wtr.write_record(&headers)?;

    for row in &comparison.rows {
        let mut record: Vec<String> = row.key.iter().map(ToString::to_string).collect();
        for (local, reference) in &row.pairs {
            record.push(local.to_string());
            record.push(reference.to_string());
        }
        record.extend(row.local_extra.iter().map(ToString::to_string));
        record.extend(row.reference_extra.iter().map(ToString::to_string));
        record.extend(row.differs.iter().map(ToString::to_string));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

/// Suggested export file name embedding the active filter's parameter,
/// e.g. `prefecture_maritime_population.csv`.
pub fn export_file_name(prefix: &str, selection: &Selection) -> String {
    let parameter = match selection {
        s if s.is_unfiltered() => "all".to_string(),
        Selection::ByParentRegion(region) => slug(region),
        Selection::ByNameSet(names) => format!("{}_selected", names.len()),
        Selection::ByValueRange { min, max } => format!("{min}_{max}"),
        Selection::All => "all".to_string(),
    };
    format!("{}_{parameter}_population.csv", slug(prefix))
}

fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::{ranked_table, summarize_by_group, by_parent_region};
    use crate::data::compare::compare;
    use crate::data::filter::ALL_REGIONS;
    use crate::data::model::{Boundary, CellValue};
    use crate::data::table::Table;
    use std::collections::BTreeSet;

    fn record(name: &str, region: &str, total: u64, male: u64, female: u64) -> RegionRecord {
        RegionRecord {
            name: name.to_string(),
            parent_region: Some(region.to_string()),
            total,
            male,
            female,
            geometry: Boundary::default(),
        }
    }

    fn as_text(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn divisions_csv_rounds_ratio() {
        let records = vec![record("Golfe", "MARITIME", 300, 100, 200)];
        let mut buf = Vec::new();
        write_divisions_csv(&mut buf, &records).unwrap();
        let text = as_text(buf);
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Prefecture,Region,Total,Male,Female,Gender Ratio")
        );
        assert_eq!(lines.next(), Some("Golfe,MARITIME,300,100,200,50.0"));
    }

    #[test]
    fn group_and_rank_exports() {
        let records = vec![
            record("A", "R1", 100, 60, 40),
            record("B", "R2", 200, 90, 110),
            record("C", "R1", 50, 20, 30),
        ];
        let groups = summarize_by_group(&records, by_parent_region);
        let mut buf = Vec::new();
        write_group_summary_csv(&mut buf, &groups).unwrap();
        let text = as_text(buf);
        // Header plus one line per region.
        assert_eq!(text.lines().count(), 3);
        assert_eq!(
            text.lines().next(),
            Some("Region,Prefectures,Total,Male,Female,% Male,% Female,M/F Ratio,% of National")
        );
        assert_eq!(text.lines().nth(1), Some("R2,1,200,90,110,45.0,55.0,81.82,57.14"));

        let refs: Vec<&RegionRecord> = records.iter().collect();
        let ranked = ranked_table(&refs, 350);
        let mut buf = Vec::new();
        write_ranked_csv(&mut buf, &ranked).unwrap();
        let text = as_text(buf);
        assert_eq!(text.lines().nth(1), Some("B,200,1,57.14"));
    }

    #[test]
    fn comparison_csv_has_flags() {
        let columns = vec!["k".to_string(), "level".to_string()];
        let local = Table::from_rows(columns.clone(), vec![vec!["a".into(), 5i64.into()]]);
        let reference = Table::from_rows(columns, vec![vec!["a".into(), CellValue::Integer(7)]]);
        let cmp = compare(&local, &reference, &["k"]).unwrap();

        let mut buf = Vec::new();
        write_comparison_csv(&mut buf, &cmp).unwrap();
        let text = as_text(buf);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "k,level_upload,level_database,level_differs");
        assert_eq!(lines[1], "a,5,7,true");
    }

    #[test]
    fn file_name_embeds_filter() {
        let region = Selection::ByParentRegion("MARITIME".into());
        assert_eq!(
            export_file_name("prefecture", &region),
            "prefecture_maritime_population.csv"
        );
        assert_eq!(
            export_file_name("prefecture", &Selection::ByParentRegion(ALL_REGIONS.into())),
            "prefecture_all_population.csv"
        );
        assert_eq!(
            export_file_name("Togo Data", &Selection::ByValueRange { min: 10, max: 20 }),
            "togo_data_10_20_population.csv"
        );
        let names: BTreeSet<String> = ["A".to_string(), "B".to_string()].into();
        assert_eq!(
            export_file_name("p", &Selection::ByNameSet(names)),
            "p_2_selected_population.csv"
        );
    }
}
