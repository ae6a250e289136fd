use std::collections::BTreeMap;

use super::model::{percent, ratio_per_hundred, RegionRecord, RegionTotal};

// ---------------------------------------------------------------------------
// Summary statistics over a subset of divisions
// ---------------------------------------------------------------------------

/// A named extreme value (largest / smallest division).
#[derive(Debug, Clone, PartialEq)]
pub struct Extreme {
    pub name: String,
    pub total: u64,
}

/// Statistics the map and statistics panels show for a subset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub sum_total: u64,
    pub sum_male: u64,
    pub sum_female: u64,
    pub mean_total: f64,
    pub max: Option<Extreme>,
    pub min: Option<Extreme>,
    /// Male per 100 female; 0 when there are no females.
    pub male_female_ratio: f64,
    pub median_total: Option<f64>,
    /// Sample standard deviation; needs two or more records.
    pub std_dev_total: Option<f64>,
}

impl Summary {
    pub fn male_percent(&self) -> f64 {
        percent(self.sum_male, self.sum_total)
    }

    pub fn female_percent(&self) -> f64 {
        percent(self.sum_female, self.sum_total)
    }
}

/// Summarize a subset. The empty subset yields zero sums, a zero mean and
/// ratio, and no extremes. Sums saturate at `u64::MAX`.
pub fn summarize<'a, I>(records: I) -> Summary
where
    I: IntoIterator<Item = &'a RegionRecord>,
{
    let mut summary = Summary::default();
    let mut totals = Vec::new();

    for r in records {
        summary.count += 1;
        summary.sum_total = summary.sum_total.saturating_add(r.total);
        summary.sum_male = summary.sum_male.saturating_add(r.male);
        summary.sum_female = summary.sum_female.saturating_add(r.female);
        totals.push(r.total);

        // Ties keep the first record seen, like `idxmax`.
        if summary.max.as_ref().map_or(true, |m| r.total > m.total) {
            summary.max = Some(Extreme {
                name: r.name.clone(),
                total: r.total,
            });
        }
        if summary.min.as_ref().map_or(true, |m| r.total < m.total) {
            summary.min = Some(Extreme {
                name: r.name.clone(),
                total: r.total,
            });
        }
    }

    if summary.count > 0 {
        summary.mean_total = summary.sum_total as f64 / summary.count as f64;
    }
    summary.male_female_ratio = ratio_per_hundred(summary.sum_male, summary.sum_female);
    summary.median_total = median(&mut totals);
    summary.std_dev_total = sample_std_dev(&totals, summary.mean_total);
    summary
}

fn median(values: &mut [u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] as f64 + values[mid] as f64) / 2.0
    } else {
        values[mid] as f64
    })
}

fn sample_std_dev(values: &[u64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let ss: f64 = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Summaries per group, largest `sum_total` first (ties by group name).
/// Records for which `key` yields `None` are left out.
pub fn summarize_by_group<'a, I, F>(records: I, key: F) -> Vec<(String, Summary)>
where
    I: IntoIterator<Item = &'a RegionRecord>,
    F: Fn(&RegionRecord) -> Option<&str>,
{
    let mut groups: BTreeMap<String, Vec<&RegionRecord>> = BTreeMap::new();
    for r in records {
        if let Some(k) = key(r) {
            groups.entry(k.to_string()).or_default().push(r);
        }
    }
    let mut out: Vec<(String, Summary)> = groups
        .into_iter()
        .map(|(k, members)| (k, summarize(members)))
        .collect();
    out.sort_by(|a, b| b.1.sum_total.cmp(&a.1.sum_total));
    out
}

/// Each group's share of the combined total of all groups, in percent.
pub fn shares_of_total(groups: &[(String, Summary)]) -> Vec<f64> {
    let whole = groups
        .iter()
        .fold(0u64, |acc, (_, s)| acc.saturating_add(s.sum_total));
    groups.iter().map(|(_, s)| percent(s.sum_total, whole)).collect()
}

/// The group whose male/female ratio is closest to parity.
#[derive(Debug, Clone, PartialEq)]
pub struct BalancedRegion {
    pub region: String,
    /// Male per 100 female.
    pub ratio: f64,
    /// `|male - female|`.
    pub difference: u64,
}

/// Group with the smallest `|ratio - 100|`; the first one wins a tie.
/// Groups without females have no ratio and are skipped.
pub fn most_balanced_region(groups: &[(String, Summary)]) -> Option<BalancedRegion> {
    groups
        .iter()
        .filter(|(_, s)| s.sum_female > 0)
        .min_by(|(_, a), (_, b)| {
            let gap = |s: &Summary| (s.male_female_ratio - 100.0).abs();
            gap(a).total_cmp(&gap(b))
        })
        .map(|(region, s)| BalancedRegion {
            region: region.clone(),
            ratio: s.male_female_ratio,
            difference: s.sum_male.abs_diff(s.sum_female),
        })
}

/// Group key: the parent region.
pub fn by_parent_region(record: &RegionRecord) -> Option<&str> {
    record.parent_region.as_deref()
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// Position of one division within a population of divisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankInfo {
    /// 1 + number of records with a strictly greater total.
    pub rank: usize,
    /// Share of records with a total at most this one's, in percent.
    pub percentile: f64,
    pub out_of: usize,
}

pub fn rank(records: &[RegionRecord], record: &RegionRecord) -> RankInfo {
    let greater = records.iter().filter(|r| r.total > record.total).count();
    let at_most = records.iter().filter(|r| r.total <= record.total).count();
    let percentile = if records.is_empty() {
        0.0
    } else {
        at_most as f64 / records.len() as f64 * 100.0
    };
    RankInfo {
        rank: greater + 1,
        percentile,
        out_of: records.len(),
    }
}

/// One line of the detailed ranking table.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRow<'a> {
    pub record: &'a RegionRecord,
    /// Dense rank: equal totals share a rank, and the next rank follows
    /// without gaps.
    pub dense_rank: usize,
    /// Percentage of `reference_total`.
    pub share_percent: f64,
}

/// Rows sorted by descending total with dense ranks and each division's
/// share of `reference_total` (usually the national total).
pub fn ranked_table<'a>(records: &[&'a RegionRecord], reference_total: u64) -> Vec<RankedRow<'a>> {
    let mut sorted: Vec<&RegionRecord> = records.to_vec();
    sorted.sort_by(|a, b| b.total.cmp(&a.total));

    let mut rows = Vec::with_capacity(sorted.len());
    let mut dense_rank = 0;
    let mut previous: Option<u64> = None;
    for record in sorted {
        if previous != Some(record.total) {
            dense_rank += 1;
            previous = Some(record.total);
        }
        rows.push(RankedRow {
            record,
            dense_rank,
            share_percent: percent(record.total, reference_total),
        });
    }
    rows
}

/// The `n` most populous records, largest first.
pub fn top_n(records: &[RegionRecord], n: usize) -> Vec<&RegionRecord> {
    let mut sorted: Vec<&RegionRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.total.cmp(&a.total));
    sorted.truncate(n);
    sorted
}

// ---------------------------------------------------------------------------
// Consistency checks
// ---------------------------------------------------------------------------

/// Official roll-up against the sum of its divisions.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionValidation {
    pub parent_region: String,
    pub official_total: u64,
    pub computed_total: u64,
    pub difference: u64,
}

impl RegionValidation {
    pub fn is_consistent(&self) -> bool {
        self.difference == 0
    }
}

pub fn validate_region(official: &RegionTotal, computed: &Summary) -> RegionValidation {
    RegionValidation {
        parent_region: official.parent_region.clone(),
        official_total: official.total,
        computed_total: computed.sum_total,
        difference: official.total.abs_diff(computed.sum_total),
    }
}

/// A division whose male and female counts do not add up to its total.
#[derive(Debug, Clone, PartialEq)]
pub struct GenderMismatch {
    pub name: String,
    /// `male + female - total`.
    pub discrepancy: i128,
}

/// Records violating `male + female == total`. The data is reported as-is;
/// nothing is corrected.
pub fn gender_mismatches<'a, I>(records: I) -> Vec<GenderMismatch>
where
    I: IntoIterator<Item = &'a RegionRecord>,
{
    records
        .into_iter()
        .filter_map(|r| {
            let discrepancy = i128::from(r.male) + i128::from(r.female) - i128::from(r.total);
            (discrepancy != 0).then(|| GenderMismatch {
                name: r.name.clone(),
                discrepancy,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{filter, Selection};
    use crate::data::model::Boundary;
    use approx::assert_relative_eq;

    fn record(name: &str, region: Option<&str>, total: u64, male: u64, female: u64) -> RegionRecord {
        RegionRecord {
            name: name.to_string(),
            parent_region: region.map(str::to_string),
            total,
            male,
            female,
            geometry: Boundary::default(),
        }
    }

    fn abc() -> Vec<RegionRecord> {
        vec![
            record("A", Some("R1"), 100, 60, 40),
            record("B", Some("R2"), 200, 90, 110),
            record("C", Some("R1"), 50, 20, 30),
        ]
    }

    #[test]
    fn range_then_summary_scenario() {
        let records = abc();
        let subset = filter(&records, &Selection::ByValueRange { min: 60, max: 150 });
        let s = summarize(subset.iter().copied());
        assert_eq!(s.count, 1);
        assert_eq!(s.sum_total, 100);
        assert_relative_eq!(s.male_female_ratio, 150.0);
        assert_eq!(s.max.unwrap().name, "A");
    }

    #[test]
    fn full_summary() {
        let records = abc();
        let s = summarize(&records);
        assert_eq!(s.count, 3);
        assert_eq!(s.sum_total, 350);
        assert_eq!(s.sum_male, 170);
        assert_eq!(s.sum_female, 180);
        assert_relative_eq!(s.mean_total, 350.0 / 3.0);
        assert_eq!(s.max, Some(Extreme { name: "B".into(), total: 200 }));
        assert_eq!(s.min, Some(Extreme { name: "C".into(), total: 50 }));
        assert_relative_eq!(s.male_female_ratio, 170.0 / 180.0 * 100.0);
        assert_eq!(s.median_total, Some(100.0));
        assert_relative_eq!(s.std_dev_total.unwrap(), 76.376_261_582_597_33, epsilon = 1e-9);
    }

    #[test]
    fn empty_summary_has_no_division_by_zero() {
        let s = summarize(std::iter::empty());
        assert_eq!(s.count, 0);
        assert_eq!(s.sum_total, 0);
        assert_eq!(s.mean_total, 0.0);
        assert_eq!(s.male_female_ratio, 0.0);
        assert!(s.max.is_none() && s.min.is_none());
        assert!(s.median_total.is_none());
        assert_eq!(s.male_percent(), 0.0);
    }

    #[test]
    fn zero_females_give_zero_ratio() {
        let records = vec![record("A", None, 10, 10, 0)];
        assert_eq!(summarize(&records).male_female_ratio, 0.0);
    }

    #[test]
    fn sum_matches_for_every_subset() {
        let records = abc();
        for mask in 0u8..8 {
            let subset: Vec<&RegionRecord> = records
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, r)| r)
                .collect();
            let expected: u64 = subset.iter().map(|r| r.total).sum();
            assert_eq!(summarize(subset.iter().copied()).sum_total, expected);
        }
    }

    #[test]
    fn huge_counts_do_not_overflow() {
        let records = vec![
            record("big", None, u64::MAX, u64::MAX, 1),
            record("bigger", None, u64::MAX, u64::MAX, u64::MAX),
        ];
        let s = summarize(&records);
        assert_eq!(s.sum_total, u64::MAX);
        assert_eq!(s.sum_male, u64::MAX);

        let found = gender_mismatches(&records);
        assert_eq!(found[0].discrepancy, 1);
        assert_eq!(found[1].discrepancy, i128::from(u64::MAX));
    }

    #[test]
    fn groups_sorted_by_descending_total() {
        let mut records = abc();
        records.push(record("D", None, 999, 500, 499));
        let groups = summarize_by_group(&records, by_parent_region);
        let keys: Vec<&str> = groups.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["R2", "R1"]);
        assert_eq!(groups[1].1.sum_total, 150);
        assert_eq!(groups[1].1.count, 2);
    }

    #[test]
    fn national_shares_and_balance() {
        let mut records = abc();
        records.push(record("D", Some("R3"), 10, 10, 0));
        let groups = summarize_by_group(&records, by_parent_region);
        // R2 200, R1 150, R3 10
        let shares = shares_of_total(&groups);
        assert_relative_eq!(shares[0], 200.0 / 360.0 * 100.0);
        assert_relative_eq!(shares.iter().sum::<f64>(), 100.0, epsilon = 1e-9);

        // R1: 80/70 is 14.3 from parity, R2: 90/110 is 18.2 away, R3 has no females.
        let balanced = most_balanced_region(&groups).unwrap();
        assert_eq!(balanced.region, "R1");
        assert_relative_eq!(balanced.ratio, 80.0 / 70.0 * 100.0);
        assert_eq!(balanced.difference, 10);

        assert!(most_balanced_region(&[]).is_none());
        assert!(shares_of_total(&[]).is_empty());
    }

    #[test]
    fn rank_and_percentile() {
        let records = abc();
        let a = rank(&records, &records[0]);
        assert_eq!(a.rank, 2);
        assert_relative_eq!(a.percentile, 200.0 / 3.0);
        assert_eq!(a.out_of, 3);
        assert_eq!(rank(&records, &records[1]).rank, 1);
        assert_relative_eq!(rank(&records, &records[1]).percentile, 100.0);
    }

    #[test]
    fn rank_is_monotonic() {
        let records: Vec<RegionRecord> = [5, 80, 80, 20, 300, 1, 80]
            .iter()
            .enumerate()
            .map(|(i, &t)| record(&format!("D{i}"), None, t, 0, t))
            .collect();
        for a in &records {
            for b in &records {
                if a.total > b.total {
                    assert!(rank(&records, a).rank < rank(&records, b).rank);
                }
            }
        }
        // Ties share a rank.
        assert_eq!(rank(&records, &records[1]).rank, rank(&records, &records[2]).rank);
    }

    #[test]
    fn dense_rank_table() {
        let records = vec![
            record("A", None, 100, 0, 0),
            record("B", None, 300, 0, 0),
            record("C", None, 100, 0, 0),
            record("D", None, 50, 0, 0),
        ];
        let refs: Vec<&RegionRecord> = records.iter().collect();
        let rows = ranked_table(&refs, 550);
        let ranks: Vec<(&str, usize)> = rows
            .iter()
            .map(|r| (r.record.name.as_str(), r.dense_rank))
            .collect();
        assert_eq!(ranks, vec![("B", 1), ("A", 2), ("C", 2), ("D", 3)]);
        assert_relative_eq!(rows[0].share_percent, 300.0 / 550.0 * 100.0);
    }

    #[test]
    fn top_n_takes_largest() {
        let records = abc();
        let top: Vec<&str> = top_n(&records, 2).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(top, vec!["B", "A"]);
        assert_eq!(top_n(&records, 10).len(), 3);
    }

    #[test]
    fn regional_validation_reports_difference() {
        let records = abc();
        let r1: Vec<&RegionRecord> = records
            .iter()
            .filter(|r| r.parent_region.as_deref() == Some("R1"))
            .collect();
        let official = RegionTotal {
            parent_region: "R1".into(),
            total: 140,
            male: 80,
            female: 60,
        };
        let v = validate_region(&official, &summarize(r1));
        assert_eq!(v.computed_total, 150);
        assert_eq!(v.difference, 10);
        assert!(!v.is_consistent());
    }

    #[test]
    fn mismatched_gender_counts_are_surfaced() {
        let records = vec![
            record("ok", None, 10, 4, 6),
            record("over", None, 10, 6, 6),
            record("under", None, 10, 3, 3),
        ];
        let found = gender_mismatches(&records);
        assert_eq!(
            found,
            vec![
                GenderMismatch { name: "over".into(), discrepancy: 2 },
                GenderMismatch { name: "under".into(), discrepancy: -4 },
            ]
        );
    }
}
