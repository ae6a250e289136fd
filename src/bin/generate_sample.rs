use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use parquet::arrow::ArrowWriter;
use prefecture_explorer::config::AppConfig;
use prefecture_explorer::store::{DetectionLabel, ReferenceTrend, TrendRow, TrendStore};
use serde_json::Value as JsonValue;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: u64, hi: u64) -> u64 {
        lo + (self.next_f64() * (hi - lo) as f64) as u64
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// Regions from north to south with their prefectures.
const REGIONS: [(&str, &[&str]); 5] = [
    ("SAVANES", &["TONE", "CINKASSE", "KPENDJAL", "OTI", "TANDJOARE"]),
    ("KARA", &["KOZAH", "BINAH", "DOUFELGOU", "KERAN", "DANKPEN", "BASSAR", "ASSOLI"]),
    ("CENTRALE", &["TCHAOUDJO", "SOTOUBOUA", "TCHAMBA", "BLITTA"]),
    (
        "PLATEAUX",
        &["OGOU", "HAHO", "MOYEN-MONO", "KLOTO", "DANYI", "AGOU", "WAWA", "AMOU", "EST-MONO", "ANIE"],
    ),
    ("MARITIME", &["GOLFE", "LACS", "VO", "YOTO", "ZIO", "AVE", "BAS-MONO", "LOME COMMUNE"]),
];

const MIN_LON: f64 = 0.0;
const MAX_LON: f64 = 1.8;
const MIN_LAT: f64 = 6.1;
const MAX_LAT: f64 = 11.1;

fn rectangle(lon0: f64, lat0: f64, lon1: f64, lat1: f64) -> Geometry {
    Geometry::new(Value::Polygon(vec![vec![
        vec![lon0, lat0],
        vec![lon1, lat0],
        vec![lon1, lat1],
        vec![lon0, lat1],
        vec![lon0, lat0],
    ]]))
}

fn feature(geometry: Option<Geometry>) -> Feature {
    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: None,
        foreign_members: None,
    }
}

/// Divisions as rectangles in latitude bands, one band per region, plus one
/// geometry-less roll-up row per region.
fn boundary_dataset(config: &AppConfig, rng: &mut SimpleRng) -> FeatureCollection {
    let fields = &config.fields;
    let band = (MAX_LAT - MIN_LAT) / REGIONS.len() as f64;
    let mut features = Vec::new();

    for (r, (region, prefectures)) in REGIONS.iter().enumerate() {
        let lat1 = MAX_LAT - band * r as f64;
        let lat0 = lat1 - band;
        let width = (MAX_LON - MIN_LON) / prefectures.len() as f64;
        let (mut sum_total, mut sum_male, mut sum_female) = (0u64, 0u64, 0u64);

        for (p, name) in prefectures.iter().enumerate() {
            let total = rng.range(60_000, 420_000);
            let male = total * rng.range(470, 515) / 1000;
            let female = total - male;
            let lon0 = MIN_LON + width * p as f64;

            let mut f = feature(Some(rectangle(lon0, lat0, lon0 + width, lat1)));
            f.set_property(&fields.division, *name);
            f.set_property(&fields.parent_region, *region);
            f.set_property(&fields.total, total);
            f.set_property(&fields.male, male);
            f.set_property(&fields.female, female);
            features.push(f);

            if !config.excluded_divisions.iter().any(|e| e == name) {
                sum_total += total;
                sum_male += male;
                sum_female += female;
            }
        }

        let mut rollup = feature(None);
        rollup.set_property(&fields.division, JsonValue::Null);
        rollup.set_property(&fields.parent_region, *region);
        rollup.set_property(&fields.total, sum_total);
        rollup.set_property(&fields.male, sum_male);
        rollup.set_property(&fields.female, sum_female);
        features.push(rollup);
    }

    features.into_iter().collect()
}

const MEASURES: [&str; 3] = ["covN2", "fluA", "rsv"];
const LEVELS: [&str; 4] = ["Low", "Moderate", "High", "Very High"];
const TRENDS: [&str; 3] = ["Increasing", "Decreasing", "No Change"];

fn reference_trends(config: &AppConfig, rng: &mut SimpleRng) -> Vec<ReferenceTrend> {
    let mut trends = Vec::new();
    for location in &config.trend_locations {
        for measure in MEASURES {
            let level = rng.pick(&LEVELS).to_string();
            trends.push(ReferenceTrend {
                location: location.clone(),
                measure: measure.to_string(),
                latest_level: level.clone(),
                viral_activity_level: level,
                latest_trends: rng.pick(&TRENDS).to_string(),
            });
        }
    }
    trends
}

/// Upload columns before renaming: Location, Assay, Intensity, Trend.
/// Roughly a third of the values are perturbed so the comparison has
/// something to show; one location is unknown to the database.
fn upload_rows(reference: &[ReferenceTrend], rng: &mut SimpleRng) -> Vec<[String; 4]> {
    let mut rows: Vec<[String; 4]> = reference
        .iter()
        .map(|t| {
            let level = if rng.next_f64() < 0.3 {
                rng.pick(&LEVELS).to_string()
            } else {
                t.latest_level.clone()
            };
            let trend = if rng.next_f64() < 0.3 {
                rng.pick(&TRENDS).to_string()
            } else {
                t.latest_trends.clone()
            };
            [t.location.clone(), t.measure.clone(), level, trend]
        })
        .collect();
    rows.push([
        "Saskatoon".to_string(),
        "fluA".to_string(),
        "Low".to_string(),
        "No Change".to_string(),
    ]);
    rows
}

fn write_upload_csv(path: &Path, rows: &[[String; 4]]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Location", "Assay", "Intensity", "Trend", "Site"])?;
    for (i, row) in rows.iter().enumerate() {
        let site = format!("site-{}", i % 4 + 1);
        wtr.write_record(row.iter().map(String::as_str).chain([site.as_str()]))?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_upload_parquet(path: &Path, rows: &[[String; 4]]) -> Result<()> {
    let column = |i: usize| StringArray::from(rows.iter().map(|r| r[i].as_str()).collect::<Vec<_>>());
    let row_ids = Int64Array::from((0..rows.len() as i64).collect::<Vec<_>>());

    let schema = Arc::new(Schema::new(vec![
        Field::new("Location", DataType::Utf8, false),
        Field::new("Assay", DataType::Utf8, false),
        Field::new("Intensity", DataType::Utf8, false),
        Field::new("Trend", DataType::Utf8, false),
        Field::new("row_id", DataType::Int64, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(column(0)),
            Arc::new(column(1)),
            Arc::new(column(2)),
            Arc::new(column(3)),
            Arc::new(row_ids),
        ],
    )?;

    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn seed_store(path: &Path, config: &AppConfig, reference: &[ReferenceTrend], rng: &mut SimpleRng) -> Result<usize> {
    if path.exists() {
        std::fs::remove_file(path).with_context(|| format!("removing {}", path.display()))?;
    }
    let store = TrendStore::open(path)?;
    store.replace_reference_trends(reference)?;

    let first_week = NaiveDate::from_ymd_opt(2025, 1, 5).context("invalid start date")?;
    let mut inserted = 0;
    for location in config.trend_locations.iter().take(6) {
        for week in 1..=4u32 {
            store.insert_trend(&TrendRow {
                location: location.clone(),
                epi_year: 2025,
                epi_week: week,
                week_start: first_week + Days::new(7 * u64::from(week - 1)),
                label: *rng.pick(&DetectionLabel::ALL),
            })?;
            inserted += 1;
        }
    }
    Ok(inserted)
}

fn main() -> Result<()> {
    let config = AppConfig::load()?;
    let mut rng = SimpleRng::new(42);

    let out_dir = config
        .boundaries_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    if let Some(db_dir) = config.database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(db_dir)?;
    }

    let dataset = boundary_dataset(&config, &mut rng);
    let n_features = dataset.features.len();
    std::fs::write(&config.boundaries_path, GeoJson::from(dataset).to_string())
        .with_context(|| format!("writing {}", config.boundaries_path.display()))?;
    println!("Wrote {n_features} features to {}", config.boundaries_path.display());

    let reference = reference_trends(&config, &mut rng);
    let upload = upload_rows(&reference, &mut rng);

    let csv_path = out_dir.join("sample_upload.csv");
    write_upload_csv(&csv_path, &upload).context("writing sample upload csv")?;
    let parquet_path = out_dir.join("sample_upload.parquet");
    write_upload_parquet(&parquet_path, &upload).context("writing sample upload parquet")?;
    println!(
        "Wrote {} upload rows to {} and {}",
        upload.len(),
        csv_path.display(),
        parquet_path.display()
    );

    let inserted = seed_store(&config.database_path, &config, &reference, &mut rng)
        .context("seeding trend store")?;
    println!(
        "Seeded {} with {} reference trends and {inserted} detection rows",
        config.database_path.display(),
        reference.len()
    );

    Ok(())
}
