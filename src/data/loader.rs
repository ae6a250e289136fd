use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Date32Type, Float32Type, Float64Type, Int32Type, Int64Type};
use chrono::NaiveDate;
use geojson::{Feature, FeatureCollection, GeoJson, JsonObject};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Boundary, CellValue, DivisionDataset, Polygon, Position, RegionRecord, RegionTotal};
use super::table::Table;
use crate::config::FieldNames;
use crate::error::{DataError, Result};

// ---------------------------------------------------------------------------
// Boundary dataset (GeoJSON)
// ---------------------------------------------------------------------------

/// Load a boundary dataset with per-division population attributes.
///
/// Features with a division name become [`RegionRecord`]s; features without
/// one but with a parent region are official roll-up rows and become
/// [`RegionTotal`]s. Divisions named in `excluded` are dropped.
pub fn load_boundaries(
    path: &Path,
    fields: &FieldNames,
    excluded: &[String],
) -> Result<DivisionDataset> {
    let text = read_source(path)?;
    let collection = FeatureCollection::try_from(text.parse::<GeoJson>()?)?;
    check_schema(&collection.features, fields, path)?;

    let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
    let mut divisions = Vec::new();
    let mut region_totals = Vec::new();

    for (row, feature) in collection.features.iter().enumerate() {
        let name = text_property(feature, &fields.division);
        let parent_region = text_property(feature, &fields.parent_region);
        let counts = [&fields.total, &fields.male, &fields.female]
            .map(|col| count_property(feature, col, row))
            .into_iter()
            .collect::<Result<Vec<Option<u64>>>>()?;
        let (total, male, female) = match counts[..] {
            [Some(t), Some(m), Some(f)] => (t, m, f),
            _ => {
                log::warn!(
                    "Skipping row {row} ({}): incomplete population counts",
                    name.as_deref().or(parent_region.as_deref()).unwrap_or("unnamed")
                );
                continue;
            }
        };

        match (name, parent_region) {
            (Some(name), parent_region) => {
                if excluded.contains(name.as_str()) {
                    log::debug!("Excluding division {name}");
                    continue;
                }
                divisions.push(RegionRecord {
                    name,
                    parent_region,
                    total,
                    male,
                    female,
                    geometry: feature_boundary(feature),
                });
            }
            (None, Some(parent_region)) => region_totals.push(RegionTotal {
                parent_region,
                total,
                male,
                female,
            }),
            (None, None) => log::warn!("Skipping row {row}: neither division nor region"),
        }
    }

    log::info!(
        "Loaded {} divisions and {} regional totals from {}",
        divisions.len(),
        region_totals.len(),
        path.display()
    );

    Ok(DivisionDataset {
        divisions,
        region_totals,
        source: path.to_path_buf(),
    })
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataError::DataNotFound {
            path: path.to_path_buf(),
        },
        _ => DataError::Io(e),
    })
}

/// A property "column" exists when at least one feature carries it.
fn check_schema(features: &[Feature], fields: &FieldNames, path: &Path) -> Result<()> {
    for column in fields.required() {
        let present = features.iter().any(|f| {
            f.properties
                .as_ref()
                .is_some_and(|p: &JsonObject| p.contains_key(column))
        });
        if !present {
            return Err(DataError::schema(column, path.display().to_string()));
        }
    }
    Ok(())
}

fn text_property(feature: &Feature, key: &str) -> Option<String> {
    match feature.property(key)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Largest population count accepted from a boundary dataset. Every count
/// up to here is exact as an `f64`.
pub const MAX_COUNT: u64 = 1 << 53;

/// Population counts arrive as integers, integral floats or numeric text.
fn count_property(feature: &Feature, key: &str, row: usize) -> Result<Option<u64>> {
    let invalid = |reason: String| DataError::InvalidValue {
        row,
        column: key.to_string(),
        reason,
    };
    let value = match feature.property(key) {
        None | Some(JsonValue::Null) => return Ok(None),
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
        Some(other) => return Err(invalid(format!("expected a number, got {other}"))),
    };
    match value {
        Some(v) if v.is_finite() && v > MAX_COUNT as f64 => {
            Err(invalid(format!("{v} exceeds the largest supported count {MAX_COUNT}")))
        }
        Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(Some(v as u64)),
        Some(v) if v.is_nan() => Ok(None),
        Some(v) => Err(invalid(format!("{v} is not a non-negative whole count"))),
        None => Err(invalid("not a number".to_string())),
    }
}

fn feature_boundary(feature: &Feature) -> Boundary {
    let Some(geometry) = &feature.geometry else {
        return Boundary::default();
    };
    let polygons = match &geometry.value {
        geojson::Value::Polygon(rings) => vec![to_polygon(rings)],
        geojson::Value::MultiPolygon(polygons) => polygons.iter().map(|p| to_polygon(p)).collect::<Vec<_>>(),
        _ => {
            log::debug!("Ignoring non-areal geometry");
            Vec::new()
        }
    };
    Boundary { polygons }
}

fn to_polygon(rings: &[Vec<Vec<f64>>]) -> Polygon {
    let mut rings = rings.iter().map(|ring| {
        ring.iter()
            .filter(|p| p.len() >= 2)
            .map(|p| [p[0], p[1]])
            .collect::<Vec<Position>>()
    });
    Polygon {
        exterior: rings.next().unwrap_or_default(),
        holes: rings.collect(),
    }
}

// ---------------------------------------------------------------------------
// Uploaded tables – public entry-point
// ---------------------------------------------------------------------------

/// Load an uploaded table.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row plus delimited records
/// * `.json`    – `[{ "Location": ..., "Assay": ... }, ...]`
/// * `.parquet` – any flat schema of string / numeric / bool / date columns
pub fn load_table(path: &Path) -> Result<Table> {
    if !path.exists() {
        return Err(DataError::DataNotFound {
            path: path.to_path_buf(),
        });
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let table = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => return Err(DataError::UnsupportedFormat(other.to_string())),
    };
    log::info!(
        "Loaded table with {} rows and columns {:?} from {}",
        table.len(),
        table.columns,
        path.display()
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)?;
    read_csv(&mut reader)
}

/// Parse CSV from any reader; cell types are guessed per value.
pub fn read_csv<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Table> {
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let mut table = Table::new(headers);

    for result in reader.records() {
        let record = result?;
        table.push_row(record.iter().map(guess_cell_type).collect());
    }
    Ok(table)
}

/// Type a text cell the way a CSV reader would: integer, float, bool,
/// ISO date, otherwise string. Blank text is null.
pub fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    if NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() {
        return CellValue::Date(s.to_string());
    }
    CellValue::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `to_json(orient='records')` layout.
/// Columns appear in first-seen order across records.
fn load_json(path: &Path) -> Result<Table> {
    let text = read_source(path)?;
    let root: JsonValue = serde_json::from_str(&text)?;

    let records = root.as_array().ok_or_else(|| DataError::InvalidValue {
        row: 0,
        column: String::new(),
        reason: "expected a top-level JSON array".to_string(),
    })?;

    let mut columns: Vec<String> = Vec::new();
    for rec in records {
        if let Some(obj) = rec.as_object() {
            for key in obj.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }

    let mut table = Table::new(columns);
    for (i, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| DataError::InvalidValue {
            row: i,
            column: String::new(),
            reason: "row is not a JSON object".to_string(),
        })?;
        let row = table
            .columns
            .iter()
            .map(|col| obj.get(col).map(json_to_cell).unwrap_or(CellValue::Null))
            .collect();
        table.rows.push(row);
    }
    Ok(table)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => guess_cell_type(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Reads every record batch row by row; see [`arrow_cell`] for the
/// supported column types.
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build()?;

    let mut table = Table::new(columns);
    for batch_result in reader {
        let batch = batch_result?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| arrow_cell(col, row))
                .collect();
            table.rows.push(cells);
        }
    }
    Ok(table)
}

/// Extract a single cell from an Arrow column at a given row.
fn arrow_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let cell = match col.data_type() {
        DataType::Utf8 => col
            .as_string_opt::<i32>()
            .map(|s| CellValue::String(s.value(row).to_string())),
        DataType::LargeUtf8 => col
            .as_string_opt::<i64>()
            .map(|s| CellValue::String(s.value(row).to_string())),
        DataType::Int32 => col
            .as_primitive_opt::<Int32Type>()
            .map(|a| CellValue::Integer(i64::from(a.value(row)))),
        DataType::Int64 => col
            .as_primitive_opt::<Int64Type>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::Float32 => col
            .as_primitive_opt::<Float32Type>()
            .map(|a| CellValue::Float(f64::from(a.value(row)))),
        DataType::Float64 => col
            .as_primitive_opt::<Float64Type>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => col.as_boolean_opt().map(|a| CellValue::Bool(a.value(row))),
        DataType::Date32 => col
            .as_primitive_opt::<Date32Type>()
            .and_then(|a| a.value_as_date(row))
            .map(|d| CellValue::Date(d.format("%Y-%m-%d").to_string())),
        _ => None,
    };
    cell.unwrap_or_else(|| CellValue::String(format!("{:?}", col.data_type())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        { "type": "Feature",
          "properties": { "prefecture": "A", "Region": "MARITIME", "Ensemble": 100, "Masculin": 60, "Feminin": 40 },
          "geometry": { "type": "Polygon", "coordinates": [[[1.0,6.0],[1.5,6.0],[1.5,6.5],[1.0,6.5],[1.0,6.0]]] } },
        { "type": "Feature",
          "properties": { "prefecture": "B", "Region": "PLATEAUX", "Ensemble": 200.0, "Masculin": 90, "Feminin": 110 },
          "geometry": { "type": "MultiPolygon", "coordinates": [[[[0.5,7.0],[1.0,7.0],[1.0,7.5],[0.5,7.0]]]] } },
        { "type": "Feature",
          "properties": { "prefecture": null, "Region": "MARITIME", "Ensemble": 110, "Masculin": 65, "Feminin": 45 },
          "geometry": null },
        { "type": "Feature",
          "properties": { "prefecture": "C", "Region": "PLATEAUX", "Ensemble": null, "Masculin": 1, "Feminin": 1 },
          "geometry": null },
        { "type": "Feature",
          "properties": { "prefecture": "LOME COMMUNE", "Region": "MARITIME", "Ensemble": 5, "Masculin": 2, "Feminin": 3 },
          "geometry": null }
      ]
    }"#;

    fn write_temp(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn splits_divisions_and_regional_totals() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "pop.geojson", SAMPLE);
        let excluded = vec!["LOME COMMUNE".to_string()];

        let ds = load_boundaries(&path, &FieldNames::default(), &excluded).unwrap();

        let names: Vec<&str> = ds.divisions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(ds.divisions[1].total, 200);
        assert_eq!(ds.divisions[1].geometry.polygons.len(), 1);
        assert_eq!(ds.region_totals.len(), 1);
        assert_eq!(ds.region_totals[0].parent_region, "MARITIME");
        assert_eq!(ds.region_totals[0].total, 110);
        assert_eq!(ds.source, path);
    }

    #[test]
    fn missing_file_is_data_not_found() {
        let err = load_boundaries(
            Path::new("/nonexistent/pop.geojson"),
            &FieldNames::default(),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, DataError::DataNotFound { .. }));
    }

    #[test]
    fn missing_property_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "pop.geojson", &SAMPLE.replace("Feminin", "Female"));
        let err = load_boundaries(&path, &FieldNames::default(), &[]).unwrap_err();
        match err {
            DataError::Schema { column, .. } => assert_eq!(column, "Feminin"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn negative_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "pop.geojson", &SAMPLE.replace("\"Ensemble\": 100", "\"Ensemble\": -1"));
        let err = load_boundaries(&path, &FieldNames::default(), &[]).unwrap_err();
        assert!(matches!(err, DataError::InvalidValue { row: 0, .. }));
    }

    #[test]
    fn count_beyond_exact_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "pop.geojson", &SAMPLE.replace("\"Ensemble\": 100", "\"Ensemble\": 1e20"));
        let err = load_boundaries(&path, &FieldNames::default(), &[]).unwrap_err();
        match err {
            DataError::InvalidValue { row, column, .. } => {
                assert_eq!(row, 0);
                assert_eq!(column, "Ensemble");
            }
            other => panic!("expected invalid value, got {other:?}"),
        }

        let at_limit = SAMPLE.replace("\"Ensemble\": 100", &format!("\"Ensemble\": {MAX_COUNT}"));
        let path = write_temp(&dir, "limit.geojson", &at_limit);
        let ds = load_boundaries(&path, &FieldNames::default(), &[]).unwrap();
        assert_eq!(ds.divisions[0].total, MAX_COUNT);
    }

    #[test]
    fn parquet_upload_keeps_column_types() {
        use arrow::array::{BooleanArray, Date32Array, Float64Array, Int64Array, StringArray};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new("Location", DataType::Utf8, false),
            Field::new("LatestLevel", DataType::Int64, true),
            Field::new("Score", DataType::Float64, false),
            Field::new("Active", DataType::Boolean, false),
            Field::new("Week_start", DataType::Date32, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["X", "Y"])),
                Arc::new(Int64Array::from(vec![Some(5), None])),
                Arc::new(Float64Array::from(vec![2.5, 0.0])),
                Arc::new(BooleanArray::from(vec![true, false])),
                Arc::new(Date32Array::from(vec![19729, 19736])),
            ],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.pq");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_table(&path).unwrap();
        assert_eq!(
            table.columns,
            vec!["Location", "LatestLevel", "Score", "Active", "Week_start"]
        );
        assert_eq!(
            table.rows,
            vec![
                vec![
                    CellValue::from("X"),
                    CellValue::Integer(5),
                    CellValue::Float(2.5),
                    CellValue::Bool(true),
                    CellValue::Date("2024-01-07".into()),
                ],
                vec![
                    CellValue::from("Y"),
                    CellValue::Null,
                    CellValue::Float(0.0),
                    CellValue::Bool(false),
                    CellValue::Date("2024-01-14".into()),
                ],
            ]
        );
    }

    #[test]
    fn csv_upload_guesses_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "upload.csv",
            "Location,Assay,Intensity,Trend,Date\nX,flu,5,Increasing,2024-01-07\nY,covid,,Stable,\n",
        );
        let table = load_table(&path).unwrap();
        assert_eq!(table.columns, vec!["Location", "Assay", "Intensity", "Trend", "Date"]);
        assert_eq!(table.get(0, "Intensity"), Some(&CellValue::Integer(5)));
        assert_eq!(table.get(0, "Date"), Some(&CellValue::Date("2024-01-07".into())));
        assert_eq!(table.get(1, "Intensity"), Some(&CellValue::Null));
    }

    #[test]
    fn json_upload_collects_all_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "upload.json",
            r#"[{"Location": "X", "Intensity": 2.5}, {"Location": "Y", "Trend": "Stable"}]"#,
        );
        let table = load_table(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "Intensity"), Some(&CellValue::Float(2.5)));
        assert_eq!(table.get(0, "Trend"), Some(&CellValue::Null));
        assert_eq!(table.get(1, "Trend"), Some(&CellValue::from("Stable")));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "upload.xlsx", "");
        assert!(matches!(
            load_table(&path),
            Err(DataError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }
}
