//! End-to-end runs of the cleaning pipeline on files in a temp directory.

use birdwatch::{
    load_cleaned, run, summarize, Cell, CleanOptions, Lens, OutputFormat, PipelineError,
};
use birdwatch::insights::lenses::LensSections;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const GRASSLAND: &str = "\
Admin_Unit_Code,Date,Start_Time,Observer,Location_Type,Ecosystem,TaxonCode,Distance,Temperature,Humidity,Flyover,PIF_Watchlist_Status
ANTI,2018-05-01,06:30:00,Elizabeth Oswald,Grassland,Grassland,BCCH,50m,19.5,70,FALSE,FALSE
ANTI,2018-05-01,06:30:00,Elizabeth Oswald,Grassland,Grassland,BCCH,50m,19.5,70,FALSE,FALSE
ANTI,not-a-date,07:10:00,,Grassland,Grassland,NOCA,Unknown,,80,FALSE,FALSE
ANTI,2018-12-24,08:00:00,Kimberly Serno,Grassland,,AMRO,120,-2.0,,TRUE,TRUE
,,,,,,,,,,,
";

const FOREST: &str = "\
admin_unit_code;date ;start_time;observer;location_type;taxoncode;distance;temperature
CATO;2018-07-04;05:45;Brian Swimelar;Forest;EATO;<= 50 Meters;25
";

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn options() -> CleanOptions {
    CleanOptions::default()
}

fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (headers, rows)
}

#[test]
fn test_one_empty_source_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(&dir, "grassland.csv", GRASSLAND);
    let b = write(&dir, "forest.csv", "");
    let out = dir.path().join("cleaned.csv");

    let report = run(&[a, b.clone()], &out, &options()).unwrap();

    assert_eq!(report.sources.len(), 1);
    assert_eq!(report.skipped, vec![b.display().to_string()]);
    // 5 data rows: one duplicate and one blank row dropped
    assert_eq!(report.rows, 3);
    assert!(out.exists());
}

#[test]
fn test_all_sources_unusable_is_fatal_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(&dir, "empty.csv", "   \n");
    let b = dir.path().join("missing.xlsx");
    let out = dir.path().join("cleaned.csv");

    let err = run(&[a, b], &out, &options()).unwrap_err();

    assert!(matches!(err, PipelineError::AllSourcesUnavailable(2)));
    assert!(!out.exists());
}

#[test]
fn test_empty_after_cleaning_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(&dir, "blank.csv", "Date,Observer\n,\nNA, \n");
    let out = dir.path().join("cleaned.csv");

    let err = run(&[a], &out, &options()).unwrap_err();

    assert!(matches!(err, PipelineError::EmptyAfterCleaning { rows: 0, .. }));
    assert!(!out.exists());
}

#[test]
fn test_merged_output_schema() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(&dir, "grassland.csv", GRASSLAND);
    let b = write(&dir, "forest.csv", FOREST);
    let out = dir.path().join("cleaned.csv");

    run(&[a, b], &out, &options()).unwrap();
    let (headers, rows) = read_rows(&out);

    // lowercase, trimmed, unique
    let unique: HashSet<&String> = headers.iter().collect();
    assert_eq!(unique.len(), headers.len());
    for h in &headers {
        assert_eq!(h, &h.trim().to_lowercase());
    }
    for derived in ["year", "month", "season"] {
        assert!(headers.iter().any(|h| h == derived));
    }

    // no duplicate rows
    let distinct: HashSet<&Vec<String>> = rows.iter().collect();
    assert_eq!(distinct.len(), rows.len());
    assert_eq!(rows.len(), 4);

    // the forest row kept its order after the grassland ones
    let date = headers.iter().position(|h| h == "date").unwrap();
    assert_eq!(rows[3][date], "2018-07-04");
}

#[test]
fn test_unparseable_date_row_kept_with_unknown_season() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(&dir, "grassland.csv", GRASSLAND);
    let out = dir.path().join("cleaned.csv");

    run(&[a], &out, &options()).unwrap();
    let (headers, rows) = read_rows(&out);
    let col = |name: &str| headers.iter().position(|h| h == name).unwrap();

    let row = rows.iter().find(|r| r[col("taxoncode")] == "NOCA").unwrap();
    assert_eq!(row[col("date")], "");
    assert_eq!(row[col("year")], "");
    assert_eq!(row[col("month")], "");
    assert_eq!(row[col("season")], "Unknown");
    assert_eq!(row[col("observer")], "Unknown");

    let winter = rows.iter().find(|r| r[col("taxoncode")] == "AMRO").unwrap();
    assert_eq!(winter[col("season")], "Winter");
    assert_eq!(winter[col("month")], "12");
}

#[test]
fn test_distance_median_of_extracted_values() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(&dir, "grassland.csv", GRASSLAND);
    let out = dir.path().join("cleaned.csv");

    let report = run(&[a], &out, &options()).unwrap();
    let (headers, rows) = read_rows(&out);
    let distance = headers.iter().position(|h| h == "distance").unwrap();

    let values: Vec<&str> = rows.iter().map(|r| r[distance].as_str()).collect();
    assert_eq!(values, vec!["50", "85", "120"]);

    let fill = report.imputation.columns.iter().find(|c| c.column == "distance").unwrap();
    assert_eq!(fill.filled, 1);
    assert_eq!(fill.fill_value.as_deref(), Some("85"));
}

#[test]
fn test_median_fill_for_numeric_columns() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(&dir, "grassland.csv", GRASSLAND);
    let out = dir.path().join("cleaned.csv");

    run(&[a], &out, &options()).unwrap();
    let (headers, rows) = read_rows(&out);
    let col = |name: &str| headers.iter().position(|h| h == name).unwrap();

    // temperature {19.5, -2} → 8.75; humidity {70, 80} → 75
    assert_eq!(rows[1][col("temperature")], "8.75");
    assert_eq!(rows[2][col("humidity")], "75");
    assert_eq!(rows[2][col("ecosystem")], "Unknown");
}

#[test]
fn test_all_dates_unparseable_removes_temporal_columns() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(
        &dir,
        "dates.csv",
        "Date,Year,Observer\nsoon,2018,Ann\nlater,2019,Bob\n",
    );
    let out = dir.path().join("cleaned.csv");

    run(&[a], &out, &options()).unwrap();
    let (headers, rows) = read_rows(&out);

    assert_eq!(headers, vec!["observer"]);
    assert_eq!(rows.len(), 2);
}

#[test]
fn test_rerun_is_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(&dir, "grassland.csv", GRASSLAND);
    let b = write(&dir, "forest.csv", FOREST);
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    run(&[a.clone(), b.clone()], &first, &options()).unwrap();
    run(&[a, b], &second, &options()).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_json_output_reloads_with_same_seasons() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(&dir, "grassland.csv", GRASSLAND);
    let out = dir.path().join("cleaned.json");
    let opts = CleanOptions {
        format: OutputFormat::Json,
        ..CleanOptions::default()
    };

    run(&[a], &out, &opts).unwrap();
    let table = load_cleaned(&out).unwrap();

    let seasons: Vec<Option<&Cell>> = (0..table.len()).map(|i| table.get(i, "season")).collect();
    assert_eq!(
        seasons,
        vec![
            Some(&Cell::text("Spring")),
            Some(&Cell::text("Unknown")),
            Some(&Cell::text("Winter")),
        ]
    );
}

#[test]
fn test_lens_over_cleaned_file() {
    let dir = tempfile::tempdir().unwrap();
    let a = write(&dir, "grassland.csv", GRASSLAND);
    let b = write(&dir, "forest.csv", FOREST);
    let out = dir.path().join("cleaned.csv");

    run(&[a, b], &out, &options()).unwrap();
    let table = load_cleaned(&out).unwrap();

    let summary = summarize(&table, Lens::Temporal);
    let LensSections::Temporal(temporal) = summary.sections else {
        panic!("wrong section");
    };
    let total: usize = temporal.seasons.iter().map(|c| c.count).sum();
    assert_eq!(total, table.len());
}
