use std::fs;
use std::path::Path;

use lumi_figures::data::rules::{CleaningRules, CutWindow, PositionWindow};
use lumi_figures::render::{CsvExport, Renderer, SeriesRole};
use lumi_figures::scenario::{align_scenario, Cosmetics, ScenarioConfig, SourceConfig};
use lumi_figures::LumiError;

fn byls_line(run_fill: &str, ls: u32, value: f64) -> String {
    format!("{run_fill},{ls}:{ls},1530000000,STABLE BEAMS,6500,{value},{value},40.0,X\n")
}

fn write_source(dir: &Path, name: &str, rows: &[(&str, u32, f64)], extra: &str) {
    let mut text = String::from("#run:fill,ls,time,beamstatus,E(GeV),delivered,recorded,avgpu,source\n");
    for &(run_fill, ls, value) in rows {
        text.push_str(&byls_line(run_fill, ls, value));
    }
    text.push_str(extra);
    fs::write(dir.join(format!("test_{name}.csv")), text).unwrap();
}

fn two_source_config(rules: CleaningRules) -> ScenarioConfig {
    ScenarioConfig {
        name: "test".into(),
        input_pattern: "test_{source}.csv".into(),
        primary: "HFET".into(),
        sources: vec![
            SourceConfig::new("HFET", "magenta"),
            SourceConfig::new("HFOC", "black"),
        ],
        rules,
        highlights: Vec::new(),
        cosmetics: Cosmetics::default(),
        output_stem: "test".into(),
    }
}

fn five_rows(value: f64) -> Vec<(&'static str, u32, f64)> {
    (1..=5).map(|ls| ("318982:6868", ls, value)).collect()
}

#[test]
fn five_row_example_aligns_both_sources() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "HFET", &five_rows(1.0), "");
    write_source(dir.path(), "HFOC", &five_rows(2.0), "");

    let aligned = align_scenario(&two_source_config(CleaningRules::default()), dir.path()).unwrap();

    let hfet = aligned.source("HFET").unwrap();
    let hfoc = aligned.source("HFOC").unwrap();
    assert_eq!(hfet.series.positions().collect::<Vec<_>>(), [0, 1, 2, 3, 4]);
    assert_eq!(hfoc.series.positions().collect::<Vec<_>>(), [0, 1, 2, 3, 4]);
    assert!(hfet.series.values().all(|v| v == 1.0));
    assert!(hfoc.series.values().all(|v| v == 2.0));
    assert_eq!(aligned.index.len(), 5);
}

#[test]
fn extra_secondary_row_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "HFET", &five_rows(1.0), "");
    write_source(dir.path(), "HFOC", &five_rows(2.0), &byls_line("318983:6868", 1, 2.0));

    let aligned = align_scenario(&two_source_config(CleaningRules::default()), dir.path()).unwrap();

    let hfoc = aligned.source("HFOC").unwrap();
    assert_eq!(hfoc.series.len(), 5);
    assert_eq!(hfoc.stats.unmatched, 1);
    assert_eq!(hfoc.stats.accepted, 6);
    assert_eq!(aligned.index.len(), 5);
}

#[test]
fn malformed_and_comment_lines_are_counted_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "HFET", &five_rows(1.0), "#Summary:\n\nbroken,line\n");
    write_source(dir.path(), "HFOC", &five_rows(2.0), "");

    let aligned = align_scenario(&two_source_config(CleaningRules::default()), dir.path()).unwrap();
    let hfet = aligned.source("HFET").unwrap();
    assert_eq!(hfet.series.len(), 5);
    assert_eq!(hfet.stats.malformed, 1);
    assert!(aligned.source("HFOC").unwrap().stats.is_clean());
}

#[test]
fn blackout_zeroes_both_sources() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "HFET", &five_rows(1.0), "");
    write_source(dir.path(), "HFOC", &five_rows(2.0), "");
    let rules = CleaningRules {
        blackout: Some(PositionWindow::new(2, 3)),
        ..Default::default()
    };

    let aligned = align_scenario(&two_source_config(rules), dir.path()).unwrap();
    let values: Vec<f64> = aligned.source("HFOC").unwrap().series.values().collect();
    assert_eq!(values, [2.0, 2.0, 0.0, 0.0, 2.0]);
    let values: Vec<f64> = aligned.source("HFET").unwrap().series.values().collect();
    assert_eq!(values, [1.0, 1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn cut_window_closes_the_gap() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "HFET", &five_rows(1.0), "");
    write_source(dir.path(), "HFOC", &five_rows(2.0), "");
    let rules = CleaningRules {
        cut: Some(CutWindow::new(1, 3)),
        ..Default::default()
    };

    let aligned = align_scenario(&two_source_config(rules), dir.path()).unwrap();
    for source in &aligned.sources {
        // LS at positions 2 and 3 are excised; position 4 slides to 2.
        assert_eq!(source.series.positions().collect::<Vec<_>>(), [0, 1, 2]);
        assert_eq!(source.stats.cut, 2);
    }
}

#[test]
fn missing_secondary_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "HFET", &five_rows(1.0), "");

    let err = align_scenario(&two_source_config(CleaningRules::default()), dir.path()).unwrap_err();
    match err {
        LumiError::Open { path, .. } => assert!(path.ends_with("test_HFOC.csv")),
        other => panic!("expected open error, got {other}"),
    }
}

#[test]
fn primary_is_processed_first_whatever_the_declared_order() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "HFET", &five_rows(1.0), "");
    // HFOC is missing the first LS; it must not define the index.
    let partial: Vec<_> = five_rows(2.0).into_iter().skip(1).collect();
    write_source(dir.path(), "HFOC", &partial, "");

    let mut config = two_source_config(CleaningRules::default());
    config.sources.reverse();
    let aligned = align_scenario(&config, dir.path()).unwrap();

    assert_eq!(aligned.sources[0].name, "HFOC");
    assert_eq!(
        aligned.source("HFOC").unwrap().series.positions().collect::<Vec<_>>(),
        [1, 2, 3, 4]
    );
}

#[test]
fn aligned_scenario_exports_series_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    write_source(dir.path(), "HFET", &five_rows(1.0), "");
    write_source(dir.path(), "HFOC", &five_rows(2.0), "");
    let config = two_source_config(CleaningRules::default());

    let aligned = align_scenario(&config, dir.path()).unwrap();
    let figure = aligned.figure(&config);
    assert_eq!(figure.series_with_role(SeriesRole::Main).count(), 2);

    let out = dir.path().join("out");
    let written = CsvExport::new(&out).render(&figure).unwrap();
    // Two main series plus the manifest; insets are empty.
    assert_eq!(written.len(), 3);
    assert!(out.join("test_HFOC_main.csv").exists());

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("test.json")).unwrap()).unwrap();
    assert_eq!(manifest["series"][1]["color"], "#000000");
    assert_eq!(manifest["provenance"]["stats"]["HFOC"]["aligned"], 5);
}

#[test]
fn duplicated_primary_ls_stays_at_its_own_line() {
    let dir = tempfile::tempdir().unwrap();
    let primary = [("1:1", 1, 1.0), ("1:1", 2, 2.0), ("1:1", 1, 3.0)];
    write_source(dir.path(), "HFET", &primary, "");
    write_source(dir.path(), "HFOC", &[("1:1", 1, 5.0)], "");

    let aligned = align_scenario(&two_source_config(CleaningRules::default()), dir.path()).unwrap();
    assert_eq!(aligned.index.overwritten(), 1);

    let hfet: Vec<(usize, f64)> = aligned
        .source("HFET")
        .unwrap()
        .series
        .points
        .iter()
        .map(|p| (p.position, p.value))
        .collect();
    assert_eq!(hfet, [(0, 1.0), (1, 2.0), (2, 3.0)]);

    // Secondaries follow the index, which keeps the later line.
    let hfoc: Vec<usize> = aligned.source("HFOC").unwrap().series.positions().collect();
    assert_eq!(hfoc, [2]);

    let figure = aligned.figure(&two_source_config(CleaningRules::default()));
    assert_eq!(figure.provenance["primary_ls"], 3);
    assert_eq!(figure.provenance["duplicate_primary_ls"], 1);
}
