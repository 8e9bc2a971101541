// End-to-end tests: regularize offsets, then compose n-grams, driven by the
// same JSON config and input documents the `canon-index` binary reads.

use canon_index::{
    FillMethod, IndexError, NGramIndexer, NGramSettings, OffsetIndexer, OffsetSettings,
    PipelineConfig, PipelineInput, Selection, Spacing, run_pipeline,
};
use canon_series::{PartKey, Table, TimeSeries};

fn series(values: &[(f64, &str)]) -> TimeSeries<String> {
    TimeSeries::from_values(values.iter().map(|&(o, v)| (o, v.to_string()))).unwrap()
}

fn windows(table: &Table<String>, label: &str) -> Vec<(f64, String)> {
    table
        .column(&label.parse().unwrap())
        .unwrap()
        .observed()
        .map(|(o, v)| (o.quarter_length(), v.clone()))
        .collect()
}

/// Two voices, irregular rhythm: harmonic intervals between them and the
/// lower voice's melodic intervals (reported where each motion arrives).
fn duet() -> (Table<String>, Table<String>) {
    let vertical = Table::new("interval.IntervalIndexer")
        .with_column(
            PartKey::Pair(0, 1),
            series(&[(0.0, "P8"), (1.0, "M6"), (1.5, "P5"), (2.0, "M6"), (3.0, "P8")]),
        )
        .unwrap();
    let horizontal = Table::new("interval.HorizontalIntervalIndexer")
        .with_column(
            1usize,
            series(&[(1.0, "+M2"), (2.0, "-M2"), (3.0, "-P4")]),
        )
        .unwrap();
    (vertical, horizontal)
}

#[test]
fn regularize_then_compose() {
    let (vertical, horizontal) = duet();
    let vertical = OffsetIndexer::new(&vertical, OffsetSettings::fixed(1.0), None)
        .unwrap()
        .run();
    let horizontal = OffsetIndexer::new(
        &horizontal,
        OffsetSettings::fixed(1.0).with_method(FillMethod::NoFill),
        None,
    )
    .unwrap()
    .run();

    let settings = NGramSettings {
        horizontal: Some(Selection::Lowest),
        brackets: false,
        ..NGramSettings::new(3, Selection::All)
    };
    let out = NGramIndexer::new(&vertical, Some(&horizontal), settings)
        .unwrap()
        .run();
    // The passing fifth at 1.5 falls between grid points and is dropped.
    assert_eq!(
        windows(&out, "0,1 : 1"),
        vec![
            (0.0, "P8 +M2 M6 -M2 M6".to_string()),
            (1.0, "M6 -M2 M6 -P4 P8".to_string()),
        ]
    );
}

#[test]
fn pipeline_from_json_documents() {
    let config = PipelineConfig::from_json(
        r#"{
            "offset": {"quarterLength": 1.0},
            "ngram": {"n": 2, "vertical": [["0,1"]], "horizontal": [[1]],
                      "terminator": ["P8"], "align": "right"}
        }"#,
    )
    .unwrap();

    let (vertical, horizontal) = duet();
    let input = PipelineInput {
        vertical,
        horizontal: Some(horizontal),
        dynamic: None,
    };
    let json = serde_json::to_string(&input).unwrap();
    let input = PipelineInput::from_json(&json).unwrap();

    let out = run_pipeline(input, &config).unwrap();
    assert_eq!(out.namespace(), "ngram.NGramIndexer");
    assert_eq!(
        windows(&out, "0,1 : 1"),
        vec![(2.0, "[M6] (-M2) [M6]".to_string())]
    );
}

#[test]
fn pipeline_puts_both_tables_on_one_grid() {
    let vertical = Table::new("interval.IntervalIndexer")
        .with_column(
            PartKey::Pair(0, 1),
            series(&[(0.0, "P8"), (1.0, "M6"), (2.0, "M3")]),
        )
        .unwrap();
    // The first melodic interval falls between grid points.
    let horizontal = Table::new("interval.HorizontalIntervalIndexer")
        .with_column(
            1usize,
            series(&[(0.5, "+M2"), (1.0, "-M2"), (2.0, "+m2")]),
        )
        .unwrap();
    let config = PipelineConfig {
        offset: Some(OffsetSettings::fixed(1.0)),
        ngram: NGramSettings {
            horizontal: Some(Selection::Lowest),
            ..NGramSettings::new(2, Selection::All)
        },
        ..PipelineConfig::default()
    };
    let input = PipelineInput {
        vertical,
        horizontal: Some(horizontal),
        dynamic: None,
    };
    let out = run_pipeline(input, &config).unwrap();
    assert_eq!(
        windows(&out, "0,1 : 1"),
        vec![
            (0.0, "[P8] (-M2) [M6]".to_string()),
            (1.0, "[M6] (+m2) [M3]".to_string()),
        ]
    );
}

#[test]
fn pipeline_without_offsets_composes_raw_tables() {
    let (vertical, horizontal) = duet();
    let config = PipelineConfig {
        ngram: NGramSettings {
            horizontal: Some(Selection::each([PartKey::Part(1)])),
            ..NGramSettings::new(2, Selection::All)
        },
        ..PipelineConfig::default()
    };
    let input = PipelineInput {
        vertical,
        horizontal: Some(horizontal),
        dynamic: None,
    };
    let out = run_pipeline(input, &config).unwrap();
    assert_eq!(
        windows(&out, "0,1 : 1"),
        vec![
            (0.0, "[P8] (+M2) [M6]".to_string()),
            (1.0, "[M6] (_) [P5]".to_string()),
            (1.5, "[P5] (-M2) [M6]".to_string()),
            (2.0, "[M6] (-P4) [P8]".to_string()),
        ]
    );
}

#[test]
fn pipeline_reports_configuration_errors() {
    let (vertical, _) = duet();
    let config = PipelineConfig::from_json(
        r#"{"offset": {"quarterLength": "dynamic"}, "ngram": {"n": 2, "vertical": "all"}}"#,
    )
    .unwrap();
    assert_eq!(
        config.offset.as_ref().and_then(|o| o.quarter_length),
        Some(Spacing::Dynamic)
    );
    let input = PipelineInput {
        vertical,
        horizontal: None,
        dynamic: None,
    };
    assert!(matches!(
        run_pipeline(input, &config),
        Err(IndexError::DynamicInputsMissing)
    ));

    let bad = PipelineConfig::from_json(r#"{"ngram": {"n": 2, "vertical": 7}}"#);
    assert!(matches!(bad, Err(IndexError::Json(_))));
}

#[test]
fn config_file_round_trip() {
    let dir = std::env::temp_dir().join(format!("canon_index_config_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");
    std::fs::write(
        &path,
        r#"{"offset": {"quarterLength": 0.5, "method": null},
            "ngram": {"n": 3, "vertical": "all", "continuer": "P1"},
            "dynamic": {"window": 4}}"#,
    )
    .unwrap();

    let config = PipelineConfig::load(&path).unwrap();
    let offset = config.offset.as_ref().unwrap();
    assert_eq!(offset.quarter_length, Some(Spacing::Fixed(0.5)));
    assert_eq!(offset.method, FillMethod::NoFill);
    assert_eq!(config.ngram.n, Some(3));
    assert_eq!(config.ngram.continuer, "P1");
    assert_eq!(config.dynamic.window, 4);
    assert_eq!(config.dynamic.ratio, 1.25);

    assert!(matches!(
        PipelineConfig::load(&dir.join("missing.json")),
        Err(IndexError::Io(_))
    ));
    std::fs::remove_dir_all(&dir).unwrap();
}
