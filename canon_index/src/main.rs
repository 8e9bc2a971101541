// canon-index: regularize offsets and compose n-grams from a JSON document.
//
// Reads `{ "vertical": Table, "horizontal": Table?, "dynamic": DynamicInputs? }`,
// regularizes the tables if offset settings are given, composes n-grams, and
// writes the result table as JSON (stdout unless --output is given).
//
// Usage:
//   cargo run -p canon_index -- <input.json> [--config config.json]
//     [--step QL | --dynamic] [--n N] [--output out.json]
//
// Flags override the config file. Without a "vertical" setting every column
// of the vertical table becomes its own n-gram column. Set RUST_LOG=info (or
// debug) for progress output.

use canon_index::{
    IndexError, OffsetSettings, PipelineConfig, PipelineInput, Selection, Spacing, run_pipeline,
};
use log::{error, info};
use std::path::Path;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let Some(input_path) = args.get(1).filter(|s| !s.starts_with("--")) else {
        eprintln!(
            "usage: canon-index <input.json> [--config config.json] [--step QL | --dynamic] [--n N] [--output out.json]"
        );
        std::process::exit(2);
    };

    if let Err(e) = run(&args, Path::new(input_path)) {
        error!("{e}");
        eprintln!("canon-index: {e}");
        std::process::exit(1);
    }
}

fn run(args: &[String], input_path: &Path) -> Result<(), IndexError> {
    let mut config = match parse_flag::<String>(args, "--config") {
        Some(path) => {
            info!("Loading config from {path}");
            PipelineConfig::load(Path::new(&path))?
        }
        None => PipelineConfig::default(),
    };

    if let Some(step) = parse_flag::<f64>(args, "--step") {
        config.offset = Some(OffsetSettings {
            quarter_length: Some(Spacing::Fixed(step)),
            ..config.offset.unwrap_or_default()
        });
    }
    if args.iter().any(|a| a == "--dynamic") {
        config.offset = Some(OffsetSettings {
            quarter_length: Some(Spacing::Dynamic),
            ..config.offset.unwrap_or_default()
        });
    }
    if let Some(n) = parse_flag::<i64>(args, "--n") {
        config.ngram.n = Some(n);
    }
    if config.ngram.vertical.is_none() {
        config.ngram.vertical = Some(Selection::All);
    }

    info!("Reading {}", input_path.display());
    let input = PipelineInput::load(input_path)?;
    info!(
        "{} vertical columns, {} horizontal columns",
        input.vertical.column_count(),
        input.horizontal.as_ref().map_or(0, |h| h.column_count())
    );
    match &config.offset {
        Some(settings) => info!("Regularizing offsets ({:?})", settings.quarter_length),
        None => info!("Offsets left as given"),
    }

    let result = run_pipeline(input, &config)?;
    info!(
        "Composed {} n-gram columns, {} windows",
        result.column_count(),
        result.columns().iter().map(|c| c.series.len()).sum::<usize>()
    );

    let json = serde_json::to_string_pretty(&result)?;
    match parse_flag::<String>(args, "--output") {
        Some(path) => {
            std::fs::write(&path, json)?;
            info!("Wrote {path}");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
