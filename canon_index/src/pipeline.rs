// The regularize-then-compose pipeline behind the `canon-index` binary.
//
// Input is one JSON document holding the vertical table, an optional
// horizontal table, and (for dynamic offsets) the six dynamic-mode inputs.
// When the config has offset settings, both tables are regularized first:
// the vertical table with those settings, the horizontal table with
// `horizontal_offset` (or the same step without fill). Both grids start at
// the earliest offset of either table, so a melodic interval that precedes
// the first simultaneity cannot put the two tables on interleaved grids. The
// n-gram indexer then runs over the results.

use crate::dynamic::DynamicInputs;
use crate::error::IndexError;
use crate::ngram::NGramIndexer;
use crate::offset::OffsetIndexer;
use crate::settings::PipelineConfig;
use canon_series::{Offset, Table};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineInput {
    pub vertical: Table<String>,
    #[serde(default)]
    pub horizontal: Option<Table<String>>,
    #[serde(default)]
    pub dynamic: Option<DynamicInputs>,
}

impl PipelineInput {
    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }
}

pub fn run_pipeline(
    input: PipelineInput,
    config: &PipelineConfig,
) -> Result<Table<String>, IndexError> {
    let (vertical, horizontal) = match &config.offset {
        Some(settings) => {
            let start = first_offset(&input.vertical)
                .into_iter()
                .chain(input.horizontal.as_ref().and_then(first_offset))
                .min();
            debug!(
                "regularizing {} vertical columns from {:?}",
                input.vertical.column_count(),
                start
            );
            let vertical = seeded(
                OffsetIndexer::with_params(
                    &input.vertical,
                    settings.clone(),
                    input.dynamic.clone(),
                    config.dynamic.clone(),
                )?,
                start,
            )
            .run();
            let horizontal = match (input.horizontal, config.horizontal_offset_settings()) {
                (Some(table), Some(h_settings)) => {
                    debug!("regularizing {} horizontal columns", table.column_count());
                    Some(
                        seeded(
                            OffsetIndexer::with_params(
                                &table,
                                h_settings,
                                input.dynamic,
                                config.dynamic.clone(),
                            )?,
                            start,
                        )
                        .run(),
                    )
                }
                (table, _) => table,
            };
            (vertical, horizontal)
        }
        None => (input.vertical, input.horizontal),
    };

    let indexer = NGramIndexer::new(&vertical, horizontal.as_ref(), config.ngram.clone())?;
    Ok(indexer.run())
}

fn first_offset(table: &Table<String>) -> Option<Offset> {
    table
        .columns()
        .iter()
        .filter_map(|c| c.series.first_offset())
        .min()
}

fn seeded(indexer: OffsetIndexer<String>, start: Option<Offset>) -> OffsetIndexer<String> {
    match start {
        Some(start) => indexer.starting_at(start),
        None => indexer,
    }
}
