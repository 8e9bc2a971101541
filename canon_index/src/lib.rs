// Canon index: offset regularization and n-gram composition.
//
// The two analytic passes that turn per-voice observation tables (notes,
// harmonic intervals, melodic intervals, dissonance labels) into material
// for corpus statistics:
//
// - offset.rs: `OffsetIndexer`, which resamples every column of a table onto
//   a shared time grid, either a fixed step or a dynamic grid
// - dynamic.rs: the dynamic grid, a three-pass heuristic (snap attack
//   density, validate against dissonance evidence, resolve provisional
//   readings) for Renaissance duple-meter polyphony
// - dissonance.rs: dissonance-type codes and the lookup from dissonance type
//   and beat strength to an implied note-value level
// - ngram.rs: `NGramIndexer`, sliding windows of vertical observations joined
//   by horizontal connectors, one output column per requested group
// - settings.rs: the typed settings both indexers are constructed from, and
//   the JSON pipeline config read by the binary
// - pipeline.rs: regularize-then-compose over one JSON input document
// - error.rs: `IndexError`
//
// Both indexers validate everything in `new` and cannot fail in `run`.
// Outputs are ordinary `canon_series::Table`s, so they can be fed back in as
// inputs to either indexer.
//
// The `canon-index` binary (main.rs) chains the two over a JSON document.

pub mod dissonance;
pub mod dynamic;
pub mod error;
pub mod ngram;
pub mod offset;
pub mod pipeline;
pub mod settings;

pub use dissonance::{DissonanceClass, DissonanceLevels, DissonanceType, MeterBasis};
pub use dynamic::{DynamicInputs, DynamicParams};
pub use error::IndexError;
pub use ngram::NGramIndexer;
pub use offset::OffsetIndexer;
pub use pipeline::{PipelineInput, run_pipeline};
pub use settings::{
    Align, FillMethod, NGramSettings, OffsetSettings, PipelineConfig, Selection, Spacing,
};
