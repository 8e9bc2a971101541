// Canon series: the shared data model for offset-indexed music analysis.
//
// Every analytic pass in the workspace reads and writes the same shape of
// data: one ordered mapping from offset to observation per voice (or per
// voice pair), grouped into a table under an indexer namespace.
//
// Architecture:
// - offset.rs: `Offset`, a quarter-length time coordinate stored as integer
//   thousandths so grid arithmetic never accumulates float error
// - part.rs: `PartKey`, the column address (single voice, voice pair, label)
// - series.rs: `TimeSeries<T>`, offset -> optional observation
// - table.rs: `Table<T>`, a namespaced, ordered set of uniquely keyed columns
// - error.rs: `SeriesError` for malformed series and tables
//
// Consumed by `canon_index` (offset regularization and n-gram composition).

pub mod error;
pub mod offset;
pub mod part;
pub mod series;
pub mod table;

pub use error::SeriesError;
pub use offset::Offset;
pub use part::PartKey;
pub use series::TimeSeries;
pub use table::{Column, Table};
