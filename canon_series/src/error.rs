// Errors raised while building series and tables.
//
// These are upstream-data defects (duplicate offsets after tie collapsing,
// two columns with the same key) rather than configuration mistakes; the
// indexers in `canon_index` wrap them transparently.

use crate::offset::Offset;
use crate::part::PartKey;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// Two observations in one series share an offset.
    #[error("duplicate offset {0} in one series")]
    DuplicateOffset(Offset),

    /// Two columns in one table share a key.
    #[error("duplicate column \"{part}\" in table \"{namespace}\"")]
    DuplicateColumn { namespace: String, part: PartKey },

    /// A column key string was empty or otherwise unusable.
    #[error("invalid part key: {0:?}")]
    InvalidPartKey(String),
}
