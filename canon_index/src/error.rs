// Error types for the indexers.
//
// Every variant except the transparent wrappers is a configuration problem
// the caller can fix, and every one of them is raised by a constructor
// (`OffsetIndexer::new`, `NGramIndexer::new`) before any data is touched.
// Once construction succeeds, `run` cannot fail.
//
// `NTooHigh` is the one advisory case: the configuration is legal but
// cannot produce any output. It is logged at warn level and then returned as
// an error so nobody mistakes an empty result for an analysis finding.

use canon_series::SeriesError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    /// `n` or `vertical` was not given to the n-gram indexer.
    ///
    /// # Example
    /// ```
    /// # use canon_index::IndexError;
    /// assert_eq!(
    ///     IndexError::MissingSettings.to_string(),
    ///     "NGramIndexer requires \"vertical\" and \"n\" settings"
    /// );
    /// ```
    #[error("NGramIndexer requires \"vertical\" and \"n\" settings")]
    MissingSettings,

    #[error("NGramIndexer requires an \"n\" value of at least 1 (got {0})")]
    NTooLow(i64),

    /// The window (plus the open-ended connector) is longer than every input.
    #[error(
        "NGramIndexer is unlikely to return results: windows need {cut_off} rows but the inputs have at most {rows}"
    )]
    NTooHigh { cut_off: usize, rows: usize },

    #[error("a \"horizontal\" setting was given but no table of horizontal observations was passed")]
    MissingHorizontalData,

    #[error("a table of horizontal observations was passed but no \"horizontal\" setting was given")]
    UnexpectedHorizontalTable,

    #[error(
        "with n = 1 and no open end, horizontal observations are never used; leave \"horizontal\" unset"
    )]
    SuperfluousHorizontalData,

    #[error("\"open-ended\" needs a \"horizontal\" setting to draw the trailing connector from")]
    OpenEndedWithoutHorizontal,

    #[error("\"horizontal\" lists {horizontal} groups but \"vertical\" lists {vertical}")]
    HorizontalLengthMismatch { vertical: usize, horizontal: usize },

    #[error("{side} group {index} names no columns")]
    EmptyGroup { side: &'static str, index: usize },

    #[error("\"{selector}\" is not a valid {side} selection")]
    InvalidSelector { side: &'static str, selector: String },

    #[error("{side} column \"{column}\" not found")]
    ColumnOutOfRange { side: &'static str, column: String },

    #[error("n-gram column \"{0}\" would be produced twice")]
    DuplicateGroup(String),

    #[error("unrecognized \"align\" setting {0:?}; use \"left\" or \"right\"")]
    WrongAlign(String),

    #[error("OffsetIndexer requires at least one part")]
    NoParts,

    #[error("OffsetIndexer requires a \"quarterLength\" setting")]
    MissingQuarterLength,

    #[error("OffsetIndexer requires a \"quarterLength\" of at least 0.001 (got {0})")]
    StepTooSmall(f64),

    #[error("OffsetIndexer requires a finite \"quarterLength\" of at most 1e12 (got {0})")]
    StepTooLarge(f64),

    #[error("dynamic offsets need dissonance, duration, beat-strength and note/rest tables, a time signature and the piece duration")]
    DynamicInputsMissing,

    #[error("dynamic offsets only support {supported} time (got {found:?})")]
    UnsupportedTimeSignature { found: String, supported: String },

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
