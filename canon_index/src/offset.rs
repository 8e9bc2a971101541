// Offset regularization: resample every column of a table onto a shared grid.
//
// Score loaders report events at whatever offsets they occur. Before voices
// can be compared moment by moment (or windowed into n-grams), every column
// has to be observed at the same offsets. `OffsetIndexer` does that:
//
// - Fixed step: each part gets the grid `start, start + step, ...` from the
//   earliest first event across all parts through its own last event. When
//   the last event is off the grid, the next grid point is included, so the
//   final event is never lost (and is counted once, even if other parts run
//   longer). Grid arithmetic is integer arithmetic on `Offset` units.
// - Dynamic: one variable-step grid for the whole table, computed from the
//   piece's contrapuntal rhythm (see `dynamic.rs`).
//
// Each grid point takes the most recent value at or before it (forward fill)
// or, with `FillMethod::NoFill`, only an exact hit. Grid points before a
// part's first event are absent.
//
// All settings are checked in `new`; `run` cannot fail. Output columns keep
// the input's keys and order under the "offset.OffsetIndexer" namespace.

use crate::dissonance::MeterBasis;
use crate::dynamic::{self, DynamicInputs, DynamicParams};
use crate::error::IndexError;
use crate::settings::{FillMethod, OffsetSettings, Spacing};
use canon_series::{Column, Offset, PartKey, Table, TimeSeries};
use log::debug;

pub const NAMESPACE: &str = "offset.OffsetIndexer";

/// Smallest fixed step, in quarter lengths.
pub const MIN_STEP: f64 = 0.001;

/// Largest fixed step, in quarter lengths. Keeps grid arithmetic in `i64`.
pub const MAX_STEP: f64 = 1e12;

enum GridPlan {
    Fixed { step: i64 },
    Dynamic {
        inputs: Box<DynamicInputs>,
        params: DynamicParams,
        basis: MeterBasis,
    },
}

pub struct OffsetIndexer<T> {
    columns: Vec<Column<T>>,
    method: FillMethod,
    plan: GridPlan,
    start: Option<Offset>,
}

impl<T: Clone> OffsetIndexer<T> {
    /// Regularize the columns of `table`. `dynamic` is required (and only
    /// used) when the spacing is `Spacing::Dynamic`.
    pub fn new(
        table: &Table<T>,
        settings: OffsetSettings,
        dynamic: Option<DynamicInputs>,
    ) -> Result<Self, IndexError> {
        Self::with_params(table, settings, dynamic, DynamicParams::default())
    }

    /// As `new`, with explicit tuning for dynamic mode.
    pub fn with_params(
        table: &Table<T>,
        settings: OffsetSettings,
        dynamic: Option<DynamicInputs>,
        params: DynamicParams,
    ) -> Result<Self, IndexError> {
        if table.column_count() == 0 {
            return Err(IndexError::NoParts);
        }
        let plan = match settings.quarter_length {
            None => return Err(IndexError::MissingQuarterLength),
            Some(Spacing::Fixed(step)) => {
                if step.is_nan() || step < MIN_STEP {
                    return Err(IndexError::StepTooSmall(step));
                }
                if step > MAX_STEP {
                    return Err(IndexError::StepTooLarge(step));
                }
                GridPlan::Fixed {
                    step: Offset::from_quarter_length(step).millis(),
                }
            }
            Some(Spacing::Dynamic) => {
                let inputs = dynamic.ok_or(IndexError::DynamicInputsMissing)?;
                let basis = inputs.check(&params)?;
                GridPlan::Dynamic {
                    inputs: Box::new(inputs),
                    params,
                    basis,
                }
            }
        };
        Ok(OffsetIndexer {
            columns: table.columns().to_vec(),
            method: settings.method,
            plan,
            start: None,
        })
    }

    /// Start the grid no later than `start`, so tables regularized
    /// separately (vertical and horizontal data) land on the same points.
    pub fn starting_at(mut self, start: Offset) -> Self {
        self.start = Some(start);
        self
    }

    /// Regularize a bare list of series, keyed `0..k` in list order.
    pub fn from_series(
        series: Vec<TimeSeries<T>>,
        settings: OffsetSettings,
        dynamic: Option<DynamicInputs>,
    ) -> Result<Self, IndexError> {
        let mut table = Table::new(NAMESPACE);
        for (part, s) in series.into_iter().enumerate() {
            table.push(PartKey::Part(part), s)?;
        }
        Self::new(&table, settings, dynamic)
    }

    pub fn run(&self) -> Table<T> {
        let Some(first) = self
            .columns
            .iter()
            .filter_map(|c| c.series.first_offset())
            .min()
        else {
            debug!("every part is empty; nothing to regularize");
            return self.output(|_| Vec::new());
        };
        let start = self.start.map_or(first, |s| s.min(first));

        match &self.plan {
            GridPlan::Fixed { step } => self.output(|series| {
                series
                    .last_offset()
                    .map(|end| fixed_grid(start, end, *step))
                    .unwrap_or_default()
            }),
            GridPlan::Dynamic {
                inputs,
                params,
                basis,
            } => {
                let last_event = self
                    .columns
                    .iter()
                    .filter_map(|c| c.series.last_offset())
                    .max()
                    .unwrap_or(start);
                let grid = dynamic::dynamic_grid(inputs, params, *basis, start, last_event);
                self.output(|series| {
                    if series.is_empty() {
                        Vec::new()
                    } else {
                        grid.clone()
                    }
                })
            }
        }
    }

    /// Reindex every column onto the grid `grid_for` picks for it.
    fn output(&self, grid_for: impl Fn(&TimeSeries<T>) -> Vec<Offset>) -> Table<T> {
        let mut table = Table::new(NAMESPACE);
        for column in &self.columns {
            let grid = grid_for(&column.series);
            debug!(
                "part {}: {} events onto {} grid points",
                column.part,
                column.series.len(),
                grid.len()
            );
            table.insert(column.part.clone(), reindex(&column.series, &grid, self.method));
        }
        table
    }
}

/// Every `step` from `start` up to the first point at or after `end`.
pub fn fixed_grid(start: Offset, end: Offset, step: i64) -> Vec<Offset> {
    let step = step.max(1);
    (start.millis()..end.millis().saturating_add(step))
        .step_by(step as usize)
        .map(Offset::from_millis)
        .collect()
}

/// Sample `series` at every grid point.
pub fn reindex<T: Clone>(series: &TimeSeries<T>, grid: &[Offset], method: FillMethod) -> TimeSeries<T> {
    grid.iter()
        .map(|&t| {
            let value = match method {
                FillMethod::ForwardFill => series.value_at_or_before(t),
                FillMethod::NoFill => series.get(t),
            };
            (t, value.cloned())
        })
        .collect()
}
