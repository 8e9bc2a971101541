// N-gram composition: sliding windows over vertical and horizontal data.
//
// A vertical observation describes a simultaneity (the harmonic interval
// between two voices, say); a horizontal observation describes the motion
// connecting two simultaneities (the melodic interval in one voice). An
// n-gram is `n` vertical slots with a horizontal slot between each pair:
//
//     [P5] (+M2) [M3] (-m2) [P8]        n = 3, brackets on
//
// Each requested group produces one output column. A group names the
// vertical columns joined into each vertical slot and, optionally, the
// horizontal columns joined into each horizontal slot.
//
// Per group:
// 1. The row index is the union of the offsets observed in every
//    contributing column.
// 2. Vertical columns are forward-filled across that index, so a slow voice
//    keeps its value while a faster one moves. Horizontal columns are not:
//    where a horizontal column has no observation, the slot shows the
//    continuer, since a repeated melodic interval would claim motion that
//    never happened.
// 3. The window starting at row `i` takes vertical slots from rows
//    `i..i+n` and the horizontal slot between vertical slots `k-1` and `k`
//    from row `i+k` (a melodic interval is reported where it arrives). When
//    open-ended, one more horizontal slot comes from row `i+n`.
// 4. A window is dropped if any slot is not yet observed, if any cell in it
//    (continuers included) equals a terminator, or if it runs past the end
//    of the data. Dropped windows leave gaps in the output index; nothing
//    shifts to fill them.
//
// Groups are independent and composed in parallel with rayon. Everything
// that can be wrong with the settings is reported by `new`.

use crate::error::IndexError;
use crate::settings::{Align, NGramSettings, Selection};
use canon_series::{Offset, PartKey, Table, TimeSeries};
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::BTreeSet;

pub const NAMESPACE: &str = "ngram.NGramIndexer";

const VERTICAL: &str = "vertical";
const HORIZONTAL: &str = "horizontal";

/// One resolved output column.
struct Group {
    key: PartKey,
    vertical: Vec<TimeSeries<String>>,
    /// `None` without a horizontal setting. A `None` column (a derived voice
    /// the horizontal table does not have) contributes only continuers.
    horizontal: Option<Vec<Option<TimeSeries<String>>>>,
}

pub struct NGramIndexer {
    groups: Vec<Group>,
    n: usize,
    open_ended: bool,
    brackets: bool,
    terminators: BTreeSet<String>,
    continuer: String,
    align: Align,
}

impl NGramIndexer {
    /// Validate `settings` against the tables and resolve every group.
    ///
    /// A horizontal table must be passed exactly when a "horizontal" setting
    /// is given.
    pub fn new(
        vertical: &Table<String>,
        horizontal: Option<&Table<String>>,
        settings: NGramSettings,
    ) -> Result<Self, IndexError> {
        let (Some(n), Some(vertical_selection)) = (settings.n, settings.vertical.as_ref()) else {
            return Err(IndexError::MissingSettings);
        };
        let n = match usize::try_from(n) {
            Ok(n) if n >= 1 => n,
            _ => return Err(IndexError::NTooLow(n)),
        };
        let align: Align = settings.align.parse()?;

        let horizontal_selection = settings.horizontal.as_ref();
        if horizontal_selection.is_some() && horizontal.is_none() {
            return Err(IndexError::MissingHorizontalData);
        }
        if n == 1
            && !settings.open_ended
            && (horizontal_selection.is_some() || horizontal.is_some())
        {
            return Err(IndexError::SuperfluousHorizontalData);
        }
        if horizontal.is_some() && horizontal_selection.is_none() {
            return Err(IndexError::UnexpectedHorizontalTable);
        }
        if settings.open_ended && horizontal_selection.is_none() {
            return Err(IndexError::OpenEndedWithoutHorizontal);
        }

        let vertical_groups = resolve_vertical(vertical_selection, vertical)?;
        let horizontal_groups = match (horizontal_selection, horizontal) {
            (Some(selection), Some(table)) => {
                Some(resolve_horizontal(selection, &vertical_groups, table)?)
            }
            _ => None,
        };

        let cut_off = n + usize::from(settings.open_ended);
        let rows = vertical
            .row_count()
            .max(horizontal.map_or(0, Table::row_count));
        if cut_off > rows {
            warn!("n-grams of {cut_off} rows requested from inputs of at most {rows} rows");
            return Err(IndexError::NTooHigh { cut_off, rows });
        }

        let mut seen = BTreeSet::new();
        let mut groups = Vec::with_capacity(vertical_groups.len());
        for (i, keys) in vertical_groups.iter().enumerate() {
            let horizontal_keys = horizontal_groups.as_ref().map(|h| h[i].as_slice());
            let label = group_label(keys, horizontal_keys);
            let key: PartKey = label.parse()?;
            if !seen.insert(key.clone()) {
                return Err(IndexError::DuplicateGroup(label));
            }
            groups.push(Group {
                key,
                vertical: keys
                    .iter()
                    .filter_map(|k| vertical.column(k).cloned())
                    .collect(),
                horizontal: horizontal_keys.map(|hk| {
                    hk.iter()
                        .map(|k| horizontal.and_then(|t| t.column(k)).cloned())
                        .collect()
                }),
            });
        }

        Ok(NGramIndexer {
            groups,
            n,
            open_ended: settings.open_ended,
            brackets: settings.brackets,
            terminators: settings.terminator.into_iter().collect(),
            continuer: settings.continuer,
            align,
        })
    }

    /// The output column keys, in output order.
    pub fn labels(&self) -> impl Iterator<Item = &PartKey> + '_ {
        self.groups.iter().map(|g| &g.key)
    }

    pub fn run(&self) -> Table<String> {
        let composed: Vec<(PartKey, TimeSeries<String>)> = self
            .groups
            .par_iter()
            .map(|group| (group.key.clone(), self.compose(group)))
            .collect();

        let mut table = Table::new(NAMESPACE);
        for (key, series) in composed {
            table.insert(key, series);
        }
        table
    }

    fn compose(&self, group: &Group) -> TimeSeries<String> {
        let horizontal_columns = group.horizontal.iter().flatten().flatten();
        let rows: Vec<Offset> = group
            .vertical
            .iter()
            .chain(horizontal_columns)
            .flat_map(|s| s.observed().map(|(o, _)| o))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let vertical_cells: Vec<Vec<Option<&str>>> = group
            .vertical
            .iter()
            .map(|s| forward_filled(s, &rows))
            .collect();
        let vertical_slots: Vec<Option<String>> = (0..rows.len())
            .map(|r| {
                let cells: Vec<&str> = vertical_cells
                    .iter()
                    .map(|column| column[r])
                    .collect::<Option<_>>()?;
                self.slot(&cells, '[', ']')
            })
            .collect();

        let horizontal_slots: Option<Vec<Option<String>>> = group.horizontal.as_ref().map(|columns| {
            let cells: Vec<Vec<Option<&str>>> = columns
                .iter()
                .map(|c| match c {
                    Some(series) => exact(series, &rows),
                    None => vec![None; rows.len()],
                })
                .collect();
            (0..rows.len())
                .map(|r| {
                    let shown: Vec<&str> = cells
                        .iter()
                        .map(|column| column[r].unwrap_or(self.continuer.as_str()))
                        .collect();
                    // Checked after substitution: a continuer can itself be a terminator.
                    if shown.iter().any(|cell| self.terminators.contains(*cell)) {
                        return None;
                    }
                    Some(self.wrap(&shown, '(', ')'))
                })
                .collect()
        });

        let span = self.n + usize::from(self.open_ended);
        let mut out = TimeSeries::new();
        for i in 0..rows.len().saturating_sub(span - 1) {
            if let Some(text) = self.window(i, &vertical_slots, horizontal_slots.as_deref()) {
                let at = match self.align {
                    Align::Left => rows[i],
                    Align::Right => rows[i + self.n - 1],
                };
                out.insert(at, Some(text));
            }
        }
        debug!(
            "n-gram column {}: {} windows from {} rows",
            group.key,
            out.len(),
            rows.len()
        );
        out
    }

    /// The window starting at row `i`, or `None` if any slot is unusable.
    fn window(
        &self,
        i: usize,
        vertical: &[Option<String>],
        horizontal: Option<&[Option<String>]>,
    ) -> Option<String> {
        let mut slots: Vec<&str> = Vec::with_capacity(2 * self.n + 1);
        slots.push(vertical[i].as_deref()?);
        for k in 1..self.n {
            if let Some(h) = horizontal {
                slots.push(h[i + k].as_deref()?);
            }
            slots.push(vertical[i + k].as_deref()?);
        }
        if let Some(h) = horizontal.filter(|_| self.open_ended) {
            slots.push(h[i + self.n].as_deref()?);
        }
        Some(slots.join(" "))
    }

    /// A vertical slot, or `None` if it holds a terminator.
    fn slot(&self, cells: &[&str], open: char, close: char) -> Option<String> {
        if cells.iter().any(|cell| self.terminators.contains(*cell)) {
            return None;
        }
        Some(self.wrap(cells, open, close))
    }

    fn wrap(&self, cells: &[&str], open: char, close: char) -> String {
        let joined = cells.join(" ");
        if self.brackets {
            format!("{open}{joined}{close}")
        } else {
            joined
        }
    }
}

// ---------------------------------------------------------------------------
// Group resolution
// ---------------------------------------------------------------------------

fn resolve_vertical(
    selection: &Selection,
    table: &Table<String>,
) -> Result<Vec<Vec<PartKey>>, IndexError> {
    match selection {
        Selection::All => Ok(table.parts().map(|p| vec![p.clone()]).collect()),
        Selection::Groups(groups) => check_groups(groups, table, VERTICAL),
        other => Err(IndexError::InvalidSelector {
            side: VERTICAL,
            selector: other.keyword().unwrap_or_default().to_string(),
        }),
    }
}

/// Per vertical group, either the derived voice (lowest = largest index,
/// highest = smallest index, read from the group's first key) or the
/// explicit horizontal group in the same position.
fn resolve_horizontal(
    selection: &Selection,
    vertical_groups: &[Vec<PartKey>],
    table: &Table<String>,
) -> Result<Vec<Vec<PartKey>>, IndexError> {
    match selection {
        Selection::Lowest | Selection::Highest => vertical_groups
            .iter()
            .map(|group| {
                let voice = group.first().and_then(|key| match selection {
                    Selection::Lowest => key.lower(),
                    _ => key.upper(),
                });
                voice
                    .map(|v| vec![PartKey::Part(v)])
                    .ok_or_else(|| IndexError::InvalidSelector {
                        side: HORIZONTAL,
                        selector: format!(
                            "{} (for {})",
                            selection.keyword().unwrap_or_default(),
                            group.first().map(ToString::to_string).unwrap_or_default()
                        ),
                    })
            })
            .collect(),
        Selection::Groups(groups) => {
            if groups.len() != vertical_groups.len() {
                return Err(IndexError::HorizontalLengthMismatch {
                    vertical: vertical_groups.len(),
                    horizontal: groups.len(),
                });
            }
            check_groups(groups, table, HORIZONTAL)
        }
        Selection::All => Err(IndexError::InvalidSelector {
            side: HORIZONTAL,
            selector: "all".to_string(),
        }),
    }
}

fn check_groups(
    groups: &[Vec<PartKey>],
    table: &Table<String>,
    side: &'static str,
) -> Result<Vec<Vec<PartKey>>, IndexError> {
    for (index, group) in groups.iter().enumerate() {
        if group.is_empty() {
            return Err(IndexError::EmptyGroup { side, index });
        }
        if let Some(missing) = group.iter().find(|k| !table.contains(k)) {
            return Err(IndexError::ColumnOutOfRange {
                side,
                column: missing.to_string(),
            });
        }
    }
    Ok(groups.to_vec())
}

/// "0,1 0,2" for vertical-only groups, "0,1 0,2 : 1 2" with horizontal keys.
fn group_label(vertical: &[PartKey], horizontal: Option<&[PartKey]>) -> String {
    let join = |keys: &[PartKey]| {
        keys.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    };
    match horizontal {
        Some(h) => format!("{} : {}", join(vertical), join(h)),
        None => join(vertical),
    }
}

// ---------------------------------------------------------------------------
// Cell lookup
// ---------------------------------------------------------------------------

/// The most recent observation at or before each row.
fn forward_filled<'a>(series: &'a TimeSeries<String>, rows: &[Offset]) -> Vec<Option<&'a str>> {
    let mut observed = series.observed().peekable();
    let mut current = None;
    rows.iter()
        .map(|&row| {
            while let Some((_, value)) = observed.next_if(|&(o, _)| o <= row) {
                current = Some(value.as_str());
            }
            current
        })
        .collect()
}

/// The observation exactly at each row.
fn exact<'a>(series: &'a TimeSeries<String>, rows: &[Offset]) -> Vec<Option<&'a str>> {
    rows.iter()
        .map(|&row| series.get(row).map(String::as_str))
        .collect()
}
