// Dynamic offset grids (experimental).
//
// A fixed grid is a poor fit for Renaissance polyphony, where the prevailing
// note value drifts between sections: a quarter-note grid over-samples a
// stretch of breves and an eighth-note passage under-samples at half notes.
// The dynamic grid follows the local contrapuntal rhythm instead.
//
// The grid is built in named passes, each testable on its own:
//
// 0. `working_durations`: per voice, fold weak (ornamental) dissonances into
//    the preceding event and strong dissonances into the following event, and
//    drop rests. What remains are the structural attacks.
// 1. `snap_attack_density`: a rolling mean of the gaps between consecutive
//    structural attacks (across all voices), snapped to a discrete note-value
//    level.
// 2. `validate_levels`: each snapped reading is kept only if the dissonances
//    in the same window imply that level, or if there are none and the level
//    has not changed. Everything else becomes provisional.
// 3. `resolve_provisional`: provisional readings take the nearest confirmed
//    level (forward first, then backward).
//
// `collapse_repeats` then merges consecutive equal levels into segments, and
// `build_dynamic_grid` lays out each segment at its own step. `dynamic_grid`
// chains everything.
//
// Only duple meters are supported; the thresholds and tables live in
// `DynamicParams` so they can be re-tuned without code changes.
//
// See also: `dissonance.rs` for the code table and implied levels,
// `offset.rs` for the indexer that reindexes a table onto the result.

use crate::dissonance::{DissonanceClass, DissonanceLevels, DissonanceType, MeterBasis};
use crate::error::IndexError;
use canon_series::{Offset, Table};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The note/rest label that marks a rest.
const REST: &str = "Rest";

/// The six per-piece inputs dynamic mode reads. All tables are per voice and
/// share column keys with the durations table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicInputs {
    /// Dissonance-type codes (see `DissonanceType`).
    pub dissonances: Table<String>,
    /// Event durations in quarter lengths.
    pub durations: Table<f64>,
    pub beat_strengths: Table<f64>,
    /// Pitch names, with "Rest" for rests.
    pub noterest: Table<String>,
    pub time_signature: String,
    /// Offset of the piece's final moment, in quarter lengths.
    pub piece_duration: f64,
}

impl DynamicInputs {
    /// Check that everything is present and the meter is supported.
    pub fn check(&self, params: &DynamicParams) -> Result<MeterBasis, IndexError> {
        let present = self.dissonances.column_count() > 0
            && self.durations.column_count() > 0
            && self.beat_strengths.column_count() > 0
            && self.noterest.column_count() > 0
            && !self.time_signature.trim().is_empty()
            && self.piece_duration.is_finite();
        if !present {
            return Err(IndexError::DynamicInputsMissing);
        }

        let found = self.time_signature.trim();
        let supported = params.time_signatures.iter().any(|ts| ts.trim() == found);
        match MeterBasis::for_time_signature(found) {
            Some(basis) if supported => Ok(basis),
            _ => Err(IndexError::UnsupportedTimeSignature {
                found: found.to_string(),
                supported: params.time_signatures.join(", "),
            }),
        }
    }
}

/// Tuning for the dynamic grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicParams {
    /// Number of attack gaps averaged into one reading.
    pub window: usize,
    /// A reading snaps to the first level `L` with `reading <= L * ratio`.
    pub ratio: f64,
    /// Candidate levels in quarter lengths, ascending.
    pub levels: Vec<f64>,
    pub time_signatures: Vec<String>,
    pub dissonance_levels: DissonanceLevels,
    /// Level used when nothing can be measured at all.
    pub fallback_level: f64,
}

impl Default for DynamicParams {
    fn default() -> Self {
        DynamicParams {
            window: 6,
            ratio: 1.25,
            levels: vec![0.5, 1.0, 2.0, 4.0],
            time_signatures: ["2/1", "2/2", "4/2", "4/4"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            dissonance_levels: DissonanceLevels::default(),
            fallback_level: 1.0,
        }
    }
}

/// One attack-density reading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelReading {
    /// The attack that opens the last gap in the window.
    pub offset: Offset,
    /// First attack covered by the window.
    pub window_start: Offset,
    /// The attack that closes the window.
    pub window_end: Offset,
    /// The snapped level, or `None` while missing or unconfirmed.
    pub level: Option<f64>,
}

// ---------------------------------------------------------------------------
// Pass 0: structural attacks
// ---------------------------------------------------------------------------

/// Per voice (in durations-table order), the durations of structural events.
pub fn working_durations(inputs: &DynamicInputs) -> Vec<BTreeMap<Offset, f64>> {
    inputs
        .durations
        .columns()
        .iter()
        .map(|column| {
            let mut durations: BTreeMap<Offset, f64> =
                column.series.observed().map(|(o, &d)| (o, d)).collect();
            let dissonances: Vec<(Offset, DissonanceClass)> = inputs
                .dissonances
                .column(&column.part)
                .map(|series| {
                    series
                        .observed()
                        .filter_map(|(o, code)| DissonanceType::from_code(code).map(|d| (o, d.class())))
                        .collect()
                })
                .unwrap_or_default();

            // Latest first, so a run of ornaments collapses onto the consonance.
            for &(offset, _) in dissonances
                .iter()
                .rev()
                .filter(|(_, class)| *class == DissonanceClass::Weak)
            {
                let Some(own) = durations.remove(&offset) else {
                    continue;
                };
                if let Some((_, previous)) = durations.range_mut(..offset).next_back() {
                    *previous += own;
                }
            }

            for &(offset, _) in dissonances
                .iter()
                .filter(|(_, class)| *class == DissonanceClass::Strong)
            {
                let Some(own) = durations.remove(&offset) else {
                    continue;
                };
                if let Some((_, next)) = durations.range_mut(offset..).next() {
                    *next += own;
                }
            }

            if let Some(notes) = inputs.noterest.column(&column.part) {
                durations.retain(|&o, _| notes.get(o).map(String::as_str) != Some(REST));
            }
            durations
        })
        .collect()
}

/// Implied levels from every classified dissonance, in offset order.
///
/// Weak dissonances read their own voice's beat strength. Strong dissonances
/// and suspensions read the strength of the moment (the first voice with an
/// event there), since what matters is where in the bar they fall.
pub fn dissonance_evidence(
    inputs: &DynamicInputs,
    basis: MeterBasis,
    levels: &DissonanceLevels,
) -> Vec<(Offset, f64)> {
    let mut evidence = Vec::new();
    for column in inputs.dissonances.columns() {
        let own_strengths = inputs.beat_strengths.column(&column.part);
        for (offset, code) in column.series.observed() {
            let Some(dissonance) = DissonanceType::from_code(code) else {
                continue;
            };
            let strength = match dissonance.class() {
                DissonanceClass::Weak => own_strengths.and_then(|s| s.get(offset)).copied(),
                _ => moment_strength(&inputs.beat_strengths, offset),
            };
            if let Some(level) = strength.and_then(|s| levels.implied_level(basis, dissonance, s)) {
                evidence.push((offset, level));
            }
        }
    }
    evidence.sort_by_key(|&(offset, _)| offset);
    evidence
}

fn moment_strength(strengths: &Table<f64>, offset: Offset) -> Option<f64> {
    strengths
        .columns()
        .iter()
        .find_map(|c| c.series.get(offset).copied())
}

// ---------------------------------------------------------------------------
// Pass 1: snap attack density
// ---------------------------------------------------------------------------

pub fn snap_level(reading: f64, params: &DynamicParams) -> f64 {
    params
        .levels
        .iter()
        .copied()
        .find(|&level| reading <= level * params.ratio)
        .or_else(|| params.levels.last().copied())
        .unwrap_or(params.fallback_level)
}

/// One reading per gap between consecutive attacks. The first `window - 1`
/// readings have no level (the rolling mean is not yet defined).
pub fn snap_attack_density(attacks: &[Offset], params: &DynamicParams) -> Vec<LevelReading> {
    let window = params.window.max(1);
    let gaps: Vec<f64> = attacks
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).quarter_length())
        .collect();

    (0..gaps.len())
        .map(|i| {
            let first = (i + 1).saturating_sub(window);
            let level = (i + 1 >= window).then(|| {
                let mean = gaps[first..=i].iter().sum::<f64>() / window as f64;
                snap_level(mean, params)
            });
            LevelReading {
                offset: attacks[i],
                window_start: attacks[first],
                window_end: attacks[i + 1],
                level,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 2: validate against dissonance evidence
// ---------------------------------------------------------------------------

/// The levels that occur most often (all of them, on a tie).
fn most_common(levels: &[(Offset, f64)]) -> Vec<f64> {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for &(_, level) in levels {
        match counts.iter_mut().find(|(l, _)| *l == level) {
            Some((_, n)) => *n += 1,
            None => counts.push((level, 1)),
        }
    }
    let top = counts.iter().map(|&(_, n)| n).max().unwrap_or(0);
    counts
        .into_iter()
        .filter(|&(_, n)| n == top)
        .map(|(level, _)| level)
        .collect()
}

/// Mark every reading that is not confirmed as provisional (`level = None`).
///
/// `evidence` must be sorted by offset. A reading is confirmed when its level
/// is among the most common implied levels in its window, or when the window
/// holds no evidence and the level equals the last confirmed one.
pub fn validate_levels(readings: &[LevelReading], evidence: &[(Offset, f64)]) -> Vec<LevelReading> {
    let mut last_confirmed: Option<f64> = None;
    readings
        .iter()
        .map(|reading| {
            let mut checked = *reading;
            let Some(level) = reading.level else {
                return checked;
            };
            let lo = evidence.partition_point(|&(o, _)| o < reading.window_start);
            let hi = evidence.partition_point(|&(o, _)| o < reading.window_end);
            let window = &evidence[lo..hi.max(lo)];
            let confirmed = if window.is_empty() {
                last_confirmed == Some(level)
            } else {
                most_common(window).contains(&level)
            };
            if confirmed {
                last_confirmed = Some(level);
            } else {
                checked.level = None;
            }
            checked
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Pass 3: resolve provisional readings
// ---------------------------------------------------------------------------

/// Fill provisional readings from confirmed neighbors: forward, then backward
/// for the leading run. With no confirmed reading at all, every reading takes
/// `fallback`.
pub fn resolve_provisional(readings: &[LevelReading], fallback: f64) -> Vec<(Offset, f64)> {
    let mut levels: Vec<Option<f64>> = readings.iter().map(|r| r.level).collect();

    let mut carry = None;
    for level in levels.iter_mut() {
        if let Some(l) = *level {
            carry = Some(l);
        } else {
            *level = carry;
        }
    }
    let mut carry = None;
    for level in levels.iter_mut().rev() {
        if let Some(l) = *level {
            carry = Some(l);
        } else {
            *level = carry;
        }
    }

    readings
        .iter()
        .zip(levels)
        .map(|(r, level)| (r.offset, level.unwrap_or(fallback)))
        .collect()
}

/// Keep only the readings where the level changes.
pub fn collapse_repeats(levels: Vec<(Offset, f64)>) -> Vec<(Offset, f64)> {
    let mut segments: Vec<(Offset, f64)> = Vec::new();
    for (offset, level) in levels {
        if segments.last().map(|&(_, prev)| prev) != Some(level) {
            segments.push((offset, level));
        }
    }
    segments
}

// ---------------------------------------------------------------------------
// Grid construction
// ---------------------------------------------------------------------------

/// Lay out each segment at its own step, from `start` up to (not including)
/// `end`. The first segment begins at `start`; each segment's points are
/// snapped to multiples of its step. The result is strictly increasing and
/// never empty.
pub fn build_dynamic_grid(segments: &[(Offset, f64)], start: Offset, end: Offset) -> Vec<Offset> {
    let mut grid: Vec<Offset> = Vec::new();
    for (i, &(offset, level)) in segments.iter().enumerate() {
        let step = Offset::from_quarter_length(level).millis().max(1);
        let from = if i == 0 { start } else { offset };
        let until = segments.get(i + 1).map_or(end, |&(next, _)| next);
        let mut t = from.snap_down(step).millis();
        while t < until.millis() {
            let point = Offset::from_millis(t);
            if point >= start && grid.last().is_none_or(|&last| point > last) {
                grid.push(point);
            }
            t += step;
        }
    }
    if grid.is_empty() {
        grid.push(start);
    }
    grid
}

/// The snapped mean gap over the whole piece.
fn global_level(attacks: &[Offset], params: &DynamicParams) -> f64 {
    match (attacks.first(), attacks.last()) {
        (Some(&first), Some(&last)) if attacks.len() > 1 => {
            let mean = (last - first).quarter_length() / (attacks.len() - 1) as f64;
            snap_level(mean, params)
        }
        _ => params.fallback_level,
    }
}

/// The full dynamic grid for a piece whose events span `start..=last_event`.
///
/// The grid ends at the piece duration, extended by whole steps of the final
/// level if that would leave the last event off the grid.
pub fn dynamic_grid(
    inputs: &DynamicInputs,
    params: &DynamicParams,
    basis: MeterBasis,
    start: Offset,
    last_event: Offset,
) -> Vec<Offset> {
    let voices = working_durations(inputs);
    let attacks: Vec<Offset> = voices
        .iter()
        .flat_map(|v| v.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let readings = snap_attack_density(&attacks, params);
    let evidence = dissonance_evidence(inputs, basis, &params.dissonance_levels);
    let validated = validate_levels(&readings, &evidence);

    let fallback = global_level(&attacks, params);
    if !validated.iter().any(|r| r.level.is_some()) {
        warn!(
            "no attack-density reading was confirmed ({} readings, {} dissonances); using {fallback} ql throughout",
            readings.len(),
            evidence.len()
        );
    }
    let mut segments = collapse_repeats(resolve_provisional(&validated, fallback));
    if segments.is_empty() {
        segments.push((start, fallback));
    }
    debug!(
        "dynamic grid: {} attacks, {} segments, levels {:?}",
        attacks.len(),
        segments.len(),
        segments.iter().map(|&(_, l)| l).collect::<Vec<_>>()
    );

    let end = Offset::from_quarter_length(inputs.piece_duration).max(start);
    let mut grid = build_dynamic_grid(&segments, start, end);

    let last_step = segments
        .last()
        .map_or(params.fallback_level, |&(_, l)| l);
    let step = Offset::from_quarter_length(last_step).millis().max(1);
    while let Some(&last) = grid.last() {
        if last >= last_event {
            break;
        }
        grid.push(Offset::from_millis(last.millis() + step));
    }
    grid
}
