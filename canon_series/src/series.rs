// One voice's (or one voice pair's) observations, keyed by offset.
//
// A `TimeSeries` maps each offset to an optional observation. `None` is the
// "absent" marker: a grid point before the voice's first event, or a point a
// no-fill reindex could not match. It is deliberately distinct from any
// explicit "no event" label such as "Rest", which is an ordinary value.
//
// Offsets within one series are unique. Building a series from a list of
// points with a repeated offset fails rather than silently keeping one.
//
// Serialized as an ordered list of `[offset, value]` pairs, since JSON object
// keys cannot be numbers.

use crate::error::SeriesError;
use crate::offset::Offset;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries<T> {
    points: BTreeMap<Offset, Option<T>>,
}

impl<T> Default for TimeSeries<T> {
    fn default() -> Self {
        TimeSeries {
            points: BTreeMap::new(),
        }
    }
}

impl<T> TimeSeries<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from `(offset, observation)` points in any order.
    pub fn from_points<I>(points: I) -> Result<Self, SeriesError>
    where
        I: IntoIterator<Item = (Offset, Option<T>)>,
    {
        let mut series = TimeSeries::new();
        for (offset, value) in points {
            if series.points.insert(offset, value).is_some() {
                return Err(SeriesError::DuplicateOffset(offset));
            }
        }
        Ok(series)
    }

    /// Build a series of present observations from `(quarter length, value)`
    /// pairs. Mostly a convenience for tests and small hand-built inputs.
    pub fn from_values<I>(values: I) -> Result<Self, SeriesError>
    where
        I: IntoIterator<Item = (f64, T)>,
    {
        Self::from_points(
            values
                .into_iter()
                .map(|(ql, v)| (Offset::from_quarter_length(ql), Some(v))),
        )
    }

    /// Insert or replace the observation at `offset`.
    pub fn insert(&mut self, offset: Offset, value: Option<T>) {
        self.points.insert(offset, value);
    }

    /// Remove the entry at `offset`, returning it if one existed.
    pub fn remove(&mut self, offset: Offset) -> Option<Option<T>> {
        self.points.remove(&offset)
    }

    /// The observation stored exactly at `offset`. `None` means there is no
    /// entry or the entry is absent.
    pub fn get(&self, offset: Offset) -> Option<&T> {
        self.points.get(&offset).and_then(Option::as_ref)
    }

    /// Whether an entry (present or absent) exists at `offset`.
    pub fn contains(&self, offset: Offset) -> bool {
        self.points.contains_key(&offset)
    }

    /// The entry at the latest offset `<= offset`, as stored (forward-fill
    /// lookup). Returns `None` before the first entry.
    pub fn value_at_or_before(&self, offset: Offset) -> Option<&T> {
        self.points
            .range(..=offset)
            .next_back()
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Offset, Option<&T>)> + '_ {
        self.points.iter().map(|(&o, v)| (o, v.as_ref()))
    }

    /// Present observations only, in offset order.
    pub fn observed(&self) -> impl DoubleEndedIterator<Item = (Offset, &T)> + '_ {
        self.points
            .iter()
            .filter_map(|(&o, v)| v.as_ref().map(|v| (o, v)))
    }

    pub fn offsets(&self) -> impl DoubleEndedIterator<Item = Offset> + '_ {
        self.points.keys().copied()
    }

    pub fn first_offset(&self) -> Option<Offset> {
        self.points.keys().next().copied()
    }

    pub fn last_offset(&self) -> Option<Offset> {
        self.points.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Transform every present observation, keeping offsets and absences.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> TimeSeries<U> {
        TimeSeries {
            points: self
                .points
                .iter()
                .map(|(&o, v)| (o, v.as_ref().map(&mut f)))
                .collect(),
        }
    }
}

impl<T> FromIterator<(Offset, Option<T>)> for TimeSeries<T> {
    /// Collect points; a repeated offset keeps the later observation.
    fn from_iter<I: IntoIterator<Item = (Offset, Option<T>)>>(iter: I) -> Self {
        TimeSeries {
            points: iter.into_iter().collect(),
        }
    }
}

impl<T: Serialize> Serialize for TimeSeries<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.points.iter())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for TimeSeries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let points: Vec<(Offset, Option<T>)> = Vec::deserialize(deserializer)?;
        TimeSeries::from_points(points).map_err(D::Error::custom)
    }
}
