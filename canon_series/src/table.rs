// Tables: several aligned series under one indexer namespace.
//
// A table is what an indexer returns: one column per voice or voice pair,
// each keyed by a `PartKey`, all filed under a namespace naming the indexer
// that produced them (e.g. "interval.IntervalIndexer"). The namespace plus
// the column key is the address of a column; tables from different indexers
// can be held side by side without their keys colliding.
//
// Column order is insertion order and is meaningful: selecting "all" columns
// of a table walks them in this order.

use crate::error::SeriesError;
use crate::offset::Offset;
use crate::part::PartKey;
use crate::series::TimeSeries;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// One keyed column of a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column<T> {
    pub part: PartKey,
    pub series: TimeSeries<T>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table<T> {
    namespace: String,
    columns: Vec<Column<T>>,
}

impl<T> Table<T> {
    pub fn new(namespace: impl Into<String>) -> Self {
        Table {
            namespace: namespace.into(),
            columns: Vec::new(),
        }
    }

    /// Append a column. Fails if the key is already present.
    pub fn push(&mut self, part: PartKey, series: TimeSeries<T>) -> Result<(), SeriesError> {
        if self.contains(&part) {
            return Err(SeriesError::DuplicateColumn {
                namespace: self.namespace.clone(),
                part,
            });
        }
        self.columns.push(Column { part, series });
        Ok(())
    }

    /// Insert a column, replacing the series of an existing column with the
    /// same key in place. Returns the replaced series.
    pub fn insert(&mut self, part: PartKey, series: TimeSeries<T>) -> Option<TimeSeries<T>> {
        match self.columns.iter_mut().find(|c| c.part == part) {
            Some(column) => Some(std::mem::replace(&mut column.series, series)),
            None => {
                self.columns.push(Column { part, series });
                None
            }
        }
    }

    /// Builder form of `push`.
    pub fn with_column(
        mut self,
        part: impl Into<PartKey>,
        series: TimeSeries<T>,
    ) -> Result<Self, SeriesError> {
        self.push(part.into(), series)?;
        Ok(self)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn column(&self, part: &PartKey) -> Option<&TimeSeries<T>> {
        self.columns
            .iter()
            .find(|c| &c.part == part)
            .map(|c| &c.series)
    }

    pub fn contains(&self, part: &PartKey) -> bool {
        self.columns.iter().any(|c| &c.part == part)
    }

    pub fn parts(&self) -> impl Iterator<Item = &PartKey> + '_ {
        self.columns.iter().map(|c| &c.part)
    }

    pub fn columns(&self) -> &[Column<T>] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column<T>> {
        self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The table's row index: the sorted union of every column's offsets.
    pub fn offsets(&self) -> Vec<Offset> {
        let all: BTreeSet<Offset> = self
            .columns
            .iter()
            .flat_map(|c| c.series.offsets())
            .collect();
        all.into_iter().collect()
    }

    /// Number of rows in the table's union index.
    pub fn row_count(&self) -> usize {
        self.offsets().len()
    }

    /// A table under `namespace` with the same columns in the same order,
    /// each series replaced by `f(part, series)`.
    pub fn map_series<U>(
        &self,
        namespace: impl Into<String>,
        mut f: impl FnMut(&PartKey, &TimeSeries<T>) -> TimeSeries<U>,
    ) -> Table<U> {
        Table {
            namespace: namespace.into(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    part: c.part.clone(),
                    series: f(&c.part, &c.series),
                })
                .collect(),
        }
    }

    /// True when the table has no rows at all (no columns, or only empty ones).
    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(|c| c.series.is_empty())
    }
}

#[derive(Deserialize)]
struct TableRepr<T> {
    namespace: String,
    columns: Vec<Column<T>>,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Table<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = TableRepr::<T>::deserialize(deserializer)?;
        let mut table = Table::new(repr.namespace);
        for column in repr.columns {
            table
                .push(column.part, column.series)
                .map_err(D::Error::custom)?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[(f64, &str)]) -> TimeSeries<String> {
        TimeSeries::from_values(values.iter().map(|&(o, v)| (o, v.to_string()))).unwrap()
    }

    #[test]
    fn test_push_rejects_duplicate_keys() {
        let mut table = Table::new("noterest.NoteRestIndexer");
        table.push(PartKey::Part(0), series(&[(0.0, "C4")])).unwrap();
        let err = table
            .push(PartKey::Part(0), series(&[(0.0, "E4")]))
            .unwrap_err();
        assert!(matches!(err, SeriesError::DuplicateColumn { .. }));
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn test_offsets_are_the_union() {
        let table = Table::new("t")
            .with_column(0usize, series(&[(0.0, "a"), (2.0, "b")]))
            .unwrap()
            .with_column(1usize, series(&[(1.0, "x"), (2.0, "y")]))
            .unwrap();
        let offsets: Vec<f64> = table.offsets().into_iter().map(f64::from).collect();
        assert_eq!(offsets, vec![0.0, 1.0, 2.0]);
        assert_eq!(table.row_count(), 3);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_lookup_by_pair_key() {
        let table = Table::new("interval.IntervalIndexer")
            .with_column(PartKey::Pair(0, 1), series(&[(0.0, "P8")]))
            .unwrap();
        assert!(table.contains(&"0,1".parse().unwrap()));
        assert!(table.column(&PartKey::Pair(1, 0)).is_none());
        let parts: Vec<String> = table.parts().map(ToString::to_string).collect();
        assert_eq!(parts, vec!["0,1"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut table = Table::new("t")
            .with_column(0usize, series(&[(0.0, "a")]))
            .unwrap()
            .with_column(1usize, series(&[(0.0, "b")]))
            .unwrap();
        let old = table.insert(PartKey::Part(0), series(&[(0.0, "c")]));
        assert_eq!(old, Some(series(&[(0.0, "a")])));
        assert!(table.insert(PartKey::Part(2), series(&[])).is_none());
        let parts: Vec<String> = table.parts().map(ToString::to_string).collect();
        assert_eq!(parts, vec!["0", "1", "2"]);
        assert_eq!(table.column(&PartKey::Part(0)).unwrap().get(0.0.into()), Some(&"c".to_string()));
    }

    #[test]
    fn test_map_series_keeps_keys_and_order() {
        let table = Table::new("noterest.NoteRestIndexer")
            .with_column(1usize, series(&[(0.0, "C4")]))
            .unwrap()
            .with_column(0usize, series(&[(0.0, "E4"), (1.0, "F4")]))
            .unwrap();
        let lengths = table.map_series("len", |_, s| s.map(|v| v.len()));
        assert_eq!(lengths.namespace(), "len");
        let parts: Vec<PartKey> = lengths.parts().cloned().collect();
        assert_eq!(parts, vec![PartKey::Part(1), PartKey::Part(0)]);
        assert_eq!(lengths.column(&PartKey::Part(0)).unwrap().len(), 2);
    }

    #[test]
    fn test_deserialize_checks_uniqueness() {
        let json = r#"{"namespace":"t","columns":[
            {"part":"0","series":[[0.0,"a"]]},
            {"part":0,"series":[[1.0,"b"]]}]}"#;
        let parsed: Result<Table<String>, _> = serde_json::from_str(json);
        assert!(parsed.is_err());

        let ok = r#"{"namespace":"t","columns":[{"part":"0,2","series":[[0.0,"M3"]]}]}"#;
        let table: Table<String> = serde_json::from_str(ok).unwrap();
        assert_eq!(table.namespace(), "t");
        assert_eq!(table.column(&PartKey::Pair(0, 2)).unwrap().len(), 1);
    }
}
