// Column keys: which voice (or pair of voices) a column describes.
//
// Parts are numbered from the top of the score down, so part 0 is the
// highest voice and larger indices are lower voices. Voice-pair columns (the
// output of a harmonic-interval indexer) are written "0,2" at the table
// boundary; internally they are a structured pair so "lowest"/"highest"
// selections compare indices instead of splitting strings.
//
// Anything that is neither a part index nor a pair (for example an n-gram
// column label like "0,1 0,2 : 1") is kept verbatim as a `Label`.

use crate::error::SeriesError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The key of one column in a `Table`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PartKey {
    /// A single voice, by index.
    Part(usize),
    /// A pair of voices, in the order written.
    Pair(usize, usize),
    /// Any other column label.
    Label(String),
}

impl PartKey {
    pub fn pair(a: usize, b: usize) -> Self {
        PartKey::Pair(a, b)
    }

    pub fn label(text: impl Into<String>) -> Self {
        PartKey::Label(text.into())
    }

    /// The highest-sounding voice this key involves (the smallest index).
    pub fn upper(&self) -> Option<usize> {
        match *self {
            PartKey::Part(p) => Some(p),
            PartKey::Pair(a, b) => Some(a.min(b)),
            PartKey::Label(_) => None,
        }
    }

    /// The lowest-sounding voice this key involves (the largest index).
    pub fn lower(&self) -> Option<usize> {
        match *self {
            PartKey::Part(p) => Some(p),
            PartKey::Pair(a, b) => Some(a.max(b)),
            PartKey::Label(_) => None,
        }
    }
}

impl From<usize> for PartKey {
    fn from(part: usize) -> Self {
        PartKey::Part(part)
    }
}

impl FromStr for PartKey {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(SeriesError::InvalidPartKey(s.to_string()));
        }
        if let Ok(part) = text.parse::<usize>() {
            return Ok(PartKey::Part(part));
        }
        if let Some((a, b)) = text.split_once(',') {
            if let (Ok(a), Ok(b)) = (a.trim().parse::<usize>(), b.trim().parse::<usize>()) {
                return Ok(PartKey::Pair(a, b));
            }
        }
        Ok(PartKey::Label(text.to_string()))
    }
}

impl fmt::Display for PartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartKey::Part(p) => write!(f, "{p}"),
            PartKey::Pair(a, b) => write!(f, "{a},{b}"),
            PartKey::Label(text) => f.write_str(text),
        }
    }
}

impl Serialize for PartKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PartKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PartKeyVisitor)
    }
}

/// Accepts `"0,2"`-style strings and bare non-negative integers.
struct PartKeyVisitor;

impl Visitor<'_> for PartKeyVisitor {
    type Value = PartKey;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a part index, a \"a,b\" voice pair, or a column label")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<PartKey, E> {
        Ok(PartKey::Part(v as usize))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<PartKey, E> {
        usize::try_from(v)
            .map(PartKey::Part)
            .map_err(|_| E::custom(format!("negative part index {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<PartKey, E> {
        v.parse().map_err(E::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!("3".parse::<PartKey>().unwrap(), PartKey::Part(3));
        assert_eq!("0,2".parse::<PartKey>().unwrap(), PartKey::Pair(0, 2));
        assert_eq!(" 1, 3 ".parse::<PartKey>().unwrap(), PartKey::Pair(1, 3));
        assert_eq!(
            "0,1 0,2 : 1".parse::<PartKey>().unwrap(),
            PartKey::label("0,1 0,2 : 1")
        );
        assert!("  ".parse::<PartKey>().is_err());
    }

    #[test]
    fn test_display_matches_table_form() {
        assert_eq!(PartKey::Pair(1, 3).to_string(), "1,3");
        assert_eq!(PartKey::Part(0).to_string(), "0");
        assert_eq!(PartKey::label("bass").to_string(), "bass");
    }

    #[test]
    fn test_upper_and_lower_voice() {
        let pair = PartKey::Pair(3, 1);
        assert_eq!(pair.upper(), Some(1));
        assert_eq!(pair.lower(), Some(3));
        assert_eq!(PartKey::Part(2).lower(), Some(2));
        assert_eq!(PartKey::label("x").upper(), None);
    }

    #[test]
    fn test_serde_accepts_strings_and_integers() {
        let keys: Vec<PartKey> = serde_json::from_str(r#"["0,1", 2, "soprano"]"#).unwrap();
        assert_eq!(
            keys,
            vec![PartKey::Pair(0, 1), PartKey::Part(2), PartKey::label("soprano")]
        );
        assert_eq!(serde_json::to_string(&PartKey::Pair(0, 1)).unwrap(), "\"0,1\"");
    }
}
