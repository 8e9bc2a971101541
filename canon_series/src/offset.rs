// Offsets: time coordinates measured in quarter lengths.
//
// Score loaders report offsets as floating-point quarter lengths, but the
// analyses only ever distinguish them to three decimal places. `Offset`
// stores the value as an integer count of thousandths of a quarter length
// (a "milli"), so stepping through a grid is exact integer arithmetic and
// offsets can be used as `BTreeMap` keys.
//
// Serialized as a plain floating-point quarter length, so JSON produced by
// other tools (`[0.0, "C4"]`, `[1.5, "Rest"]`) reads in directly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Number of offset units per quarter length.
pub const UNITS_PER_QUARTER: i64 = 1000;

/// A time coordinate in thousandths of a quarter length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Offset(i64);

impl Offset {
    pub const ZERO: Offset = Offset(0);

    /// Build an offset from raw thousandths of a quarter length.
    pub const fn from_millis(millis: i64) -> Self {
        Offset(millis)
    }

    /// Build an offset from a quarter length, rounding to the nearest
    /// thousandth.
    pub fn from_quarter_length(ql: f64) -> Self {
        Offset((ql * UNITS_PER_QUARTER as f64).round() as i64)
    }

    /// Raw thousandths of a quarter length.
    pub const fn millis(self) -> i64 {
        self.0
    }

    pub fn quarter_length(self) -> f64 {
        self.0 as f64 / UNITS_PER_QUARTER as f64
    }

    /// Round down to the closest multiple of `step` (in millis). A
    /// non-positive step leaves the offset unchanged.
    pub fn snap_down(self, step: i64) -> Self {
        if step <= 0 {
            return self;
        }
        Offset(self.0 - self.0.rem_euclid(step))
    }
}

impl From<f64> for Offset {
    fn from(ql: f64) -> Self {
        Offset::from_quarter_length(ql)
    }
}

impl From<Offset> for f64 {
    fn from(offset: Offset) -> Self {
        offset.quarter_length()
    }
}

impl Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset(self.0 + rhs.0)
    }
}

impl Sub for Offset {
    type Output = Offset;

    fn sub(self, rhs: Offset) -> Offset {
        Offset(self.0 - rhs.0)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.quarter_length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_to_thousandths() {
        assert_eq!(Offset::from_quarter_length(0.1).millis(), 100);
        assert_eq!(Offset::from_quarter_length(1.0 / 3.0).millis(), 333);
        assert_eq!(Offset::from_quarter_length(2.1).millis(), 2100);
        assert_eq!(Offset::from_quarter_length(0.0004), Offset::ZERO);
    }

    #[test]
    fn test_snap_down() {
        assert_eq!(Offset::from_millis(2100).snap_down(500), Offset::from_millis(2000));
        assert_eq!(Offset::from_millis(2000).snap_down(500), Offset::from_millis(2000));
        assert_eq!(Offset::from_millis(-250).snap_down(500), Offset::from_millis(-500));
        assert_eq!(Offset::from_millis(1234).snap_down(0), Offset::from_millis(1234));
    }

    #[test]
    fn test_arithmetic_and_display() {
        let a = Offset::from_quarter_length(1.5);
        let b = Offset::from_quarter_length(0.25);
        assert_eq!((a + b).quarter_length(), 1.75);
        assert_eq!((a - b).quarter_length(), 1.25);
        assert_eq!(a.to_string(), "1.5");
        assert_eq!(Offset::from_quarter_length(2.0).to_string(), "2");
    }

    #[test]
    fn test_serde_as_quarter_length() {
        let json = serde_json::to_string(&Offset::from_quarter_length(1.5)).unwrap();
        assert_eq!(json, "1.5");
        let back: Offset = serde_json::from_str("0.125").unwrap();
        assert_eq!(back.millis(), 125);
    }
}
