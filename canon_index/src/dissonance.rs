// Dissonance types and the note-value levels they imply.
//
// The dynamic offset grid (dynamic.rs) needs two things from the output of a
// dissonance classifier: which dissonant events to fold away before measuring
// attack density, and what metric level each dissonance implies. A passing
// tone on a weak eighth-note position says the texture is moving in eighths;
// a suspension on a strong beat says something about the half-note level.
//
// Dissonance labels arrive as single-letter codes. Anything that is not one
// of the codes below (consonances, "-", unclassified dissonances) is ignored.
//
// `DissonanceLevels` is the lookup from (meter basis, class, beat strength) to
// an implied level in quarter lengths. It is an ordinary value carried in
// `DynamicParams`, so the empirically tuned tables can be swapped per corpus.

use serde::{Deserialize, Serialize};

/// Tolerance when matching beat strengths against table keys.
const BEAT_STRENGTH_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DissonanceType {
    /// "R": passing tone, rising.
    RisingPassing,
    /// "D": passing tone, descending.
    DescendingPassing,
    /// "L": lower neighbor.
    LowerNeighbor,
    /// "U": upper neighbor.
    UpperNeighbor,
    /// "E": échappée.
    Echappee,
    /// "C": nota cambiata.
    Cambiata,
    /// "A": anticipation.
    Anticipation,
    /// "Q": dissonant third quarter.
    ThirdQuarter,
    /// "H": chanson idiom.
    ChansonIdiom,
    /// "S": suspension.
    Suspension,
}

/// How a dissonance is treated when measuring contrapuntal rhythm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DissonanceClass {
    /// Ornamental; its duration belongs to the preceding consonance.
    Weak,
    /// Its duration belongs to the following event.
    Strong,
    /// Left in place; only contributes evidence of the metric level.
    Suspension,
}

impl DissonanceType {
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code.trim() {
            "R" => DissonanceType::RisingPassing,
            "D" => DissonanceType::DescendingPassing,
            "L" => DissonanceType::LowerNeighbor,
            "U" => DissonanceType::UpperNeighbor,
            "E" => DissonanceType::Echappee,
            "C" => DissonanceType::Cambiata,
            "A" => DissonanceType::Anticipation,
            "Q" => DissonanceType::ThirdQuarter,
            "H" => DissonanceType::ChansonIdiom,
            "S" => DissonanceType::Suspension,
            _ => return None,
        })
    }

    pub fn code(self) -> &'static str {
        match self {
            DissonanceType::RisingPassing => "R",
            DissonanceType::DescendingPassing => "D",
            DissonanceType::LowerNeighbor => "L",
            DissonanceType::UpperNeighbor => "U",
            DissonanceType::Echappee => "E",
            DissonanceType::Cambiata => "C",
            DissonanceType::Anticipation => "A",
            DissonanceType::ThirdQuarter => "Q",
            DissonanceType::ChansonIdiom => "H",
            DissonanceType::Suspension => "S",
        }
    }

    pub fn class(self) -> DissonanceClass {
        match self {
            DissonanceType::ThirdQuarter | DissonanceType::ChansonIdiom => DissonanceClass::Strong,
            DissonanceType::Suspension => DissonanceClass::Suspension,
            _ => DissonanceClass::Weak,
        }
    }
}

/// Which family of level tables a time signature reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeterBasis {
    /// Half-note or whole-note beats: 2/1, 2/2, 4/2.
    Breve,
    /// Quarter-note beats: 4/4.
    Quarter,
}

impl MeterBasis {
    pub fn for_time_signature(time_signature: &str) -> Option<Self> {
        let (_, denominator) = time_signature.trim().split_once('/')?;
        match denominator.trim() {
            "1" | "2" => Some(MeterBasis::Breve),
            "4" => Some(MeterBasis::Quarter),
            _ => None,
        }
    }
}

/// Beat strength -> implied level (quarter lengths), per meter basis and
/// dissonance class. Each table is a list of `[beat_strength, level]` pairs.
///
/// Beats 1 and 3 share a strength bucket, so they currently imply the same
/// level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DissonanceLevels {
    pub breve_weak: Vec<(f64, f64)>,
    pub breve_strong: Vec<(f64, f64)>,
    pub quarter_weak: Vec<(f64, f64)>,
    pub quarter_strong: Vec<(f64, f64)>,
}

impl Default for DissonanceLevels {
    fn default() -> Self {
        DissonanceLevels {
            breve_weak: vec![(0.0625, 1.0), (0.125, 2.0), (0.25, 4.0), (0.5, 8.0), (1.0, 8.0)],
            breve_strong: vec![(0.0625, 0.25), (0.125, 0.5), (0.25, 1.0), (0.5, 2.0), (1.0, 2.0)],
            quarter_weak: vec![(0.0625, 0.5), (0.125, 1.0), (0.25, 2.0), (0.5, 4.0), (1.0, 4.0)],
            quarter_strong: vec![
                (0.0625, 0.125),
                (0.125, 0.25),
                (0.25, 0.5),
                (0.5, 1.0),
                (1.0, 1.0),
            ],
        }
    }
}

impl DissonanceLevels {
    fn table(&self, basis: MeterBasis, class: DissonanceClass) -> &[(f64, f64)] {
        match (basis, class) {
            (MeterBasis::Breve, DissonanceClass::Weak) => &self.breve_weak,
            (MeterBasis::Breve, _) => &self.breve_strong,
            (MeterBasis::Quarter, DissonanceClass::Weak) => &self.quarter_weak,
            (MeterBasis::Quarter, _) => &self.quarter_strong,
        }
    }

    /// The level a dissonance at `beat_strength` implies, or `None` if the
    /// strength has no entry.
    pub fn implied_level(
        &self,
        basis: MeterBasis,
        dissonance: DissonanceType,
        beat_strength: f64,
    ) -> Option<f64> {
        self.table(basis, dissonance.class())
            .iter()
            .find(|(strength, _)| (strength - beat_strength).abs() < BEAT_STRENGTH_EPSILON)
            .map(|&(_, level)| level)
    }
}
