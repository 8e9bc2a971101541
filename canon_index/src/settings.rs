// Settings for the offset and n-gram indexers.
//
// Both indexers are configured by flat mappings of named options, usually
// read from JSON. The structs here are those mappings: every recognized key
// is a named field with its documented default, and unrecognized keys are
// ignored.
//
// The structs are permissive (`n` is signed, `align` is a plain string, the
// required keys are `Option`s): a bad value reaches the indexer constructor
// and fails there with a specific `IndexError`, not as a generic parse
// failure. The constructors turn them into typed, validated configurations.
//
// See also: `offset.rs` and `ngram.rs` for validation, `dynamic.rs` for the
// tuning parameters of dynamic offsets, `pipeline.rs` for how
// `PipelineConfig` drives a run.

use crate::dynamic::DynamicParams;
use crate::error::IndexError;
use canon_series::PartKey;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Offset indexer settings
// ---------------------------------------------------------------------------

/// Grid spacing for the offset indexer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Spacing {
    /// A uniform grid with this step, in quarter lengths.
    Fixed(f64),
    /// A variable grid derived from contrapuntal rhythm (see `dynamic.rs`).
    Dynamic,
}

impl<'de> Deserialize<'de> for Spacing {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Step(f64),
            Keyword(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Step(step) => Ok(Spacing::Fixed(step)),
            Repr::Keyword(k) if k.eq_ignore_ascii_case("dynamic") => Ok(Spacing::Dynamic),
            Repr::Keyword(k) => Err(D::Error::custom(format!(
                "expected a quarter length or \"dynamic\", got {k:?}"
            ))),
        }
    }
}

/// How grid points between original events are filled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillMethod {
    /// Carry the most recent observation forward (vertical data).
    #[default]
    ForwardFill,
    /// Keep only exact hits; repetition means nothing for melodic data.
    NoFill,
}

impl<'de> Deserialize<'de> for FillMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let method: Option<String> = Option::deserialize(deserializer)?;
        match method.as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("none") => Ok(FillMethod::NoFill),
            Some("ffill") | Some("pad") => Ok(FillMethod::ForwardFill),
            Some(other) => Err(D::Error::custom(format!(
                "unknown fill method {other:?}; use \"ffill\" or null"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OffsetSettings {
    /// Required. A step of at least 0.001, or "dynamic".
    #[serde(rename = "quarterLength", default)]
    pub quarter_length: Option<Spacing>,
    /// "ffill" (default) or null for no fill.
    #[serde(default)]
    pub method: FillMethod,
}

impl OffsetSettings {
    pub fn fixed(quarter_length: f64) -> Self {
        OffsetSettings {
            quarter_length: Some(Spacing::Fixed(quarter_length)),
            method: FillMethod::ForwardFill,
        }
    }

    pub fn dynamic() -> Self {
        OffsetSettings {
            quarter_length: Some(Spacing::Dynamic),
            method: FillMethod::ForwardFill,
        }
    }

    pub fn with_method(mut self, method: FillMethod) -> Self {
        self.method = method;
        self
    }
}

// ---------------------------------------------------------------------------
// N-gram indexer settings
// ---------------------------------------------------------------------------

/// Which columns feed an n-gram, per output column.
///
/// `All` is only meaningful for "vertical" and `Lowest`/`Highest` only for
/// "horizontal"; `NGramIndexer::new` rejects the other combinations.
#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    /// One group per column of the vertical table, in table order.
    All,
    /// Per vertical group, the lowest voice of its first key.
    Lowest,
    /// Per vertical group, the highest voice of its first key.
    Highest,
    /// Explicit groups; each group's columns are joined into one slot.
    Groups(Vec<Vec<PartKey>>),
}

impl Selection {
    pub fn groups<I, G>(groups: I) -> Self
    where
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = PartKey>,
    {
        Selection::Groups(
            groups
                .into_iter()
                .map(|g| g.into_iter().collect())
                .collect(),
        )
    }

    /// One single-column group per key.
    pub fn each<I: IntoIterator<Item = PartKey>>(keys: I) -> Self {
        Selection::Groups(keys.into_iter().map(|k| vec![k]).collect())
    }

    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Selection::All => Some("all"),
            Selection::Lowest => Some("lowest"),
            Selection::Highest => Some("highest"),
            Selection::Groups(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Group {
            One(PartKey),
            Many(Vec<PartKey>),
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Keyword(String),
            Groups(Vec<Group>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Keyword(k) => match k.to_ascii_lowercase().as_str() {
                "all" | "all pairs" => Ok(Selection::All),
                "lowest" => Ok(Selection::Lowest),
                "highest" => Ok(Selection::Highest),
                _ => Err(D::Error::custom(format!(
                    "unknown selection {k:?}; use \"all\", \"lowest\", \"highest\" or a list of groups"
                ))),
            },
            Repr::Groups(groups) => Ok(Selection::Groups(
                groups
                    .into_iter()
                    .map(|g| match g {
                        Group::One(key) => vec![key],
                        Group::Many(keys) => keys,
                    })
                    .collect(),
            )),
        }
    }
}

/// Where a window's reported offset comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Align {
    /// The offset of the window's first vertical slot.
    #[default]
    Left,
    /// The offset of the window's last vertical slot.
    Right,
}

impl FromStr for Align {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Align::Left),
            "right" | "r" => Ok(Align::Right),
            _ => Err(IndexError::WrongAlign(s.to_string())),
        }
    }
}

fn default_brackets() -> bool {
    true
}

fn default_continuer() -> String {
    "_".to_string()
}

fn default_align() -> String {
    "left".to_string()
}

/// Accept either one string or a list of strings.
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        One(String),
        Many(Vec<String>),
    }
    Ok(match Option::<Repr>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Repr::One(s)) => vec![s],
        Some(Repr::Many(v)) => v,
    })
}

#[derive(Clone, Debug, Deserialize)]
pub struct NGramSettings {
    /// Required. Number of vertical slots per window.
    #[serde(default)]
    pub n: Option<i64>,
    /// Required. "all" or explicit groups.
    #[serde(default)]
    pub vertical: Option<Selection>,
    /// "lowest", "highest", or explicit groups parallel to `vertical`.
    #[serde(default)]
    pub horizontal: Option<Selection>,
    /// Append one more horizontal observation after the last vertical slot.
    #[serde(rename = "open-ended", default)]
    pub open_ended: bool,
    /// Wrap vertical slots in [] and horizontal slots in ().
    #[serde(default = "default_brackets")]
    pub brackets: bool,
    /// Windows touching any of these values are dropped.
    #[serde(default, deserialize_with = "one_or_many")]
    pub terminator: Vec<String>,
    /// Stand-in for a horizontal slot with no observation.
    #[serde(default = "default_continuer")]
    pub continuer: String,
    /// "left" (default) or "right".
    #[serde(default = "default_align")]
    pub align: String,
}

impl Default for NGramSettings {
    fn default() -> Self {
        NGramSettings {
            n: None,
            vertical: None,
            horizontal: None,
            open_ended: false,
            brackets: default_brackets(),
            terminator: Vec::new(),
            continuer: default_continuer(),
            align: default_align(),
        }
    }
}

impl NGramSettings {
    /// Settings with the two required keys filled in and defaults elsewhere.
    pub fn new(n: i64, vertical: Selection) -> Self {
        NGramSettings {
            n: Some(n),
            vertical: Some(vertical),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Everything the `canon-index` binary needs for one run, loaded from JSON.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PipelineConfig {
    /// Regularization of the vertical table. Skipped when absent.
    #[serde(default)]
    pub offset: Option<OffsetSettings>,
    /// Regularization of the horizontal table. Defaults to `offset` with no
    /// fill, since repeating a melodic interval would invent motion.
    #[serde(default)]
    pub horizontal_offset: Option<OffsetSettings>,
    #[serde(default)]
    pub ngram: NGramSettings,
    /// Tuning for dynamic offsets.
    #[serde(default)]
    pub dynamic: DynamicParams,
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Settings for the horizontal table, falling back to the vertical
    /// settings without fill.
    pub fn horizontal_offset_settings(&self) -> Option<OffsetSettings> {
        self.horizontal_offset.clone().or_else(|| {
            self.offset
                .clone()
                .map(|s| s.with_method(FillMethod::NoFill))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_settings_from_json() {
        let s: OffsetSettings = serde_json::from_str(r#"{"quarterLength": 0.5}"#).unwrap();
        assert_eq!(s.quarter_length, Some(Spacing::Fixed(0.5)));
        assert_eq!(s.method, FillMethod::ForwardFill);

        let s: OffsetSettings =
            serde_json::from_str(r#"{"quarterLength": "Dynamic", "method": null, "mp": true}"#)
                .unwrap();
        assert_eq!(s.quarter_length, Some(Spacing::Dynamic));
        assert_eq!(s.method, FillMethod::NoFill);

        let s: OffsetSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s.quarter_length, None);

        assert!(serde_json::from_str::<OffsetSettings>(r#"{"quarterLength": "fast"}"#).is_err());
    }

    #[test]
    fn test_ngram_settings_defaults() {
        let s = NGramSettings::from_json(r#"{"n": 3, "vertical": "all"}"#).unwrap();
        assert_eq!(s.n, Some(3));
        assert_eq!(s.vertical, Some(Selection::All));
        assert_eq!(s.horizontal, None);
        assert!(!s.open_ended);
        assert!(s.brackets);
        assert!(s.terminator.is_empty());
        assert_eq!(s.continuer, "_");
        assert_eq!(s.align, "left");
    }

    #[test]
    fn test_ngram_settings_groups_and_keywords() {
        let s = NGramSettings::from_json(
            r#"{"n": 2, "vertical": [["0,1", "0,2"], "1,2"], "horizontal": "Lowest",
                "open-ended": true, "terminator": "Rest", "continuer": "P1",
                "brackets": false, "align": "R", "banana": 7}"#,
        )
        .unwrap();
        assert_eq!(
            s.vertical,
            Some(Selection::groups(vec![
                vec![PartKey::Pair(0, 1), PartKey::Pair(0, 2)],
                vec![PartKey::Pair(1, 2)],
            ]))
        );
        assert_eq!(s.horizontal, Some(Selection::Lowest));
        assert!(s.open_ended);
        assert_eq!(s.terminator, vec!["Rest".to_string()]);
        assert_eq!(s.continuer, "P1");
        assert!(!s.brackets);
        assert_eq!(s.align.parse::<Align>().unwrap(), Align::Right);
    }

    #[test]
    fn test_unknown_keyword_is_rejected() {
        assert!(NGramSettings::from_json(r#"{"n": 2, "vertical": "banana"}"#).is_err());
    }

    #[test]
    fn test_align_spellings() {
        assert_eq!("LEFT".parse::<Align>().unwrap(), Align::Left);
        assert_eq!(" l ".parse::<Align>().unwrap(), Align::Left);
        assert_eq!("right".parse::<Align>().unwrap(), Align::Right);
        assert!(matches!(
            "centre".parse::<Align>(),
            Err(IndexError::WrongAlign(s)) if s == "centre"
        ));
    }

    #[test]
    fn test_pipeline_config_horizontal_fallback() {
        let config = PipelineConfig::from_json(
            r#"{"offset": {"quarterLength": 1.0}, "ngram": {"n": 2, "vertical": "all"}}"#,
        )
        .unwrap();
        let horiz = config.horizontal_offset_settings().unwrap();
        assert_eq!(horiz.quarter_length, Some(Spacing::Fixed(1.0)));
        assert_eq!(horiz.method, FillMethod::NoFill);
        assert_eq!(config.dynamic.window, 6);
    }
}
