//! Data models for the relic catalog, parsed relics and character ratings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Main stat value at one rarity: `base_value + scaling_value * level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainStatScaling {
    pub rarity: u8,
    pub base_value: f64,
    pub scaling_value: f64,
}

impl MainStatScaling {
    pub fn value_at(&self, level: u32) -> f64 {
        self.base_value + self.scaling_value * f64::from(level)
    }
}

/// One possible roll increment for a substat at one rarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstatScaling {
    pub rarity: u8,
    pub scaling_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stat {
    pub name: String,
    #[serde(default)]
    pub alt_names: Vec<String>,
    pub display_percentage: bool,
    #[serde(default)]
    pub can_be_substat: bool,
    #[serde(default)]
    pub main_stat_scalings: Vec<MainStatScaling>,
    #[serde(default)]
    pub substat_scalings: Vec<SubstatScaling>,
}

impl Stat {
    pub fn main_stat_scaling(&self, rarity: u8) -> Option<&MainStatScaling> {
        self.main_stat_scalings.iter().find(|s| s.rarity == rarity)
    }

    /// Every roll increment this stat can get at `rarity`, in catalog order.
    pub fn substat_rolls(&self, rarity: u8) -> Vec<f64> {
        self.substat_scalings
            .iter()
            .filter(|s| s.rarity == rarity)
            .map(|s| s.scaling_value)
            .collect()
    }

    /// Canonical name followed by the alternate names.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.alt_names.iter().map(String::as_str))
    }
}

/// Equipment slot with the main stats a piece of this type can roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceType {
    pub name: String,
    pub stats: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub thumbnail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelicSet {
    pub name: String,
    pub pieces: Vec<Piece>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rarity {
    pub rarity: u8,
    pub max_level: u32,
    pub min_substat_amount: u32,
    pub max_substat_amount: u32,
}

/// Recommended main stat for one of the variable piece types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterMainStat {
    #[serde(rename = "type")]
    pub type_name: String,
    pub stat: String,
}

/// Substat wanted by a character. Priority 1 is the most wanted tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSubstat {
    pub stat: String,
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub thumbnail: String,
    pub rarity: u8,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub sets: Vec<String>,
    #[serde(default)]
    pub main_stats: Vec<CharacterMainStat>,
    #[serde(default)]
    pub substats: Vec<CharacterSubstat>,
}

/// A named stat value as read from a relic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatValue {
    pub name: String,
    pub value: f64,
    pub display_percentage: bool,
}

/// A substat line together with its roll decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Substat {
    pub name: String,
    pub value: f64,
    pub display_percentage: bool,
    /// Roll increments summing to `value`, the initial roll included.
    #[serde(default)]
    pub upgrades: Vec<f64>,
    /// Largest single roll this stat can get at the relic's rarity.
    #[serde(default)]
    pub max_value: f64,
}

impl Substat {
    pub fn new(name: impl Into<String>, value: f64, display_percentage: bool) -> Self {
        Self {
            name: name.into(),
            value,
            display_percentage,
            upgrades: Vec::new(),
            max_value: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelicStats {
    pub main_stat: StatValue,
    pub substats: Vec<Substat>,
}

/// A relic identified against the catalog, not yet leveled.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRelic {
    pub set: RelicSet,
    pub piece: Piece,
    pub piece_type: PieceType,
    pub stats: RelicStats,
}

/// A parsed relic whose level and rarity have been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct LeveledRelic {
    pub set: RelicSet,
    pub piece: Piece,
    pub piece_type: PieceType,
    pub stats: RelicStats,
    pub level: u32,
    pub rarity: Rarity,
}

/// Running value of one substat for one character, one entry per roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActualValue {
    pub stat: String,
    pub values: Vec<f64>,
}

impl ActualValue {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRelicValue {
    pub name: String,
    pub thumbnail: String,
    pub rarity: u8,
    pub release_date: NaiveDate,
    pub max_potential_value: f64,
    pub max_potential_value_at_max_level: f64,
    pub remaining_number_of_upgrades: u32,
    pub actual_values: Vec<ActualValue>,
    pub potential_stats: Vec<String>,
    pub potential_stats_value: f64,
}

impl CharacterRelicValue {
    /// Sum of every roll value across all substats.
    pub fn actual_total(&self) -> f64 {
        self.actual_values.iter().map(ActualValue::total).sum()
    }
}

/// Rated relic record, the shape returned to callers and re-imported by
/// the Stella batch dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedRelic {
    pub set_name: String,
    pub image: String,
    pub relic_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub level: u32,
    pub rarity: u8,
    pub main_stat: StatValue,
    pub substats: Vec<Substat>,
    pub characters: Vec<CharacterRelicValue>,
}
