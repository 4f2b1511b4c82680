//! Read-only reference catalog: stats, piece types, sets, rarities and
//! characters.
//!
//! The catalog is loaded once and passed by reference into every parsing,
//! leveling and scoring call. Order is preserved from the source because
//! the leveler tries rarities in catalog order and priority ties keep
//! catalog order.
//!
//! JSON format (all keys camelCase):
//! ```json
//! {
//!   "stats": [{ "name": "CRIT Rate", "displayPercentage": true, "canBeSubstat": true,
//!               "mainStatScalings": [{ "rarity": 5, "baseValue": 5.184, "scalingValue": 1.8144 }],
//!               "substatScalings": [{ "rarity": 5, "scalingValue": 2.592 }] }],
//!   "pieceTypes": [{ "name": "Body", "stats": ["CRIT Rate"] }],
//!   "sets": [{ "name": "Musketeer of Wild Wheat",
//!              "pieces": [{ "name": "Musketeer's Wind-Hunting Shawl", "type": "Body" }] }],
//!   "rarities": [{ "rarity": 5, "maxLevel": 15, "minSubstatAmount": 3, "maxSubstatAmount": 4 }],
//!   "characters": [{ "name": "Seele", "rarity": 5, "releaseDate": "2023-04-26",
//!                    "sets": ["Musketeer of Wild Wheat"],
//!                    "mainStats": [{ "type": "Body", "stat": "CRIT Rate" }],
//!                    "substats": [{ "stat": "CRIT Rate", "priority": 1 }] }]
//! }
//! ```

use crate::error::{Result, StellaError};
use crate::file_utils::read_text_file;
use crate::models::{Character, PieceType, Rarity, RelicSet, Stat};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceCatalog {
    #[serde(default)]
    pub stats: Vec<Stat>,
    #[serde(default)]
    pub piece_types: Vec<PieceType>,
    #[serde(default)]
    pub sets: Vec<RelicSet>,
    #[serde(default)]
    pub rarities: Vec<Rarity>,
    #[serde(default)]
    pub characters: Vec<Character>,
}

impl ReferenceCatalog {
    /// Load a catalog from a JSON file and validate its references.
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let content = read_text_file(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check that every piece points at a known piece type and every piece
    /// type only allows known stats.
    pub fn validate(&self) -> Result<()> {
        for piece_type in &self.piece_types {
            for stat_name in &piece_type.stats {
                if self.stat(stat_name).is_none() {
                    return Err(StellaError::Validation(format!(
                        "Piece type {} allows unknown stat {}",
                        piece_type.name, stat_name
                    )));
                }
            }
        }

        for set in &self.sets {
            for piece in &set.pieces {
                if self.piece_type(&piece.type_name).is_none() {
                    return Err(StellaError::Validation(format!(
                        "Piece {} of set {} has unknown type {}",
                        piece.name, set.name, piece.type_name
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn stat(&self, name: &str) -> Option<&Stat> {
        self.stats.iter().find(|s| s.name == name)
    }

    pub fn piece_type(&self, name: &str) -> Option<&PieceType> {
        self.piece_types.iter().find(|t| t.name == name)
    }

    pub fn set(&self, name: &str) -> Option<&RelicSet> {
        self.sets.iter().find(|s| s.name == name)
    }

    pub fn rarity(&self, stars: u8) -> Option<&Rarity> {
        self.rarities.iter().find(|r| r.rarity == stars)
    }

    /// Stats a piece of this type can have as main stat, in type order.
    pub fn main_stats_for(&self, piece_type: &PieceType) -> Vec<&Stat> {
        piece_type
            .stats
            .iter()
            .filter_map(|name| self.stat(name))
            .collect()
    }

    /// Every stat that can appear as a substat, in catalog order.
    pub fn substat_list(&self) -> Vec<&Stat> {
        self.stats.iter().filter(|s| s.can_be_substat).collect()
    }

    /// Copy of this catalog without the named characters.
    pub fn without_characters(&self, excluded: &[String]) -> Self {
        Self {
            characters: self
                .characters
                .iter()
                .filter(|c| !excluded.contains(&c.name))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}
