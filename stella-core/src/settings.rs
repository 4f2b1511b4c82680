//! Rating display settings and the usable-character filter.
//!
//! Settings are read from TOML:
//! ```toml
//! excluded_characters = ["Natasha"]
//! relic_ratings = "potential"
//! min_rating_percentage = 60
//! ratings_format = "percentage"
//! include_unreleased_characters = false
//! ```

use crate::error::{Result, StellaError};
use crate::file_utils::read_text_file;
use crate::models::{CharacterRelicValue, RatedRelic};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::Path;

/// Which value a character's rating is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelicRatings {
    /// Rolls the relic already has.
    #[default]
    Actual,
    /// Rolls the relic has plus its best possible next roll.
    Potential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingsFormat {
    #[default]
    Fraction,
    Percentage,
}

fn default_min_rating_percentage() -> f64 {
    50.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub excluded_characters: Vec<String>,
    pub relic_ratings: RelicRatings,
    #[serde(default = "default_min_rating_percentage")]
    pub min_rating_percentage: f64,
    pub ratings_format: RatingsFormat,
    pub include_unreleased_characters: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            excluded_characters: Vec::new(),
            relic_ratings: RelicRatings::default(),
            min_rating_percentage: default_min_rating_percentage(),
            ratings_format: RatingsFormat::default(),
            include_unreleased_characters: false,
        }
    }
}

/// A character the relic is good enough for under the current settings.
#[derive(Debug, Clone, PartialEq)]
pub struct UsableCharacter {
    pub name: String,
    pub thumbnail: String,
    pub rating: f64,
    pub max_potential_value: f64,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = read_text_file(path)?;
        Self::from_str(&content)
    }

    /// Parse settings from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| StellaError::Config(format!("Failed to parse settings TOML: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1.0..=100.0).contains(&self.min_rating_percentage) {
            return Err(StellaError::Config(format!(
                "min_rating_percentage must be between 1 and 100, got {}",
                self.min_rating_percentage
            )));
        }
        Ok(())
    }

    /// The rating a character gets from a relic under these settings.
    pub fn rating(&self, value: &CharacterRelicValue) -> f64 {
        let actual = value.actual_total();
        match self.relic_ratings {
            RelicRatings::Potential if !value.potential_stats.is_empty() => {
                actual + value.potential_stats_value
            }
            _ => actual,
        }
    }

    /// Render a rating as `7.2/25` or `29%`.
    pub fn format_rating(&self, rating: f64, max_potential_value: f64) -> String {
        match self.ratings_format {
            RatingsFormat::Fraction => format!("{:.1}/{}", rating, max_potential_value),
            RatingsFormat::Percentage => {
                let percentage = if max_potential_value > 0.0 {
                    rating / max_potential_value * 100.0
                } else {
                    0.0
                };
                format!("{:.0}%", percentage)
            }
        }
    }
}

/// Characters whose rating reaches the minimum percentage, in the order
/// the relic lists them. Unreleased characters are dropped unless the settings
/// include them.
pub fn usable_characters(relic: &RatedRelic, settings: &Settings, today: NaiveDate) -> Vec<UsableCharacter> {
    relic
        .characters
        .iter()
        .filter(|c| !settings.excluded_characters.contains(&c.name))
        .filter(|c| settings.include_unreleased_characters || c.release_date < today)
        .filter_map(|c| {
            let rating = settings.rating(c);
            if c.max_potential_value <= 0.0 {
                return None;
            }
            let percentage = rating / c.max_potential_value * 100.0;
            (percentage >= settings.min_rating_percentage).then(|| UsableCharacter {
                name: c.name.clone(),
                thumbnail: c.thumbnail.clone(),
                rating,
                max_potential_value: c.max_potential_value,
            })
        })
        .collect()
}
