//! Per-character relic ratings.
//!
//! A character's substat priorities are turned into points: the least wanted
//! tier is worth 1 and every tier above it one more, so with tiers 1..=3 the
//! first tier is worth 3. A roll is worth its fraction of the best possible
//! roll for that stat times the stat's points.

use crate::leveler::LEVELS_PER_UPGRADE;
use crate::models::{ActualValue, Character, CharacterRelicValue, LeveledRelic, RatedRelic};

/// Points a character gives to one substat.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstatPoints {
    pub stat: String,
    pub points: u32,
}

/// Priority points of every substat the character wants, highest first.
/// Stats sharing a tier keep their catalog order.
pub fn substat_points(character: &Character) -> Vec<SubstatPoints> {
    let Some(lowest_priority) = character.substats.iter().map(|s| s.priority).max() else {
        return Vec::new();
    };

    let mut points: Vec<SubstatPoints> = character
        .substats
        .iter()
        .map(|s| SubstatPoints {
            stat: s.stat.clone(),
            points: lowest_priority.saturating_sub(s.priority) + 1,
        })
        .collect();
    points.sort_by(|a, b| b.points.cmp(&a.points));
    points
}

/// Whether the character would wear this relic at all.
///
/// The set must be one of the character's best sets. Piece types with a
/// single possible main stat (Head, Hands) skip the main stat check; the
/// others need the relic's main stat among the character's picks for that
/// type.
pub fn is_eligible(relic: &LeveledRelic, character: &Character) -> bool {
    if !character.sets.iter().any(|set| *set == relic.set.name) {
        return false;
    }

    if relic.piece_type.stats.len() > 1 {
        return character
            .main_stats
            .iter()
            .any(|m| m.type_name == relic.piece_type.name && m.stat == relic.stats.main_stat.name);
    }

    true
}

/// Rate the relic for one character. Returns `None` when the character is
/// not eligible or the relic has nothing for them.
pub fn rate_for_character(relic: &LeveledRelic, character: &Character) -> Option<CharacterRelicValue> {
    if !is_eligible(relic, character) {
        return None;
    }

    let substat_values = substat_points(character);
    if substat_values.is_empty() {
        return None;
    }

    let rarity = &relic.rarity;
    let stats = &relic.stats;
    let number_of_upgrades = relic.level / LEVELS_PER_UPGRADE;
    let number_of_upgrades_at_max_level = rarity.max_level / LEVELS_PER_UPGRADE;
    let max_substat_value = substat_values.iter().map(|s| s.points).max().unwrap_or(0);

    // an unleveled relic at best rolls the character's top substats
    let base_potential_value: u32 = substat_values
        .iter()
        .take(rarity.max_substat_amount as usize)
        .map(|s| s.points)
        .sum();
    let max_potential_value = max_substat_value * number_of_upgrades + base_potential_value;
    let max_potential_value_at_max_level =
        max_substat_value * number_of_upgrades_at_max_level + base_potential_value;

    let mut actual_values = Vec::new();
    for substat_value in &substat_values {
        let Some(found) = stats.substats.iter().find(|s| s.name == substat_value.stat) else {
            continue;
        };
        if found.upgrades.is_empty() || found.max_value <= 0.0 {
            continue;
        }

        let points = f64::from(substat_value.points);
        actual_values.push(ActualValue {
            stat: substat_value.stat.clone(),
            values: found
                .upgrades
                .iter()
                .map(|roll| points * (roll / found.max_value))
                .collect(),
        });
    }

    // Below the substat cap the next roll may add any stat the relic does not
    // have yet. At the cap only existing substats can grow.
    let eligible: Vec<&SubstatPoints> = if stats.substats.len() < rarity.max_substat_amount as usize {
        substat_values
            .iter()
            .filter(|s| {
                s.stat != stats.main_stat.name && !stats.substats.iter().any(|sub| sub.name == s.stat)
            })
            .collect()
    } else {
        stats
            .substats
            .iter()
            .filter_map(|sub| substat_values.iter().find(|s| s.stat == sub.name))
            .collect()
    };

    let mut highest_value = 0;
    let mut potential_stats = Vec::new();
    for candidate in eligible {
        if candidate.points == 0 {
            continue;
        }
        if candidate.points > highest_value {
            highest_value = candidate.points;
            potential_stats = vec![candidate.stat.clone()];
        } else if candidate.points == highest_value {
            potential_stats.push(candidate.stat.clone());
        }
    }

    if actual_values.is_empty() && highest_value == 0 {
        return None;
    }

    Some(CharacterRelicValue {
        name: character.name.clone(),
        thumbnail: character.thumbnail.clone(),
        rarity: if character.rarity == 4 { 4 } else { 5 },
        release_date: character.release_date,
        max_potential_value: f64::from(max_potential_value),
        max_potential_value_at_max_level: f64::from(max_potential_value_at_max_level),
        remaining_number_of_upgrades: rarity.max_level.saturating_sub(relic.level).div_ceil(LEVELS_PER_UPGRADE),
        actual_values,
        potential_stats,
        potential_stats_value: f64::from(highest_value),
    })
}

/// Rate a leveled relic for every character that can use it.
pub fn rate_relic(relic: &LeveledRelic, characters: &[Character]) -> RatedRelic {
    let characters = characters
        .iter()
        .filter_map(|character| rate_for_character(relic, character))
        .collect();

    RatedRelic {
        set_name: relic.set.name.clone(),
        image: relic.piece.thumbnail.clone(),
        relic_name: relic.piece.name.clone(),
        type_name: relic.piece_type.name.clone(),
        level: relic.level,
        rarity: relic.rarity.rarity,
        main_stat: relic.stats.main_stat.clone(),
        substats: relic.stats.substats.clone(),
        characters,
    }
}
