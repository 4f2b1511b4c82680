//! Level and rarity inference from main stat scaling and substat rolls.
//!
//! Every third level a relic gains one substat roll. Given the main stat
//! value, each rarity in the catalog yields the levels whose scaling formula
//! displays as that value. For each candidate the substats are decomposed
//! into rolls, and the candidate is accepted when the number of upgrade
//! rolls matches `level / 3`, or is one short for a relic that dropped with
//! one substat fewer. A candidate where some substat has no decomposition
//! at all is rejected.

use crate::catalog::ReferenceCatalog;
use crate::error::{Result, StellaError};
use crate::models::{LeveledRelic, ParsedRelic, Rarity, Stat, Substat};
use crate::rolls::{display_units, solve_rolls};
use tracing::debug;

/// Levels between two substat rolls.
pub const LEVELS_PER_UPGRADE: u32 = 3;

/// A rarity/level pair consistent with the observed main stat.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelCandidate {
    pub rarity: Rarity,
    pub level: u32,
}

/// Fill in the roll decomposition and the best possible roll of `substat`
/// at `rarity`. A value with no decomposition gets an empty roll list.
pub fn substat_upgrades(substat: &mut Substat, substat_list: &[&Stat], rarity: u8) -> Result<()> {
    let stat = substat_list
        .iter()
        .find(|s| s.name == substat.name)
        .ok_or_else(|| StellaError::MissingScaling(substat.name.clone()))?;

    let rolls = stat.substat_rolls(rarity);
    substat.max_value = rolls.iter().copied().fold(0.0, f64::max);
    substat.upgrades =
        solve_rolls(&rolls, substat.value, substat.display_percentage).unwrap_or_default();

    Ok(())
}

/// Whether every substat with a value has a roll decomposition.
pub fn all_substats_decomposed(substats: &[Substat]) -> bool {
    substats.iter().all(|s| s.value == 0.0 || !s.upgrades.is_empty())
}

/// Upgrade rolls across all substats, not counting each substat's initial roll.
pub fn upgrade_count(substats: &[Substat]) -> i64 {
    substats.iter().map(|s| s.upgrades.len() as i64 - 1).sum()
}

/// Every rarity/level pair whose main stat scaling displays as the observed
/// main stat value, rarities in catalog order.
pub fn possible_levels(relic: &ParsedRelic, catalog: &ReferenceCatalog) -> Vec<LevelCandidate> {
    let main_stat = &relic.stats.main_stat;
    let Some(stat) = relic
        .piece_type
        .stats
        .iter()
        .find(|name| **name == main_stat.name)
        .and_then(|name| catalog.stat(name))
    else {
        return Vec::new();
    };

    let observed = display_units(main_stat.value, main_stat.display_percentage);
    let mut candidates = Vec::new();

    for rarity in &catalog.rarities {
        let Some(scaling) = stat.main_stat_scaling(rarity.rarity) else {
            continue;
        };

        for level in 0..=rarity.max_level {
            let computed = display_units(scaling.value_at(level), main_stat.display_percentage);
            if computed == observed {
                candidates.push(LevelCandidate {
                    rarity: rarity.clone(),
                    level,
                });
            }
            // scaling only grows with level
            if computed >= observed {
                break;
            }
        }
    }

    candidates
}

/// Resolve level and rarity of a parsed relic and decompose its substats.
///
/// The first candidate in catalog order whose roll count is consistent wins.
pub fn level_relic(relic: ParsedRelic, catalog: &ReferenceCatalog) -> Result<LeveledRelic> {
    let candidates = possible_levels(&relic, catalog);
    debug!(
        "Possible levels for {}: {:?}",
        relic.piece.name,
        candidates.iter().map(|c| (c.rarity.rarity, c.level)).collect::<Vec<_>>()
    );
    if candidates.is_empty() {
        return Err(StellaError::LevelIndeterminate);
    }

    let substat_list = catalog.substat_list();

    for candidate in candidates {
        let expected = i64::from(candidate.level / LEVELS_PER_UPGRADE);

        let mut substats = relic.stats.substats.clone();
        for substat in &mut substats {
            substat_upgrades(substat, &substat_list, candidate.rarity.rarity)?;
        }

        if !all_substats_decomposed(&substats) {
            debug!(
                "Rarity {} level {}: a substat has no roll decomposition",
                candidate.rarity.rarity, candidate.level
            );
            continue;
        }

        let calculated = upgrade_count(&substats);
        let diff = expected - calculated;
        debug!(
            "Rarity {} level {}: expected {} upgrades, calculated {}",
            candidate.rarity.rarity, candidate.level, expected, calculated
        );

        // 0 or 1 because the relic may have dropped with one substat fewer
        if calculated >= 0 && (diff == 0 || diff == 1) {
            debug!("Found rarity {} at level {}", candidate.rarity.rarity, candidate.level);
            let mut stats = relic.stats;
            stats.substats = substats;
            return Ok(LeveledRelic {
                set: relic.set,
                piece: relic.piece,
                piece_type: relic.piece_type,
                stats,
                level: candidate.level,
                rarity: candidate.rarity,
            });
        }
    }

    Err(StellaError::RarityIndeterminate)
}
