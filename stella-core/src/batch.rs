//! Batch import of structured relic exports.
//!
//! Two dialects are understood: the HSR-Scanner export and Stella's own
//! rated relic format. Items are rated independently; an item that cannot
//! be matched against the catalog is logged and dropped so one bad entry
//! never fails the whole import.

use crate::catalog::ReferenceCatalog;
use crate::error::{Result, StellaError};
use crate::leveler::substat_upgrades;
use crate::models::{LeveledRelic, RatedRelic, RelicStats, StatValue, Substat};
use crate::parsers::flat_stats_with_percentage_variants;
use crate::scoring::rate_relic;
use rayon::prelude::*;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub const BATCH_FORMAT_ERROR: &str =
    "An error occured while parsing the data. The JSON format may be incorrect.";

/// Which export format a batch file is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchImportKind {
    Stella,
    HsrScanner,
}

impl FromStr for BatchImportKind {
    type Err = StellaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stella" => Ok(Self::Stella),
            "hsr-scanner" => Ok(Self::HsrScanner),
            other => Err(StellaError::Validation(format!("Unknown batch import kind: {}", other))),
        }
    }
}

impl fmt::Display for BatchImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stella => write!(f, "stella"),
            Self::HsrScanner => write!(f, "hsr-scanner"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HsrScannerSubstat {
    pub key: String,
    pub value: f64,
}

/// One relic as exported by HSR-Scanner.
#[derive(Debug, Clone, Deserialize)]
pub struct HsrScannerRelic {
    pub set: String,
    pub slot: String,
    pub rarity: u8,
    pub level: u32,
    pub mainstat: String,
    #[serde(default)]
    pub substats: Vec<HsrScannerSubstat>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub lock: bool,
    #[serde(default)]
    pub discard: bool,
    #[serde(rename = "_uid", alias = "id", default)]
    pub uid: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HsrScannerDocument {
    Wrapped { relics: Vec<HsrScannerRelic> },
    Bare(Vec<HsrScannerRelic>),
}

/// One relic in Stella's export format. Incoming character ratings are
/// ignored and recomputed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StellaRelic {
    pub set_name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub relic_name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub level: u32,
    pub rarity: u8,
    pub main_stat: StatValue,
    #[serde(default)]
    pub substats: Vec<Substat>,
    #[serde(default)]
    pub characters: Vec<serde_json::Value>,
}

/// Decode the document, unwrapping it first when the export was stored as
/// a JSON string.
fn decode<T: for<'de> Deserialize<'de>>(json: &serde_json::Value) -> Result<T> {
    let decoded = match json {
        serde_json::Value::String(inner) => serde_json::from_str(inner),
        other => T::deserialize(other),
    };
    decoded.map_err(|e| {
        debug!("Batch document rejected: {}", e);
        StellaError::Validation(BATCH_FORMAT_ERROR.to_string())
    })
}

/// Main stats on variable slots are always percentages; the scanner only
/// writes the bare name.
pub fn normalize_main_stat(mainstat: &str, slot: &str, flat_stats: &[String]) -> String {
    let fixed_slot = slot.contains("Head") || slot.contains("Hands");
    if flat_stats.iter().any(|s| s == mainstat) && !fixed_slot {
        format!("{}%", mainstat)
    } else {
        mainstat.to_string()
    }
}

/// A trailing `_` marks a percentage substat. It distinguishes `ATK_` from
/// `ATK` and is noise on stats like `CRIT Rate_`.
pub fn normalize_substat_key(key: &str, flat_stats: &[String]) -> String {
    match key.strip_suffix('_') {
        Some(base) if flat_stats.iter().any(|s| s == base) => key.replacen('_', "%", 1),
        Some(_) => key.replacen('_', "", 1),
        None => key.to_string(),
    }
}

fn rate_hsr_scanner_relic(
    relic: &HsrScannerRelic,
    catalog: &ReferenceCatalog,
    flat_stats: &[String],
) -> Result<RatedRelic> {
    let mainstat = normalize_main_stat(&relic.mainstat, &relic.slot, flat_stats);

    let set = catalog
        .set(&relic.set)
        .ok_or_else(|| StellaError::NotFound(format!("set {}", relic.set)))?;
    let piece = set
        .pieces
        .iter()
        .find(|p| p.type_name == relic.slot)
        .ok_or_else(|| StellaError::NotFound(format!("{} piece of {}", relic.slot, set.name)))?;
    let piece_type = catalog
        .piece_type(&piece.type_name)
        .ok_or_else(|| StellaError::NotFound(format!("piece type {}", piece.type_name)))?;
    let main_stat = catalog
        .main_stats_for(piece_type)
        .into_iter()
        .find(|s| s.name == mainstat)
        .ok_or_else(|| StellaError::NotFound(format!("main stat {} on {}", mainstat, piece_type.name)))?;
    let scaling = main_stat
        .main_stat_scaling(relic.rarity)
        .ok_or_else(|| StellaError::MissingScaling(main_stat.name.clone()))?;
    let rarity = catalog
        .rarity(relic.rarity)
        .ok_or_else(|| StellaError::NotFound(format!("rarity {}", relic.rarity)))?;

    let substat_list = catalog.substat_list();
    let mut substats = Vec::with_capacity(relic.substats.len());
    for substat in &relic.substats {
        let name = normalize_substat_key(&substat.key, flat_stats);
        let display_percentage = catalog.stat(&name).is_some_and(|s| s.display_percentage);
        let mut substat = Substat::new(name, substat.value, display_percentage);
        substat_upgrades(&mut substat, &substat_list, relic.rarity)?;
        substats.push(substat);
    }

    let leveled = LeveledRelic {
        set: set.clone(),
        piece: piece.clone(),
        piece_type: piece_type.clone(),
        stats: RelicStats {
            main_stat: StatValue {
                name: main_stat.name.clone(),
                value: scaling.value_at(relic.level),
                display_percentage: main_stat.display_percentage,
            },
            substats,
        },
        level: relic.level,
        rarity: rarity.clone(),
    };

    Ok(rate_relic(&leveled, &catalog.characters))
}

fn rate_stella_relic(relic: &StellaRelic, catalog: &ReferenceCatalog) -> Result<RatedRelic> {
    let set = catalog
        .set(&relic.set_name)
        .ok_or_else(|| StellaError::NotFound(format!("set {}", relic.set_name)))?;
    let piece = set
        .pieces
        .iter()
        .find(|p| p.type_name == relic.type_name)
        .ok_or_else(|| StellaError::NotFound(format!("{} piece of {}", relic.type_name, set.name)))?;
    let piece_type = catalog
        .piece_type(&piece.type_name)
        .ok_or_else(|| StellaError::NotFound(format!("piece type {}", piece.type_name)))?;
    let main_stat = catalog
        .main_stats_for(piece_type)
        .into_iter()
        .find(|s| s.name == relic.main_stat.name)
        .ok_or_else(|| {
            StellaError::NotFound(format!("main stat {} on {}", relic.main_stat.name, piece_type.name))
        })?;
    if main_stat.main_stat_scaling(relic.rarity).is_none() {
        return Err(StellaError::MissingScaling(main_stat.name.clone()));
    }
    let rarity = catalog
        .rarity(relic.rarity)
        .ok_or_else(|| StellaError::NotFound(format!("rarity {}", relic.rarity)))?;

    let leveled = LeveledRelic {
        set: set.clone(),
        piece: piece.clone(),
        piece_type: piece_type.clone(),
        stats: RelicStats {
            main_stat: relic.main_stat.clone(),
            substats: relic.substats.clone(),
        },
        level: relic.level,
        rarity: rarity.clone(),
    };

    Ok(rate_relic(&leveled, &catalog.characters))
}

/// Rate every relic of an HSR-Scanner export.
pub fn hsr_scanner_batch(json: &serde_json::Value, catalog: &ReferenceCatalog) -> Result<Vec<RatedRelic>> {
    let relics = match decode::<HsrScannerDocument>(json)? {
        HsrScannerDocument::Wrapped { relics } | HsrScannerDocument::Bare(relics) => relics,
    };

    let flat_stats =
        flat_stats_with_percentage_variants(catalog.substat_list().iter().map(|s| s.name.as_str()));

    let rated: Vec<RatedRelic> = relics
        .par_iter()
        .filter_map(|relic| match rate_hsr_scanner_relic(relic, catalog, &flat_stats) {
            Ok(rated) => Some(rated),
            Err(e) => {
                warn!("Skipping relic {} ({} {}): {}", relic.uid, relic.set, relic.slot, e);
                None
            }
        })
        .collect();

    debug!("Rated {} of {} scanner relics", rated.len(), relics.len());
    Ok(rated)
}

/// Re-rate every relic of a Stella export.
pub fn stella_batch(json: &serde_json::Value, catalog: &ReferenceCatalog) -> Result<Vec<RatedRelic>> {
    let relics: Vec<StellaRelic> = decode(json)?;

    let rated: Vec<RatedRelic> = relics
        .par_iter()
        .filter_map(|relic| match rate_stella_relic(relic, catalog) {
            Ok(rated) => Some(rated),
            Err(e) => {
                warn!("Skipping relic {} ({} {}): {}", relic.relic_name, relic.set_name, relic.type_name, e);
                None
            }
        })
        .collect();

    debug!("Rated {} of {} Stella relics", rated.len(), relics.len());
    Ok(rated)
}

pub fn import(kind: BatchImportKind, json: &serde_json::Value, catalog: &ReferenceCatalog) -> Result<Vec<RatedRelic>> {
    match kind {
        BatchImportKind::Stella => stella_batch(json, catalog),
        BatchImportKind::HsrScanner => hsr_scanner_batch(json, catalog),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::rate_scan;
    use crate::test_fixtures::{BODY_SCAN, sample_catalog};
    use serde_json::json;

    fn scanner_body() -> serde_json::Value {
        json!({
            "set": "Musketeer of Wild Wheat",
            "slot": "Body",
            "rarity": 5,
            "level": 15,
            "mainstat": "CRIT DMG",
            "substats": [
                { "key": "CRIT Rate_", "value": 8.7 },
                { "key": "ATK_", "value": 3.8 },
                { "key": "SPD", "value": 6 },
                { "key": "HP", "value": 33 }
            ],
            "location": "Seele",
            "lock": true,
            "discard": false,
            "_uid": "relic_1"
        })
    }

    fn flat_stats() -> Vec<String> {
        let catalog = sample_catalog();
        flat_stats_with_percentage_variants(catalog.substat_list().iter().map(|s| s.name.as_str()))
    }

    #[test]
    fn test_batch_import_kind_from_str() {
        assert_eq!("stella".parse::<BatchImportKind>().unwrap(), BatchImportKind::Stella);
        assert_eq!("hsr-scanner".parse::<BatchImportKind>().unwrap(), BatchImportKind::HsrScanner);
        assert!("csv".parse::<BatchImportKind>().is_err());
        assert_eq!(BatchImportKind::HsrScanner.to_string(), "hsr-scanner");
    }

    #[test]
    fn test_normalize_main_stat() {
        let flat = flat_stats();
        assert_eq!(flat, vec!["HP".to_string(), "ATK".to_string()]);
        assert_eq!(normalize_main_stat("ATK", "Body", &flat), "ATK%");
        assert_eq!(normalize_main_stat("ATK", "Hands", &flat), "ATK");
        assert_eq!(normalize_main_stat("HP", "Head", &flat), "HP");
        assert_eq!(normalize_main_stat("CRIT DMG", "Body", &flat), "CRIT DMG");
    }

    #[test]
    fn test_normalize_substat_key() {
        let flat = flat_stats();
        assert_eq!(normalize_substat_key("ATK_", &flat), "ATK%");
        assert_eq!(normalize_substat_key("CRIT Rate_", &flat), "CRIT Rate");
        assert_eq!(normalize_substat_key("ATK", &flat), "ATK");
    }

    #[test]
    fn test_hsr_scanner_batch_matches_scan() {
        let catalog = sample_catalog();
        let document = json!({ "relics": [scanner_body()] });
        let rated = hsr_scanner_batch(&document, &catalog).unwrap();
        assert_eq!(rated.len(), 1);

        let scanned = rate_scan(BODY_SCAN, &catalog, &[]).unwrap();
        assert_eq!(rated[0].relic_name, scanned.relic_name);
        assert_eq!(rated[0].main_stat.name, "CRIT DMG");
        assert!(rated[0].main_stat.display_percentage);
        let names: Vec<&str> = rated[0].substats.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["CRIT Rate", "ATK%", "SPD", "HP"]);
        assert_eq!(rated[0].characters, scanned.characters);
    }

    #[test]
    fn test_hsr_scanner_batch_skips_unmatched_items() {
        let catalog = sample_catalog();
        let mut unknown_set = scanner_body();
        unknown_set["set"] = json!("Genius of Brilliant Stars");
        let mut bad_rarity = scanner_body();
        bad_rarity["rarity"] = json!(3);
        let ground = json!({
            "set": "Musketeer of Wild Wheat",
            "slot": "Body",
            "rarity": 5,
            "level": 0,
            "mainstat": "ATK",
            "substats": [],
            "id": "relic_4"
        });

        let document = json!([unknown_set, scanner_body(), bad_rarity, ground]);
        let rated = hsr_scanner_batch(&document, &catalog).unwrap();
        assert_eq!(rated.len(), 2);
        assert_eq!(rated[0].main_stat.name, "CRIT DMG");

        let ground = &rated[1];
        assert_eq!(ground.main_stat.name, "ATK%");
        assert!((ground.main_stat.value - 6.912).abs() < 1e-9);
        let names: Vec<&str> = ground.characters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Dan Heng"]);
        assert_eq!(ground.characters[0].potential_stats, vec!["SPD".to_string()]);
    }

    #[test]
    fn test_hsr_scanner_batch_string_document() {
        let catalog = sample_catalog();
        let document = json!({ "relics": [scanner_body()] }).to_string();
        let rated = hsr_scanner_batch(&serde_json::Value::String(document), &catalog).unwrap();
        assert_eq!(rated.len(), 1);
    }

    #[test]
    fn test_batch_rejects_malformed_document() {
        let catalog = sample_catalog();
        let err = hsr_scanner_batch(&json!({ "relics": 3 }), &catalog).unwrap_err();
        assert_eq!(err.to_string(), BATCH_FORMAT_ERROR);
        let err = stella_batch(&json!({ "setName": "x" }), &catalog).unwrap_err();
        assert!(matches!(err, StellaError::Validation(_)));
    }

    #[test]
    fn test_stella_batch_round_trip() {
        let catalog = sample_catalog();
        let scanned = rate_scan(BODY_SCAN, &catalog, &[]).unwrap();
        let exported = serde_json::to_value(vec![scanned.clone()]).unwrap();

        let rated = import(BatchImportKind::Stella, &exported, &catalog).unwrap();
        assert_eq!(rated, vec![scanned]);
    }

    #[test]
    fn test_stella_batch_skips_wrong_type() {
        let catalog = sample_catalog();
        let scanned = rate_scan(BODY_SCAN, &catalog, &[]).unwrap();
        let mut exported = serde_json::to_value(&scanned).unwrap();
        exported["type"] = json!("Planar Sphere");
        let rated = stella_batch(&json!([exported]), &catalog).unwrap();
        assert!(rated.is_empty());
    }
}
