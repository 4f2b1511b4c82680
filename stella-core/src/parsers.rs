//! Stat-block parser for OCR'd or pasted relic text.
//!
//! A scan looks roughly like this (line breaks depend on the OCR tool):
//! ```text
//! Musketeer's Wind-Hunting Shawl
//! +15
//! CRIT DMG 64.8%
//! CRIT Rate 8.7%
//! ATK 3.8%
//! SPD 6
//! HP 33
//! Musketeer of Wild
//! Wheat
//! 2-Pc: ATK increases by 12%.
//! ```

use crate::catalog::ReferenceCatalog;
use crate::error::{Result, StellaError};
use crate::models::{ParsedRelic, RelicStats, Stat, StatValue, Substat};
use regex::Regex;

/// A relic never has more substats than this.
pub const MAX_SUBSTATS: usize = 4;

/// Remove every whitespace character. Set and piece names may be wrapped
/// over several lines by the OCR.
pub fn remove_space(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Flat stats that also exist with a `%` suffix, e.g. `ATK` when `ATK%` is
/// in the list.
pub fn flat_stats_with_percentage_variants<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let names: Vec<&str> = names.into_iter().collect();
    names
        .iter()
        .filter(|name| names.contains(&format!("{}%", name).as_str()))
        .map(|name| name.to_string())
        .collect()
}

/// Cut the text at the set bonus description so bonus effects such as
/// "increases CRIT DMG by 16%" are not read as substats.
fn truncate_set_description(raw: &str) -> Result<&str> {
    let marker = Regex::new(r"(?i)2-pc")?;
    Ok(match marker.find(raw) {
        Some(m) => &raw[..m.start()],
        None => raw,
    })
}

/// Matches stat names and their values on single lines of a stat block.
pub struct StatLineMatcher {
    number: Regex,
}

impl StatLineMatcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            number: Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?")?,
        })
    }

    /// Last space-separated word on the line that starts with a number,
    /// after dropping one `%`. Returns the raw word and its value.
    fn trailing_value<'l>(&self, line: &'l str) -> Option<(&'l str, f64)> {
        for word in line.split(' ').rev() {
            let cleaned = word.replacen('%', "", 1);
            let Some(found) = self.number.find(cleaned.trim_start()) else {
                continue;
            };
            if let Ok(value) = found.as_str().parse::<f64>() {
                return Some((word, value));
            }
        }
        None
    }

    /// Read `stat` from `line` if the line names it and carries a non-zero
    /// value.
    ///
    /// Percentage variants (`ATK%`) match when the bare name and a `%` both
    /// appear on the line. A flat stat that has a percentage variant (`ATK`)
    /// only matches when its value has no `%`.
    pub fn match_stat(
        &self,
        line: &str,
        stat: &Stat,
        flat_stats_with_variants: &[String],
    ) -> Option<StatValue> {
        let (word, value) = self.trailing_value(line)?;
        if value == 0.0 {
            return None;
        }

        let has_variant = flat_stats_with_variants.contains(&stat.name);
        let matched = stat.labels().any(|label| {
            if label.contains('%') {
                line.contains(&label.replace('%', "")) && line.contains('%')
            } else {
                line.contains(label) && (!has_variant || !word.contains('%'))
            }
        });

        matched.then(|| StatValue {
            name: stat.name.clone(),
            value,
            display_percentage: stat.display_percentage,
        })
    }
}

/// Find the main stat and the substats in a stat block.
///
/// The first line naming one of `main_stats` is the main stat line; every
/// following line is scanned for substats until four are found. One line
/// may yield several substats when it names more than one stat.
pub fn parse_stats(raw: &str, main_stats: &[&Stat], substat_list: &[&Stat]) -> Result<RelicStats> {
    let matcher = StatLineMatcher::new()?;
    let main_flat = flat_stats_with_percentage_variants(main_stats.iter().map(|s| s.name.as_str()));
    let sub_flat = flat_stats_with_percentage_variants(substat_list.iter().map(|s| s.name.as_str()));

    let lines: Vec<&str> = raw.lines().collect();

    let mut main_stat = None;
    let mut main_stat_line = 0;
    for (index, line) in lines.iter().enumerate() {
        for stat in main_stats {
            if let Some(parsed) = matcher.match_stat(line, stat, &main_flat) {
                main_stat_line = index;
                main_stat = Some(parsed);
            }
        }
        if main_stat.is_some() {
            break;
        }
    }

    let Some(main_stat) = main_stat else {
        return Err(StellaError::Parse("Main stat is not found".to_string()));
    };

    let mut substats = Vec::new();
    'lines: for line in &lines[main_stat_line + 1..] {
        for stat in substat_list {
            if let Some(parsed) = matcher.match_stat(line, stat, &sub_flat) {
                substats.push(Substat::new(parsed.name, parsed.value, parsed.display_percentage));
                if substats.len() >= MAX_SUBSTATS {
                    break 'lines;
                }
            }
        }
    }

    Ok(RelicStats { main_stat, substats })
}

/// Identify the set, piece and stats of a relic from raw scan text.
pub fn parse_relic(raw: &str, catalog: &ReferenceCatalog) -> Result<ParsedRelic> {
    let compact = remove_space(raw);
    let set = catalog
        .sets
        .iter()
        .find(|set| {
            let name = remove_space(&set.name);
            !name.is_empty() && compact.contains(&name)
        })
        .ok_or_else(|| StellaError::Parse("No matched set found".to_string()))?;

    let text = truncate_set_description(raw)?;
    let compact = remove_space(text);

    let piece = set
        .pieces
        .iter()
        .find(|piece| {
            let name = remove_space(&piece.name);
            !name.is_empty() && compact.contains(&name)
        })
        .ok_or_else(|| StellaError::Parse("No matched piece found".to_string()))?;

    let piece_type = catalog
        .piece_type(&piece.type_name)
        .ok_or_else(|| StellaError::Parse("No matched piece type found".to_string()))?;

    let stats = parse_stats(text, &catalog.main_stats_for(piece_type), &catalog.substat_list())?;

    Ok(ParsedRelic {
        set: set.clone(),
        piece: piece.clone(),
        piece_type: piece_type.clone(),
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Piece;
    use crate::test_fixtures::{BODY_SCAN, HANDS_SCAN, sample_catalog};

    fn stat(name: &str, display_percentage: bool) -> Stat {
        Stat {
            name: name.to_string(),
            alt_names: Vec::new(),
            display_percentage,
            can_be_substat: true,
            main_stat_scalings: Vec::new(),
            substat_scalings: Vec::new(),
        }
    }

    #[test]
    fn test_remove_space() {
        assert_eq!(remove_space("Musketeer of Wild\nWheat \t"), "MusketeerofWildWheat");
    }

    #[test]
    fn test_flat_stats_with_percentage_variants() {
        let flat = flat_stats_with_percentage_variants(["HP", "ATK", "HP%", "ATK%", "CRIT Rate", "SPD"]);
        assert_eq!(flat, vec!["HP".to_string(), "ATK".to_string()]);
    }

    #[test]
    fn test_percentage_variant_main_stat() {
        let atk_percent = stat("ATK%", true);
        let stats = parse_stats("Body\nATK%  42.3%\n", &[&atk_percent], &[]).unwrap();
        assert_eq!(
            stats.main_stat,
            StatValue { name: "ATK%".to_string(), value: 42.3, display_percentage: true }
        );
        assert!(stats.substats.is_empty());
    }

    #[test]
    fn test_flat_stat_rejects_percentage_value() {
        let matcher = StatLineMatcher::new().unwrap();
        let atk = stat("ATK", false);
        let atk_percent = stat("ATK%", true);
        let flat = vec!["ATK".to_string()];

        assert!(matcher.match_stat("ATK 3.8%", &atk, &flat).is_none());
        assert_eq!(matcher.match_stat("ATK 3.8%", &atk_percent, &flat).unwrap().value, 3.8);
        assert_eq!(matcher.match_stat("ATK 19", &atk, &flat).unwrap().value, 19.0);
        assert!(matcher.match_stat("ATK 19", &atk_percent, &flat).is_none());
    }

    #[test]
    fn test_trailing_value_skips_words() {
        let matcher = StatLineMatcher::new().unwrap();
        let crit = stat("CRIT Rate", true);
        let parsed = matcher.match_stat("CRIT Rate 8.7% (locked)", &crit, &[]).unwrap();
        assert_eq!(parsed.value, 8.7);
        assert!(matcher.match_stat("CRIT Rate", &crit, &[]).is_none());
        assert!(matcher.match_stat("CRIT Rate 0", &crit, &[]).is_none());
    }

    #[test]
    fn test_alternate_names() {
        let catalog = sample_catalog();
        let matcher = StatLineMatcher::new().unwrap();
        let break_effect = catalog.stat("Break Effect").unwrap();
        let parsed = matcher.match_stat("Break Eff. 6.4%", break_effect, &[]).unwrap();
        assert_eq!(parsed.name, "Break Effect");
        assert_eq!(parsed.value, 6.4);
    }

    #[test]
    fn test_line_naming_two_stats_yields_both() {
        let hp = stat("HP", false);
        let atk = stat("ATK", false);
        let spd = stat("SPD", false);
        let stats = parse_stats("SPD 10\nHP ATK 33\n", &[&spd], &[&hp, &atk]).unwrap();
        let names: Vec<&str> = stats.substats.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["HP", "ATK"]);
        assert!(stats.substats.iter().all(|s| s.value == 33.0));
    }

    #[test]
    fn test_substats_stop_at_four() {
        let spd = stat("SPD", false);
        let hp = stat("HP", false);
        let text = "SPD 10\nHP 1\nHP 2\nHP 3\nHP 4\nHP 5\n";
        let stats = parse_stats(text, &[&spd], &[&hp]).unwrap();
        assert_eq!(stats.substats.len(), MAX_SUBSTATS);
        assert_eq!(stats.substats[3].value, 4.0);
    }

    #[test]
    fn test_parse_relic_body_scan() {
        let catalog = sample_catalog();
        let relic = parse_relic(BODY_SCAN, &catalog).unwrap();

        assert_eq!(relic.set.name, "Musketeer of Wild Wheat");
        assert_eq!(relic.piece.name, "Musketeer's Wind-Hunting Shawl");
        assert_eq!(relic.piece_type.name, "Body");
        assert_eq!(relic.stats.main_stat.name, "CRIT DMG");
        assert_eq!(relic.stats.main_stat.value, 64.8);

        let substats: Vec<(&str, f64, bool)> = relic
            .stats
            .substats
            .iter()
            .map(|s| (s.name.as_str(), s.value, s.display_percentage))
            .collect();
        assert_eq!(
            substats,
            vec![
                ("CRIT Rate", 8.7, true),
                ("ATK%", 3.8, true),
                ("SPD", 6.0, false),
                ("HP", 33.0, false),
            ]
        );
    }

    #[test]
    fn test_parse_relic_ignores_set_bonus_text() {
        let catalog = sample_catalog();
        let text = "Herta's Space Station\nATK 43.2%\nSPD 2\nSpace Sealing Station\n\
                    2-Pc: Increases the wearer's ATK by 12%. CRIT DMG 16%\n";
        let relic = parse_relic(text, &catalog).unwrap();
        assert_eq!(relic.piece_type.name, "Planar Sphere");
        assert_eq!(relic.stats.main_stat.name, "ATK%");
        assert_eq!(relic.stats.substats.len(), 1);
        assert_eq!(relic.stats.substats[0].name, "SPD");
    }

    #[test]
    fn test_parse_relic_hands_scan() {
        let catalog = sample_catalog();
        let relic = parse_relic(HANDS_SCAN, &catalog).unwrap();
        assert_eq!(relic.piece_type.name, "Hands");
        assert_eq!(relic.stats.main_stat.name, "ATK");
        assert_eq!(relic.stats.main_stat.value, 234.0);
        assert_eq!(relic.stats.substats.len(), 4);
    }

    #[test]
    fn test_parse_relic_errors() {
        let catalog = sample_catalog();

        let err = parse_relic("Nothing to see here", &catalog).unwrap_err();
        assert_eq!(err.to_string(), "No matched set found");

        let err = parse_relic("Musketeer of Wild Wheat\nCRIT DMG 64.8%", &catalog).unwrap_err();
        assert_eq!(err.to_string(), "No matched piece found");

        let err = parse_relic("Musketeer's Wind-Hunting Shawl\nMusketeer of Wild Wheat", &catalog)
            .unwrap_err();
        assert_eq!(err.to_string(), "Main stat is not found");
    }

    #[test]
    fn test_set_match_takes_first_in_catalog_order() {
        let mut catalog = sample_catalog();
        let mut nested = catalog.sets[0].clone();
        nested.name = "Wild Wheat".to_string();

        // both names occur in the scan; the earlier set wins
        catalog.sets.push(nested.clone());
        let relic = parse_relic(BODY_SCAN, &catalog).unwrap();
        assert_eq!(relic.set.name, "Musketeer of Wild Wheat");

        catalog.sets.pop();
        catalog.sets.insert(0, nested);
        let relic = parse_relic(BODY_SCAN, &catalog).unwrap();
        assert_eq!(relic.set.name, "Wild Wheat");
    }

    #[test]
    fn test_piece_match_takes_first_in_set_order() {
        let mut catalog = sample_catalog();
        let short = Piece {
            name: "Wind-Hunting Shawl".to_string(),
            type_name: "Body".to_string(),
            thumbnail: "short.webp".to_string(),
        };

        catalog.sets[0].pieces.push(short.clone());
        let relic = parse_relic(BODY_SCAN, &catalog).unwrap();
        assert_eq!(relic.piece.name, "Musketeer's Wind-Hunting Shawl");

        catalog.sets[0].pieces.pop();
        catalog.sets[0].pieces.insert(0, short);
        let relic = parse_relic(BODY_SCAN, &catalog).unwrap();
        assert_eq!(relic.piece.name, "Wind-Hunting Shawl");
        assert_eq!(relic.piece.thumbnail, "short.webp");
    }
}
