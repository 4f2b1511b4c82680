//! Single scan entry point.

use crate::catalog::ReferenceCatalog;
use crate::error::Result;
use crate::leveler::level_relic;
use crate::models::RatedRelic;
use crate::parsers::parse_relic;
use crate::scoring::rate_relic;
use tracing::debug;

/// Parse, level and rate one raw stat block. Characters named in
/// `excluded` are left out of the ratings.
pub fn rate_scan(raw: &str, catalog: &ReferenceCatalog, excluded: &[String]) -> Result<RatedRelic> {
    let parsed = parse_relic(raw, catalog)?;
    debug!(
        "Parsed {} ({}) with main stat {}",
        parsed.piece.name, parsed.set.name, parsed.stats.main_stat.name
    );

    let leveled = level_relic(parsed, catalog)?;
    let catalog = catalog.without_characters(excluded);

    Ok(rate_relic(&leveled, &catalog.characters))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StellaError;
    use crate::test_fixtures::{BODY_SCAN, HANDS_SCAN, sample_catalog};

    #[test]
    fn test_rate_scan() {
        let catalog = sample_catalog();
        let rated = rate_scan(BODY_SCAN, &catalog, &[]).unwrap();
        assert_eq!(rated.relic_name, "Musketeer's Wind-Hunting Shawl");
        assert_eq!(rated.level, 15);
        assert_eq!(rated.rarity, 5);
        assert_eq!(rated.characters.len(), 1);
    }

    #[test]
    fn test_rate_scan_excluded_characters() {
        let catalog = sample_catalog();
        let rated = rate_scan(HANDS_SCAN, &catalog, &["Seele".to_string()]).unwrap();
        let names: Vec<&str> = rated.characters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Dan Heng"]);
    }

    #[test]
    fn test_rate_scan_surfaces_first_error() {
        let catalog = sample_catalog();
        let err = rate_scan("nothing to see here", &catalog, &[]).unwrap_err();
        assert!(matches!(err, StellaError::Parse(_)));

        let unleveled = BODY_SCAN.replace("64.8%", "5.0%");
        let err = rate_scan(&unleveled, &catalog, &[]).unwrap_err();
        assert!(matches!(err, StellaError::LevelIndeterminate));
    }
}
