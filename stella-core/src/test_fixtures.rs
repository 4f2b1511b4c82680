//! Shared fixtures for unit tests.

use crate::catalog::ReferenceCatalog;

pub const SAMPLE_CATALOG_JSON: &str = include_str!("../../data/sample-catalog.json");

/// +15 five star body piece with four substats.
pub const BODY_SCAN: &str = "Musketeer's Wind-Hunting Shawl
+15
Body
CRIT DMG 64.8%
CRIT Rate 8.7%
ATK 3.8%
SPD 6
HP 33
Musketeer of Wild
Wheat
2-Pc: ATK increases by 12%.
4-Pc: The wearer's SPD increases by 6% and Basic ATK DMG increases by 10%.
";

/// +12 four star hands piece. The main stat alone would also fit a +9 five star.
pub const HANDS_SCAN: &str = "Musketeer's Coarse Leather Gloves
+12
ATK 234
CRIT Rate 5.8%
SPD 2
HP 27
Break Effect 4.1%
Musketeer of Wild Wheat
2-Pc: ATK increases by 12%.
";

pub fn sample_catalog() -> ReferenceCatalog {
    ReferenceCatalog::from_json_str(SAMPLE_CATALOG_JSON).unwrap()
}
