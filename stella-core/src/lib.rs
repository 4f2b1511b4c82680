//! Core library for parsing, leveling and rating Honkai: Star Rail relics.

pub mod batch;
pub mod catalog;
pub mod database;
pub mod error;
pub mod file_utils;
pub mod imaging;
pub mod leveler;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod rolls;
pub mod scoring;
pub mod settings;

#[cfg(test)]
mod test_fixtures;

pub use batch::{BatchImportKind, import as batch_import};
pub use catalog::ReferenceCatalog;
pub use database::CatalogDb;
pub use error::{Result, StellaError};
pub use imaging::preprocess_scan_image;
pub use models::{CharacterRelicValue, RatedRelic};
pub use pipeline::rate_scan;
pub use scoring::rate_relic;
pub use settings::{Settings, UsableCharacter, usable_characters};
