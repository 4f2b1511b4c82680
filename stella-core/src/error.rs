use thiserror::Error;

#[derive(Error, Debug)]
pub enum StellaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{0}")]
    Parse(String),

    #[error("Could not determine substat value distribution for {0}")]
    MissingScaling(String),

    #[error("Could not determine relic level")]
    LevelIndeterminate,

    #[error("Could not determine relic rarity")]
    RarityIndeterminate,

    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StellaError>;
