use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use stella_core::file_utils::{find_files_with_extension, read_text_file};
use stella_core::{
    BatchImportKind, CatalogDb, RatedRelic, ReferenceCatalog, Settings, batch_import,
    preprocess_scan_image, rate_scan, usable_characters,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(
    name = "stella",
    version = "0.1.0",
    about = "Rate Honkai: Star Rail relics against character builds",
    long_about = None
)]
struct Cli {
    /// Path to SQLite catalog database
    #[arg(long, global = true, default_value = "./stella.sqlite")]
    database: PathBuf,

    /// Read the catalog from this JSON file instead of the database
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Path to log file
    #[arg(long, global = true, default_value = "/tmp/stella.log")]
    log_file: PathBuf,

    /// Verbosity level (repeat for more verbose output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a catalog JSON file and load it into the database
    ImportCatalog {
        /// Catalog JSON file
        #[arg(long)]
        input: PathBuf,
    },

    /// Rate a single relic scan
    Rate {
        /// Text file with the scanned stat block, or - for stdin
        #[arg(long)]
        input: PathBuf,
        /// Character to leave out of the ratings (repeatable)
        #[arg(long = "exclude")]
        exclude: Vec<String>,
        /// TOML rating settings; logs the characters the relic is good for
        #[arg(long)]
        settings: Option<PathBuf>,
    },

    /// Prepare a relic screenshot for OCR (greyscale, invert, contrast)
    PreprocessImage {
        /// Screenshot to process
        #[arg(long)]
        input: PathBuf,
        /// Where to write the processed image; format follows the extension
        #[arg(long)]
        output: PathBuf,
    },

    /// Rate every relic of an exported JSON file or directory of files
    Batch {
        /// Export format: stella or hsr-scanner
        #[arg(long)]
        kind: BatchImportKind,
        /// JSON file, or directory searched recursively for .json files
        #[arg(long)]
        input: PathBuf,
    },
}

fn setup_logging(verbose: u8, log_file: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let filter_level = match verbose {
        0 => tracing::Level::ERROR,
        1 => tracing::Level::WARN,
        2 => tracing::Level::INFO,
        3 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(filter_level.into());

    let file_appender = tracing_appender::rolling::never(
        log_file.parent().unwrap_or(Path::new(".")),
        log_file.file_name().unwrap_or(std::ffi::OsStr::new("stella.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::Layer::new().with_writer(std::io::stderr).with_ansi(true))
        .with(fmt::Layer::new().with_writer(non_blocking).with_ansi(false));

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}

/// The catalog from `--catalog` when given, else the database snapshot.
fn load_catalog(catalog: Option<&Path>, database: &Path) -> Result<ReferenceCatalog> {
    let catalog = match catalog {
        Some(path) => ReferenceCatalog::from_json_path(path)
            .with_context(|| format!("Failed to load catalog from {}", path.display()))?,
        None => {
            if !database.exists() {
                bail!(
                    "No catalog database at {}; run import-catalog or pass --catalog",
                    database.display()
                );
            }
            CatalogDb::new(database)?.load_catalog()?
        }
    };

    info!(
        "Loaded catalog with {} sets, {} stats and {} characters",
        catalog.sets.len(),
        catalog.stats.len(),
        catalog.characters.len()
    );
    Ok(catalog)
}

fn read_scan(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        return Ok(raw);
    }
    Ok(read_text_file(input)?)
}

fn batch_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_dir() {
        let files = find_files_with_extension(input, "json")?;
        if files.is_empty() {
            bail!("No .json files found in {}", input.display());
        }
        Ok(files)
    } else {
        Ok(vec![input.to_path_buf()])
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = setup_logging(cli.verbose, &cli.log_file)?;

    info!("Starting stella CLI");

    match cli.command {
        Commands::ImportCatalog { input } => {
            let catalog = ReferenceCatalog::from_json_path(&input)
                .with_context(|| format!("Failed to load catalog from {}", input.display()))?;
            let db = CatalogDb::new(&cli.database)?;
            let written = db.import_catalog(&catalog)?;
            info!(
                "Imported {} catalog rows into {}",
                written,
                cli.database.display()
            );
        }
        Commands::Rate { input, exclude, settings } => {
            let catalog = load_catalog(cli.catalog.as_deref(), &cli.database)?;
            let settings = settings.as_deref().map(Settings::from_file).transpose()?;

            let mut excluded = exclude;
            if let Some(settings) = &settings {
                excluded.extend(settings.excluded_characters.iter().cloned());
            }

            let raw = read_scan(&input)?;
            let rated = rate_scan(&raw, &catalog, &excluded)?;
            info!(
                "Rated {} (+{}, {} stars) for {} characters",
                rated.relic_name,
                rated.level,
                rated.rarity,
                rated.characters.len()
            );

            if let Some(settings) = &settings {
                let today = chrono::Local::now().date_naive();
                let usable = usable_characters(&rated, settings, today);
                if usable.is_empty() {
                    info!("No character reaches {}% on this relic", settings.min_rating_percentage);
                }
                for character in &usable {
                    info!(
                        "{}: {}",
                        character.name,
                        settings.format_rating(character.rating, character.max_potential_value)
                    );
                }
            }

            println!("{}", serde_json::to_string_pretty(&rated)?);
        }
        Commands::PreprocessImage { input, output } => {
            let processed = preprocess_scan_image(&input)?;
            processed
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote preprocessed screenshot to {}", output.display());
        }
        Commands::Batch { kind, input } => {
            let catalog = load_catalog(cli.catalog.as_deref(), &cli.database)?;
            let files = batch_files(&input)?;
            info!("Found {} {} export files", files.len(), kind);

            let per_file: Vec<Vec<RatedRelic>> = files
                .par_iter()
                .filter_map(|path| {
                    let rated = read_text_file(path)
                        .map_err(anyhow::Error::from)
                        .and_then(|content| Ok(serde_json::from_str::<serde_json::Value>(&content)?))
                        .and_then(|json| Ok(batch_import(kind, &json, &catalog)?));
                    match rated {
                        Ok(rated) => Some(rated),
                        Err(e) => {
                            tracing::warn!("Failed to import {:?}: {}", path, e);
                            None
                        }
                    }
                })
                .collect();

            let rated: Vec<RatedRelic> = per_file.into_iter().flatten().collect();
            info!("Rated {} relics", rated.len());
            println!("{}", serde_json::to_string_pretty(&rated)?);
        }
    }

    Ok(())
}
