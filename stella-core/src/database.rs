use crate::catalog::ReferenceCatalog;
use crate::error::{Result, StellaError};
use crate::models::{
    Character, CharacterMainStat, CharacterSubstat, MainStatScaling, Piece, PieceType, Rarity,
    RelicSet, Stat, SubstatScaling,
};
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, params};
use std::collections::HashMap;

const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite store for the reference catalog.
pub struct CatalogDb {
    pool: Pool<SqliteConnectionManager>,
}

impl CatalogDb {
    pub fn new(path: &std::path::Path) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| {
                conn.pragma_update(None, "foreign_keys", "ON")?;
                Ok(())
            });
        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(StellaError::Pool)?;

        let db = Self { pool };
        db.run_migrations()?;
        Ok(db)
    }

    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(StellaError::Pool)
    }

    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.connection()?;

        let tx = conn.transaction()?;

        tx.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS stats (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                display_percentage BOOLEAN NOT NULL,
                can_be_substat BOOLEAN NOT NULL
            );

            CREATE TABLE IF NOT EXISTS stat_alt_names (
                id INTEGER PRIMARY KEY,
                stat_name TEXT NOT NULL,
                alt_name TEXT NOT NULL,
                FOREIGN KEY (stat_name) REFERENCES stats(name) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS main_stat_scalings (
                id INTEGER PRIMARY KEY,
                stat_name TEXT NOT NULL,
                rarity INTEGER NOT NULL,
                base_value REAL NOT NULL,
                scaling_value REAL NOT NULL,
                FOREIGN KEY (stat_name) REFERENCES stats(name) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS substat_scalings (
                id INTEGER PRIMARY KEY,
                stat_name TEXT NOT NULL,
                rarity INTEGER NOT NULL,
                scaling_value REAL NOT NULL,
                FOREIGN KEY (stat_name) REFERENCES stats(name) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS piece_types (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS piece_type_stats (
                id INTEGER PRIMARY KEY,
                type_name TEXT NOT NULL,
                stat_name TEXT NOT NULL,
                FOREIGN KEY (type_name) REFERENCES piece_types(name) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS sets (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS pieces (
                id INTEGER PRIMARY KEY,
                set_name TEXT NOT NULL,
                name TEXT NOT NULL,
                type_name TEXT NOT NULL,
                thumbnail TEXT NOT NULL,
                FOREIGN KEY (set_name) REFERENCES sets(name) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS rarities (
                id INTEGER PRIMARY KEY,
                rarity INTEGER UNIQUE NOT NULL,
                max_level INTEGER NOT NULL,
                min_substat_amount INTEGER NOT NULL,
                max_substat_amount INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS characters (
                id INTEGER PRIMARY KEY,
                name TEXT UNIQUE NOT NULL,
                thumbnail TEXT NOT NULL,
                rarity INTEGER NOT NULL,
                release_date DATE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS character_sets (
                id INTEGER PRIMARY KEY,
                character_name TEXT NOT NULL,
                set_name TEXT NOT NULL,
                FOREIGN KEY (character_name) REFERENCES characters(name) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS character_main_stats (
                id INTEGER PRIMARY KEY,
                character_name TEXT NOT NULL,
                type_name TEXT NOT NULL,
                stat_name TEXT NOT NULL,
                FOREIGN KEY (character_name) REFERENCES characters(name) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS character_substats (
                id INTEGER PRIMARY KEY,
                character_name TEXT NOT NULL,
                stat_name TEXT NOT NULL,
                priority INTEGER NOT NULL,
                FOREIGN KEY (character_name) REFERENCES characters(name) ON DELETE CASCADE
            );
            "#,
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Replace the stored catalog. Returns the number of rows written.
    pub fn import_catalog(&self, catalog: &ReferenceCatalog) -> Result<usize> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;

        // children before parents
        tx.execute_batch(
            "DELETE FROM character_substats;
             DELETE FROM character_main_stats;
             DELETE FROM character_sets;
             DELETE FROM characters;
             DELETE FROM rarities;
             DELETE FROM pieces;
             DELETE FROM sets;
             DELETE FROM piece_type_stats;
             DELETE FROM piece_types;
             DELETE FROM substat_scalings;
             DELETE FROM main_stat_scalings;
             DELETE FROM stat_alt_names;
             DELETE FROM stats;",
        )?;

        let mut inserted_count = 0;
        inserted_count += insert_stats(&tx, &catalog.stats)?;
        inserted_count += insert_piece_types(&tx, &catalog.piece_types)?;
        inserted_count += insert_sets(&tx, &catalog.sets)?;

        for rarity in &catalog.rarities {
            tx.execute(
                "INSERT INTO rarities (rarity, max_level, min_substat_amount, max_substat_amount)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    rarity.rarity,
                    rarity.max_level,
                    rarity.min_substat_amount,
                    rarity.max_substat_amount,
                ],
            )?;
            inserted_count += 1;
        }

        inserted_count += insert_characters(&tx, &catalog.characters)?;

        tx.commit()?;
        tracing::debug!("Wrote {} catalog rows", inserted_count);
        Ok(inserted_count)
    }

    /// Read the whole catalog back in insertion order and validate its
    /// references.
    pub fn load_catalog(&self) -> Result<ReferenceCatalog> {
        let conn = self.connection()?;

        let catalog = ReferenceCatalog {
            stats: load_stats(&conn)?,
            piece_types: load_piece_types(&conn)?,
            sets: load_sets(&conn)?,
            rarities: load_rarities(&conn)?,
            characters: load_characters(&conn)?,
        };
        catalog.validate()?;
        Ok(catalog)
    }
}

fn insert_stats(conn: &Connection, stats: &[Stat]) -> Result<usize> {
    let mut inserted_count = 0;

    for stat in stats {
        conn.execute(
            "INSERT INTO stats (name, display_percentage, can_be_substat) VALUES (?1, ?2, ?3)",
            params![stat.name, stat.display_percentage, stat.can_be_substat],
        )?;
        inserted_count += 1;

        for alt_name in &stat.alt_names {
            conn.execute(
                "INSERT INTO stat_alt_names (stat_name, alt_name) VALUES (?1, ?2)",
                params![stat.name, alt_name],
            )?;
            inserted_count += 1;
        }

        for scaling in &stat.main_stat_scalings {
            conn.execute(
                "INSERT INTO main_stat_scalings (stat_name, rarity, base_value, scaling_value)
                 VALUES (?1, ?2, ?3, ?4)",
                params![stat.name, scaling.rarity, scaling.base_value, scaling.scaling_value],
            )?;
            inserted_count += 1;
        }

        for scaling in &stat.substat_scalings {
            conn.execute(
                "INSERT INTO substat_scalings (stat_name, rarity, scaling_value) VALUES (?1, ?2, ?3)",
                params![stat.name, scaling.rarity, scaling.scaling_value],
            )?;
            inserted_count += 1;
        }
    }

    Ok(inserted_count)
}

fn insert_piece_types(conn: &Connection, piece_types: &[PieceType]) -> Result<usize> {
    let mut inserted_count = 0;

    for piece_type in piece_types {
        conn.execute("INSERT INTO piece_types (name) VALUES (?1)", params![piece_type.name])?;
        inserted_count += 1;

        for stat in &piece_type.stats {
            conn.execute(
                "INSERT INTO piece_type_stats (type_name, stat_name) VALUES (?1, ?2)",
                params![piece_type.name, stat],
            )?;
            inserted_count += 1;
        }
    }

    Ok(inserted_count)
}

fn insert_sets(conn: &Connection, sets: &[RelicSet]) -> Result<usize> {
    let mut inserted_count = 0;

    for set in sets {
        conn.execute("INSERT INTO sets (name) VALUES (?1)", params![set.name])?;
        inserted_count += 1;

        for piece in &set.pieces {
            conn.execute(
                "INSERT INTO pieces (set_name, name, type_name, thumbnail) VALUES (?1, ?2, ?3, ?4)",
                params![set.name, piece.name, piece.type_name, piece.thumbnail],
            )?;
            inserted_count += 1;
        }
    }

    Ok(inserted_count)
}

fn insert_characters(conn: &Connection, characters: &[Character]) -> Result<usize> {
    let mut inserted_count = 0;

    for character in characters {
        conn.execute(
            "INSERT INTO characters (name, thumbnail, rarity, release_date) VALUES (?1, ?2, ?3, ?4)",
            params![
                character.name,
                character.thumbnail,
                character.rarity,
                character.release_date.format(RELEASE_DATE_FORMAT).to_string(),
            ],
        )?;
        inserted_count += 1;

        for set in &character.sets {
            conn.execute(
                "INSERT INTO character_sets (character_name, set_name) VALUES (?1, ?2)",
                params![character.name, set],
            )?;
            inserted_count += 1;
        }

        for main_stat in &character.main_stats {
            conn.execute(
                "INSERT INTO character_main_stats (character_name, type_name, stat_name) VALUES (?1, ?2, ?3)",
                params![character.name, main_stat.type_name, main_stat.stat],
            )?;
            inserted_count += 1;
        }

        for substat in &character.substats {
            conn.execute(
                "INSERT INTO character_substats (character_name, stat_name, priority) VALUES (?1, ?2, ?3)",
                params![character.name, substat.stat, substat.priority],
            )?;
            inserted_count += 1;
        }
    }

    Ok(inserted_count)
}

/// Rows of a child table as (parent name, value), in insertion order.
fn load_children<T>(
    conn: &Connection,
    sql: &str,
    map: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<(String, T)>,
) -> Result<Vec<(String, T)>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Attach child rows to their parents by name. Rows of unknown parents are
/// dropped.
fn attach<P, T>(
    parents: &mut [P],
    name_of: impl Fn(&P) -> &str,
    children: Vec<(String, T)>,
    mut push: impl FnMut(&mut P, T),
) {
    let index: HashMap<String, usize> = parents
        .iter()
        .enumerate()
        .map(|(i, p)| (name_of(p).to_string(), i))
        .collect();

    for (parent, child) in children {
        if let Some(&i) = index.get(&parent) {
            push(&mut parents[i], child);
        }
    }
}

fn load_stats(conn: &Connection) -> Result<Vec<Stat>> {
    let mut stmt =
        conn.prepare("SELECT name, display_percentage, can_be_substat FROM stats ORDER BY id")?;
    let mut stats = stmt
        .query_map([], |row| {
            Ok(Stat {
                name: row.get(0)?,
                alt_names: Vec::new(),
                display_percentage: row.get(1)?,
                can_be_substat: row.get(2)?,
                main_stat_scalings: Vec::new(),
                substat_scalings: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let alt_names = load_children(
        conn,
        "SELECT stat_name, alt_name FROM stat_alt_names ORDER BY id",
        |row| Ok((row.get(0)?, row.get::<_, String>(1)?)),
    )?;
    attach(&mut stats, |s| s.name.as_str(), alt_names, |s, alt| s.alt_names.push(alt));

    let main_stat_scalings = load_children(
        conn,
        "SELECT stat_name, rarity, base_value, scaling_value FROM main_stat_scalings ORDER BY id",
        |row| {
            Ok((
                row.get(0)?,
                MainStatScaling {
                    rarity: row.get(1)?,
                    base_value: row.get(2)?,
                    scaling_value: row.get(3)?,
                },
            ))
        },
    )?;
    attach(&mut stats, |s| s.name.as_str(), main_stat_scalings, |s, scaling| {
        s.main_stat_scalings.push(scaling)
    });

    let substat_scalings = load_children(
        conn,
        "SELECT stat_name, rarity, scaling_value FROM substat_scalings ORDER BY id",
        |row| {
            Ok((
                row.get(0)?,
                SubstatScaling {
                    rarity: row.get(1)?,
                    scaling_value: row.get(2)?,
                },
            ))
        },
    )?;
    attach(&mut stats, |s| s.name.as_str(), substat_scalings, |s, scaling| {
        s.substat_scalings.push(scaling)
    });

    Ok(stats)
}

fn load_piece_types(conn: &Connection) -> Result<Vec<PieceType>> {
    let mut stmt = conn.prepare("SELECT name FROM piece_types ORDER BY id")?;
    let mut piece_types = stmt
        .query_map([], |row| {
            Ok(PieceType {
                name: row.get(0)?,
                stats: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let stats = load_children(
        conn,
        "SELECT type_name, stat_name FROM piece_type_stats ORDER BY id",
        |row| Ok((row.get(0)?, row.get::<_, String>(1)?)),
    )?;
    attach(&mut piece_types, |t| t.name.as_str(), stats, |t, stat| t.stats.push(stat));

    Ok(piece_types)
}

fn load_sets(conn: &Connection) -> Result<Vec<RelicSet>> {
    let mut stmt = conn.prepare("SELECT name FROM sets ORDER BY id")?;
    let mut sets = stmt
        .query_map([], |row| {
            Ok(RelicSet {
                name: row.get(0)?,
                pieces: Vec::new(),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let pieces = load_children(
        conn,
        "SELECT set_name, name, type_name, thumbnail FROM pieces ORDER BY id",
        |row| {
            Ok((
                row.get(0)?,
                Piece {
                    name: row.get(1)?,
                    type_name: row.get(2)?,
                    thumbnail: row.get(3)?,
                },
            ))
        },
    )?;
    attach(&mut sets, |s| s.name.as_str(), pieces, |s, piece| s.pieces.push(piece));

    Ok(sets)
}

fn load_rarities(conn: &Connection) -> Result<Vec<Rarity>> {
    let mut stmt = conn.prepare(
        "SELECT rarity, max_level, min_substat_amount, max_substat_amount FROM rarities ORDER BY id",
    )?;
    let rarities = stmt
        .query_map([], |row| {
            Ok(Rarity {
                rarity: row.get(0)?,
                max_level: row.get(1)?,
                min_substat_amount: row.get(2)?,
                max_substat_amount: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rarities)
}

fn load_characters(conn: &Connection) -> Result<Vec<Character>> {
    let mut stmt =
        conn.prepare("SELECT name, thumbnail, rarity, release_date FROM characters ORDER BY id")?;
    let rows: Vec<(String, String, u8, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut characters = Vec::with_capacity(rows.len());
    for (name, thumbnail, rarity, release_date) in rows {
        let release_date = NaiveDate::parse_from_str(&release_date, RELEASE_DATE_FORMAT).map_err(|e| {
            StellaError::Parse(format!("Invalid release date {:?} for {}: {}", release_date, name, e))
        })?;
        characters.push(Character {
            name,
            thumbnail,
            rarity,
            release_date,
            sets: Vec::new(),
            main_stats: Vec::new(),
            substats: Vec::new(),
        });
    }

    let sets = load_children(
        conn,
        "SELECT character_name, set_name FROM character_sets ORDER BY id",
        |row| Ok((row.get(0)?, row.get::<_, String>(1)?)),
    )?;
    attach(&mut characters, |c| c.name.as_str(), sets, |c, set| c.sets.push(set));

    let main_stats = load_children(
        conn,
        "SELECT character_name, type_name, stat_name FROM character_main_stats ORDER BY id",
        |row| {
            Ok((
                row.get(0)?,
                CharacterMainStat {
                    type_name: row.get(1)?,
                    stat: row.get(2)?,
                },
            ))
        },
    )?;
    attach(&mut characters, |c| c.name.as_str(), main_stats, |c, m| c.main_stats.push(m));

    let substats = load_children(
        conn,
        "SELECT character_name, stat_name, priority FROM character_substats ORDER BY id",
        |row| {
            Ok((
                row.get(0)?,
                CharacterSubstat {
                    stat: row.get(1)?,
                    priority: row.get(2)?,
                },
            ))
        },
    )?;
    attach(&mut characters, |c| c.name.as_str(), substats, |c, s| c.substats.push(s));

    Ok(characters)
}
