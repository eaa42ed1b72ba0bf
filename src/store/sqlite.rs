use super::MovieStore;
use crate::record::CanonicalMovieRecord;
use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Statement, params};
use std::collections::HashSet;
use std::path::Path;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS movies (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id   INTEGER NOT NULL UNIQUE,
    title         TEXT NOT NULL,
    original_title TEXT NOT NULL DEFAULT '',
    year          INTEGER NOT NULL,
    released      TEXT NOT NULL DEFAULT '',
    genres        TEXT NOT NULL DEFAULT '',
    overview      TEXT NOT NULL DEFAULT '',
    poster_url    TEXT NOT NULL DEFAULT '',
    popularity    REAL NOT NULL DEFAULT 0,
    runtime       INTEGER,
    tmdb_rating   REAL,
    tmdb_votes    INTEGER,
    imdb_id       TEXT NOT NULL DEFAULT '',
    imdb_rating   REAL,
    imdb_votes    TEXT NOT NULL DEFAULT '',
    language      TEXT NOT NULL DEFAULT '',
    country       TEXT NOT NULL DEFAULT '',
    production    TEXT NOT NULL DEFAULT '',
    actors        TEXT NOT NULL DEFAULT '',
    director      TEXT NOT NULL DEFAULT '',
    writer        TEXT NOT NULL DEFAULT '',
    status        TEXT NOT NULL DEFAULT '',
    box_office    TEXT NOT NULL DEFAULT '',
    source        TEXT NOT NULL
);
";

macro_rules! insert_sql {
    ($verb:literal) => {
        concat!(
            $verb,
            " INTO movies (external_id, title, original_title, year, released, genres, \
             overview, poster_url, popularity, runtime, tmdb_rating, tmdb_votes, imdb_id, \
             imdb_rating, imdb_votes, language, country, production, actors, director, writer, \
             status, box_office, source) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
             ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)"
        )
    };
}

const INSERT_OR_IGNORE: &str = insert_sql!("INSERT OR IGNORE");
const INSERT: &str = insert_sql!("INSERT");

fn execute_insert(stmt: &mut Statement<'_>, r: &CanonicalMovieRecord) -> rusqlite::Result<usize> {
    stmt.execute(params![
        r.external_id,
        r.title,
        r.original_title,
        r.release_year,
        r.released,
        r.genres_display(),
        r.overview,
        r.poster_url,
        r.popularity,
        r.runtime,
        r.external_rating,
        r.external_vote_count,
        r.imdb_id,
        r.imdb_rating,
        r.imdb_votes_display,
        r.language,
        r.country,
        r.production_display(),
        r.cast_display(),
        r.director_display(),
        r.writer_display(),
        r.release_status,
        r.revenue_display,
        r.source.to_string(),
    ])
}

/// The movie catalog in a SQLite database.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    ///
    /// # Errors
    /// Fails if the database cannot be opened or the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("open database {}", path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().context("open in-memory database")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("create movies table")?;
        Ok(Self { conn })
    }

    /// Stored title for `external_id`, if present.
    pub fn title_of(&self, external_id: i64) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT title FROM movies WHERE external_id = ?1",
                [external_id],
                |row| row.get(0),
            )
            .optional()
            .context("query movie title")
    }
}

impl MovieStore for SqliteStore {
    fn query_existing_ids(&self) -> Result<HashSet<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT external_id FROM movies")
            .context("prepare id query")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()
            .context("read existing ids")?;
        Ok(ids)
    }

    fn bulk_insert_ignore_conflicts(&mut self, records: &[CanonicalMovieRecord]) -> Result<usize> {
        let tx = self.conn.transaction().context("begin batch transaction")?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare_cached(INSERT_OR_IGNORE)?;
            for r in records {
                written += execute_insert(&mut stmt, r)
                    .with_context(|| format!("insert movie {}", r.external_id))?;
            }
        }
        tx.commit().context("commit batch transaction")?;
        Ok(written)
    }

    fn insert_one(&mut self, record: &CanonicalMovieRecord) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(INSERT)?;
        execute_insert(&mut stmt, record)
            .with_context(|| format!("insert movie {}", record.external_id))?;
        Ok(())
    }

    fn count(&self) -> Result<u64> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))
            .context("count movies")?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}
