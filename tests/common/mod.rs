#![allow(dead_code)]

use anyhow::Result;
use cineload::io::HierarchicalEntry;
use cineload::{CanonicalMovieRecord, FieldLimits, RawEntry, normalize};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const CSV_COLUMNS: &[&str] = &[
    "id",
    "title",
    "original_title",
    "release_date",
    "status",
    "vote_count",
    "vote_average",
    "popularity",
    "runtime",
    "revenue",
    "poster_path",
    "overview",
    "imdb_id",
    "imdb_rating",
    "imdb_vote_count",
    "genres",
    "cast",
    "crew",
    "production_companies",
    "production_countries",
    "spoken_languages",
];

/// One CSV row, every cell as raw text.
#[derive(Debug, Clone, Default)]
pub struct CsvMovie {
    pub id: String,
    pub title: String,
    pub original_title: String,
    pub release_date: String,
    pub status: String,
    pub vote_count: String,
    pub vote_average: String,
    pub popularity: String,
    pub runtime: String,
    pub revenue: String,
    pub poster_path: String,
    pub overview: String,
    pub imdb_id: String,
    pub imdb_rating: String,
    pub imdb_vote_count: String,
    pub genres: String,
    pub cast: String,
    pub crew: String,
    pub production_companies: String,
    pub production_countries: String,
    pub spoken_languages: String,
}

impl CsvMovie {
    /// A released, well-formed row.
    pub fn new(id: i64, title: &str, release_date: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            original_title: title.to_string(),
            release_date: release_date.to_string(),
            status: "Released".into(),
            vote_count: "500".into(),
            vote_average: "7.1".into(),
            popularity: "12.5".into(),
            runtime: "104".into(),
            revenue: "0".into(),
            poster_path: format!("/poster{id}.jpg"),
            overview: format!("Overview of {title}."),
            genres: r#"[{"id": 18, "name": "Drama"}]"#.into(),
            ..Default::default()
        }
    }

    fn fields(&self) -> [&str; 21] {
        [
            &self.id,
            &self.title,
            &self.original_title,
            &self.release_date,
            &self.status,
            &self.vote_count,
            &self.vote_average,
            &self.popularity,
            &self.runtime,
            &self.revenue,
            &self.poster_path,
            &self.overview,
            &self.imdb_id,
            &self.imdb_rating,
            &self.imdb_vote_count,
            &self.genres,
            &self.cast,
            &self.crew,
            &self.production_companies,
            &self.production_countries,
            &self.spoken_languages,
        ]
    }
}

pub fn write_csv(path: impl AsRef<Path>, rows: &[CsvMovie]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record(CSV_COLUMNS)?;
    for row in rows {
        w.write_record(row.fields())?;
    }
    w.flush()?;
    Ok(())
}

/// A JSON dump object with the fields the nested format carries.
pub fn json_movie(id: i64, title: &str, release_date: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "original_title": title,
        "release_date": release_date,
        "genre_ids": [18],
        "popularity": 10.0,
        "adult": false,
        "poster_path": format!("/p{id}.jpg"),
        "overview": "",
        "original_language": "en",
        "vote_average": 6.5,
        "vote_count": 120
    })
}

/// Newline-delimited JSON, one object per line.
pub fn ndjson(items: &[Value]) -> String {
    items
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A JSON array with one item per line, as dumps are usually written.
pub fn json_array(items: &[Value]) -> String {
    let body = items
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(",\n");
    format!("[\n{body}\n]\n")
}

pub fn write_text(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, contents)?;
    Ok(path)
}

pub fn write_gzip(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut enc = GzEncoder::new(std::fs::File::create(&path)?, Compression::default());
    enc.write_all(contents.as_bytes())?;
    enc.finish()?;
    Ok(path)
}

/// A valid canonical record, for pre-populating stores.
pub fn canonical(id: i64, title: &str) -> CanonicalMovieRecord {
    let entry = HierarchicalEntry {
        position: 0,
        id,
        title: title.to_string(),
        release_date: "2001-01-01".into(),
        popularity: 1.0,
        ..Default::default()
    };
    normalize(&RawEntry::Hierarchical(entry), &FieldLimits::CATALOG)
        .expect("fixture record is valid")
}
