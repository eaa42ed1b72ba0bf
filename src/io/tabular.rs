//! Streaming reader for the columnar (CSV) dump.
//!
//! The reader holds one [`csv::ByteRecord`] and reuses it for every row, so
//! memory stays flat regardless of file size. Each row is decoded into a
//! [`TabularRow`]:
//!
//! - scalar cells are coerced defensively: anything that fails to parse as the
//!   expected number becomes `None`;
//! - cells holding serialized sub-structures (genres, cast, crew, production
//!   companies, countries, spoken languages) are decoded through
//!   [`crate::embedded::decode`]; a cell nothing can decode is simply empty;
//! - invalid UTF-8 is replaced rather than rejected.
//!
//! Required-field checks happen later, in the normalizer. The reader only
//! produces a [`Skip`] when the CSV layer itself cannot deliver a record.

use crate::config::ImportFilters;
use crate::embedded::{self, CrewNames};
use crate::io::compression::open_decompressed;
use crate::io::{RawEntry, RecordSource};
use crate::record::{MAX_CAST, MAX_COMPANIES, MAX_DIRECTORS, MAX_WRITERS, SourceFormat};
use crate::validation::{FilterReason, Skip};
use anyhow::{Context, Result, bail};
use csv::{ByteRecord, ErrorKind, ReaderBuilder};
use std::borrow::Cow;
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

/// One CSV row with typed scalars and decoded sub-structures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularRow {
    pub line: u64,
    pub id: Option<i64>,
    pub title: String,
    pub original_title: String,
    pub release_date: String,
    pub status: String,
    pub vote_count: Option<i64>,
    pub vote_average: Option<f64>,
    pub popularity: Option<f64>,
    pub runtime: Option<i64>,
    pub revenue: Option<i64>,
    pub poster_path: String,
    pub overview: String,
    pub imdb_id: String,
    pub imdb_rating: Option<f64>,
    pub imdb_vote_count: Option<i64>,
    pub genres: Vec<String>,
    pub cast: Vec<String>,
    pub directors: Vec<String>,
    pub writers: Vec<String>,
    pub production_companies: Vec<String>,
    pub countries: Vec<String>,
    pub languages: Vec<String>,
}

impl TabularRow {
    /// `only_released` and `min_votes`, in that order.
    pub fn filter_reason(&self, filters: &ImportFilters) -> Option<FilterReason> {
        if filters.only_released && !self.status.trim().eq_ignore_ascii_case("released") {
            return Some(FilterReason::Unreleased);
        }
        if filters.min_votes > 0 && self.vote_count.unwrap_or(0) < filters.min_votes {
            return Some(FilterReason::LowVotes);
        }
        None
    }
}

/// Column positions resolved from the header row.
#[derive(Debug, Default)]
struct Columns {
    id: Option<usize>,
    title: Option<usize>,
    original_title: Option<usize>,
    release_date: Option<usize>,
    status: Option<usize>,
    vote_count: Option<usize>,
    vote_average: Option<usize>,
    popularity: Option<usize>,
    runtime: Option<usize>,
    revenue: Option<usize>,
    poster_path: Option<usize>,
    overview: Option<usize>,
    imdb_id: Option<usize>,
    imdb_rating: Option<usize>,
    imdb_vote_count: Option<usize>,
    genres: Option<usize>,
    cast: Option<usize>,
    crew: Option<usize>,
    production_companies: Option<usize>,
    production_countries: Option<usize>,
    spoken_languages: Option<usize>,
}

impl Columns {
    fn from_header(header: &ByteRecord) -> Result<Self> {
        let mut cols = Columns::default();
        for (i, raw) in header.iter().enumerate() {
            let name = String::from_utf8_lossy(raw);
            let name = name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase();
            let slot = match name.as_str() {
                "id" => &mut cols.id,
                "title" => &mut cols.title,
                "original_title" => &mut cols.original_title,
                "release_date" => &mut cols.release_date,
                "status" => &mut cols.status,
                "vote_count" => &mut cols.vote_count,
                "vote_average" => &mut cols.vote_average,
                "popularity" => &mut cols.popularity,
                "runtime" => &mut cols.runtime,
                "revenue" => &mut cols.revenue,
                "poster_path" => &mut cols.poster_path,
                "overview" => &mut cols.overview,
                "imdb_id" => &mut cols.imdb_id,
                "imdb_rating" => &mut cols.imdb_rating,
                "imdb_vote_count" => &mut cols.imdb_vote_count,
                "genres" => &mut cols.genres,
                "cast" => &mut cols.cast,
                "crew" => &mut cols.crew,
                "production_companies" => &mut cols.production_companies,
                "production_countries" => &mut cols.production_countries,
                "spoken_languages" => &mut cols.spoken_languages,
                _ => continue,
            };
            slot.get_or_insert(i);
        }
        if cols.id.is_none() {
            bail!("missing required column 'id'");
        }
        if cols.title.is_none() && cols.original_title.is_none() {
            bail!("missing required column 'title'");
        }
        if cols.release_date.is_none() {
            bail!("missing required column 'release_date'");
        }
        Ok(cols)
    }
}

/// Cells that pandas-style exporters write for missing values.
fn is_null_marker(s: &str) -> bool {
    matches!(s, "nan" | "NaN" | "None" | "null" | "NULL")
}

fn text(record: &ByteRecord, idx: Option<usize>) -> Cow<'_, str> {
    let Some(raw) = idx.and_then(|i| record.get(i)) else {
        return Cow::Borrowed("");
    };
    let s = String::from_utf8_lossy(raw);
    if is_null_marker(s.trim()) {
        Cow::Borrowed("")
    } else {
        s
    }
}

/// Parse a float; unparseable, empty or non-finite values are absent.
pub fn safe_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integer, accepting float spellings such as `"120.0"`.
pub fn safe_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    safe_float(s)
        .filter(|v| *v >= i64::MIN as f64 && *v <= i64::MAX as f64)
        .map(|v| v.trunc() as i64)
}

/// Streaming [`RecordSource`] over a CSV dump.
pub struct TabularReader {
    label: String,
    reader: csv::Reader<Box<dyn BufRead>>,
    columns: Columns,
    record: ByteRecord,
    done: bool,
}

impl TabularReader {
    /// Open `path` (optionally compressed) and resolve its header.
    ///
    /// # Errors
    /// Fails if the file cannot be opened, the header cannot be read, or the
    /// header lacks the id, title, or release date columns.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = open_decompressed(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);
        let header = reader
            .byte_headers()
            .with_context(|| format!("read CSV header of {}", path.display()))?
            .clone();
        let columns = Columns::from_header(&header)
            .with_context(|| format!("unsupported CSV layout in {}", path.display()))?;
        Ok(Self {
            label: path.display().to_string(),
            reader,
            columns,
            record: ByteRecord::new(),
            done: false,
        })
    }

    fn decode_row(&self, line: u64) -> TabularRow {
        let r = &self.record;
        let c = &self.columns;

        let genres = embedded::decode(&text(r, c.genres));
        let cast = embedded::decode(&text(r, c.cast));
        let crew = embedded::decode(&text(r, c.crew));
        let companies = embedded::decode(&text(r, c.production_companies));
        let countries = embedded::decode(&text(r, c.production_countries));
        let languages = embedded::decode(&text(r, c.spoken_languages));
        let CrewNames { directors, writers } =
            embedded::crew(crew.as_ref(), MAX_DIRECTORS, MAX_WRITERS);

        TabularRow {
            line,
            id: safe_int(&text(r, c.id)),
            title: text(r, c.title).trim().to_string(),
            original_title: text(r, c.original_title).trim().to_string(),
            release_date: text(r, c.release_date).trim().to_string(),
            status: text(r, c.status).trim().to_string(),
            vote_count: safe_int(&text(r, c.vote_count)),
            vote_average: safe_float(&text(r, c.vote_average)),
            popularity: safe_float(&text(r, c.popularity)),
            runtime: safe_int(&text(r, c.runtime)),
            revenue: safe_int(&text(r, c.revenue)),
            poster_path: text(r, c.poster_path).trim().to_string(),
            overview: text(r, c.overview).trim().to_string(),
            imdb_id: text(r, c.imdb_id).trim().to_string(),
            imdb_rating: safe_float(&text(r, c.imdb_rating)),
            imdb_vote_count: safe_int(&text(r, c.imdb_vote_count)),
            genres: embedded::names(genres.as_ref(), &["name"], usize::MAX),
            cast: embedded::names(cast.as_ref(), &["name"], MAX_CAST),
            directors,
            writers,
            production_companies: embedded::names(companies.as_ref(), &["name"], MAX_COMPANIES),
            countries: embedded::names(countries.as_ref(), &["name", "iso_3166_1"], usize::MAX),
            languages: embedded::names(
                languages.as_ref(),
                &["english_name", "name", "iso_639_1"],
                usize::MAX,
            ),
        }
    }
}

impl RecordSource for TabularReader {
    fn format(&self) -> SourceFormat {
        SourceFormat::Tabular
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn next_entry(&mut self) -> Option<Result<RawEntry, Skip>> {
        if self.done {
            return None;
        }
        match self.reader.read_byte_record(&mut self.record) {
            Ok(false) => {
                self.done = true;
                None
            }
            Ok(true) => {
                let line = self.record.position().map_or(0, |p| p.line());
                Some(Ok(RawEntry::Tabular(self.decode_row(line))))
            }
            Err(e) => {
                let line = e.position().map_or(0, |p| p.line());
                // An I/O failure (e.g. a truncated gzip stream) will not recover.
                if matches!(e.kind(), ErrorKind::Io(_)) {
                    self.done = true;
                }
                debug!(source = %self.label, line, error = %e, "unreadable CSV record");
                Some(Err(Skip::parse(line, e.to_string())))
            }
        }
    }

    fn filter(&self, entry: &RawEntry, filters: &ImportFilters) -> Option<FilterReason> {
        match entry {
            RawEntry::Tabular(row) => row.filter_reason(filters),
            RawEntry::Hierarchical(_) => None,
        }
    }
}
