//! The canonical movie record and the static tables it is built from.
//!
//! Every input format is normalized into [`CanonicalMovieRecord`]. Field length
//! limits ([`FieldLimits`]) and the TMDB genre code table ([`GENRES`]) are
//! compile-time constants; there is no mutable module state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Earliest plausible release year (the first motion pictures).
pub const MIN_RELEASE_YEAR: i32 = 1888;
/// Latest release year accepted as plausible.
pub const MAX_RELEASE_YEAR: i32 = 2100;

/// Base URL prefixed to relative poster paths.
pub const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

/// Separator used when list fields are rendered as display strings.
pub const LIST_SEPARATOR: &str = ", ";

/// Which kind of dump a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Columnar CSV with embedded serialized sub-structures.
    Tabular,
    /// JSON array or newline-delimited JSON objects.
    Hierarchical,
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFormat::Tabular => f.write_str("tabular"),
            SourceFormat::Hierarchical => f.write_str("hierarchical"),
        }
    }
}

/// Maximum lengths (in characters) of the canonical text fields.
///
/// List fields are limited on their rendered, comma-joined form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    pub title: usize,
    pub genres: usize,
    pub overview: usize,
    pub poster_url: usize,
    pub language: usize,
    pub country: usize,
    pub production: usize,
    pub director: usize,
    pub writer: usize,
    pub cast: usize,
    pub imdb_id: usize,
    pub imdb_votes: usize,
    pub released: usize,
    pub revenue: usize,
    pub status: usize,
}

impl FieldLimits {
    /// The limits of the catalog's `movies` table.
    pub const CATALOG: FieldLimits = FieldLimits {
        title: 255,
        genres: 500,
        overview: 5000,
        poster_url: 500,
        language: 200,
        country: 200,
        production: 500,
        director: 500,
        writer: 500,
        cast: 1000,
        imdb_id: 50,
        imdb_votes: 100,
        released: 100,
        revenue: 100,
        status: 50,
    };
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self::CATALOG
    }
}

/// Caps on the number of names kept from embedded lists.
pub const MAX_CAST: usize = 10;
pub const MAX_DIRECTORS: usize = 3;
pub const MAX_WRITERS: usize = 3;
pub const MAX_COMPANIES: usize = 5;

/// TMDB genre codes, sorted by code for binary search.
pub const GENRES: &[(u32, &str)] = &[
    (12, "Adventure"),
    (14, "Fantasy"),
    (16, "Animation"),
    (18, "Drama"),
    (27, "Horror"),
    (28, "Action"),
    (35, "Comedy"),
    (36, "History"),
    (37, "Western"),
    (53, "Thriller"),
    (80, "Crime"),
    (99, "Documentary"),
    (878, "Science Fiction"),
    (9648, "Mystery"),
    (10402, "Music"),
    (10749, "Romance"),
    (10751, "Family"),
    (10752, "War"),
    (10770, "TV Movie"),
];

/// Look up a TMDB genre code. Unknown codes yield `None`.
pub fn genre_name(code: u32) -> Option<&'static str> {
    GENRES
        .binary_search_by_key(&code, |&(c, _)| c)
        .ok()
        .map(|i| GENRES[i].1)
}

/// The single normalized movie shape produced from either source format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalMovieRecord {
    /// Dataset-assigned identifier; the dedup key.
    pub external_id: i64,
    pub title: String,
    pub original_title: String,
    pub release_year: i32,
    /// Raw release date string as found in the source.
    pub released: String,
    pub genres: Vec<String>,
    pub overview: String,
    pub poster_url: String,
    pub popularity: f64,
    pub runtime: Option<i32>,
    pub external_rating: Option<f64>,
    pub external_vote_count: Option<i64>,
    pub imdb_id: String,
    pub imdb_rating: Option<f64>,
    pub imdb_votes_display: String,
    pub language: String,
    pub country: String,
    pub production_companies: Vec<String>,
    pub cast_names: Vec<String>,
    pub director_names: Vec<String>,
    pub writer_names: Vec<String>,
    pub release_status: String,
    pub revenue_display: String,
    pub source: SourceFormat,
}

impl CanonicalMovieRecord {
    /// Genres rendered the way the catalog stores them.
    pub fn genres_display(&self) -> String {
        self.genres.join(LIST_SEPARATOR)
    }

    pub fn cast_display(&self) -> String {
        self.cast_names.join(LIST_SEPARATOR)
    }

    pub fn director_display(&self) -> String {
        self.director_names.join(LIST_SEPARATOR)
    }

    pub fn writer_display(&self) -> String {
        self.writer_names.join(LIST_SEPARATOR)
    }

    pub fn production_display(&self) -> String {
        self.production_companies.join(LIST_SEPARATOR)
    }
}

/// Truncate `s` to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Keep whole items while their joined form fits in `max` characters.
///
/// If even the first item is too long it is cut to `max` and kept alone.
pub fn truncate_list(items: Vec<String>, max: usize) -> Vec<String> {
    let mut out = Vec::with_capacity(items.len());
    let mut used = 0usize;
    for item in items {
        let sep = if out.is_empty() { 0 } else { LIST_SEPARATOR.len() };
        let len = item.chars().count();
        if used + sep + len > max {
            if out.is_empty() && max > 0 {
                out.push(truncate_chars(&item, max));
            }
            break;
        }
        used += sep + len;
        out.push(item);
    }
    out
}

/// Format an integer with thousands separators (`1234567` -> `"1,234,567"`).
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
