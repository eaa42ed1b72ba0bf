//! Translation of raw entries into [`CanonicalMovieRecord`].
//!
//! This is the only place that knows the raw field names of both dumps. The
//! mapping is a pure function of the entry and the [`FieldLimits`]: the same
//! input always yields the same record or the same [`InvalidField`].

use crate::io::{HierarchicalEntry, RawEntry, TabularRow};
use crate::record::{
    CanonicalMovieRecord, FieldLimits, LIST_SEPARATOR, MAX_RELEASE_YEAR, MIN_RELEASE_YEAR,
    POSTER_BASE_URL, SourceFormat, genre_name, group_thousands, truncate_chars, truncate_list,
};
use crate::validation::{InvalidField, Validate, validators};

/// Normalize one raw entry, or report the first required field it lacks.
pub fn normalize(
    entry: &RawEntry,
    limits: &FieldLimits,
) -> Result<CanonicalMovieRecord, InvalidField> {
    let record = match entry {
        RawEntry::Tabular(row) => from_tabular(row, limits)?,
        RawEntry::Hierarchical(e) => from_hierarchical(e, limits)?,
    };
    record.validate()?;
    Ok(record)
}

/// Year from the first four characters of a `YYYY-MM-DD` style date.
pub fn release_year(date: &str) -> Result<i32, InvalidField> {
    let date = date.trim();
    let prefix: String = date.chars().take(4).collect();
    if prefix.chars().count() < 4 {
        return Err(InvalidField::MissingReleaseYear);
    }
    let year: i32 = prefix
        .parse()
        .map_err(|_| InvalidField::MissingReleaseYear)?;
    if !validators::in_range(year, MIN_RELEASE_YEAR, MAX_RELEASE_YEAR) {
        return Err(InvalidField::ReleaseYearOutOfRange);
    }
    Ok(year)
}

/// Absolute poster URL; relative paths get the CDN prefix.
pub fn poster_url(path: &str, max: usize) -> String {
    let path = path.trim();
    if path.is_empty() {
        return String::new();
    }
    if path.starts_with("http") {
        truncate_chars(path, max)
    } else {
        truncate_chars(&format!("{POSTER_BASE_URL}{path}"), max)
    }
}

/// `"$1,234,567"` for positive revenue, otherwise empty.
pub fn revenue_display(revenue: Option<i64>) -> String {
    match revenue {
        Some(r) if r > 0 => format!("${}", group_thousands(r)),
        _ => String::new(),
    }
}

fn title_of(title: &str, original_title: &str) -> Result<String, InvalidField> {
    [title, original_title]
        .into_iter()
        .find(|t| !validators::is_blank(t))
        .map(|t| t.trim().to_string())
        .ok_or(InvalidField::MissingTitle)
}

fn positive_id(id: Option<i64>) -> Result<i64, InvalidField> {
    id.filter(|id| *id > 0).ok_or(InvalidField::MissingId)
}

fn joined(items: &[String], max: usize) -> String {
    truncate_list(items.to_vec(), max).join(LIST_SEPARATOR)
}

fn from_tabular(row: &TabularRow, limits: &FieldLimits) -> Result<CanonicalMovieRecord, InvalidField> {
    let title = title_of(&row.title, &row.original_title)?;
    let release_year = release_year(&row.release_date)?;
    let external_id = positive_id(row.id)?;

    Ok(CanonicalMovieRecord {
        external_id,
        title: truncate_chars(&title, limits.title),
        original_title: truncate_chars(&row.original_title, limits.title),
        release_year,
        released: truncate_chars(&row.release_date, limits.released),
        genres: truncate_list(row.genres.clone(), limits.genres),
        overview: truncate_chars(&row.overview, limits.overview),
        poster_url: poster_url(&row.poster_path, limits.poster_url),
        popularity: row.popularity.unwrap_or(0.0),
        runtime: row.runtime.and_then(|r| i32::try_from(r).ok()),
        external_rating: row.vote_average,
        external_vote_count: row.vote_count,
        imdb_id: truncate_chars(&row.imdb_id, limits.imdb_id),
        imdb_rating: row.imdb_rating,
        imdb_votes_display: match row.imdb_vote_count {
            Some(v) if v != 0 => truncate_chars(&group_thousands(v), limits.imdb_votes),
            _ => String::new(),
        },
        language: joined(&row.languages, limits.language),
        country: joined(&row.countries, limits.country),
        production_companies: truncate_list(row.production_companies.clone(), limits.production),
        cast_names: truncate_list(row.cast.clone(), limits.cast),
        director_names: truncate_list(row.directors.clone(), limits.director),
        writer_names: truncate_list(row.writers.clone(), limits.writer),
        release_status: truncate_chars(&row.status, limits.status),
        revenue_display: truncate_chars(&revenue_display(row.revenue), limits.revenue),
        source: SourceFormat::Tabular,
    })
}

fn from_hierarchical(
    e: &HierarchicalEntry,
    limits: &FieldLimits,
) -> Result<CanonicalMovieRecord, InvalidField> {
    let title = title_of(&e.title, &e.original_title)?;
    let release_year = release_year(&e.release_date)?;
    let external_id = positive_id(Some(e.id))?;

    // Unknown genre codes are dropped.
    let genres = e
        .genre_ids
        .iter()
        .filter_map(|code| genre_name(*code))
        .map(str::to_string)
        .collect();

    Ok(CanonicalMovieRecord {
        external_id,
        title: truncate_chars(&title, limits.title),
        original_title: truncate_chars(&e.original_title, limits.title),
        release_year,
        released: truncate_chars(&e.release_date, limits.released),
        genres: truncate_list(genres, limits.genres),
        overview: truncate_chars(&e.overview, limits.overview),
        poster_url: poster_url(&e.poster_path, limits.poster_url),
        popularity: e.popularity,
        runtime: None,
        external_rating: e.vote_average,
        external_vote_count: e.vote_count,
        imdb_id: String::new(),
        imdb_rating: None,
        imdb_votes_display: String::new(),
        language: truncate_chars(&e.original_language, limits.language),
        country: String::new(),
        production_companies: Vec::new(),
        cast_names: Vec::new(),
        director_names: Vec::new(),
        writer_names: Vec::new(),
        release_status: String::new(),
        revenue_display: String::new(),
        source: SourceFormat::Hierarchical,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> HierarchicalEntry {
        HierarchicalEntry {
            position: 1,
            id: 603,
            title: "The Matrix".into(),
            original_title: "The Matrix".into(),
            release_date: "1999-03-30".into(),
            genre_ids: vec![28, 878, 4242],
            popularity: 80.5,
            poster_path: "/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg".into(),
            original_language: "en".into(),
            ..Default::default()
        }
    }

    #[test]
    fn hierarchical_entry_maps_to_canonical_shape() {
        let r = normalize(&RawEntry::Hierarchical(entry()), &FieldLimits::CATALOG).unwrap();
        assert_eq!(r.external_id, 603);
        assert_eq!(r.release_year, 1999);
        assert_eq!(r.genres, vec!["Action", "Science Fiction"]);
        assert_eq!(
            r.poster_url,
            "https://image.tmdb.org/t/p/w500/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg"
        );
        assert_eq!(r.language, "en");
        assert_eq!(r.runtime, None);
        assert_eq!(r.source, SourceFormat::Hierarchical);
    }

    #[test]
    fn release_year_rules() {
        assert_eq!(release_year("1999-03-30"), Ok(1999));
        assert_eq!(release_year("2100"), Ok(2100));
        assert_eq!(release_year(""), Err(InvalidField::MissingReleaseYear));
        assert_eq!(release_year("99"), Err(InvalidField::MissingReleaseYear));
        assert_eq!(release_year("n/a-01-01"), Err(InvalidField::MissingReleaseYear));
        assert_eq!(release_year("1850-01-01"), Err(InvalidField::ReleaseYearOutOfRange));
        assert_eq!(release_year("2101-01-01"), Err(InvalidField::ReleaseYearOutOfRange));
    }

    #[test]
    fn tabular_row_uses_original_title_and_display_strings() {
        let row = TabularRow {
            line: 2,
            id: Some(11),
            original_title: "Star Wars".into(),
            release_date: "1977-05-25".into(),
            status: "Released".into(),
            revenue: Some(775_398_007),
            imdb_vote_count: Some(1_412_345),
            poster_path: "http://cdn.example/p.jpg".into(),
            countries: vec!["United States of America".into()],
            languages: vec!["English".into(), "French".into()],
            ..Default::default()
        };
        let r = normalize(&RawEntry::Tabular(row), &FieldLimits::CATALOG).unwrap();
        assert_eq!(r.title, "Star Wars");
        assert_eq!(r.revenue_display, "$775,398,007");
        assert_eq!(r.imdb_votes_display, "1,412,345");
        assert_eq!(r.poster_url, "http://cdn.example/p.jpg");
        assert_eq!(r.language, "English, French");
        assert_eq!(r.country, "United States of America");
        assert_eq!(r.popularity, 0.0);
    }

    #[test]
    fn limits_are_applied_before_output() {
        let mut e = entry();
        e.title = "x".repeat(400);
        e.overview = "é".repeat(6000);
        let r = normalize(&RawEntry::Hierarchical(e), &FieldLimits::CATALOG).unwrap();
        assert_eq!(r.title.chars().count(), 255);
        assert_eq!(r.overview.chars().count(), 5000);
    }

    #[test]
    fn missing_identity_is_rejected() {
        let row = TabularRow {
            id: Some(0),
            title: "Zero".into(),
            release_date: "2001-01-01".into(),
            ..Default::default()
        };
        assert_eq!(
            normalize(&RawEntry::Tabular(row), &FieldLimits::CATALOG),
            Err(InvalidField::MissingId)
        );
        let mut e = entry();
        e.title.clear();
        e.original_title = "   ".into();
        assert_eq!(
            normalize(&RawEntry::Hierarchical(e), &FieldLimits::CATALOG),
            Err(InvalidField::MissingTitle)
        );
        assert_eq!(revenue_display(Some(0)), "");
    }
}
