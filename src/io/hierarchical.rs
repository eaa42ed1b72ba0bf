//! Streaming reader for the nested (JSON) dump.
//!
//! Two layouts are accepted, optionally gzip-compressed:
//!
//! - a single JSON array of movie objects, read item by item without loading
//!   the array ([`StreamStrategy::Incremental`]);
//! - newline-delimited objects ([`StreamStrategy::Lines`]). Per line a leading
//!   `[`, a trailing `]` and trailing commas are tolerated, so an array written
//!   one object per line is also readable this way.
//!
//! If incremental extraction hits malformed JSON the reader reports that item
//! as a parse error, re-opens the file and recovers in line mode. While
//! recovering, only lines holding a whole object are entries; fragments of
//! pretty-printed items are skipped without being counted, and objects already
//! produced before the switch are not produced twice.

use crate::config::ImportFilters;
use crate::io::compression::open_decompressed;
use crate::io::{RawEntry, RecordSource};
use crate::record::SourceFormat;
use crate::validation::{FilterReason, InvalidField, Skip};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt::Display;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One decoded movie object. Id and title presence are already checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchicalEntry {
    pub position: u64,
    pub id: i64,
    pub title: String,
    pub original_title: String,
    pub release_date: String,
    pub genre_ids: Vec<u32>,
    pub popularity: f64,
    pub adult: bool,
    pub poster_path: String,
    pub overview: String,
    pub original_language: String,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
}

fn int_of(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float_of(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    f.filter(|f| f.is_finite())
}

fn text_of(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn flag_of(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().is_some_and(|i| i != 0),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        _ => false,
    }
}

impl HierarchicalEntry {
    /// Build an entry from a JSON object, requiring an id and a title or
    /// original title.
    pub fn from_object(position: u64, obj: &Map<String, Value>) -> Result<Self, InvalidField> {
        let id = obj.get("id").and_then(int_of).ok_or(InvalidField::MissingId)?;
        let title = text_of(obj.get("title"));
        let original_title = text_of(obj.get("original_title"));
        if title.is_empty() && original_title.is_empty() {
            return Err(InvalidField::MissingTitle);
        }
        let genre_ids = match obj.get("genre_ids") {
            Some(Value::Array(ids)) => ids
                .iter()
                .filter_map(int_of)
                .filter_map(|g| u32::try_from(g).ok())
                .collect(),
            _ => Vec::new(),
        };
        Ok(Self {
            position,
            id,
            title,
            original_title,
            release_date: text_of(obj.get("release_date")),
            genre_ids,
            popularity: obj.get("popularity").and_then(float_of).unwrap_or(0.0),
            adult: flag_of(obj.get("adult")),
            poster_path: text_of(obj.get("poster_path")),
            overview: text_of(obj.get("overview")),
            original_language: text_of(obj.get("original_language")),
            vote_average: obj.get("vote_average").and_then(float_of),
            vote_count: obj.get("vote_count").and_then(int_of),
        })
    }

    /// `include_adult` and `min_popularity`, in that order.
    pub fn filter_reason(&self, filters: &ImportFilters) -> Option<FilterReason> {
        if self.adult && !filters.include_adult {
            return Some(FilterReason::Adult);
        }
        if self.popularity < filters.min_popularity {
            return Some(FilterReason::Unpopular);
        }
        None
    }
}

/// How the reader is currently walking the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStrategy {
    /// Item-by-item extraction from a top-level JSON array.
    Incremental,
    /// One JSON object per line.
    Lines,
}

enum Step {
    Yield(Result<RawEntry, Skip>),
    Again,
    End,
}

/// Skip ASCII whitespace (and a UTF-8 BOM) and peek at the next byte.
fn peek_significant(input: &mut dyn BufRead) -> io::Result<Option<u8>> {
    loop {
        let buf = input.fill_buf()?;
        if buf.is_empty() {
            return Ok(None);
        }
        let skip = buf
            .iter()
            .take_while(|b| b.is_ascii_whitespace() || matches!(b, 0xEF | 0xBB | 0xBF))
            .count();
        if skip < buf.len() {
            let next = buf[skip];
            input.consume(skip);
            return Ok(Some(next));
        }
        input.consume(skip);
    }
}

/// Strip array punctuation around a single object on one line.
fn unwrap_line(line: &str) -> &str {
    let mut s = line.trim();
    if let Some(rest) = s.strip_prefix('[') {
        s = rest.trim_start();
    }
    if let Some(rest) = s.strip_suffix(',') {
        s = rest.trim_end();
    }
    if let Some(rest) = s.strip_suffix(']')
        && rest.trim_end().ends_with('}')
    {
        s = rest.trim_end();
    }
    if let Some(rest) = s.strip_suffix(',') {
        s = rest.trim_end();
    }
    s
}

fn entry_from_value(position: u64, value: Value) -> Result<RawEntry, Skip> {
    let Value::Object(map) = value else {
        return Err(Skip::parse(position, "entry is not a JSON object"));
    };
    HierarchicalEntry::from_object(position, &map)
        .map(RawEntry::Hierarchical)
        .map_err(|field| Skip::invalid(position, field))
}

/// Streaming [`RecordSource`] over a JSON dump.
pub struct HierarchicalReader {
    path: PathBuf,
    label: String,
    input: Box<dyn BufRead>,
    strategy: StreamStrategy,
    /// Item index (incremental) or line number (lines).
    position: u64,
    /// Values decoded in incremental mode.
    decoded: u64,
    /// Objects still to be dropped after switching to line mode.
    suppress: u64,
    /// Line mode entered from a malformed array rather than chosen at open.
    recovering: bool,
    line: Vec<u8>,
    done: bool,
}

impl HierarchicalReader {
    /// Open `path` and choose a strategy from its first significant byte.
    ///
    /// # Errors
    /// Fails if the file cannot be opened or read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut input = open_decompressed(path)?;
        let first = peek_significant(&mut input)
            .with_context(|| format!("read {}", path.display()))?;

        let strategy = if first == Some(b'[') {
            input.consume(1);
            StreamStrategy::Incremental
        } else {
            // Start over so line numbers count from the top of the file.
            input = open_decompressed(path)?;
            StreamStrategy::Lines
        };
        debug!(source = %path.display(), ?strategy, "opened JSON dump");

        Ok(Self {
            path: path.to_path_buf(),
            label: path.display().to_string(),
            input,
            strategy,
            position: 0,
            decoded: 0,
            suppress: 0,
            recovering: false,
            line: Vec::new(),
            done: false,
        })
    }

    pub fn strategy(&self) -> StreamStrategy {
        self.strategy
    }

    fn fail_io(&mut self, err: impl Display) -> Step {
        self.done = true;
        Step::Yield(Err(Skip::parse(
            self.position + 1,
            format!("read error: {err}"),
        )))
    }

    /// Switch to line mode. `failed_item` is set when a specific array item
    /// could not be decoded; it is reported once here.
    fn fall_back(&mut self, reason: impl Display, failed_item: bool) -> Step {
        let item = self.position + 1;
        warn!(
            source = %self.label,
            item,
            %reason,
            "malformed JSON array, re-reading as line-delimited JSON"
        );
        match open_decompressed(&self.path) {
            Ok(input) => {
                self.input = input;
                self.strategy = StreamStrategy::Lines;
                self.recovering = true;
                self.suppress = self.decoded;
                self.position = 0;
                if failed_item {
                    Step::Yield(Err(Skip::parse(
                        item,
                        format!("malformed array item: {reason}"),
                    )))
                } else {
                    Step::Again
                }
            }
            Err(e) => self.fail_io(format!("{e:#}")),
        }
    }

    fn next_array_item(&mut self) -> Step {
        let next = match peek_significant(&mut self.input) {
            Ok(next) => next,
            Err(e) => return self.fail_io(e),
        };
        match next {
            Some(b',') => {
                self.input.consume(1);
                Step::Again
            }
            Some(b']') => {
                self.input.consume(1);
                Step::End
            }
            None => self.fall_back("array is not terminated", false),
            Some(_) => {
                let parsed = {
                    let mut de = serde_json::Deserializer::from_reader(&mut self.input);
                    Value::deserialize(&mut de)
                };
                match parsed {
                    Ok(value) => {
                        self.decoded += 1;
                        self.position += 1;
                        Step::Yield(entry_from_value(self.position, value))
                    }
                    Err(e) if e.is_io() => self.fail_io(e),
                    Err(e) => self.fall_back(e, true),
                }
            }
        }
    }

    fn next_line_item(&mut self) -> Step {
        self.line.clear();
        match self.input.read_until(b'\n', &mut self.line) {
            Ok(0) => Step::End,
            Err(e) => self.fail_io(e),
            Ok(_) => {
                self.position += 1;
                let text = String::from_utf8_lossy(&self.line);
                let body = unwrap_line(&text);
                if matches!(body, "" | "[" | "]") {
                    return Step::Again;
                }
                if self.recovering && !body.starts_with('{') {
                    return Step::Again;
                }
                match serde_json::from_str::<Value>(body) {
                    Ok(Value::Object(_)) if self.suppress > 0 => {
                        self.suppress -= 1;
                        Step::Again
                    }
                    Ok(value) => Step::Yield(entry_from_value(self.position, value)),
                    Err(_) if self.recovering => Step::Again,
                    Err(e) => Step::Yield(Err(Skip::parse(self.position, e.to_string()))),
                }
            }
        }
    }
}

impl RecordSource for HierarchicalReader {
    fn format(&self) -> SourceFormat {
        SourceFormat::Hierarchical
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn next_entry(&mut self) -> Option<Result<RawEntry, Skip>> {
        loop {
            if self.done {
                return None;
            }
            let step = match self.strategy {
                StreamStrategy::Incremental => self.next_array_item(),
                StreamStrategy::Lines => self.next_line_item(),
            };
            match step {
                Step::Yield(item) => return Some(item),
                Step::Again => continue,
                Step::End => self.done = true,
            }
        }
    }

    fn filter(&self, entry: &RawEntry, filters: &ImportFilters) -> Option<FilterReason> {
        match entry {
            RawEntry::Hierarchical(e) => e.filter_reason(filters),
            RawEntry::Tabular(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn drain(reader: &mut HierarchicalReader) -> (Vec<i64>, Vec<Skip>) {
        let mut ids = Vec::new();
        let mut skips = Vec::new();
        while let Some(item) = reader.next_entry() {
            match item {
                Ok(RawEntry::Hierarchical(e)) => ids.push(e.id),
                Ok(other) => panic!("unexpected entry {other:?}"),
                Err(s) => skips.push(s),
            }
        }
        (ids, skips)
    }

    #[test]
    fn line_punctuation_is_stripped() {
        assert_eq!(unwrap_line(r#"[{"id": 1},"#), r#"{"id": 1}"#);
        assert_eq!(unwrap_line(r#"  {"id": 2}]  "#), r#"{"id": 2}"#);
        assert_eq!(unwrap_line(r#"{"ids": [1, 2]}"#), r#"{"ids": [1, 2]}"#);
        assert_eq!(unwrap_line("]"), "]");
    }

    #[test]
    fn from_object_is_lenient() {
        let v = json!({
            "id": "603",
            "original_title": "The Matrix",
            "genre_ids": [28, "878", -1],
            "adult": 0,
            "popularity": "41.5"
        });
        let Value::Object(map) = v else { unreachable!() };
        let e = HierarchicalEntry::from_object(7, &map).unwrap();
        assert_eq!(e.id, 603);
        assert_eq!(e.title, "");
        assert_eq!(e.original_title, "The Matrix");
        assert_eq!(e.genre_ids, vec![28, 878]);
        assert!(!e.adult);
        assert_eq!(e.popularity, 41.5);
    }

    #[test]
    fn from_object_requires_id_and_title() {
        let Value::Object(no_id) = json!({"title": "x"}) else { unreachable!() };
        assert_eq!(
            HierarchicalEntry::from_object(1, &no_id),
            Err(InvalidField::MissingId)
        );
        let Value::Object(no_title) = json!({"id": 1, "title": " "}) else { unreachable!() };
        assert_eq!(
            HierarchicalEntry::from_object(1, &no_title),
            Err(InvalidField::MissingTitle)
        );
    }

    #[test]
    fn reads_array_incrementally() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("list.json");
        fs::write(
            &path,
            r#" [ {"id": 1, "title": "A"}, {"id": 2, "title": "B"}, 5, {"title": "no id"} ] "#,
        )?;
        let mut reader = HierarchicalReader::open(&path)?;
        assert_eq!(reader.strategy(), StreamStrategy::Incremental);
        let (ids, skips) = drain(&mut reader);
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(skips.len(), 2);
        assert_eq!(skips[1].position, 4);
        Ok(())
    }

    #[test]
    fn malformed_array_falls_back_without_repeats() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("list.json");
        fs::write(
            &path,
            "[\n{\"id\": 1, \"title\": \"A\"},\n{\"id\": 2, \"title\": \"B\"},\n{\"id\": 3, \"title\": oops},\n{\"id\": 4, \"title\": \"D\"}\n]\n",
        )?;
        let mut reader = HierarchicalReader::open(&path)?;
        let (ids, skips) = drain(&mut reader);
        assert_eq!(reader.strategy(), StreamStrategy::Lines);
        assert_eq!(ids, vec![1, 2, 4]);
        assert_eq!(skips.len(), 1);
        // Reported by item index, not by line.
        assert_eq!(skips[0].position, 3);
        Ok(())
    }

    #[test]
    fn recovery_skips_fragments_of_pretty_items() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("list.json");
        let good = serde_json::to_string_pretty(&json!([
            {"id": 1, "title": "A", "genre_ids": [18, 28], "extra": {}},
            {"id": 2, "title": "B", "genre_ids": [12]}
        ]))?;
        let body = format!(
            "{},\n  {{\n    \"id\": 3,\n    \"title\": oops\n  }}\n]\n",
            good.trim_end().trim_end_matches(']').trim_end()
        );
        fs::write(&path, body)?;

        let mut reader = HierarchicalReader::open(&path)?;
        let (ids, skips) = drain(&mut reader);
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(skips.len(), 1);
        assert_eq!(skips[0].position, 3);
        Ok(())
    }

    #[test]
    fn plain_line_mode_still_counts_bad_lines() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("dump.json");
        fs::write(&path, "{\"id\": 1, \"title\": \"A\"}\nnot json\n[1, 2]\n")?;

        let mut reader = HierarchicalReader::open(&path)?;
        assert_eq!(reader.strategy(), StreamStrategy::Lines);
        let (ids, skips) = drain(&mut reader);
        assert_eq!(ids, vec![1]);
        assert_eq!(skips.len(), 2);
        Ok(())
    }

    #[test]
    fn filters_adult_before_popularity() {
        let e = HierarchicalEntry {
            adult: true,
            popularity: 0.1,
            ..Default::default()
        };
        let mut f = ImportFilters {
            min_popularity: 1.0,
            ..Default::default()
        };
        assert_eq!(e.filter_reason(&f), Some(FilterReason::Adult));
        f.include_adult = true;
        assert_eq!(e.filter_reason(&f), Some(FilterReason::Unpopular));
        f.min_popularity = 0.0;
        assert_eq!(e.filter_reason(&f), None);
    }
}
