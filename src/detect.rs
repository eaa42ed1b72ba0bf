//! Classification of a dataset file as tabular or hierarchical.

use crate::io::compression::open_decompressed;
use crate::record::SourceFormat;
use std::io::BufRead;
use std::path::Path;

/// Decide which reader handles `path`.
///
/// `.csv` is tabular; `.json` and `.json.gz` are hierarchical. Anything else is
/// decided from its first line: a comma-separated header with an id-like column
/// is tabular. Unknown or unreadable content is hierarchical; this never fails.
pub fn detect_format(path: impl AsRef<Path>) -> SourceFormat {
    let path = path.as_ref();
    let name = path.to_string_lossy().to_lowercase();
    if name.ends_with(".csv") {
        return SourceFormat::Tabular;
    }
    if name.ends_with(".json") || name.ends_with(".json.gz") {
        return SourceFormat::Hierarchical;
    }
    match first_line(path) {
        Some(line) if looks_like_header(&line) => SourceFormat::Tabular,
        _ => SourceFormat::Hierarchical,
    }
}

fn first_line(path: &Path) -> Option<String> {
    let mut input = open_decompressed(path).ok()?;
    let mut buf = Vec::new();
    input.read_until(b'\n', &mut buf).ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}

/// A comma-separated line with an `id` column, the one key the tabular reader
/// cannot do without.
pub fn looks_like_header(line: &str) -> bool {
    let line = line.trim().trim_start_matches('\u{feff}');
    if line.starts_with('{') || line.starts_with('[') || !line.contains(',') {
        return false;
    }
    line.split(',').any(|field| {
        let col = field.trim().trim_matches('"').to_ascii_lowercase();
        col == "id"
    })
}
