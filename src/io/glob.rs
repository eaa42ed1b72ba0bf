//! Expansion of `--file` arguments into concrete dataset paths.
//!
//! An argument containing glob metacharacters (`*`, `?`, `[`) is expanded and
//! its matches are imported in sorted order; any other argument is taken as a
//! literal path and must exist.

use anyhow::{Context, Result, bail};
use glob::glob;
use std::path::PathBuf;

fn is_pattern(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

/// Expand a glob pattern into a sorted list of matching files.
///
/// Directories are ignored. No match yields an empty vector.
///
/// # Errors
/// Returns an error if the pattern is invalid or a matched entry cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Resolve every input argument, preserving argument order.
///
/// A file reached through two arguments is imported once.
///
/// # Errors
/// A literal path that does not exist, or a pattern with no matches, is a
/// fatal configuration error.
pub fn resolve_inputs(args: &[String]) -> Result<Vec<PathBuf>> {
    let mut out: Vec<PathBuf> = Vec::new();
    for arg in args {
        let matches = if is_pattern(arg) {
            let m = expand_glob(arg)?;
            if m.is_empty() {
                bail!("no files found matching pattern: {arg}");
            }
            m
        } else {
            let p = PathBuf::from(arg);
            if !p.is_file() {
                bail!("file not found: {}", p.display());
            }
            vec![p]
        };
        for p in matches {
            if !out.contains(&p) {
                out.push(p);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_literals_and_patterns() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let a = tmp.path().join("a.csv");
        let b = tmp.path().join("b.csv");
        fs::write(&a, "id,title\n")?;
        fs::write(&b, "id,title\n")?;

        let pattern = tmp.path().join("*.csv").to_string_lossy().into_owned();
        let literal = b.to_string_lossy().into_owned();
        let got = resolve_inputs(&[literal, pattern])?;
        assert_eq!(got, vec![b, a]);
        Ok(())
    }

    #[test]
    fn missing_literal_is_fatal() {
        let err = resolve_inputs(&["/definitely/not/here.csv".to_string()]).unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
