//! Integration tests for glob patterns in `--file` arguments.

mod common;

use anyhow::Result;
use cineload::io::glob::{expand_glob, resolve_inputs};
use cineload::{ImportOptions, ImportSupervisor, MemoryStore};
use common::{json_movie, ndjson, write_text};
use std::fs::create_dir_all;
use tempfile::TempDir;

#[test]
fn pattern_expands_in_sorted_order() -> Result<()> {
    let dir = TempDir::new()?;
    let base = dir.path();
    for name in ["part-2.json", "part-1.json", "notes.txt"] {
        write_text(base, name, "")?;
    }
    create_dir_all(base.join("part-3.json"))?;

    let pattern = format!("{}/part-*.json", base.display());
    let got = expand_glob(&pattern)?;
    assert_eq!(got, vec![base.join("part-1.json"), base.join("part-2.json")]);
    Ok(())
}

#[test]
fn pattern_without_matches_is_fatal() -> Result<()> {
    let dir = TempDir::new()?;
    let pattern = format!("{}/*.csv", dir.path().display());
    let err = resolve_inputs(&[pattern]).unwrap_err();
    assert!(err.to_string().contains("no files found"));
    Ok(())
}

#[test]
fn repeated_inputs_are_read_once() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_text(
        dir.path(),
        "dump.json",
        &ndjson(&[json_movie(1, "One", "2001-01-01")]),
    )?;
    let literal = path.display().to_string();
    let pattern = format!("{}/*.json", dir.path().display());

    let inputs = resolve_inputs(&[literal, pattern])?;
    assert_eq!(inputs, vec![path]);
    Ok(())
}

#[test]
fn sharded_dump_imports_every_shard() -> Result<()> {
    let dir = TempDir::new()?;
    let base = dir.path();
    write_text(
        base,
        "shard-a.json",
        &ndjson(&[json_movie(1, "One", "2001-01-01"), json_movie(2, "Two", "2002-01-01")]),
    )?;
    write_text(
        base,
        "shard-b.json",
        &ndjson(&[json_movie(2, "Two", "2002-01-01"), json_movie(3, "Three", "2003-01-01")]),
    )?;

    let inputs = resolve_inputs(&[format!("{}/shard-*.json", base.display())])?;
    let options = ImportOptions {
        show_progress: false,
        ..Default::default()
    };
    let mut supervisor = ImportSupervisor::new(MemoryStore::new(), options);
    let summary = supervisor.run(&inputs)?;
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.skipped_existing, 1);
    Ok(())
}
