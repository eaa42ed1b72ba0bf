//! # cineload
//!
//! Bulk import of third-party movie metadata dumps into a movie catalog.
//!
//! Dumps run to millions of records and hundreds of megabytes, come in two
//! structurally different shapes, and are often gzip-compressed. `cineload`
//! streams them under bounded memory, normalizes both shapes into one
//! [`CanonicalMovieRecord`], and writes each external id at most once, across
//! repeated and interrupted runs.
//!
//! ## Key Features
//!
//! - **Two input formats** - columnar CSV with serialized sub-structures in
//!   single cells, and JSON (one array or newline-delimited objects)
//! - **Streaming** - one entry, one record, and one pending batch in memory
//! - **Transparent decompression** - gzip by extension or magic bytes; zstd
//!   behind the `compression-zstd` feature
//! - **Idempotent** - a dedup index seeded from the store plus conflict-ignoring
//!   batch inserts
//! - **Resilient** - malformed rows are classified and counted, never fatal
//! - **Graceful interruption** - the pending batch is still committed
//!
//! ## Quick Start
//!
//! ```no_run
//! use cineload::{ImportOptions, ImportSupervisor, SqliteStore};
//! use std::path::PathBuf;
//!
//! # fn main() -> anyhow::Result<()> {
//! let store = SqliteStore::open("catalog.db")?;
//! let mut supervisor = ImportSupervisor::new(store, ImportOptions::default());
//!
//! let summary = supervisor.run(&[PathBuf::from("movie-list.json.gz")])?;
//! summary.print();
//! assert!(summary.is_consistent());
//! # Ok(())
//! # }
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! file -> detect -> {tabular | hierarchical} reader -> normalize
//!      -> dedup (accept / reject) -> batch committer -> store
//! ```
//!
//! Every entry rejected before the store is a [`SkipReason`]: a parse error,
//! an invalid record, a filtered record or an existing id. Records the store
//! refuses even one at a time are counted from the committer's outcome.
//! Errors in the `anyhow` sense are reserved for fatal problems found before
//! streaming starts (missing file, unopenable store, failed download).
//!
//! ## Module Overview
//!
//! - [`record`] - the canonical record, field limits, genre table
//! - [`detect`] - tabular vs. hierarchical classification
//! - [`io`] - readers, decompression, input globbing
//! - [`embedded`] - decoding of serialized cell contents
//! - [`normalize`] - raw entry to canonical record
//! - [`validation`] - skip taxonomy, `Validate`, reject log
//! - [`dedup`] - in-run id index
//! - [`store`] - storage trait, SQLite and in-memory stores
//! - [`commit`] - batching with per-record fallback
//! - [`supervisor`] - the run state machine and cancellation
//! - [`metrics`] - counters, throughput, summary
//! - [`config`] - run options
//! - [`download`] - optional dataset download
//! - [`logging`] - tracing setup for the binary

pub mod commit;
pub mod config;
pub mod dedup;
pub mod detect;
pub mod download;
pub mod embedded;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod normalize;
pub mod record;
pub mod store;
pub mod supervisor;
pub mod validation;

pub use commit::{BatchCommitter, BatchOutcome};
pub use config::{ImportFilters, ImportOptions};
pub use dedup::DeduplicationIndex;
pub use detect::detect_format;
pub use io::{RawEntry, RecordSource, open_source};
pub use metrics::{ImportStats, ImportSummary};
pub use normalize::normalize;
pub use record::{CanonicalMovieRecord, FieldLimits, SourceFormat};
pub use store::{MemoryStore, MovieStore, SqliteStore};
pub use supervisor::{CancelToken, ImportState, ImportSupervisor};
pub use validation::{FilterReason, InvalidField, SkipReason, Validate};
