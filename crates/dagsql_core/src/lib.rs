//! Runtime core for compiling SQL statements into a DAG of streaming tasks
//! and driving that DAG to completion.
//!
//! # Life of a job
//!
//! A `Context` is created per query, holding the raw query text, an optional
//! resolved `Schema` and the `TaskPlanner` used to create concrete tasks.
//!
//! `build_sql_job` parses the raw text, then dispatches the statement against
//! a `Visitor`. The default visitor is the `JobBuilder` itself. An override
//! visitor may be provided, falling back to the default for any statement it
//! returns `VisitStatus::Continue` for. Statements referencing more than one
//! source are compiled with one `SourceBuilder` per source, and stitched back
//! together into a join task.
//!
//! The compiled root task is then driven through `setup`, `run` and `close`.
//! Results are read from the drain, the outbound handoff of the last child of
//! the root task, while the job is running.
//!
//! Each task communicates with its neighbors only through bounded channels,
//! so a slow consumer applies backpressure all the way to the scans.
pub mod config;
pub mod context;
pub mod errlist;
pub mod errors;
pub mod exec;
pub mod expr;
pub mod plan;
pub mod rel;
pub mod scalar;
pub mod schema;

pub use context::Context;
pub use errors::{ExecError, Result};
pub use exec::job::{build_sql_job, build_sql_job_with, JobBuilder, JobRunner, JobState};
pub use exec::metadata::MetadataVisitor;
