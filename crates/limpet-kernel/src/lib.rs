//! limpet-kernel: the execution core of the limpet shell.
//!
//! This crate turns a raw command line into running operating-system
//! processes and reports the outcome back to an interactive loop:
//!
//! - **Lexer**: splits a line into word and operator tokens using logos
//! - **Parser**: builds a [`Pipeline`] of [`Stage`]s, resolving `<`, `>`,
//!   `>>` redirections and the trailing `&`
//! - **Variable store**: `$name` substitution with last-write-wins
//!   assignment
//! - **Scheduler**: pipeline execution over real pipes, plus the
//!   fixed-capacity background job table and its non-blocking sweep
//! - **Kernel**: the facade tying the pieces together
//!
//! The core is single-threaded and synchronous: the only concurrency is
//! the spawned processes themselves. A foreground pipeline blocks until
//! every stage has exited and yields the last stage's status; a
//! background pipeline returns at once and is reaped by
//! [`Kernel::reap_jobs`] between prompts.

pub mod ast;
pub mod kernel;
pub mod lexer;
pub mod parser;
pub mod scheduler;
pub mod vars;

pub use ast::{Pipeline, Redirect, Stage};
pub use kernel::{Kernel, ShellError};
pub use parser::ParseError;
pub use scheduler::job::{
    CompletedJob, JOB_TABLE_CAPACITY, JobId, JobInfo, JobTable, JobTableFull,
};
pub use vars::VarStore;
