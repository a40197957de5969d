//! The kernel facade: session state plus the entry points an interactive
//! loop calls.
//!
//! One `Kernel` is created at session start and dropped at session end;
//! it owns the variable store and the job table, so there are no
//! process-wide singletons. All methods run on the calling thread — the
//! only blocking ones are foreground pipeline waits.

use thiserror::Error;

use crate::ast::Pipeline;
use crate::lexer::{self, Spanned, Token};
use crate::parser::{self, ParseError};
use crate::scheduler::job::{CompletedJob, JobInfo, JobTable};
use crate::scheduler::pipeline::{self, SpawnError};
use crate::vars::{self, VarStore};

/// Errors surfaced by the kernel entry points. Every one is recovered at
/// the boundary of the command that caused it; none ends the session.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Spawn(#[from] SpawnError),
}

/// Session state and the execution entry points.
pub struct Kernel {
    vars: VarStore,
    jobs: JobTable,
}

impl Kernel {
    pub fn new() -> Self {
        Self {
            vars: VarStore::new(),
            jobs: JobTable::new(),
        }
    }

    /// Execute one command line: expand variables, parse the pipeline,
    /// spawn it, and either wait for it (foreground) or track it
    /// (background).
    ///
    /// Returns the pipeline's effective exit status: the last stage's
    /// status for a foreground run, 0 for a background launch, 0 for a
    /// blank line. `background_hint` forces background execution when
    /// the caller's segmenter already stripped a trailing `&`.
    #[tracing::instrument(level = "debug", skip(self, line), fields(input_len = line.len()))]
    pub fn execute_line(&mut self, line: &str, background_hint: bool) -> Result<i32, ShellError> {
        let Some(mut pipeline) = self.parse_line(line)? else {
            return Ok(0);
        };
        pipeline.background |= background_hint;
        self.run_pipeline(&pipeline)
    }

    /// Run `condition` as a foreground pipeline, then exactly one of the
    /// branches: `then` when the condition exited 0, `els` otherwise. A
    /// missing branch returns the condition's own status unchanged.
    ///
    /// Not a general control-flow construct: branches do not nest.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run_conditional(
        &mut self,
        condition: &str,
        then: Option<&str>,
        els: Option<&str>,
    ) -> Result<i32, ShellError> {
        let status = self.run_foreground(condition)?;
        let branch = if status == 0 { then } else { els };
        match branch {
            Some(command) => self.run_foreground(command),
            None => Ok(status),
        }
    }

    /// Apply a `name=value` assignment (last write wins).
    pub fn set_variable(&mut self, assignment: &str) -> Result<(), ParseError> {
        let (name, value) = vars::parse_assignment(assignment)?;
        self.vars.set(name, value);
        Ok(())
    }

    pub fn get_variable(&self, name: &str) -> Option<&str> {
        self.vars.get(name)
    }

    /// Current variables; iteration order is unspecified.
    pub fn list_variables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.list()
    }

    /// Non-blocking sweep of the job table, returning the jobs that have
    /// finished since the last call. Meant to run once per prompt cycle;
    /// `execute_line` never reaps.
    pub fn reap_jobs(&mut self) -> Vec<CompletedJob> {
        self.jobs.sweep()
    }

    /// Tracked background jobs in insertion order.
    pub fn jobs(&self) -> impl Iterator<Item = JobInfo> + '_ {
        self.jobs.list()
    }

    /// Lex, variable-expand, and parse one line.
    fn parse_line(&self, line: &str) -> Result<Option<Pipeline>, ParseError> {
        let tokens = lexer::tokenize(line)
            .into_iter()
            .map(|spanned| match spanned.token {
                Token::Word(word) => Spanned {
                    token: Token::Word(self.vars.expand_word(&word)),
                    span: spanned.span,
                },
                token => Spanned {
                    token,
                    span: spanned.span,
                },
            })
            .collect();
        parser::parse_tokens(line, tokens)
    }

    /// Run one line to completion, ignoring any background request.
    fn run_foreground(&mut self, line: &str) -> Result<i32, ShellError> {
        let Some(mut pipeline) = self.parse_line(line)? else {
            return Ok(0);
        };
        pipeline.background = false;
        self.run_pipeline(&pipeline)
    }

    fn run_pipeline(&mut self, pipeline: &Pipeline) -> Result<i32, ShellError> {
        let (spawned, aborted) = pipeline::spawn(pipeline);

        if !pipeline.background || !spawned.has_running() {
            // Foreground — or a background launch where nothing survived
            // spawning: settle every stage now (nothing blocks in the
            // latter case).
            let status = spawned.wait();
            return match aborted {
                Some(err) => Err(err.into()),
                None => Ok(status),
            };
        }

        let children = spawned.into_children();
        let pid = children[0].id();
        match self.jobs.register(pipeline.text.clone(), children) {
            Ok(id) => println!("[{id}] pid {pid}"),
            Err(full) => {
                tracing::warn!(command = %pipeline.text, "{full}");
                eprintln!("limpet: {full}");
            }
        }
        match aborted {
            Some(err) => Err(err.into()),
            None => Ok(0),
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}
