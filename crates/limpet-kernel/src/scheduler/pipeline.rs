//! Pipeline execution for limpet.
//!
//! Spawns one OS process per stage. Stage N's stdout feeds stage N+1's
//! stdin through a real pipe: the previous child's captured stdout handle
//! becomes the next command's stdin, so the parent's copy of every pipe
//! end is consumed at spawn time and none leaks past the spawn loop.
//! Explicit file redirections are wired last and therefore win over pipe
//! connections.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use thiserror::Error;

use crate::ast::{Pipeline, Redirect};

/// Status for a stage whose redirection target would not open.
const STATUS_REDIRECT_FAILED: i32 = 1;
/// Status for a program that exists but cannot be executed.
const STATUS_NOT_EXECUTABLE: i32 = 126;
/// Status for a program that does not exist.
const STATUS_NOT_FOUND: i32 = 127;

/// Process creation itself failed — not a problem with the program being
/// launched (those confine to the stage as status 126/127). The stages
/// spawned before the failure keep running; the rest were abandoned.
#[derive(Debug, Error)]
#[error("failed to spawn '{command}': {source}")]
pub struct SpawnError {
    pub command: String,
    #[source]
    pub source: io::Error,
}

/// One stage of a spawned pipeline.
enum StageHandle {
    Running(Child),
    /// The stage never started; this status stands in for it.
    Failed(i32),
}

/// A pipeline after spawning, stages in order.
pub struct SpawnedPipeline {
    stages: Vec<StageHandle>,
}

impl SpawnedPipeline {
    /// True if at least one stage is actually running.
    pub fn has_running(&self) -> bool {
        self.stages
            .iter()
            .any(|stage| matches!(stage, StageHandle::Running(_)))
    }

    /// Block until every running stage has exited, in any order, and
    /// return the last stage's status — the pipeline's effective status.
    pub fn wait(self) -> i32 {
        let mut last = 0;
        for stage in self.stages {
            last = match stage {
                StageHandle::Running(mut child) => match child.wait() {
                    Ok(status) => exit_code(status),
                    Err(err) => {
                        tracing::warn!(pid = child.id(), "wait failed: {err}");
                        1
                    }
                },
                StageHandle::Failed(status) => status,
            };
        }
        last
    }

    /// Surrender the running children, in stage order, for job tracking.
    pub fn into_children(self) -> Vec<Child> {
        self.stages
            .into_iter()
            .filter_map(|stage| match stage {
                StageHandle::Running(child) => Some(child),
                StageHandle::Failed(_) => None,
            })
            .collect()
    }
}

/// Spawn every stage of `pipeline`.
///
/// Stage-local failures — an unknown program, an unopenable redirect
/// target — are recorded as a stand-in exit status with a diagnostic on
/// stderr, and the rest of the pipeline keeps going; a downstream
/// consumer of such a stage reads end-of-file. A hard process-creation
/// failure abandons the stages not yet spawned and is returned alongside
/// the partial pipeline so the caller can still settle or track what did
/// start.
#[tracing::instrument(level = "debug", skip(pipeline), fields(stages = pipeline.stages.len(), background = pipeline.background))]
pub fn spawn(pipeline: &Pipeline) -> (SpawnedPipeline, Option<SpawnError>) {
    if pipeline.stages.is_empty() {
        return (SpawnedPipeline { stages: Vec::new() }, None);
    }

    let mut stages = Vec::with_capacity(pipeline.stages.len());
    // stdout of the previous stage, on its way to becoming the next
    // stage's stdin.
    let mut carry: Option<ChildStdout> = None;
    let last = pipeline.stages.len() - 1;

    for (i, stage) in pipeline.stages.iter().enumerate() {
        let piped = carry.take();
        let mut cmd = Command::new(stage.program());
        cmd.args(stage.args());

        // Stdin: an explicit `< file` wins over the pipe from the
        // previous stage; a mid-pipeline stage whose producer never
        // materialized reads end-of-file; the first stage inherits the
        // terminal.
        if let Some(path) = &stage.input {
            match File::open(path) {
                Ok(file) => {
                    cmd.stdin(Stdio::from(file));
                }
                Err(err) => {
                    eprintln!("limpet: {path}: {err}");
                    stages.push(StageHandle::Failed(STATUS_REDIRECT_FAILED));
                    continue;
                }
            }
        } else if let Some(prev) = piped {
            cmd.stdin(Stdio::from(prev));
        } else if i > 0 {
            cmd.stdin(Stdio::null());
        }

        // Stdout: an explicit `> file` / `>> file` wins over the pipe to
        // the next stage.
        if let Some(redirect) = &stage.output {
            match open_output(redirect) {
                Ok(file) => {
                    cmd.stdout(Stdio::from(file));
                }
                Err(err) => {
                    eprintln!("limpet: {}: {err}", redirect.path);
                    stages.push(StageHandle::Failed(STATUS_REDIRECT_FAILED));
                    continue;
                }
            }
        } else if i < last {
            cmd.stdout(Stdio::piped());
        }

        match cmd.spawn() {
            Ok(mut child) => {
                if i < last && stage.output.is_none() {
                    carry = child.stdout.take();
                }
                tracing::debug!(program = %stage.program(), pid = child.id(), "stage spawned");
                stages.push(StageHandle::Running(child));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                eprintln!("limpet: {}: command not found", stage.program());
                stages.push(StageHandle::Failed(STATUS_NOT_FOUND));
            }
            Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                eprintln!("limpet: {}: permission denied", stage.program());
                stages.push(StageHandle::Failed(STATUS_NOT_EXECUTABLE));
            }
            Err(source) => {
                return (
                    SpawnedPipeline { stages },
                    Some(SpawnError {
                        command: stage.program().to_owned(),
                        source,
                    }),
                );
            }
        }
    }

    (SpawnedPipeline { stages }, None)
}

fn open_output(redirect: &Redirect) -> io::Result<File> {
    let mut opts = OpenOptions::new();
    opts.write(true).create(true);
    if redirect.append {
        opts.append(true);
    } else {
        opts.truncate(true);
    }
    opts.open(&redirect.path)
}

/// Map a wait status to a shell exit code; signal deaths report
/// 128 + signal number.
fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}
