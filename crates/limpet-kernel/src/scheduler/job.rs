//! Background job tracking for limpet.
//!
//! The table is bounded, insertion-ordered, and owned by the single
//! interactive thread: all mutation goes through [`JobTable::register`]
//! and [`JobTable::sweep`], so nothing here needs synchronization. A
//! front end that adds threads must serialize access itself.

use std::fmt;
use std::process::Child;

use thiserror::Error;

/// Fixed capacity of the job table.
pub const JOB_TABLE_CAPACITY: usize = 50;

/// Unique identifier for a tracked background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(pub u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned when `register` is refused at capacity. Non-fatal: the
/// pipeline keeps running, just untracked.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("job table full ({capacity} jobs); pipeline left untracked")]
pub struct JobTableFull {
    pub capacity: usize,
}

/// A tracked background pipeline.
struct Job {
    id: JobId,
    /// Pid of the first spawned stage, shown in listings.
    pid: u32,
    command: String,
    /// Stages still being polled; drained as they exit.
    children: Vec<Child>,
}

/// A row of `jobs` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub id: JobId,
    pub pid: u32,
    pub command: String,
}

/// A job whose every stage has exited, removed from the table by
/// [`JobTable::sweep`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    pub id: JobId,
    pub pid: u32,
    pub command: String,
}

/// Insertion-ordered table of background jobs with a fixed capacity.
#[derive(Default)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: u32,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 0,
        }
    }

    /// Track a freshly launched background pipeline.
    ///
    /// `children` holds every stage that actually spawned, in stage
    /// order; the first one's pid becomes the representative shown to
    /// the user. At capacity the registration is refused and the caller
    /// proceeds untracked — existing entries are never disturbed.
    pub fn register(
        &mut self,
        command: String,
        children: Vec<Child>,
    ) -> Result<JobId, JobTableFull> {
        if self.jobs.len() >= JOB_TABLE_CAPACITY {
            return Err(JobTableFull {
                capacity: JOB_TABLE_CAPACITY,
            });
        }
        debug_assert!(!children.is_empty(), "registering a job with no children");

        self.next_id += 1;
        let id = JobId(self.next_id);
        let pid = children[0].id();
        self.jobs.push(Job {
            id,
            pid,
            command,
            children,
        });
        Ok(id)
    }

    /// Poll every tracked job without blocking; remove and return the
    /// ones whose every stage has exited.
    ///
    /// A stage that finished between sweeps is picked up here; one that
    /// finishes mid-sweep is picked up by the next call. Nothing is ever
    /// reported twice, and a job with a stage still running is never
    /// removed.
    pub fn sweep(&mut self) -> Vec<CompletedJob> {
        let mut done = Vec::new();
        self.jobs.retain_mut(|job| {
            job.children.retain_mut(|child| match child.try_wait() {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(err) => {
                    // Should not happen for a handle we own; stop
                    // polling the child rather than wedge the job.
                    tracing::warn!(pid = child.id(), "try_wait failed: {err}");
                    false
                }
            });
            if job.children.is_empty() {
                done.push(CompletedJob {
                    id: job.id,
                    pid: job.pid,
                    command: std::mem::take(&mut job.command),
                });
                false
            } else {
                true
            }
        });
        done
    }

    /// Current entries in insertion order. A pure read: no reaping
    /// happens here, and the iterator can be restarted at will.
    pub fn list(&self) -> impl Iterator<Item = JobInfo> + '_ {
        self.jobs.iter().map(|job| JobInfo {
            id: job.id,
            pid: job.pid,
            command: job.command.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
