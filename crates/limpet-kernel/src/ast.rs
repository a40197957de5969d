//! Data model for parsed command lines.

/// One program invocation: its argument vector plus optional redirections.
///
/// Redirection targets are only recorded here; no file is opened until the
/// stage is actually spawned. A stage is immutable once parsing hands it
/// to the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Program name followed by its arguments. Never empty once parsed.
    pub argv: Vec<String>,
    /// `< path`: read stdin from a file instead of the terminal or the
    /// preceding pipe.
    pub input: Option<String>,
    /// `> path` / `>> path`: write stdout to a file instead of the
    /// terminal or the following pipe.
    pub output: Option<Redirect>,
}

impl Stage {
    /// The program to launch.
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// The arguments after the program name.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }
}

/// An output redirection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    /// `>>` appends, `>` truncates.
    pub append: bool,
}

/// A sequence of stages connected by pipes, executed as one command.
///
/// Created per command line, consumed entirely by one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
    /// Launch without blocking the caller (`cmd &`).
    pub background: bool,
    /// The command as the user typed it, minus any trailing `&`. Kept
    /// for job listings.
    pub text: String,
}
