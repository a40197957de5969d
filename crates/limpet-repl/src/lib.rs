//! limpet-repl — the interactive front end.
//!
//! Thin glue around the kernel: reads lines with rustyline, splits `;`
//! statements, recalls history with `!n`, dispatches built-ins, and
//! reports background completions between prompts. Everything that
//! actually runs processes lives in `limpet-kernel`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;

use limpet_kernel::Kernel;
use limpet_kernel::vars::is_valid_name;

/// Lines kept for `!n` recall.
const HISTORY_CAPACITY: usize = 100;

const HELP_TEXT: &str = "\
Built-ins:
  exit            Quit the shell
  cd <dir>        Change directory
  help            Show this help
  jobs            List background jobs
  history         Show recent commands
  vars            List shell variables
  !n              Re-run the nth history entry

Syntax:
  a | b | c       Pipeline
  cmd < in > out  Redirection (>> appends)
  cmd &           Background job, reported between prompts
  cmd1 ; cmd2     Sequential statements
  name=value      Set a variable; $name expands it
  if A then B else C";

/// Outcome of processing one input line.
enum LineResult {
    Continue,
    Exit,
}

/// REPL state: the kernel plus the recall history and the status of the
/// last command (used as the process exit code for `limpet -c`).
pub struct Repl {
    kernel: Kernel,
    history: Vec<String>,
    last_status: i32,
}

impl Repl {
    pub fn new() -> Self {
        Self {
            kernel: Kernel::new(),
            history: Vec::new(),
            last_status: 0,
        }
    }

    /// Handle one raw input line. Returns `Exit` when the user asked to
    /// leave.
    fn process_line(&mut self, line: &str) -> LineResult {
        let line = line.trim();
        if line.is_empty() {
            return LineResult::Continue;
        }

        // `!n` recall replaces the whole line before anything else sees
        // it; the recalled line is what enters history.
        let line = match self.recall(line) {
            Ok(Some(recalled)) => {
                println!("Executing: {recalled}");
                recalled
            }
            Ok(None) => line.to_owned(),
            Err(message) => {
                eprintln!("limpet: {message}");
                return LineResult::Continue;
            }
        };

        self.remember(&line);

        for statement in line.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            if let LineResult::Exit = self.run_statement(statement) {
                return LineResult::Exit;
            }
        }
        LineResult::Continue
    }

    /// Run one `;`-separated statement: built-in, conditional,
    /// assignment, or a pipeline for the kernel.
    fn run_statement(&mut self, statement: &str) -> LineResult {
        if let Some(result) = self.try_builtin(statement) {
            return result;
        }

        if let Some(cond) = parse_if_line(statement) {
            match self
                .kernel
                .run_conditional(cond.condition, cond.then_branch, cond.else_branch)
            {
                Ok(status) => self.last_status = status,
                Err(err) => {
                    eprintln!("limpet: {err}");
                    self.last_status = 1;
                }
            }
            return LineResult::Continue;
        }

        if is_assignment(statement) {
            if let Err(err) = self.kernel.set_variable(statement) {
                eprintln!("limpet: {err}");
                self.last_status = 1;
            } else {
                self.last_status = 0;
            }
            return LineResult::Continue;
        }

        match self.kernel.execute_line(statement, false) {
            Ok(status) => self.last_status = status,
            Err(err) => {
                eprintln!("limpet: {err}");
                self.last_status = 1;
            }
        }
        LineResult::Continue
    }

    /// Dispatch a built-in. Returns `None` when the statement is not
    /// one, so the caller hands it to the kernel.
    fn try_builtin(&mut self, statement: &str) -> Option<LineResult> {
        let mut words = statement.split_whitespace();
        let name = words.next()?;
        match name {
            "exit" => {
                println!("Exiting limpet.");
                Some(LineResult::Exit)
            }
            "cd" => {
                match words.next() {
                    None => eprintln!("limpet: cd: expected an argument"),
                    Some(dir) => {
                        if let Err(err) = std::env::set_current_dir(dir) {
                            eprintln!("limpet: cd: {dir}: {err}");
                        }
                    }
                }
                Some(LineResult::Continue)
            }
            "help" => {
                println!("{HELP_TEXT}");
                Some(LineResult::Continue)
            }
            "jobs" => {
                self.show_jobs();
                Some(LineResult::Continue)
            }
            "history" => {
                self.show_history();
                Some(LineResult::Continue)
            }
            "vars" => {
                self.show_vars();
                Some(LineResult::Continue)
            }
            _ => None,
        }
    }

    fn show_jobs(&self) {
        let mut any = false;
        for job in self.kernel.jobs() {
            any = true;
            println!("[{}] pid {}  {}", job.id, job.pid, job.command);
        }
        if !any {
            println!("No background jobs.");
        }
    }

    fn show_history(&self) {
        for (i, line) in self.history.iter().enumerate() {
            println!("{}  {}", i + 1, line);
        }
    }

    fn show_vars(&self) {
        let mut vars: Vec<_> = self.kernel.list_variables().collect();
        if vars.is_empty() {
            println!("(no variables set)");
            return;
        }
        vars.sort();
        for (name, value) in vars {
            println!("{name}={value}");
        }
    }

    /// Record a line for `!n` recall, dropping the oldest past capacity.
    fn remember(&mut self, line: &str) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.remove(0);
        }
        self.history.push(line.to_owned());
    }

    /// Resolve a `!n` line against the recall history.
    ///
    /// `Ok(None)` means the line is not a recall at all; anything after
    /// `!` that is not a number is taken literally.
    fn recall(&self, line: &str) -> Result<Option<String>, String> {
        let Some(rest) = line.strip_prefix('!') else {
            return Ok(None);
        };
        if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
            return Ok(None);
        }
        let n: usize = rest
            .parse()
            .map_err(|_| format!("bad history reference: !{rest}"))?;
        match n.checked_sub(1).and_then(|i| self.history.get(i)) {
            Some(entry) => Ok(Some(entry.clone())),
            None => Err(format!("no such command in history: !{n}")),
        }
    }

    /// Report background completions; called between prompts, never
    /// while a command runs.
    fn notify_finished_jobs(&mut self) {
        for job in self.kernel.reap_jobs() {
            println!("[Done] pid {}  {}", job.pid, job.command);
        }
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

/// A single-line conditional, split into its parts.
#[derive(Debug, PartialEq, Eq)]
struct IfLine<'a> {
    condition: &'a str,
    then_branch: Option<&'a str>,
    else_branch: Option<&'a str>,
}

/// Split `if <cond> then <cmd> [else <cmd>]`.
///
/// Keywords only count as standalone words. Returns `None` when the
/// statement is not an `if` line (or is missing its `then`), in which
/// case it falls through and fails downstream as an ordinary command
/// named `if`.
fn parse_if_line(statement: &str) -> Option<IfLine<'_>> {
    let rest = statement.strip_prefix("if")?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let (condition, after_then) = split_keyword(rest, "then")?;
    let condition = condition.trim();
    if condition.is_empty() {
        return None;
    }
    let (then_branch, else_branch) = match split_keyword(after_then, "else") {
        Some((then_part, else_part)) => (then_part.trim(), Some(else_part.trim())),
        None => (after_then.trim(), None),
    };
    Some(IfLine {
        condition,
        then_branch: (!then_branch.is_empty()).then_some(then_branch),
        else_branch: else_branch.filter(|branch| !branch.is_empty()),
    })
}

/// Find `keyword` as a standalone word; return the text on each side.
fn split_keyword<'a>(text: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let mut search_from = 0;
    while let Some(pos) = text[search_from..].find(keyword) {
        let start = search_from + pos;
        let end = start + keyword.len();
        let before_ok = start == 0 || text[..start].ends_with([' ', '\t']);
        let after_ok = end == text.len() || text[end..].starts_with([' ', '\t']);
        if before_ok && after_ok {
            return Some((&text[..start], &text[end..]));
        }
        search_from = end;
    }
    None
}

/// True when the whole statement is a single `name=value` word.
fn is_assignment(statement: &str) -> bool {
    !statement.contains(char::is_whitespace)
        && statement
            .split_once('=')
            .is_some_and(|(name, _)| is_valid_name(name))
}

/// Run the interactive loop until `exit` or end-of-file.
pub fn run() -> Result<()> {
    println!("limpet v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'help' for built-ins, 'exit' to leave.");
    println!();

    let mut rl: Editor<(), DefaultHistory> =
        Editor::new().context("failed to create line editor")?;

    let history_path = directories::BaseDirs::new()
        .map(|base| base.data_dir().join("limpet").join("history.txt"));
    if let Some(ref path) = history_path
        && let Err(err) = rl.load_history(path)
    {
        // Missing history is expected on first run.
        let missing =
            matches!(&err, ReadlineError::Io(io) if io.kind() == std::io::ErrorKind::NotFound);
        if !missing {
            tracing::warn!("failed to load history: {err}");
        }
    }

    let mut repl = Repl::new();

    loop {
        repl.notify_finished_jobs();

        match rl.readline("limpet> ") {
            Ok(line) => {
                if !line.trim().is_empty()
                    && let Err(err) = rl.add_history_entry(line.as_str())
                {
                    tracing::warn!("failed to record history entry: {err}");
                }
                if let LineResult::Exit = repl.process_line(&line) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                eprintln!("limpet: {err}");
                break;
            }
        }
    }

    save_history(&mut rl, &history_path);
    Ok(())
}

/// Execute a single command line non-interactively (`limpet -c`) and
/// return the status of its last statement.
pub fn run_command(command: &str) -> Result<i32> {
    let mut repl = Repl::new();
    let _ = repl.process_line(command);
    Ok(repl.last_status)
}

/// Persist readline history, creating the parent directory on demand.
fn save_history(rl: &mut Editor<(), DefaultHistory>, history_path: &Option<PathBuf>) {
    if let Some(path) = history_path {
        if let Some(parent) = path.parent()
            && let Err(err) = std::fs::create_dir_all(parent)
        {
            tracing::warn!("failed to create history directory: {err}");
        }
        if let Err(err) = rl.save_history(path) {
            tracing::warn!("failed to save history: {err}");
        }
    }
}
