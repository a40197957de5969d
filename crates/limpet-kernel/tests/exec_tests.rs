//! End-to-end execution coverage: real processes, real pipes, real
//! files. Exercises the observable guarantees of the core — exact
//! foreground status, pipeline connectivity, redirection round-trips,
//! background reaping, job-table capacity, conditional branch
//! exclusivity, and the variable-expansion policy.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use limpet_kernel::{JOB_TABLE_CAPACITY, Kernel, ParseError, ShellError};

fn run(kernel: &mut Kernel, line: &str) -> i32 {
    kernel
        .execute_line(line, false)
        .unwrap_or_else(|err| panic!("'{line}' failed: {err}"))
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
}

#[test]
fn foreground_returns_the_exact_exit_status() {
    let mut kernel = Kernel::new();
    assert_eq!(run(&mut kernel, "true"), 0);
    assert_eq!(run(&mut kernel, "false"), 1);

    // The expanded variable stays one token, so sh sees a single -c
    // argument and the requested status comes back unchanged.
    kernel.set_variable("SCRIPT=exit 42").unwrap();
    assert_eq!(run(&mut kernel, "sh -c $SCRIPT"), 42);
}

#[test]
fn unknown_command_reports_127() {
    let mut kernel = Kernel::new();
    assert_eq!(run(&mut kernel, "definitely-not-a-real-command-xyz"), 127);
}

#[test]
fn signal_death_reports_128_plus_signal() {
    let mut kernel = Kernel::new();
    // sh expands $$ itself; limpet leaves the unknown name literal.
    kernel.set_variable("DIE=kill -TERM $$").unwrap();
    assert_eq!(run(&mut kernel, "sh -c $DIE"), 128 + 15);
}

#[test]
fn blank_line_is_a_no_op() {
    let mut kernel = Kernel::new();
    assert_eq!(run(&mut kernel, ""), 0);
    assert_eq!(run(&mut kernel, "   "), 0);
}

#[test]
fn pipeline_connects_stdout_to_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let mut kernel = Kernel::new();

    let line = format!("echo ok | cat | cat > {}", out.display());
    assert_eq!(run(&mut kernel, &line), 0);
    assert_eq!(read(&out), "ok\n");
}

#[test]
fn pipeline_status_is_the_last_stage() {
    let mut kernel = Kernel::new();
    assert_eq!(run(&mut kernel, "false | true"), 0);
    assert_eq!(run(&mut kernel, "true | false"), 1);
}

#[test]
fn failed_stage_feeds_eof_downstream() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let mut kernel = Kernel::new();

    // The producer never spawns; the consumer still runs and sees EOF.
    let line = format!("no-such-producer-xyz | cat > {}", out.display());
    assert_eq!(run(&mut kernel, &line), 0);
    assert_eq!(read(&out), "");
}

#[test]
fn redirection_round_trip_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.txt");
    let copy = dir.path().join("copy.txt");
    let mut kernel = Kernel::new();

    assert_eq!(run(&mut kernel, &format!("echo X > {}", data.display())), 0);
    let line = format!("cat < {} > {}", data.display(), copy.display());
    assert_eq!(run(&mut kernel, &line), 0);
    assert_eq!(read(&copy), "X\n");

    // `>` truncates: a rewrite replaces, never extends.
    assert_eq!(
        run(&mut kernel, &format!("echo shorter > {}", data.display())),
        0
    );
    assert_eq!(read(&data), "shorter\n");
}

#[test]
fn append_redirection_accumulates_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("log.txt");
    let mut kernel = Kernel::new();

    assert_eq!(run(&mut kernel, &format!("echo one >> {}", log.display())), 0);
    assert_eq!(run(&mut kernel, &format!("echo two >> {}", log.display())), 0);
    assert_eq!(read(&log), "one\ntwo\n");
}

#[test]
fn input_redirection_wins_over_the_pipe() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data.txt");
    let out = dir.path().join("out.txt");
    let mut kernel = Kernel::new();

    assert_eq!(run(&mut kernel, &format!("echo file > {}", data.display())), 0);
    let line = format!("echo piped | cat < {} > {}", data.display(), out.display());
    assert_eq!(run(&mut kernel, &line), 0);
    assert_eq!(read(&out), "file\n");
}

#[test]
fn unopenable_input_fails_only_that_stage() {
    let mut kernel = Kernel::new();
    assert_eq!(run(&mut kernel, "cat < /definitely/not/here"), 1);
}

#[test]
fn background_launch_returns_before_completion() {
    let mut kernel = Kernel::new();
    let started = Instant::now();
    assert_eq!(run(&mut kernel, "sleep 0.3 &"), 0);
    assert!(
        started.elapsed() < Duration::from_millis(250),
        "background launch blocked the caller"
    );
    assert_eq!(kernel.jobs().count(), 1);

    // Not finished yet: the sweep must not invent a completion.
    assert!(kernel.reap_jobs().is_empty());

    thread::sleep(Duration::from_millis(500));
    let done = kernel.reap_jobs();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].command, "sleep 0.3");
    assert_eq!(kernel.jobs().count(), 0);

    // And never reported twice.
    assert!(kernel.reap_jobs().is_empty());
}

#[test]
fn background_hint_forces_background() {
    let mut kernel = Kernel::new();
    let started = Instant::now();
    assert_eq!(kernel.execute_line("sleep 0.3", true).unwrap(), 0);
    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(kernel.jobs().count(), 1);

    thread::sleep(Duration::from_millis(500));
    assert_eq!(kernel.reap_jobs().len(), 1);
}

#[test]
fn background_pipeline_tracks_one_job_entry() {
    let mut kernel = Kernel::new();
    assert_eq!(run(&mut kernel, "echo hi | sleep 0.3 &"), 0);
    let jobs: Vec<_> = kernel.jobs().collect();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].command, "echo hi | sleep 0.3");

    thread::sleep(Duration::from_millis(500));
    assert_eq!(kernel.reap_jobs().len(), 1);
}

#[test]
fn job_table_overflow_leaves_tracked_jobs_intact() {
    let mut kernel = Kernel::new();
    for _ in 0..JOB_TABLE_CAPACITY {
        assert_eq!(run(&mut kernel, "sleep 0.5 &"), 0);
    }
    assert_eq!(kernel.jobs().count(), JOB_TABLE_CAPACITY);

    // The overflow pipeline still runs; it just is not tracked.
    assert_eq!(run(&mut kernel, "sleep 0.5 &"), 0);
    assert_eq!(kernel.jobs().count(), JOB_TABLE_CAPACITY);

    thread::sleep(Duration::from_millis(900));
    assert_eq!(kernel.reap_jobs().len(), JOB_TABLE_CAPACITY);
    assert_eq!(kernel.jobs().count(), 0);
}

#[test]
fn conditional_takes_the_then_branch_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let then_mark = dir.path().join("then.txt");
    let else_mark = dir.path().join("else.txt");
    let mut kernel = Kernel::new();

    let then_cmd = format!("echo yes > {}", then_mark.display());
    let else_cmd = format!("echo no > {}", else_mark.display());
    let status = kernel
        .run_conditional("true", Some(&then_cmd), Some(&else_cmd))
        .unwrap();
    assert_eq!(status, 0);
    assert!(then_mark.exists());
    assert!(!else_mark.exists());
}

#[test]
fn conditional_takes_the_else_branch_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let then_mark = dir.path().join("then.txt");
    let else_mark = dir.path().join("else.txt");
    let mut kernel = Kernel::new();

    let then_cmd = format!("echo yes > {}", then_mark.display());
    let else_cmd = format!("echo no > {}", else_mark.display());
    kernel
        .run_conditional("false", Some(&then_cmd), Some(&else_cmd))
        .unwrap();
    assert!(!then_mark.exists());
    assert!(else_mark.exists());
    assert_eq!(read(&else_mark), "no\n");
}

#[test]
fn conditional_without_a_branch_returns_condition_status() {
    let mut kernel = Kernel::new();
    assert_eq!(kernel.run_conditional("false", None, None).unwrap(), 1);
    assert_eq!(
        kernel
            .run_conditional("false", Some("echo never-runs"), None)
            .unwrap(),
        1
    );
}

#[test]
fn variables_expand_before_execution() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let mut kernel = Kernel::new();

    kernel.set_variable("GREETING=hello").unwrap();
    assert_eq!(
        run(&mut kernel, &format!("echo $GREETING > {}", out.display())),
        0
    );
    assert_eq!(read(&out), "hello\n");
}

#[test]
fn undefined_variable_stays_the_literal_token() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let mut kernel = Kernel::new();

    assert_eq!(
        run(&mut kernel, &format!("echo $NOPE > {}", out.display())),
        0
    );
    assert_eq!(read(&out), "$NOPE\n");
}

#[test]
fn assignments_validate_names_and_overwrite() {
    let mut kernel = Kernel::new();
    kernel.set_variable("X=1").unwrap();
    kernel.set_variable("X=2").unwrap();
    assert_eq!(kernel.get_variable("X"), Some("2"));
    assert_eq!(kernel.list_variables().count(), 1);

    assert!(matches!(
        kernel.set_variable("1X=1"),
        Err(ParseError::InvalidAssignment(_))
    ));
    assert!(matches!(
        kernel.set_variable("no-equals"),
        Err(ParseError::InvalidAssignment(_))
    ));
}

#[test]
fn parse_errors_surface_without_spawning() {
    let mut kernel = Kernel::new();
    for line in ["cmd |", "| cmd", "cmd > ", "a & b"] {
        assert!(
            matches!(
                kernel.execute_line(line, false),
                Err(ShellError::Parse(_))
            ),
            "'{line}' should be a parse error"
        );
    }
    assert_eq!(kernel.jobs().count(), 0);
}
