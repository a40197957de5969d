//! limpet CLI entry point.
//!
//! Usage:
//!   limpet              # interactive shell
//!   limpet -c <command> # execute one command line and exit

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG).
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("limpet: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        None => {
            limpet_repl::run()?;
            Ok(ExitCode::SUCCESS)
        }

        Some("--help" | "-h") => {
            print_help();
            Ok(ExitCode::SUCCESS)
        }

        Some("--version" | "-V") => {
            println!("limpet {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }

        Some("-c") => {
            let command = args.get(2).context("-c requires a command argument")?;
            let status = limpet_repl::run_command(command)?;
            Ok(ExitCode::from(status.clamp(0, 255) as u8))
        }

        Some(unknown) => {
            eprintln!("limpet: unknown option: {unknown}");
            eprintln!("Run 'limpet --help' for usage.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_help() {
    println!(
        r#"limpet — a small interactive shell

Usage:
  limpet               Interactive shell
  limpet -c <command>  Execute one command line and exit

Options:
  -c <command>         Execute command string and exit
  -h, --help           Show this help
  -V, --version        Show version

Inside the shell:
  a | b | c            Pipeline
  cmd < in > out       Redirection (>> appends)
  cmd &                Background job (reported between prompts)
  cmd1 ; cmd2          Sequential statements
  name=value           Set a variable; use $name to expand it
  if A then B else C   Run B or C depending on A's exit status
  !n                   Re-run the nth history entry

Built-ins: exit, cd <dir>, help, jobs, history, vars
"#
    );
}
