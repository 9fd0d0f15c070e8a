//! Prints a saved solution document as a schedule table.
//!
//! Usage: `print-schedule <solution.json>`

use std::path::PathBuf;
use std::process::ExitCode;

use run_scheduler::format::{costs_to_string, schedule_to_table};
use run_scheduler::store::Solution;
use tracing::error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Builds the log filter from `RUST_LOG` text; warnings and up when it holds
/// no directives.
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives)
}

fn main() -> ExitCode {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&directives))
        .init();

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: print-schedule <solution.json>");
        return ExitCode::from(2);
    };

    let solution = match Solution::from_json_file(&path) {
        Ok(solution) => solution,
        Err(err) => {
            error!(path = %path.display(), error = %err, "cannot read solution");
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{} model {}{}",
        solution.event,
        solution.model,
        if solution.optimal { " (optimal)" } else { "" }
    );
    println!("{}", schedule_to_table(&solution.schedule));
    println!("{}", costs_to_string(&solution.costs));
    ExitCode::SUCCESS
}
