//! `coop-sort` — cooperative sort scheduler (spec sections 1-6, C1).
//!
//! Wires the CLI to the scheduler and merge writer: sorts each input file
//! concurrently under signal-driven preemption on one OS thread, then
//! k-way merges the results. See `scheduler`, `reader`, `sorter`, `task`,
//! `context`, and `merge` for the individual components.

mod cli;
mod context;
mod merge;
mod reader;
mod scheduler;
mod sorter;
mod task;

use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;

fn main() -> ExitCode {
    logger::init();
    let cli = cli::Cli::parse();

    log::info!(
        "sorting {} file(s), time slice {} us, output {}",
        cli.files.len(),
        cli.time_slice_us,
        cli.output.display()
    );

    let tasks = scheduler::run(&cli.files, Duration::from_micros(cli.time_slice_us));

    for task in &tasks {
        println!(
            "task {} ({}): swap_times {}, total working time us {}",
            task.id,
            task.input_path.display(),
            task.swap_count(),
            task.total_cpu_micros(),
        );
    }

    let sources: Vec<Vec<i32>> = tasks.iter().map(|t| t.data.lock().unwrap().clone()).collect();

    let merge_start = Instant::now();
    let result = merge::merge_to_file(&sources, &cli.output);
    let merge_elapsed = merge_start.elapsed();

    match result {
        Ok(()) => {
            println!(
                "merged {} file(s) into {} in {:?}",
                tasks.len(),
                cli.output.display(),
                merge_elapsed
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: could not write {}: {e}", cli.output.display());
            ExitCode::FAILURE
        }
    }
}
