//! bulksync - Parallel PostgreSQL to Search Index Bootstrap Loader
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use bulksync::config::{CliArgs, SyncConfig};
use bulksync::engine::postgres::PgEngineFactory;
use bulksync::engine::EngineFactory;
use bulksync::progress::{print_header, print_summary, ProgressReporter};
use bulksync::sync::{SyncCoordinator, Task, TaskPlanner};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and load config
    let config = SyncConfig::load(&args).context("Invalid configuration")?;

    if config.show_progress {
        print_header(
            &args.config.display().to_string(),
            config.worker_count,
            config.targets.len(),
        );
    }

    // Targets run sequentially, each with its own full worker-pool lifecycle
    for target in &config.targets {
        let factory = PgEngineFactory::new(target.clone(), config.checkpoint_dir.clone());

        if config.dry_run {
            let mut engine = factory
                .connect()
                .with_context(|| format!("Failed to connect for '{}'", target.index))?;
            let planner = TaskPlanner::new(target.block_size)?;
            let tasks = planner.plan(&mut engine)?;
            let rows: usize = tasks.iter().map(Task::len).sum();

            info!(
                index = %target.index,
                tasks = tasks.len(),
                rows,
                block_size = target.block_size,
                "Dry run - plan only"
            );
            println!(
                "{}: {} tasks covering {} rows (block size {})",
                target.index,
                tasks.len(),
                rows,
                target.block_size
            );
            continue;
        }

        let progress = if config.show_progress {
            Some(ProgressReporter::new())
        } else {
            None
        };

        if let Some(ref p) = progress {
            p.set_status(&format!("Syncing {} -> {}", target.table, target.index));
        }

        let coordinator = SyncCoordinator::new(factory, config.worker_count, target.block_size);
        let report = coordinator
            .run()
            .with_context(|| format!("Sync failed for index '{}'", target.index))?;

        if let Some(ref p) = progress {
            p.finish("Bulk sync complete");
        }

        if config.show_progress {
            print_summary(&target.index, &report);
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("bulksync=debug,warn")
    } else {
        EnvFilter::new("bulksync=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
