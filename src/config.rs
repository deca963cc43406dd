//! Configuration types for bulksync
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - The JSON sync-target config file format
//! - Runtime configuration with validation

use crate::error::ConfigError;
use clap::Parser;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Default rows-per-task when neither the CLI nor the target sets one
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Parallel PostgreSQL to search index bootstrap loader
#[derive(Parser, Debug, Clone)]
#[command(
    name = "bulksync",
    version,
    about = "Parallel PostgreSQL to search index bootstrap loader",
    long_about = "Performs the initial bulk replication of PostgreSQL tables into a search \
                  index using parallel workers, then replays writes that landed during the \
                  bulk phase.\n\n\
                  The table scan is partitioned by physical row location (ctid), so workers \
                  never contend on the same rows, and the whole parallel phase is bracketed \
                  by transaction-id checkpoints.",
    after_help = "EXAMPLES:\n    \
        bulksync sync.json\n    \
        bulksync sync.json -w 16 --block-size 8192\n    \
        bulksync sync.json --checkpoint-dir /var/lib/bulksync --dry-run"
)]
pub struct CliArgs {
    /// Path to the sync targets config file
    #[arg(value_name = "CONFIG", default_value = "sync.json")]
    pub config: PathBuf,

    /// Number of parallel sync workers
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Rows per task (overrides per-target block sizes)
    #[arg(short = 'b', long, value_name = "NUM")]
    pub block_size: Option<usize>,

    /// Directory for checkpoint state files
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub checkpoint_dir: PathBuf,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (show per-task activity)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Plan tasks and report counts without touching the index or checkpoint
    #[arg(long)]
    pub dry_run: bool,
}

fn default_workers() -> usize {
    // Default to 2x CPU cores, as the pull is network-bound on both ends
    num_cpus::get() * 2
}

/// A schema-qualified table reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Schema name ("public" when unqualified)
    pub schema: String,

    /// Table name
    pub table: String,
}

impl TableRef {
    /// Parse a table reference
    ///
    /// Accepts `table` (resolved against the `public` schema) or
    /// `schema.table`. Each part must be a plain identifier: letters,
    /// digits and underscores, not starting with a digit.
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        let name = name.trim();
        let mut parts = name.split('.');

        let (schema, table) = match (parts.next(), parts.next(), parts.next()) {
            (Some(table), None, _) => ("public", table),
            (Some(schema), Some(table), None) => (schema, table),
            _ => {
                return Err(ConfigError::InvalidTable {
                    name: name.to_string(),
                    reason: "expected 'table' or 'schema.table'".into(),
                })
            }
        };

        for part in [schema, table] {
            if !is_identifier(part) {
                return Err(ConfigError::InvalidTable {
                    name: name.to_string(),
                    reason: format!("'{part}' is not a valid identifier"),
                });
            }
        }

        Ok(Self {
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    /// Quoted, schema-qualified form for use in SQL text
    pub fn qualified(&self) -> String {
        format!("\"{}\".\"{}\"", self.schema, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// One target descriptor as it appears in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct TargetDescriptor {
    /// PostgreSQL connection string
    pub database: String,

    /// Root table to replicate, optionally schema-qualified
    pub table: String,

    /// Destination index name
    pub index: String,

    /// Primary key column used as the document id
    pub primary_key: String,

    /// Base URL of the search index
    pub search_url: String,

    /// Rows per task for this target (falls back to the system default)
    #[serde(default)]
    pub block_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct SyncFile {
    targets: Vec<TargetDescriptor>,
}

/// A validated sync target
#[derive(Debug, Clone)]
pub struct TargetConfig {
    /// PostgreSQL connection string
    pub database: String,

    /// Root table to replicate
    pub table: TableRef,

    /// Destination index name
    pub index: String,

    /// Primary key column used as the document id
    pub primary_key: String,

    /// Base URL of the search index
    pub search_url: String,

    /// Rows per task
    pub block_size: usize,
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Ordered sync targets, run sequentially
    pub targets: Vec<TargetConfig>,

    /// Number of worker threads per target
    pub worker_count: usize,

    /// Directory holding checkpoint state files
    pub checkpoint_dir: PathBuf,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,

    /// Plan only, touch nothing
    pub dry_run: bool,
}

impl SyncConfig {
    /// Load and validate configuration from CLI arguments
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(&args.config).map_err(|e| ConfigError::FileRead {
            path: args.config.clone(),
            reason: e.to_string(),
        })?;

        Self::from_json(&text, &args.config, args)
    }

    /// Validate configuration from raw config file contents
    fn from_json(text: &str, path: &Path, args: &CliArgs) -> Result<Self, ConfigError> {
        let file: SyncFile = serde_json::from_str(text).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if file.targets.is_empty() {
            return Err(ConfigError::NoTargets {
                path: path.to_path_buf(),
            });
        }

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        if let Some(size) = args.block_size {
            if size == 0 {
                return Err(ConfigError::InvalidBlockSize { size });
            }
        }

        if !args.checkpoint_dir.is_dir() {
            return Err(ConfigError::InvalidCheckpointDir {
                path: args.checkpoint_dir.clone(),
                reason: "not a directory".into(),
            });
        }

        let mut targets = Vec::with_capacity(file.targets.len());
        for descriptor in file.targets {
            let block_size = args
                .block_size
                .or(descriptor.block_size)
                .unwrap_or(DEFAULT_BLOCK_SIZE);
            if block_size == 0 {
                return Err(ConfigError::InvalidBlockSize { size: block_size });
            }

            targets.push(TargetConfig {
                database: descriptor.database,
                table: TableRef::parse(&descriptor.table)?,
                index: descriptor.index,
                primary_key: descriptor.primary_key,
                search_url: descriptor.search_url.trim_end_matches('/').to_string(),
                block_size,
            });
        }

        Ok(Self {
            targets,
            worker_count: args.workers,
            checkpoint_dir: args.checkpoint_dir.clone(),
            show_progress: !args.quiet,
            verbose: args.verbose,
            dry_run: args.dry_run,
        })
    }
}
