use std::io::{self, Write};
use std::path::PathBuf;
use std::pin::pin;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::allocator::CountingAllocator;
use crate::config::Config;
use crate::error::CoroutineError;
use crate::generator::Generator;
use crate::inline::InlineCoroutine;
use crate::recursive::RecursiveCoroutine;
use crate::samples::{inorder, range, triangular, Tree, MAX_TRIANGULAR_SEED};

#[derive(Parser)]
#[command(name = "refrain")]
#[command(about = "Refrain - drive sample generators from the command line", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Byte budget for recursive generator storage (overrides config file and env vars)
    #[arg(long, global = true)]
    pub budget_bytes: Option<usize>,

    /// Print output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Yield integers from start (inclusive) to end (exclusive)
    Range {
        /// First value
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        start: i64,

        /// Exclusive bound (default: config `default_range_end`)
        #[arg(long, allow_hyphen_values = true)]
        end: Option<i64>,

        /// Increment; negative counts down, zero yields nothing
        #[arg(long, default_value = "1", allow_hyphen_values = true)]
        step: i64,
    },

    /// Walk a binary tree in order, one recursive generator per subtree
    Inorder {
        /// Tree literal, e.g. "{2:[1,{4:[3,_]}]}"
        tree: String,
    },

    /// Count 1..=seed through a chain of recursive generators
    Triangular {
        /// Recursion depth, at most 1000 (default: config `default_seed`)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli, &mut io::stdout().lock())
}

/// Run the CLI with provided arguments, writing results to `out`
pub fn run_cli_from_args<W: Write>(args: Vec<String>, out: &mut W) -> Result<()> {
    let cli = Cli::try_parse_from(args)?;
    run_cli_with_args(cli, out)
}

/// Install the stderr subscriber; `RUST_LOG` wins over the configured level
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_cli_with_args<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let config = Config::builder()
        .config_path(cli.config.as_ref().map(PathBuf::from))
        .budget_bytes(cli.budget_bytes)
        .build()
        .context("Failed to load configuration")?;

    init_tracing(&config.log_level);

    let allocator = match config.budget_bytes {
        Some(limit) => CountingAllocator::with_limit(limit),
        None => CountingAllocator::new(),
    };

    match cli.command {
        Commands::Range { start, end, step } => {
            let end = end.unwrap_or(config.default_range_end);
            let mut gen = pin!(InlineCoroutine::new(|ctx| range(ctx, start, end, step)).with_default_message(()));
            let values = drain(&mut gen).context("Range generator failed")?;
            emit_values(out, &values, cli.json)?;
        }

        Commands::Inorder { tree } => {
            let tree = Tree::parse(&tree).context("Failed to parse tree")?;
            let mut gen = RecursiveCoroutine::new(|ctx| inorder(ctx, &tree, &allocator), &allocator)
                .context("Failed to allocate generator")?
                .with_default_message(());
            let values = drain(&mut gen).context("In-order traversal failed")?;
            gen.dispose();

            info!(
                nodes = tree.len(),
                peak_bytes = allocator.peak_bytes(),
                generators = allocator.total_blocks(),
                "traversal complete"
            );
            emit_values(out, &values, cli.json)?;
        }

        Commands::Triangular { seed } => {
            let seed = seed.unwrap_or(config.default_seed);
            if seed > MAX_TRIANGULAR_SEED {
                bail!("seed {} exceeds the maximum of {}", seed, MAX_TRIANGULAR_SEED);
            }
            let mut gen = RecursiveCoroutine::new(|ctx| triangular(ctx, seed, &allocator), &allocator)
                .context("Failed to allocate generator")?
                .with_default_message(());
            let values = drain(&mut gen).context("Triangular generator failed")?;
            gen.dispose();

            info!(
                seed,
                peak_bytes = allocator.peak_bytes(),
                generators = allocator.total_blocks(),
                "recursion complete"
            );

            let count = values.len();
            let sum: u64 = values.iter().sum();
            if cli.json {
                writeln!(out, "{}", json!({ "values": values, "count": count, "sum": sum }))?;
            } else {
                emit_values(out, &values, false)?;
                writeln!(out, "count: {}", count)?;
                writeln!(out, "sum: {}", sum)?;
            }
        }

        Commands::Config => {
            if cli.json {
                writeln!(out, "{}", serde_json::to_string_pretty(&config)?)?;
            } else {
                write!(out, "{}", config.to_toml()?)?;
            }
        }
    }

    Ok(())
}

/// Advance `gen` with its default message until it is exhausted
fn drain<S: Clone, Y, G: Generator<S, Y>>(gen: &mut G) -> Result<Vec<Y>, CoroutineError> {
    let mut values = Vec::new();
    while let Some(value) = gen.next()? {
        values.push(value);
    }
    Ok(values)
}

fn emit_values<W: Write, T: Serialize + std::fmt::Display>(out: &mut W, values: &[T], as_json: bool) -> Result<()> {
    if as_json {
        writeln!(out, "{}", serde_json::to_string(values)?)?;
    } else {
        for value in values {
            writeln!(out, "{}", value)?;
        }
    }
    Ok(())
}
