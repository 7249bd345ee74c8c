//! Bitclass CLI - bit-vector packet classification benchmark and lookup tool

use anyhow::Result;
use bitclass_core::{LaneWidth, Reduction};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

mod cli;
mod config;

use crate::cli::commands::*;
use crate::config::Config;

#[derive(Parser)]
#[command(name = "bitclass")]
#[command(about = "SIMD bit-vector packet classifier", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Disable colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify random IPv4 keys and report throughput
    Bench {
        /// Rule file (`<id> <a.b.c.d>/<len>` per line)
        rules: PathBuf,

        /// Number of random keys
        #[arg(short = 'n', long)]
        keys: Option<usize>,

        /// Reduction strategy (linear, tree)
        #[arg(short, long)]
        strategy: Option<Reduction>,

        /// Lane width in bits (128, 256)
        #[arg(short, long)]
        lane: Option<LaneWidth>,

        /// RNG seed for key generation
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the matching rule for each address
    Lookup {
        /// Rule file
        rules: PathBuf,

        /// IPv4 addresses to classify
        #[arg(required = true)]
        addrs: Vec<String>,
    },

    /// Validate a rule file and show statistics
    Check {
        /// Rule file
        rules: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.debug {
        tracing_subscriber::fmt()
            .with_env_filter("bitclass=debug,bitclass_core=debug")
            .init();
    }

    // Disable colors if requested
    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = Config::load(cli.config).and_then(|config| match cli.command {
        Commands::Bench {
            rules,
            keys,
            strategy,
            lane,
            seed,
        } => run_bench(
            &rules,
            BenchOptions {
                keys,
                reduction: strategy,
                lane,
                seed,
            },
            &config,
        ),
        Commands::Lookup { rules, addrs } => run_lookup(&rules, &addrs, &config),
        Commands::Check { rules } => run_check(&rules),
    });

    // Handle errors
    if let Err(e) = result {
        eprintln!("{}", cli::format::format_error(&format!("{:#}", e)));
        if cli.debug {
            eprintln!("\n{:#?}", e);
        } else {
            eprintln!("\n{}", "Run with --debug for more details".dimmed());
        }
        std::process::exit(1);
    }

    Ok(())
}
