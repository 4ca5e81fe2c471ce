//! `tbn-explorer`: analyze / filter / ibot command-line interface.
//!
//! Thin wiring layer over the library crates — no analysis logic lives
//! here, only argument parsing, solver selection, and result rendering.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tbn-explorer", about = "Analyze Thermodynamics of Binding Networks")]
struct Cli {
    #[arg(short, long, global = true, help = "Enable verbose tracing (or set RUST_LOG)")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the polymer basis, free energies, and equilibrium concentrations of a .tbn file.
    Analyze(commands::analyze::AnalyzeArgs),
    /// Query a computed polymer basis by monomer composition.
    Filter(commands::filter::FilterArgs),
    /// Run the Iterative Balancing of Off-Target algorithm.
    Ibot(commands::ibot::IbotArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args),
        Commands::Filter(args) => commands::filter::run(args),
        Commands::Ibot(args) => commands::ibot::run(args),
    };

    if let Err(e) = &result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| if verbose { "tbn_cli=debug".into() } else { "tbn_cli=info".into() });
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).without_time().init();
}

fn solver_config() -> tbn_core::SolverConfig {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    tbn_core::SolverConfig::load(&cwd)
}
