//! windtap-cli: command-line driver for pressure-tap comparison plots.
//!
//! # Logging
//!
//! Set `RUST_LOG` to control log output:
//! - `RUST_LOG=windtap=info` - basic pipeline logging
//! - `RUST_LOG=windtap=debug` - match decisions and grid details
//! - `RUST_LOG=windtap::timing=debug` - per-operation timing
//!
//! # Example
//!
//! ```bash
//! windtap plot \
//!     --target runs/Run0011/D1.asc \
//!     --reference runs/Run0010/D1.asc \
//!     --channel-map diffuser_taps.csv \
//!     --grid diffuser.stl \
//!     --out plots/
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use miette::Diagnostic;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{info, plot};

/// windtap - side-by-side and delta Cp contour plots for wind-tunnel runs.
#[derive(Parser)]
#[command(name = "windtap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Render target/reference/delta contour figures for a run pair
    Plot(PlotArgs),

    /// Display an interpolation grid's inferred plane and outline
    GridInfo {
        /// Grid STL file
        input: PathBuf,
    },
}

#[derive(Args)]
pub struct PlotArgs {
    /// Target run table (tab-separated D1.asc export)
    #[arg(long)]
    target: PathBuf,

    /// Reference run table (tab-separated D1.asc export)
    #[arg(long)]
    reference: PathBuf,

    /// Channel map CSV (x, y, z, channel)
    #[arg(long)]
    channel_map: PathBuf,

    /// Interpolation grid STL
    #[arg(long)]
    grid: PathBuf,

    /// Directory figures are saved under
    #[arg(long, short)]
    out: PathBuf,

    /// Variable name shown on colorbars
    #[arg(long, default_value = "Cp")]
    variable: String,

    /// Absolute scale range
    #[arg(long, default_value = "0.0")]
    abs_min: f64,
    #[arg(long, default_value = "0.75")]
    abs_max: f64,

    /// Delta scale range
    #[arg(long, default_value = "-0.15")]
    delta_min: f64,
    #[arg(long, default_value = "0.15")]
    delta_max: f64,

    /// Skip target points below this belt speed
    #[arg(long, default_value = "20.0")]
    min_speed: f64,

    /// ParaView JSON colormap for the absolute subplots
    #[arg(long)]
    colormap: Option<PathBuf>,

    /// ParaView JSON colormap for the delta subplot
    #[arg(long)]
    delta_colormap: Option<PathBuf>,
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over the -v flags.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "windtap=info",
            2 => "windtap=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::Plot(args) => plot::run(args, &cli),
        Commands::GridInfo { input } => info::run(input, &cli),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            if let Some(tap) = e.downcast_ref::<windtap::TapError>() {
                eprintln!("{}: {}", "Error".red().bold(), tap);
                if let Some(code) = tap.code() {
                    eprintln!("  {}: {}", "Code".cyan(), code);
                }
                if let Some(help) = tap.help() {
                    eprintln!("  {}: {}", "Help".green(), help);
                }
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
