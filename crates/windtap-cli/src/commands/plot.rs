//! windtap plot command - run a full comparison batch.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde::Serialize;

use windtap::{BatchOptions, ChannelMap, ColorMap, RunTable, batch, io};

use crate::{Cli, OutputFormat, PlotArgs, output};

#[derive(Serialize)]
struct PlotSummary {
    comparisons: usize,
    figures: Vec<String>,
    out_dir: String,
}

pub fn run(args: &PlotArgs, cli: &Cli) -> Result<()> {
    let grid = io::load_grid(&args.grid)
        .with_context(|| format!("Failed to load grid from {:?}", args.grid))?;
    let target = RunTable::read(&args.target)
        .with_context(|| format!("Failed to read target run from {:?}", args.target))?;
    let reference = RunTable::read(&args.reference)
        .with_context(|| format!("Failed to read reference run from {:?}", args.reference))?;
    let map = ChannelMap::read(&args.channel_map)
        .with_context(|| format!("Failed to read channel map from {:?}", args.channel_map))?;

    // Fail before any processing when an input is empty.
    if target.is_empty() {
        bail!("target run table {:?} has no data rows", args.target);
    }
    if reference.is_empty() {
        bail!("reference run table {:?} has no data rows", args.reference);
    }
    if map.is_empty() {
        bail!("channel map {:?} has no taps", args.channel_map);
    }

    let opts = build_options(args)?;

    let quiet = cli.quiet;
    let progress = |done: usize, total: usize| {
        if !quiet {
            eprintln!("  [{}/{}] figure saved", done, total);
        }
    };

    let result = batch::run_batch(
        &grid,
        &target,
        &reference,
        &map,
        &args.out,
        &opts,
        Some(&progress),
    )?;

    let summary = PlotSummary {
        comparisons: result.total,
        figures: result
            .saved
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        out_dir: args.out.display().to_string(),
    };

    match cli.format {
        OutputFormat::Json => output::print(&summary, cli.format, cli.quiet),
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Comparison Plots".bold().underline());
                println!("  {}: {}", "Comparisons".cyan(), summary.comparisons);
                println!("  {}: {}", "Figures".cyan(), summary.figures.len());
                println!("  {}: {}", "Saved under".cyan(), summary.out_dir);
            }
        }
    }

    Ok(())
}

fn build_options(args: &PlotArgs) -> Result<BatchOptions> {
    let mut opts = BatchOptions::for_variable(&args.variable);
    opts.absolute_scale.bounds = (args.abs_min, args.abs_max);
    opts.delta_scale.bounds = (args.delta_min, args.delta_max);
    opts.matching.min_speed = args.min_speed;

    if let Some(path) = &args.colormap {
        opts.absolute_scale.colormap = ColorMap::from_json_path(path)
            .with_context(|| format!("Failed to load colormap from {:?}", path))?;
    }
    if let Some(path) = &args.delta_colormap {
        opts.delta_scale.colormap = ColorMap::from_json_path(path)
            .with_context(|| format!("Failed to load delta colormap from {:?}", path))?;
    }

    Ok(opts)
}
