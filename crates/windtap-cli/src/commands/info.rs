//! windtap grid-info command - display grid statistics.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use windtap::io;

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct GridInfo {
    path: String,
    vertices: usize,
    triangles: usize,
    plot_axes: [usize; 2],
    boundary_points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundsInfo>,
}

#[derive(Serialize)]
struct BoundsInfo {
    min: [f64; 3],
    max: [f64; 3],
}

pub fn run(input: &Path, cli: &Cli) -> Result<()> {
    let grid =
        io::load_grid(input).with_context(|| format!("Failed to load grid from {:?}", input))?;

    let bounds = grid.bounds().map(|(min, max)| BoundsInfo {
        min: [min.x, min.y, min.z],
        max: [max.x, max.y, max.z],
    });

    let info = GridInfo {
        path: input.display().to_string(),
        vertices: grid.vertex_count(),
        triangles: grid.triangle_count(),
        plot_axes: grid.axes,
        boundary_points: grid.boundary.len(),
        bounds,
    };

    match cli.format {
        OutputFormat::Json => output::print(&info, cli.format, cli.quiet),
        OutputFormat::Text => {
            if !cli.quiet {
                const AXIS_NAMES: [&str; 3] = ["x", "y", "z"];
                println!("{}", "Grid Information".bold().underline());
                println!("  {}: {}", "File".cyan(), info.path);
                println!("  {}: {}", "Vertices".cyan(), info.vertices);
                println!("  {}: {}", "Triangles".cyan(), info.triangles);
                println!(
                    "  {}: {}-{}",
                    "Plot plane".cyan(),
                    AXIS_NAMES[info.plot_axes[0]],
                    AXIS_NAMES[info.plot_axes[1]]
                );
                println!(
                    "  {}: {}",
                    "Boundary points".cyan(),
                    info.boundary_points
                );
                if let Some(ref b) = info.bounds {
                    println!(
                        "  {}: ({:.2}, {:.2}, {:.2}) to ({:.2}, {:.2}, {:.2})",
                        "Bounds".cyan(),
                        b.min[0],
                        b.min[1],
                        b.min[2],
                        b.max[0],
                        b.max[1],
                        b.max[2]
                    );
                }
            }
        }
    }

    Ok(())
}
