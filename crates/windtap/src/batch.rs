//! The outer comparison loop: match, interpolate, render, save.
//!
//! Comparisons are processed strictly one at a time; the grid is loaded
//! once and shared read-only. The first structural failure (grid,
//! interpolation, rendering, disk) aborts the batch — plots already
//! written stay on disk — while match-less points are skipped silently.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::error::{RenderError, TapResult};
use crate::interpolate::Rbf;
use crate::matching::{Comparison, MatchOptions, build_comparisons};
use crate::render::{Figure, RenderOptions, render};
use crate::rundata::{ChannelMap, RunTable};
use crate::tracing_ext::OperationTimer;
use crate::types::{ColorScale, PlotSpec, SurfaceGrid};

/// Progress callback, invoked after each saved comparison with
/// `(completed, total)`.
pub type ProgressCallback<'a> = dyn Fn(usize, usize) + 'a;

/// Every knob of a comparison batch.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Display name of the plotted variable; feeds the colorbar labels.
    pub variable: String,

    /// Scale for the target and reference subplots.
    pub absolute_scale: ColorScale,

    /// Scale for the target-minus-reference subplot.
    pub delta_scale: ColorScale,

    pub matching: MatchOptions,
    pub render: RenderOptions,
}

impl BatchOptions {
    /// Defaults for a variable name: absolute [0, 0.75] x 33 levels,
    /// delta [-0.15, 0.15] x 17 levels.
    pub fn for_variable(variable: &str) -> Self {
        let mut absolute_scale = ColorScale::default();
        absolute_scale.label = variable.to_string();
        Self {
            variable: variable.to_string(),
            absolute_scale,
            delta_scale: ColorScale::delta(variable),
            matching: MatchOptions::default(),
            render: RenderOptions::default(),
        }
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::for_variable("Cp")
    }
}

/// Summary of a completed batch.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Figure files written, in processing order.
    pub saved: Vec<PathBuf>,

    /// Comparisons processed (equals `saved.len()` on success).
    pub total: usize,
}

/// Interpolate and render one comparison as a three-row figure:
/// target, reference, delta.
pub fn render_comparison(
    grid: &SurfaceGrid,
    comparison: &Comparison,
    opts: &BatchOptions,
) -> TapResult<Figure> {
    let _timer = OperationTimer::with_item("render_comparison", &comparison.target_run_point);

    let specs = vec![
        PlotSpec::new(
            Rbf::fit(&comparison.target)?.evaluate_on_grid(grid),
            opts.absolute_scale.clone(),
            format!("Target: Run {}", comparison.target_run_point),
        ),
        PlotSpec::new(
            Rbf::fit(&comparison.reference)?.evaluate_on_grid(grid),
            opts.absolute_scale.clone(),
            format!("Reference: {}", comparison.reference_run_point),
        ),
        PlotSpec::new(
            Rbf::fit(&comparison.delta)?.evaluate_on_grid(grid),
            opts.delta_scale.clone(),
            "Target - Reference",
        ),
    ];

    Ok(render(grid, &specs, &opts.render)?)
}

/// Run a full comparison batch, saving one PNG per matched target point
/// under `out_dir/Run_{target}_vs_{reference}/`.
pub fn run_batch(
    grid: &SurfaceGrid,
    target: &RunTable,
    reference: &RunTable,
    map: &ChannelMap,
    out_dir: &Path,
    opts: &BatchOptions,
    progress: Option<&ProgressCallback<'_>>,
) -> TapResult<BatchResult> {
    crate::tracing_ext::log_grid_stats(grid, "batch");
    let comparisons = build_comparisons(target, reference, map, &opts.matching)?;
    let total = comparisons.len();
    info!("Processing {} matched comparisons", total);

    let mut saved = Vec::with_capacity(total);
    for (done, comparison) in comparisons.iter().enumerate() {
        let path = save_comparison(grid, comparison, out_dir, opts).map_err(|e| {
            error!(
                run_point = comparison.target_run_point.as_str(),
                "Comparison failed: {}", e
            );
            e
        })?;
        saved.push(path);

        if let Some(callback) = progress {
            callback(done + 1, total);
        }
    }

    info!("Batch complete: {} figures saved", saved.len());
    Ok(BatchResult { saved, total })
}

fn save_comparison(
    grid: &SurfaceGrid,
    comparison: &Comparison,
    out_dir: &Path,
    opts: &BatchOptions,
) -> TapResult<PathBuf> {
    let figure = render_comparison(grid, comparison, opts)?;

    let dir = out_dir.join(format!(
        "Run_{}_vs_{}",
        comparison.target_run, comparison.reference_run
    ));
    fs::create_dir_all(&dir).map_err(|e| RenderError::Io {
        path: dir.clone(),
        source: e,
    })?;

    let path = dir.join(format!(
        "RH-{}_Run_{}_vs_{}.png",
        format_ride_height(comparison.ride_height),
        comparison.target_run_point,
        comparison.reference_run_point
    ));
    figure.save_png(&path)?;
    Ok(path)
}

/// Ride heights are whole-numbered in practice; print them without a
/// trailing `.0` so directory listings sort cleanly.
fn format_ride_height(rh: f64) -> String {
    if rh.fract() == 0.0 {
        format!("{}", rh as i64)
    } else {
        format!("{}", rh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::build_grid;
    use crate::rundata::{RunRow, Tap};
    use nalgebra::Point3;
    use std::cell::RefCell;

    fn unit_square_grid() -> SurfaceGrid {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_grid(points, vec![[0, 1, 2], [0, 2, 3]], Path::new("square.stl")).unwrap()
    }

    fn columns() -> Vec<String> {
        [
            "Run Number",
            "Point Number",
            "Ride-Height-Number",
            "YAW",
            "RRS_SPEED",
            "DYNPR",
            "P101 psf",
            "P102 psf",
            "P103 psf",
            "P104 psf",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn row(run: f64, point: f64, taps: [f64; 4]) -> RunRow {
        RunRow {
            values: vec![
                run, point, 3.0, 0.0, 150.0, 25.0, taps[0], taps[1], taps[2], taps[3],
            ],
            run_point: format!("{}.{:02}", run as i64, point as i64),
        }
    }

    fn tap_map() -> ChannelMap {
        let tap = |x: f64, y: f64, channel: &str| Tap {
            position: Point3::new(x, y, 0.0),
            channel: channel.to_string(),
        };
        ChannelMap {
            taps: vec![
                tap(0.0, 0.0, "P101"),
                tap(1.0, 0.0, "P102"),
                tap(1.0, 1.0, "P103"),
                tap(0.0, 1.0, "P104"),
            ],
        }
    }

    #[test]
    fn test_batch_saves_expected_paths() {
        let grid = unit_square_grid();
        let target = RunTable::from_parts(columns(), vec![row(11.0, 1.0, [0.1, 0.2, 0.3, 0.4])]);
        let reference = RunTable::from_parts(columns(), vec![row(10.0, 1.0, [0.1, 0.1, 0.2, 0.2])]);
        let out = tempfile::tempdir().unwrap();

        let calls = RefCell::new(Vec::new());
        let progress = |done: usize, total: usize| calls.borrow_mut().push((done, total));

        let result = run_batch(
            &grid,
            &target,
            &reference,
            &tap_map(),
            out.path(),
            &BatchOptions::default(),
            Some(&progress),
        )
        .unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.saved.len(), 1);
        let expected = out
            .path()
            .join("Run_11_vs_10")
            .join("RH-3_Run_11.01_vs_10.01.png");
        assert_eq!(result.saved[0], expected);
        assert!(expected.is_file());
        assert_eq!(*calls.borrow(), vec![(1, 1)]);
    }

    #[test]
    fn test_render_comparison_has_three_rows() {
        let grid = unit_square_grid();
        let target = RunTable::from_parts(columns(), vec![row(11.0, 1.0, [0.1, 0.2, 0.3, 0.4])]);
        let reference = RunTable::from_parts(columns(), vec![row(10.0, 1.0, [0.1, 0.1, 0.2, 0.2])]);
        let comparisons = build_comparisons(
            &target,
            &reference,
            &tap_map(),
            &MatchOptions::default(),
        )
        .unwrap();

        let figure = render_comparison(&grid, &comparisons[0], &BatchOptions::default()).unwrap();
        assert_eq!(figure.subplot_count(), 3);
        assert_eq!(figure.subplots()[2].colorbar_label, "dCp");
    }

    #[test]
    fn test_format_ride_height() {
        assert_eq!(format_ride_height(3.0), "3");
        assert_eq!(format_ride_height(2.5), "2.5");
    }
}
