//! Pressure-tap contour comparison for wind-tunnel runs.
//!
//! windtap diffs two physical test runs ("target" and "reference") taken
//! at matching ride-height / yaw / speed conditions: discrete tap
//! readings are converted to pressure coefficients, scattered onto a
//! triangulated surface grid with an exact radial-basis interpolant, and
//! drawn as stacked filled-contour subplots (target, reference, delta)
//! sharing one spatial extent.
//!
//! # Pipeline
//!
//! 1. [`io::load_grid`] — parse the STL interpolation grid once, infer
//!    the two plot axes from the mean surface normal and extract the
//!    ordered boundary outline.
//! 2. [`rundata::RunTable::read`] / [`rundata::ChannelMap::read`] — parse
//!    the tab-separated run exports and the tap layout CSV.
//! 3. [`matching::build_comparisons`] — pair each target point with the
//!    reference rows measured at the same condition and derive Cp fields.
//! 4. [`interpolate::Rbf`] — fit one interpolant per field and evaluate
//!    it at every grid vertex.
//! 5. [`render::render`] — produce the stacked contour [`render::Figure`];
//!    saving it to PNG is a separate step.
//!
//! [`batch::run_batch`] drives steps 3-5 for a whole run pair.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use windtap::{BatchOptions, ChannelMap, RunTable, io, batch};
//!
//! fn main() -> windtap::TapResult<()> {
//!     let grid = io::load_grid(Path::new("diffuser.stl"))?;
//!     let target = RunTable::read(Path::new("target/D1.asc"))?;
//!     let reference = RunTable::read(Path::new("reference/D1.asc"))?;
//!     let map = ChannelMap::read(Path::new("diffuser_taps.csv"))?;
//!
//!     let result = batch::run_batch(
//!         &grid,
//!         &target,
//!         &reference,
//!         &map,
//!         Path::new("plots"),
//!         &BatchOptions::default(),
//!         None,
//!     )?;
//!     println!("{} figures written", result.saved.len());
//!     Ok(())
//! }
//! ```
//!
//! # Logging
//!
//! The library logs through `tracing`; install a subscriber (e.g.
//! `RUST_LOG=windtap=debug`) to see grid statistics, match decisions and
//! per-operation timing.

mod error;
mod types;

pub mod batch;
pub mod colormap;
pub mod interpolate;
pub mod io;
pub mod matching;
pub mod perimeter;
pub mod render;
pub mod rundata;
pub mod tracing_ext;

pub use batch::{BatchOptions, BatchResult, ProgressCallback};
pub use colormap::{ColorMap, ColorStop};
pub use error::{DataError, InterpolationError, MeshLoadError, RenderError, TapError, TapResult};
pub use interpolate::{MIN_SAMPLES, Rbf, RbfKernel};
pub use matching::{CP_FACTOR, Comparison, MatchOptions};
pub use perimeter::sort_perimeter;
pub use render::{Figure, RenderOptions, SubplotInfo};
pub use rundata::{ChannelMap, RunRow, RunTable, Tap};
pub use types::{ColorScale, PlotSpec, Sample, ScatteredField, SurfaceGrid, Triangle, VertexField};
