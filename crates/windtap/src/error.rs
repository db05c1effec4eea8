//! Error types for the pressure-tap plotting pipeline.
//!
//! Each pipeline stage has its own error enum so callers can match on the
//! stage that failed: [`MeshLoadError`] (grid files), [`InterpolationError`]
//! (RBF fitting), [`RenderError`] (figure assembly), [`DataError`] (run
//! tables, channel maps and colormaps). [`TapError`] aggregates them for
//! code that drives the whole pipeline.
//!
//! A missing reference match is deliberately *not* an error: the batch loop
//! skips the item and continues.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for whole-pipeline operations.
pub type TapResult<T> = Result<T, TapError>;

/// Errors while loading an interpolation grid from a mesh file.
#[derive(Debug, Error, Diagnostic)]
pub enum MeshLoadError {
    /// The grid file could not be read at all.
    #[error("failed to read grid from {path}")]
    #[diagnostic(
        code(windtap::grid::io),
        help("Check that the file exists and is readable")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not a parsable triangulated surface.
    #[error("failed to parse grid from {path}: {details}")]
    #[diagnostic(
        code(windtap::grid::parse),
        help("The grid must be a binary or ASCII STL surface. Try re-exporting it.")
    )]
    Parse { path: PathBuf, details: String },

    /// Too little usable geometry to infer a projection plane.
    #[error("grid {path} is degenerate: only {triangles} valid triangles")]
    #[diagnostic(
        code(windtap::grid::degenerate),
        help("An interpolation grid needs at least 3 non-degenerate triangles")
    )]
    DegenerateSurface { path: PathBuf, triangles: usize },
}

impl MeshLoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshLoadError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        MeshLoadError::Parse {
            path: path.into(),
            details: details.into(),
        }
    }
}

/// Errors while fitting or evaluating the scattered-data interpolant.
#[derive(Debug, Error, Diagnostic)]
pub enum InterpolationError {
    /// A stable RBF fit needs a minimum number of samples.
    #[error("scattered field has {found} samples, at least {required} required")]
    #[diagnostic(
        code(windtap::interp::too_few_samples),
        help("Check the channel map: every tap needs a position and a reading")
    )]
    TooFewSamples { found: usize, required: usize },

    /// The basis system could not be solved (typically coincident taps).
    #[error("radial basis system is singular: {details}")]
    #[diagnostic(
        code(windtap::interp::singular),
        help("Look for duplicate tap coordinates in the channel map")
    )]
    Singular { details: String },
}

/// Errors while rendering a contour figure.
#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    /// A figure with zero subplots is a caller bug, not a blank image.
    #[error("no plot specs supplied")]
    #[diagnostic(
        code(windtap::render::no_plots),
        help("Pass at least one PlotSpec to render()")
    )]
    NoPlots,

    /// An interpolated field does not line up with the grid vertices.
    #[error("field has {field_len} values but grid has {vertex_count} vertices")]
    #[diagnostic(
        code(windtap::render::field_mismatch),
        help("Interpolated fields must be evaluated on the same grid they are drawn on")
    )]
    FieldMismatch {
        field_len: usize,
        vertex_count: usize,
    },

    /// The drawing backend rejected an element.
    #[error("drawing backend failure: {details}")]
    #[diagnostic(code(windtap::render::backend))]
    Backend { details: String },

    /// Writing the finished figure to disk failed.
    #[error("failed to write figure to {path}")]
    #[diagnostic(
        code(windtap::render::io),
        help("Check that the output directory exists and is writable")
    )]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    pub fn backend(details: impl Into<String>) -> Self {
        RenderError::Backend {
            details: details.into(),
        }
    }
}

/// Errors in the tabular inputs: run tables, channel maps, colormaps.
#[derive(Debug, Error, Diagnostic)]
pub enum DataError {
    #[error("failed to read {path}")]
    #[diagnostic(code(windtap::data::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path} as delimited data")]
    #[diagnostic(
        code(windtap::data::csv),
        help("Run tables are tab-separated .asc exports; channel maps are comma CSV")
    )]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A column the matching logic depends on is absent.
    #[error("{path} is missing required column {column:?}")]
    #[diagnostic(code(windtap::data::missing_column))]
    MissingColumn { path: PathBuf, column: String },

    /// A channel-map entry matched no run-table column.
    #[error("channel {channel:?} matches no column in the run table")]
    #[diagnostic(
        code(windtap::data::unknown_channel),
        help("Channel names are matched as prefixes of run-table column names")
    )]
    UnknownChannel { channel: String },

    #[error("invalid colormap: {details}")]
    #[diagnostic(
        code(windtap::data::colormap),
        help("Colormaps are ParaView JSON: [{{\"Name\": ..., \"RGBPoints\": [x,r,g,b, ...]}}]")
    )]
    Colormap { details: String },
}

impl DataError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DataError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        DataError::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn missing_column(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        DataError::MissingColumn {
            path: path.into(),
            column: column.into(),
        }
    }

    pub fn colormap(details: impl Into<String>) -> Self {
        DataError::Colormap {
            details: details.into(),
        }
    }
}

/// Any failure in the comparison pipeline.
#[derive(Debug, Error, Diagnostic)]
pub enum TapError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    MeshLoad(#[from] MeshLoadError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Interpolation(#[from] InterpolationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Data(#[from] DataError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_counts() {
        let err = RenderError::FieldMismatch {
            field_len: 7,
            vertex_count: 12,
        };
        let text = format!("{}", err);
        assert!(text.contains('7'));
        assert!(text.contains("12"));
    }

    #[test]
    fn test_too_few_samples_display() {
        let err = InterpolationError::TooFewSamples {
            found: 2,
            required: 4,
        };
        assert!(format!("{}", err).contains("2 samples"));
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: TapError = RenderError::NoPlots.into();
        assert!(matches!(err, TapError::Render(RenderError::NoPlots)));
    }
}
