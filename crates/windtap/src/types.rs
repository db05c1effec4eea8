//! Core data types for the comparison pipeline.

use nalgebra::{Point3, Vector3};

use crate::colormap::ColorMap;

/// A loaded interpolation grid: triangulated surface plus the derived
/// projection plane and outline.
///
/// Immutable after [`crate::io::load_grid`] returns; every comparison in a
/// batch shares the same grid by reference.
#[derive(Debug, Clone)]
pub struct SurfaceGrid {
    /// Vertex positions; index is the vertex id.
    pub points: Vec<Point3<f64>>,

    /// Triangles as vertex-id triples.
    pub triangles: Vec<[u32; 3]>,

    /// The two coordinate axes (of 0=x, 1=y, 2=z) spanning the dominant
    /// flat plane, sorted by axis index. The excluded axis is the one the
    /// mean surface normal points along.
    pub axes: [usize; 2],

    /// Ordered closed outline (first point repeated at the end), or empty
    /// for degenerate boundaries. Used only for drawing.
    pub boundary: Vec<Point3<f64>>,
}

impl SurfaceGrid {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Project a 3D point onto the grid's plot plane.
    #[inline]
    pub fn project(&self, p: &Point3<f64>) -> (f64, f64) {
        (p[self.axes[0]], p[self.axes[1]])
    }

    /// Axis-aligned bounding box, or None for an empty grid.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.points[1..] {
            for k in 0..3 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        Some((min, max))
    }

    /// Plot-plane extent `((x_min, x_max), (y_min, y_max))` expanded by
    /// `margin` on all sides. Shared by every subplot of a figure.
    pub fn extent(&self, margin: f64) -> Option<((f64, f64), (f64, f64))> {
        let (min, max) = self.bounds()?;
        let (u, v) = (self.axes[0], self.axes[1]);
        Some((
            (min[u] - margin, max[u] + margin),
            (min[v] - margin, max[v] + margin),
        ))
    }
}

/// A triangle with concrete vertex positions.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unit face normal by the right-hand rule, None for degenerate
    /// (zero-area) triangles.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = (self.v1 - self.v0).cross(&(self.v2 - self.v0));
        let len_sq = n.norm_squared();
        if len_sq > f64::EPSILON {
            Some(n / len_sq.sqrt())
        } else {
            None
        }
    }

    #[inline]
    pub fn area(&self) -> f64 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0)).norm() * 0.5
    }
}

/// One discrete measurement: a tap position and its reading.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub position: Point3<f64>,
    pub value: f64,
}

/// A set of scattered measurements to fit an interpolant through.
///
/// Coincident tap coordinates make the basis system singular and are
/// reported by [`crate::interpolate::Rbf::fit`], not silently smoothed.
#[derive(Debug, Clone, Default)]
pub struct ScatteredField {
    pub samples: Vec<Sample>,
}

impl ScatteredField {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Build a field from parallel position/value slices. Values arrive as
    /// `f64` because readings are coerced at the parsing boundary, whatever
    /// their source representation.
    pub fn from_parts(positions: &[Point3<f64>], values: &[f64]) -> Self {
        let samples = positions
            .iter()
            .zip(values)
            .map(|(&position, &value)| Sample { position, value })
            .collect();
        Self { samples }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// An interpolated field with one value per grid vertex, in vertex order.
///
/// Derived data: recomputed whenever the scattered field changes, never
/// mutated in place.
#[derive(Debug, Clone)]
pub struct VertexField {
    pub values: Vec<f64>,
}

impl VertexField {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Color mapping for one subplot: value bounds, level count, ramp, legend
/// label.
///
/// Every recognized option is an explicit field; [`ColorScale::default`]
/// is the absolute-Cp scale the tool has always used.
#[derive(Debug, Clone)]
pub struct ColorScale {
    /// Inclusive (min, max) value bounds. Values outside are clamped to the
    /// ramp ends when drawn ("extend both").
    pub bounds: (f64, f64),

    /// Number of contour levels, linearly spaced between the bounds
    /// inclusive. At least 2.
    pub levels: usize,

    pub colormap: ColorMap,

    /// Legend label drawn above the colorbar.
    pub label: String,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            bounds: (0.0, 0.75),
            levels: 33,
            colormap: ColorMap::default_absolute(),
            label: "Cp".to_string(),
        }
    }
}

impl ColorScale {
    /// The scale used for target-minus-reference delta subplots.
    pub fn delta(variable: &str) -> Self {
        Self {
            bounds: (-0.15, 0.15),
            levels: 17,
            colormap: ColorMap::default_delta(),
            label: format!("d{}", variable),
        }
    }

    /// The level values, `levels` points from min to max inclusive.
    pub fn level_values(&self) -> Vec<f64> {
        let n = self.levels.max(2);
        let (lo, hi) = self.bounds;
        let step = (hi - lo) / (n - 1) as f64;
        (0..n).map(|i| lo + step * i as f64).collect()
    }

    /// Normalize a value into [0, 1] ramp position, clamping outside the
    /// bounds.
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        let (lo, hi) = self.bounds;
        if hi <= lo {
            return 0.5;
        }
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

/// One subplot: an interpolated field, how to color it, and its title.
#[derive(Debug, Clone)]
pub struct PlotSpec {
    pub field: VertexField,
    pub scale: ColorScale,
    pub title: String,
}

impl PlotSpec {
    pub fn new(field: VertexField, scale: ColorScale, title: impl Into<String>) -> Self {
        Self {
            field,
            scale,
            title: title.into(),
        }
    }
}
